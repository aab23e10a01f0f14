// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Auth middleware. `X-API-Key` is checked first, then `Authorization:
//! Bearer <jwt>`; the resolved [`Principal`] lands in request extensions
//! for handlers to pick up.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(api_key) = request
        .headers()
        .get("X-API-Key")
        .and_then(|value| value.to_str().ok())
    {
        if let Ok(Some(principal)) = state.auth.principal_from_api_key(api_key).await {
            request.extensions_mut().insert(principal);
            return Ok(next.run(request).await);
        }
    }

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("invalid authorization header format"))?;

    let principal = state
        .auth
        .principal_from_token(token)
        .ok_or_else(|| ApiError::unauthorized("invalid token"))?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
