// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::{parse_id, ApiJson};

#[derive(Serialize)]
pub struct NonceResponse {
    pub nonce: String,
}

pub async fn nonce(State(state): State<AppState>) -> Json<NonceResponse> {
    Json(NonceResponse {
        nonce: state.auth.issue_nonce(),
    })
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub token: String,
    pub address: String,
}

pub async fn verify(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let outcome = state.auth.verify_login(&req.message, &req.signature).await?;
    Ok(Json(VerifyResponse {
        token: outcome.token,
        address: outcome.address,
    }))
}

#[derive(Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub key: String,
    pub name: String,
}

pub async fn create_api_key(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .auth
        .create_api_key(principal.wallet_id, req.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponse {
            id: issued.id,
            key: issued.key,
            name: issued.name,
        }),
    ))
}

pub async fn list_api_keys(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let keys = state.auth.list_api_keys(principal.wallet_id).await?;
    Ok(Json(keys))
}

pub async fn delete_api_key(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "key")?;
    state.auth.revoke_api_key(principal.wallet_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
