// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request handlers, one module per resource. Handlers stay thin: parse,
//! delegate to the application service, map the error kind.

pub mod agents;
pub mod audit;
pub mod auth;
pub mod permissions;
pub mod policies;
pub mod validation;
pub mod webhooks;

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::presentation::error::ApiError;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// JSON extractor whose rejection matches the API error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|_| ApiError::bad_request("invalid request body"))?;
        Ok(ApiJson(value))
    }
}

/// Path ids are parsed by hand so malformed ids produce the same error
/// body as every other failure.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid {what} id")))
}
