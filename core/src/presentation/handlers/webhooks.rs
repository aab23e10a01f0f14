// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::domain::repository::WebhookUpdate;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::{parse_id, ApiJson};

#[derive(Deserialize)]
pub struct CreateWebhookRequest {
    pub name: String,
    pub url: String,
    pub events: Vec<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let webhook = state
        .webhooks
        .create(principal.wallet_id, req.name, req.url, req.events)
        .await?;
    Ok((StatusCode::CREATED, Json(webhook)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.webhooks.list(principal.wallet_id).await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "webhook")?;
    Ok(Json(state.webhooks.get(principal.wallet_id, id).await?))
}

#[derive(Deserialize)]
pub struct UpdateWebhookRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<String>>,
    #[serde(default)]
    pub active: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "webhook")?;
    let update = WebhookUpdate {
        name: req.name,
        url: req.url,
        events: req.events,
        active: req.active,
    };
    Ok(Json(
        state
            .webhooks
            .update(principal.wallet_id, id, update)
            .await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "webhook")?;
    state.webhooks.delete(principal.wallet_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
