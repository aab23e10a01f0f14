// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::application::policies::PolicyChanges;
use crate::domain::policy::Definition;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::{parse_id, ApiJson};

#[derive(Deserialize)]
pub struct CreatePolicyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub definition: Definition,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreatePolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = state
        .policies
        .create(principal.wallet_id, req.name, req.description, req.definition)
        .await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.policies.list(principal.wallet_id).await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    Ok(Json(state.policies.get(principal.wallet_id, id).await?))
}

#[derive(Deserialize)]
pub struct UpdatePolicyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: Option<Definition>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePolicyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    let changes = PolicyChanges {
        name: req.name,
        description: req.description,
        definition: req.definition,
    };
    Ok(Json(
        state
            .policies
            .update(principal.wallet_id, id, changes)
            .await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    state.policies.delete(principal.wallet_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    Ok(Json(state.policies.activate(principal.wallet_id, id).await?))
}

pub async fn revoke(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    Ok(Json(state.policies.revoke(principal.wallet_id, id).await?))
}

pub async fn reactivate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "policy")?;
    Ok(Json(
        state.policies.reactivate(principal.wallet_id, id).await?,
    ))
}
