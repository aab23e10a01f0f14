// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::repository::PermissionFilter;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::{parse_id, ApiJson};

#[derive(Deserialize)]
pub struct CreatePermissionRequest {
    pub agent_id: Uuid,
    pub policy_id: Uuid,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreatePermissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let permission = state
        .permissions
        .create(
            principal.wallet_id,
            req.agent_id,
            req.policy_id,
            req.valid_from,
            req.valid_until,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[derive(Deserialize)]
pub struct ListPermissionsQuery {
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub policy_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListPermissionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = PermissionFilter {
        agent_id: query.agent_id,
        policy_id: query.policy_id,
    };
    Ok(Json(
        state.permissions.list(principal.wallet_id, filter).await?,
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "permission")?;
    Ok(Json(state.permissions.get(principal.wallet_id, id).await?))
}

/// DELETE revokes: permissions are never removed, only flipped.
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "permission")?;
    state.permissions.revoke(principal.wallet_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mint(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "permission")?;
    Ok(Json(state.permissions.mint(principal.wallet_id, id).await?))
}
