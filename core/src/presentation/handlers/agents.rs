// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::domain::agent::{AgentStatus, WalletType};
use crate::domain::repository::AgentUpdate;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::{parse_id, ApiJson};

#[derive(Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub agent_address: Option<String>,
    #[serde(default)]
    pub wallet_type: Option<String>,
    #[serde(default)]
    pub chain_id: Option<i64>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet_type = match req.wallet_type.as_deref() {
        Some("smart_account") => WalletType::SmartAccount,
        _ => WalletType::Eoa,
    };

    let agent = state
        .agents
        .create(
            principal.wallet_id,
            req.name,
            req.description,
            req.agent_address,
            wallet_type,
            req.chain_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.agents.list(principal.wallet_id).await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "agent")?;
    Ok(Json(state.agents.get(principal.wallet_id, id).await?))
}

#[derive(Deserialize)]
pub struct UpdateAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub agent_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateAgentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "agent")?;
    let update = AgentUpdate {
        name: req.name,
        description: req.description,
        agent_address: req.agent_address,
        status: req.status.as_deref().map(AgentStatus::from_db),
    };
    Ok(Json(
        state.agents.update(principal.wallet_id, id, update).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "agent")?;
    state.agents.delete(principal.wallet_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn register_onchain(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "agent")?;
    Ok(Json(
        state
            .agents
            .register_onchain(principal.wallet_id, id)
            .await?,
    ))
}

pub async fn sync_onchain(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .agents
            .sync_from_chain(principal.wallet_id, &principal.address)
            .await?,
    ))
}
