// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::action::Action;
use crate::domain::policy::is_valid_action;
use crate::domain::validation::Decision;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;
use crate::presentation::handlers::ApiJson;

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub agent_id: Uuid,
    pub action: Action,
}

fn check_action(action: &Action) -> Result<(), ApiError> {
    if !is_valid_action(&action.kind) {
        return Err(ApiError::bad_request(format!(
            "invalid action type: {}",
            action.kind
        )));
    }
    Ok(())
}

pub async fn validate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<ValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_action(&req.action)?;
    let decision = state
        .validation
        .validate(principal.wallet_id, req.agent_id, req.action)
        .await;
    Ok(Json(decision))
}

#[derive(Deserialize)]
pub struct BatchValidateRequest {
    pub requests: Vec<ValidateRequest>,
}

#[derive(Serialize)]
pub struct BatchValidateResponse {
    pub results: Vec<Decision>,
}

pub async fn validate_batch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<BatchValidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for request in &req.requests {
        check_action(&request.action)?;
    }
    let requests = req
        .requests
        .into_iter()
        .map(|r| (r.agent_id, r.action))
        .collect();
    let results = state
        .validation
        .validate_batch(principal.wallet_id, requests)
        .await?;
    Ok(Json(BatchValidateResponse { results }))
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    pub agent_id: Uuid,
    pub action: Action,
}

pub async fn simulate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<SimulateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_action(&req.action)?;
    let simulation = state
        .validation
        .simulate(principal.wallet_id, req.agent_id, req.action)
        .await;
    Ok(Json(simulation))
}
