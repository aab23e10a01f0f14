// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Extension, Query, State};
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::audit::AuditRecord;
use crate::domain::repository::AuditFilter;
use crate::domain::wallet::Principal;
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;

#[derive(Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub policy_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates.
fn parse_date(raw: &str, what: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(ApiError::bad_request(format!("invalid {what}")))
}

fn parse_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
    let start = start.map(|s| parse_date(s, "start_date")).transpose()?;
    let end = end.map(|s| parse_date(s, "end_date")).transpose()?;
    Ok((start, end))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (start, end) = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;

    let filter = AuditFilter {
        event_type: query.event_type,
        agent_id: query.agent_id,
        policy_id: query.policy_id,
        start,
        end,
        limit: query.limit.filter(|l| *l > 0 && *l <= 1000).unwrap_or(50),
        offset: query.offset.filter(|o| *o >= 0).unwrap_or(0),
    };

    let (records, total) = state.audit.list(principal.wallet_id, filter).await?;
    Ok((
        AppendHeaders([("X-Total-Count", total.to_string())]),
        Json(records),
    ))
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

pub async fn export(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (start, end) = parse_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let records = state.audit.export(principal.wallet_id, start, end).await?;

    if query.format.as_deref() == Some("csv") {
        let body = to_csv(&records)
            .map_err(|_| ApiError::bad_request("failed to encode audit export"))?;
        return Ok((
            AppendHeaders([
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=audit_logs.csv".to_string(),
                ),
            ]),
            body,
        )
            .into_response());
    }

    Ok((
        AppendHeaders([(
            header::CONTENT_DISPOSITION,
            "attachment; filename=audit_logs.json".to_string(),
        )]),
        Json(records),
    )
        .into_response())
}

fn to_csv(records: &[AuditRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "wallet_id",
        "agent_id",
        "policy_id",
        "permission_id",
        "event_type",
        "details",
        "ip_address",
        "user_agent",
        "created_at",
    ])?;

    for record in records {
        writer.write_record([
            record.id.to_string(),
            record.wallet_id.to_string(),
            record.agent_id.map(|id| id.to_string()).unwrap_or_default(),
            record.policy_id.map(|id| id.to_string()).unwrap_or_default(),
            record
                .permission_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            record.event_type.clone(),
            record
                .details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            record.ip_address.clone().unwrap_or_default(),
            record.user_agent.clone().unwrap_or_default(),
            record.created_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_both_shapes() {
        assert!(parse_date("2026-01-02T03:04:05Z", "start_date").is_ok());
        assert!(parse_date("2026-01-02", "start_date").is_ok());
        assert!(parse_date("yesterday", "start_date").is_err());
    }
}
