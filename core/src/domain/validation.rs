// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Validation records and decision outcomes. A record row is appended for
//! every decision (allow or deny) and doubles as the source of truth for
//! rolling-usage accounting, so rows are never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Append-only row recording a single decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub agent_id: Uuid,
    pub action_type: String,
    /// Raw action JSON as submitted; `action_data.amount` feeds the
    /// rolling-usage sum.
    pub action_data: Value,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a `validate` call.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,
    /// Projected constraints of the matching policy:
    /// `{maxValuePerTx, maxDailyVolume, requireApproval}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
    /// Id of the validation record appended for this decision.
    pub request_id: Uuid,
}

/// Outcome of a `simulate` call. Nothing is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Simulation {
    pub would_allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_policy: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_quota: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub recommendations: Vec<String>,
}
