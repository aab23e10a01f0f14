// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Validation Engine
//!
//! The decision path: given (wallet, agent, action), select the first
//! currently-valid permission whose policy definition matches the action
//! and allow, otherwise deny. Candidates are evaluated in the store's
//! deterministic order (`created_at DESC, id ASC`), so for a fixed store
//! state the decision is a pure function of the input.
//!
//! Per-permission failures never fail the call: a stored definition that
//! no longer parses is skipped, and a store error inside evaluation
//! degrades to a deny with reason `internal error`.
//!
//! Rolling usage is the sum of `action_data.amount` over *allowed*
//! records since the start of the current UTC calendar day (a calendar
//! window, not a trailing 24 h — contractual). It is computed at decision
//! time, fetched at most once per call, and only when a candidate's
//! `maxDailyVolume` actually needs it. The usage check and the record
//! insert are deliberately not serialized: two concurrent calls may both
//! observe the pre-state. Single-threaded use is tight; concurrent use is
//! best-effort.

use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::action::Action;
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::policy::{parse_amount, Definition};
use crate::domain::repository::{PermissionRepository, ValidationRepository};
use crate::domain::validation::{Decision, Simulation, ValidationRecord};

/// Maximum actions accepted by a single batch call.
pub const MAX_BATCH: usize = 100;

const NO_MATCH: &str = "no matching policy found for this action";

pub struct ValidationEngine {
    permissions: Arc<dyn PermissionRepository>,
    validations: Arc<dyn ValidationRepository>,
    audit: Arc<dyn AuditSink>,
}

#[derive(Debug, Clone)]
struct Evaluation {
    allowed: bool,
    reason: Option<String>,
    permission_id: Option<Uuid>,
    policy_id: Option<Uuid>,
    constraints: Option<Value>,
}

impl Evaluation {
    fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            permission_id: None,
            policy_id: None,
            constraints: None,
        }
    }
}

impl ValidationEngine {
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        validations: Arc<dyn ValidationRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            permissions,
            validations,
            audit,
        }
    }

    /// Decide and record. Every call appends a validation record (allow
    /// or deny) and emits a `validation.request` audit event.
    pub async fn validate(&self, wallet_id: Uuid, agent_id: Uuid, action: Action) -> Decision {
        let decision = self.decide(wallet_id, agent_id, &action).await;

        self.audit
            .record({
                let mut event = NewAuditEvent::new(wallet_id, "validation.request")
                    .agent(agent_id)
                    .details(json!({
                        "action": action,
                        "allowed": decision.allowed,
                        "reason": decision.reason.clone(),
                        "request_id": decision.request_id,
                    }));
                event.policy_id = decision.policy_id;
                event.permission_id = decision.permission_id;
                event
            })
            .await;

        decision
    }

    /// Up to [`MAX_BATCH`] actions against one agent set, processed
    /// sequentially; each produces an independent validation record.
    pub async fn validate_batch(
        &self,
        wallet_id: Uuid,
        requests: Vec<(Uuid, Action)>,
    ) -> Result<Vec<Decision>, ServiceError> {
        if requests.len() > MAX_BATCH {
            return Err(ServiceError::invalid("max 100 requests per batch"));
        }

        let mut decisions = Vec::with_capacity(requests.len());
        for (agent_id, action) in requests {
            decisions.push(self.decide(wallet_id, agent_id, &action).await);
        }
        Ok(decisions)
    }

    /// Dry-run: evaluate without recording, and report current usage plus
    /// remaining daily quota where a matching policy defines one.
    pub async fn simulate(&self, wallet_id: Uuid, agent_id: Uuid, action: Action) -> Simulation {
        let eval = self.evaluate(wallet_id, agent_id, &action).await;

        let mut current_usage = None;
        let mut remaining_quota = None;
        let mut recommendations = Vec::new();

        if eval.policy_id.is_some() {
            let usage = self.rolling_usage(wallet_id, agent_id).await;
            current_usage = Some(json!({ "daily": usage.to_string() }));

            let max_daily = eval
                .constraints
                .as_ref()
                .and_then(|c| c.get("maxDailyVolume"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .and_then(parse_amount);
            if let Some(max_daily) = max_daily {
                let remaining = num_bigint::BigInt::from(max_daily) - num_bigint::BigInt::from(usage);
                remaining_quota = Some(json!({ "daily": remaining.to_string() }));
            }
        } else {
            recommendations.push("Create a policy that allows this action type".to_string());
            recommendations
                .push("Grant permission to the agent with an active policy".to_string());
        }

        Simulation {
            would_allow: eval.allowed,
            reason: eval.reason,
            matching_policy: eval.policy_id,
            current_usage,
            remaining_quota,
            recommendations,
        }
    }

    async fn decide(&self, wallet_id: Uuid, agent_id: Uuid, action: &Action) -> Decision {
        let started = Instant::now();
        let eval = self.evaluate(wallet_id, agent_id, action).await;

        let record = ValidationRecord {
            id: Uuid::new_v4(),
            wallet_id,
            agent_id,
            action_type: action.kind.clone(),
            action_data: serde_json::to_value(action).unwrap_or(Value::Null),
            allowed: eval.allowed,
            reason: eval.reason.clone(),
            permission_id: eval.permission_id,
            policy_id: eval.policy_id,
            latency_ms: started.elapsed().as_millis() as i64,
            created_at: Utc::now(),
        };
        if let Err(e) = self.validations.insert(&record).await {
            error!(error = %e, "failed to record validation request");
        }

        Decision {
            allowed: eval.allowed,
            reason: eval.reason,
            permission_id: eval.permission_id,
            policy_id: eval.policy_id,
            constraints: eval.constraints,
            request_id: record.id,
        }
    }

    async fn evaluate(&self, wallet_id: Uuid, agent_id: Uuid, action: &Action) -> Evaluation {
        let bindings = match self
            .permissions
            .active_bindings(wallet_id, agent_id, Utc::now())
            .await
        {
            Ok(bindings) => bindings,
            Err(e) => {
                error!(error = %e, "failed to query permissions");
                return Evaluation::denied("internal error");
            }
        };

        let mut usage: Option<BigUint> = None;
        for binding in bindings {
            // Malformed historical definitions skip this permission only.
            let definition: Definition = match serde_json::from_value(binding.definition) {
                Ok(d) => d,
                Err(_) => continue,
            };

            if usage.is_none() && definition.needs_rolling_usage(action) {
                usage = Some(self.rolling_usage(wallet_id, agent_id).await);
            }

            if definition.matches(action, usage.as_ref()) {
                return Evaluation {
                    allowed: true,
                    reason: None,
                    permission_id: Some(binding.permission_id),
                    policy_id: Some(binding.policy_id),
                    constraints: Some(json!({
                        "maxValuePerTx": definition
                            .constraints
                            .max_value_per_tx
                            .unwrap_or_default(),
                        "maxDailyVolume": definition
                            .constraints
                            .max_daily_volume
                            .unwrap_or_default(),
                        "requireApproval": definition.constraints.require_approval,
                    })),
                };
            }
        }

        Evaluation::denied(NO_MATCH)
    }

    /// Allowed volume so far today (UTC calendar day). Store errors read
    /// as zero usage, matching the permissive original.
    async fn rolling_usage(&self, wallet_id: Uuid, agent_id: Uuid) -> BigUint {
        let since = start_of_utc_day(Utc::now());
        match self
            .validations
            .allowed_amounts_since(wallet_id, agent_id, since)
            .await
        {
            Ok(amounts) => amounts
                .iter()
                .filter_map(|raw| parse_amount(raw))
                .sum(),
            Err(e) => {
                error!(error = %e, "failed to compute rolling usage");
                BigUint::default()
            }
        }
    }
}

fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_utc_day() {
        let now = DateTime::parse_from_rfc3339("2026-03-14T15:09:26Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = start_of_utc_day(now);
        assert_eq!(start.to_rfc3339(), "2026-03-14T00:00:00+00:00");
    }
}
