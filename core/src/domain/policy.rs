// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Grammar & Matching
//!
//! A policy's `definition` is a declarative rule set with four parts:
//!
//! ```text
//! Definition
//!   ├─ actions      – non-empty list from a closed token set; "*" wildcard
//!   ├─ assets       – token / protocol / chain allowlists ("*" per list)
//!   ├─ constraints  – per-tx ceiling, rolling daily volume, approval flag
//!   ├─ duration     – optional validity window
//!   └─ conditions   – field/operator/value predicates over the action
//! ```
//!
//! Amounts are decimal strings with arbitrary-precision integer
//! semantics; the daily-volume window is the current UTC calendar day.
//! [`Definition::validate`] runs at submission time, [`Definition::matches`]
//! at decision time. Matching applies the checks in a fixed order and the
//! first failing check denies.

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, BigUint};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::action::Action;

/// Closed set of valid action tokens; `*` matches any action.
pub const VALID_ACTIONS: &[&str] = &[
    "swap", "transfer", "approve", "stake", "unstake", "deposit", "withdraw",
    "mint", "burn", "bridge", "claim", "vote", "delegate", "lp_add",
    "lp_remove", "borrow", "repay", "liquidate", "*",
];

/// Closed set of condition operators.
pub const VALID_OPERATORS: &[&str] = &[
    "eq", "ne", "gt", "gte", "lt", "lte", "in", "not_in", "contains", "regex",
];

/// Error returned when a policy definition fails submission-time
/// validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("at least one action is required")]
    NoActions,
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("{0} must be a valid integer")]
    InvalidAmount(&'static str),
    #[error("maxTxCount must be non-negative")]
    NegativeTxCount,
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
    #[error("condition value must be a string, number, boolean, or list")]
    InvalidConditionValue,
    #[error("validUntil must be after validFrom")]
    InvalidWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Assets::is_empty")]
    pub assets: Assets,
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,
    #[serde(default, skip_serializing_if = "Validity::is_empty")]
    pub duration: Validity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Which tokens, protocols, and chains the policy applies to. Empty lists
/// mean "no filter"; `"*"` is a per-list wildcard. String matching is
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<i64>,
}

impl Assets {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.protocols.is_empty() && self.chains.is_empty()
    }
}

/// Quantitative limits. Amounts are decimal strings so the grammar stays
/// precision-agnostic. `maxWeeklyVolume` is validated here but not
/// enforced by the decision path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_per_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_weekly_volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tx_count: Option<i64>,
    #[serde(default)]
    pub require_approval: bool,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.max_value_per_tx.is_none()
            && self.max_daily_volume.is_none()
            && self.max_weekly_volume.is_none()
            && self.max_tx_count.is_none()
            && !self.require_approval
    }
}

/// Optional validity window on the definition itself (distinct from the
/// permission's window).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
}

impl Validity {
    pub fn is_empty(&self) -> bool {
        self.valid_from.is_none() && self.valid_until.is_none()
    }
}

/// A single predicate over the action. `field` addresses a top-level
/// action field or any key of `action.data`; `value` may be a string,
/// number, boolean, or list of those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Definition {
    /// Submission-time validation of the grammar. Invalid definitions are
    /// rejected here so the decision path can treat stored definitions as
    /// trusted (and merely skip the ones that still fail to parse).
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.actions.is_empty() {
            return Err(DefinitionError::NoActions);
        }
        for action in &self.actions {
            let lower = action.to_lowercase();
            if !VALID_ACTIONS.contains(&lower.as_str()) {
                return Err(DefinitionError::InvalidAction(action.clone()));
            }
        }

        for (field, name) in [
            (&self.constraints.max_value_per_tx, "maxValuePerTx"),
            (&self.constraints.max_daily_volume, "maxDailyVolume"),
            (&self.constraints.max_weekly_volume, "maxWeeklyVolume"),
        ] {
            if let Some(raw) = field.as_deref() {
                if !raw.is_empty() && parse_amount(raw).is_none() {
                    return Err(DefinitionError::InvalidAmount(name));
                }
            }
        }
        if matches!(self.constraints.max_tx_count, Some(n) if n < 0) {
            return Err(DefinitionError::NegativeTxCount);
        }

        for cond in &self.conditions {
            if !VALID_OPERATORS.contains(&cond.operator.as_str()) {
                return Err(DefinitionError::InvalidOperator(cond.operator.clone()));
            }
            match &cond.value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Array(_) => {}
                _ => return Err(DefinitionError::InvalidConditionValue),
            }
        }

        if let (Some(from), Some(until)) =
            (self.duration.valid_from, self.duration.valid_until)
        {
            if until <= from {
                return Err(DefinitionError::InvalidWindow);
            }
        }

        Ok(())
    }

    /// Whether evaluating this definition against `action` will consult
    /// rolling usage. Lets the engine fetch usage once, and only when a
    /// candidate actually needs it.
    pub fn needs_rolling_usage(&self, action: &Action) -> bool {
        !action.amount.is_empty()
            && self
                .constraints
                .max_daily_volume
                .as_deref()
                .is_some_and(|v| !v.is_empty())
    }

    /// Decision-time matching, first false wins:
    ///
    /// 1. action type ∈ `actions` (case-insensitive) or `"*"` present
    /// 2. token / protocol allowlists, skipped when the action leaves the
    ///    field empty
    /// 3. chain allowlist, skipped when `action.chain == 0`
    /// 4. amount ceilings: `maxValuePerTx` inclusive, then
    ///    `rolling_usage + amount ≤ maxDailyVolume`
    /// 5. every condition holds
    pub fn matches(&self, action: &Action, rolling_usage: Option<&BigUint>) -> bool {
        let action_allowed = self
            .actions
            .iter()
            .any(|a| a == "*" || a.eq_ignore_ascii_case(&action.kind));
        if !action_allowed {
            return false;
        }

        if !self.assets.tokens.is_empty() && !action.token.is_empty() {
            let token_allowed = self
                .assets
                .tokens
                .iter()
                .any(|t| t == "*" || t.eq_ignore_ascii_case(&action.token));
            if !token_allowed {
                return false;
            }
        }

        if !self.assets.protocols.is_empty() && !action.protocol.is_empty() {
            let protocol_allowed = self
                .assets
                .protocols
                .iter()
                .any(|p| p == "*" || p.eq_ignore_ascii_case(&action.protocol));
            if !protocol_allowed {
                return false;
            }
        }

        if !self.assets.chains.is_empty()
            && action.chain != 0
            && !self.assets.chains.contains(&action.chain)
        {
            return false;
        }

        if !action.amount.is_empty() {
            let Some(amount) = parse_amount(&action.amount) else {
                return false;
            };

            if let Some(max) = parse_opt_amount(&self.constraints.max_value_per_tx) {
                if amount > max {
                    return false;
                }
            }

            if let Some(max_daily) = parse_opt_amount(&self.constraints.max_daily_volume) {
                let used = rolling_usage.cloned().unwrap_or_default();
                if used + &amount > max_daily {
                    return false;
                }
            }
        }

        self.conditions
            .iter()
            .all(|cond| evaluate_condition(cond, action))
    }
}

/// Parse a non-negative arbitrary-precision decimal amount.
pub fn parse_amount(raw: &str) -> Option<BigUint> {
    BigUint::from_str(raw).ok()
}

/// Whether `kind` is a concrete action token an agent can submit. The
/// `*` wildcard is a definition-side construct, not a submittable
/// action.
pub fn is_valid_action(kind: &str) -> bool {
    let lower = kind.to_lowercase();
    lower != "*" && VALID_ACTIONS.contains(&lower.as_str())
}

fn parse_opt_amount(raw: &Option<String>) -> Option<BigUint> {
    raw.as_deref().filter(|s| !s.is_empty()).and_then(parse_amount)
}

/// Evaluate a single condition against an action. Unknown operators
/// evaluate to false, which makes the enclosing permission skip rather
/// than fail the whole decision.
fn evaluate_condition(cond: &Condition, action: &Action) -> bool {
    let field = field_value(&cond.field, action);

    match cond.operator.as_str() {
        "eq" => field == cond.value,
        "ne" => field != cond.value,
        "gt" => compare_numeric(&field, &cond.value) > 0,
        "gte" => compare_numeric(&field, &cond.value) >= 0,
        "lt" => compare_numeric(&field, &cond.value) < 0,
        "lte" => compare_numeric(&field, &cond.value) <= 0,
        "in" => cond
            .value
            .as_array()
            .is_some_and(|vs| vs.iter().any(|v| *v == field)),
        "not_in" => !cond
            .value
            .as_array()
            .is_some_and(|vs| vs.iter().any(|v| *v == field)),
        "contains" => match (field.as_str(), cond.value.as_str()) {
            (Some(s), Some(sub)) => s.contains(sub),
            _ => false,
        },
        "regex" => match (field.as_str(), cond.value.as_str()) {
            (Some(s), Some(pattern)) => Regex::new(pattern)
                .map(|re| re.is_match(s))
                .unwrap_or(false),
            _ => false,
        },
        _ => false,
    }
}

fn field_value(field: &str, action: &Action) -> Value {
    match field {
        "type" => Value::String(action.kind.clone()),
        "token" => Value::String(action.token.clone()),
        "protocol" => Value::String(action.protocol.clone()),
        "amount" => Value::String(action.amount.clone()),
        "chain" => Value::from(action.chain),
        "to" => Value::String(action.to.clone()),
        other => action.data.get(other).cloned().unwrap_or(Value::Null),
    }
}

/// Numeric three-way comparison with arbitrary-precision semantics over
/// decimal strings. Non-numeric operands compare as 0 (not strictly
/// ordered), so `gte`/`lte` hold and `gt`/`lt` do not.
fn compare_numeric(a: &Value, b: &Value) -> i32 {
    match (to_bigint(a), to_bigint(b)) {
        (Some(a), Some(b)) => match a.cmp(&b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        _ => 0,
    }
}

fn to_bigint(v: &Value) -> Option<BigInt> {
    match v {
        Value::String(s) => BigInt::from_str(s).ok(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(BigInt::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(BigInt::from(u))
            } else {
                n.as_f64().map(|f| BigInt::from(f as i64))
            }
        }
        _ => None,
    }
}

// ── Policy aggregate ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Draft,
    Active,
    Revoked,
    Deleted,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Draft => "draft",
            PolicyStatus::Active => "active",
            PolicyStatus::Revoked => "revoked",
            PolicyStatus::Deleted => "deleted",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "active" => PolicyStatus::Active,
            "revoked" => PolicyStatus::Revoked,
            "deleted" => PolicyStatus::Deleted,
            _ => PolicyStatus::Draft,
        }
    }
}

/// The policy row. `definition` stays a raw JSON value here: it is parsed
/// into [`Definition`] at validation and decision time, so one malformed
/// historical row can never poison unrelated reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub definition: Value,
    pub status: PolicyStatus,
    pub version: i32,
    /// Null iff the policy has never been activated. Stable across
    /// subsequent active↔revoked toggles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Policy {
    pub fn new(wallet_id: Uuid, name: String, description: Option<String>, definition: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            name,
            description,
            definition,
            status: PolicyStatus::Draft,
            version: 1,
            onchain_hash: None,
            created_at: now,
            updated_at: now,
            activated_at: None,
            revoked_at: None,
        }
    }
}

/// Immutable snapshot appended whenever an active policy's definition
/// changes (and once at creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub version: i32,
    pub definition: Value,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl PolicyVersion {
    pub fn snapshot(policy_id: Uuid, version: i32, definition: Value, created_by: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy_id,
            version,
            definition,
            created_by,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(v: Value) -> Definition {
        serde_json::from_value(v).unwrap()
    }

    // ── Validation ───────────────────────────────────────────────────────

    #[test]
    fn test_validate_requires_actions() {
        let d = def(json!({ "actions": [] }));
        assert_eq!(d.validate(), Err(DefinitionError::NoActions));
    }

    #[test]
    fn test_validate_rejects_unknown_action() {
        let d = def(json!({ "actions": ["teleport"] }));
        assert_eq!(
            d.validate(),
            Err(DefinitionError::InvalidAction("teleport".into()))
        );
    }

    #[test]
    fn test_validate_accepts_uppercase_and_wildcard() {
        let d = def(json!({ "actions": ["SWAP", "*"] }));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_numeric_constraint() {
        let d = def(json!({
            "actions": ["swap"],
            "constraints": { "maxValuePerTx": "12.5" }
        }));
        assert_eq!(
            d.validate(),
            Err(DefinitionError::InvalidAmount("maxValuePerTx"))
        );

        let d = def(json!({
            "actions": ["swap"],
            "constraints": { "maxDailyVolume": "-10" }
        }));
        assert_eq!(
            d.validate(),
            Err(DefinitionError::InvalidAmount("maxDailyVolume"))
        );
    }

    #[test]
    fn test_validate_rejects_unknown_operator() {
        let d = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "token", "operator": "matches", "value": "x" }]
        }));
        assert_eq!(
            d.validate(),
            Err(DefinitionError::InvalidOperator("matches".into()))
        );
    }

    #[test]
    fn test_validate_rejects_object_condition_value() {
        let d = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "token", "operator": "eq", "value": {"a": 1} }]
        }));
        assert_eq!(d.validate(), Err(DefinitionError::InvalidConditionValue));
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let d = def(json!({
            "actions": ["swap"],
            "duration": {
                "validFrom": "2026-02-01T00:00:00Z",
                "validUntil": "2026-01-01T00:00:00Z"
            }
        }));
        assert_eq!(d.validate(), Err(DefinitionError::InvalidWindow));
    }

    // ── Matching ─────────────────────────────────────────────────────────

    fn swap_action(amount: &str) -> Action {
        let mut a = Action::new("swap");
        a.token = "0xUSDC".into();
        a.amount = amount.into();
        a
    }

    #[test]
    fn test_matches_action_type_case_insensitive() {
        let d = def(json!({ "actions": ["swap"] }));
        let mut a = Action::new("Swap");
        a.amount = "100".into();
        assert!(d.matches(&a, None));

        let b = Action::new("transfer");
        assert!(!d.matches(&b, None));
    }

    #[test]
    fn test_matches_wildcard_action() {
        let d = def(json!({ "actions": ["*"] }));
        assert!(d.matches(&Action::new("liquidate"), None));
    }

    #[test]
    fn test_matches_token_filter() {
        let d = def(json!({
            "actions": ["swap"],
            "assets": { "tokens": ["0xUSDC"] }
        }));
        assert!(d.matches(&swap_action("1"), None));

        let mut other = swap_action("1");
        other.token = "0xDAI".into();
        assert!(!d.matches(&other, None));
    }

    #[test]
    fn test_matches_empty_action_token_skips_filter() {
        let d = def(json!({
            "actions": ["swap"],
            "assets": { "tokens": ["0xUSDC"] }
        }));
        let mut a = swap_action("1");
        a.token = String::new();
        assert!(d.matches(&a, None));
    }

    #[test]
    fn test_matches_token_wildcard_entry() {
        let d = def(json!({
            "actions": ["swap"],
            "assets": { "tokens": ["*"] }
        }));
        let mut a = swap_action("1");
        a.token = "0xANY".into();
        assert!(d.matches(&a, None));
    }

    #[test]
    fn test_matches_chain_filter() {
        let d = def(json!({
            "actions": ["swap"],
            "assets": { "chains": [1, 8453] }
        }));
        let mut a = swap_action("1");
        a.chain = 8453;
        assert!(d.matches(&a, None));

        a.chain = 137;
        assert!(!d.matches(&a, None));

        // chain 0 means unspecified; the filter is skipped
        a.chain = 0;
        assert!(d.matches(&a, None));
    }

    #[test]
    fn test_matches_max_value_per_tx_inclusive_boundary() {
        let d = def(json!({
            "actions": ["swap"],
            "constraints": { "maxValuePerTx": "1000" }
        }));
        assert!(d.matches(&swap_action("1000"), None));
        assert!(!d.matches(&swap_action("1001"), None));
    }

    #[test]
    fn test_matches_unparseable_amount_denies() {
        let d = def(json!({ "actions": ["swap"] }));
        assert!(!d.matches(&swap_action("1,000"), None));
        assert!(!d.matches(&swap_action("-5"), None));
    }

    #[test]
    fn test_matches_daily_volume_includes_usage() {
        let d = def(json!({
            "actions": ["swap"],
            "constraints": { "maxDailyVolume": "1000" }
        }));
        let used = BigUint::from(700u32);
        assert!(d.matches(&swap_action("300"), Some(&used)));
        assert!(!d.matches(&swap_action("400"), Some(&used)));
    }

    #[test]
    fn test_matches_huge_amounts() {
        // Amounts are unbounded; 2^300-scale values must compare exactly.
        let big = "2037035976334486086268445688409378161051468393665936250636140449354381299763336706183397376";
        let d = def(json!({
            "actions": ["swap"],
            "constraints": { "maxValuePerTx": big }
        }));
        assert!(d.matches(&swap_action(big), None));
    }

    // ── Conditions ───────────────────────────────────────────────────────

    #[test]
    fn test_condition_eq_on_to_field() {
        let d = def(json!({
            "actions": ["transfer"],
            "conditions": [{ "field": "to", "operator": "eq", "value": "0xabc" }]
        }));
        let mut a = Action::new("transfer");
        a.to = "0xabc".into();
        assert!(d.matches(&a, None));
        a.to = "0xdef".into();
        assert!(!d.matches(&a, None));
    }

    #[test]
    fn test_condition_numeric_comparisons() {
        let d = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "amount", "operator": "lte", "value": "500" }]
        }));
        assert!(d.matches(&swap_action("500"), None));
        assert!(!d.matches(&swap_action("501"), None));
    }

    #[test]
    fn test_condition_non_numeric_compares_unordered() {
        // gt over a non-numeric value is 0-ordered: gt fails, gte holds.
        let gt = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "to", "operator": "gt", "value": "abc" }]
        }));
        let mut a = Action::new("swap");
        a.to = "xyz".into();
        assert!(!gt.matches(&a, None));

        let gte = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "to", "operator": "gte", "value": "abc" }]
        }));
        assert!(gte.matches(&a, None));
    }

    #[test]
    fn test_condition_in_and_not_in() {
        let d = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "token", "operator": "in", "value": ["0xUSDC", "0xDAI"] }]
        }));
        assert!(d.matches(&swap_action("1"), None));

        let not_in = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "token", "operator": "not_in", "value": ["0xUSDC"] }]
        }));
        assert!(!not_in.matches(&swap_action("1"), None));
    }

    #[test]
    fn test_condition_contains_and_regex() {
        let contains = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "to", "operator": "contains", "value": "dead" }]
        }));
        let mut a = Action::new("swap");
        a.to = "0xdeadbeef".into();
        assert!(contains.matches(&a, None));

        let re = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "to", "operator": "regex", "value": "^0x[0-9a-f]+$" }]
        }));
        assert!(re.matches(&a, None));

        let bad_pattern = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "to", "operator": "regex", "value": "([" }]
        }));
        assert!(!bad_pattern.matches(&a, None));
    }

    #[test]
    fn test_condition_data_field_lookup() {
        let d = def(json!({
            "actions": ["swap"],
            "conditions": [{ "field": "slippage", "operator": "lte", "value": 50 }]
        }));
        let mut a = Action::new("swap");
        a.data.insert("slippage".into(), json!(30));
        assert!(d.matches(&a, None));
        a.data.insert("slippage".into(), json!(80));
        assert!(!d.matches(&a, None));
    }

    #[test]
    fn test_unknown_operator_denies_at_decision_time() {
        // Stored definitions can predate operator tightening; an unknown
        // operator must make this definition miss, not crash.
        let mut d = def(json!({ "actions": ["swap"] }));
        d.conditions.push(Condition {
            field: "to".into(),
            operator: "between".into(),
            value: json!("x"),
        });
        assert!(!d.matches(&Action::new("swap"), None));
    }

    #[test]
    fn test_is_valid_action_rejects_wildcard_and_unknowns() {
        assert!(is_valid_action("swap"));
        assert!(is_valid_action("SWAP"));
        assert!(is_valid_action("lp_add"));
        assert!(!is_valid_action("*"));
        assert!(!is_valid_action("teleport"));
        assert!(!is_valid_action(""));
    }

    #[test]
    fn test_definition_serde_round_trip() {
        let d = def(json!({
            "actions": ["swap"],
            "assets": { "tokens": ["0xUSDC"], "chains": [8453] },
            "constraints": { "maxValuePerTx": "1000", "requireApproval": true },
            "conditions": [{ "field": "to", "operator": "eq", "value": "0xabc" }]
        }));
        let round: Definition =
            serde_json::from_slice(&serde_json::to_vec(&d).unwrap()).unwrap();
        assert_eq!(round, d);
    }
}
