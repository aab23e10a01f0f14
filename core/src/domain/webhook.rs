// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tenant-registered webhook endpoints. Each audit event is delivered to
//! every active endpoint whose `events` set contains the event type or
//! `"*"`, signed with the endpoint's secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub name: String,
    pub url: String,
    /// Signing secret; cleared before list serialization so it is only
    /// ever returned on create and direct get.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    pub events: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_call_at: Option<DateTime<Utc>>,
}

impl Webhook {
    /// Whether this endpoint subscribes to the given event type.
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type || e == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(events: &[&str]) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
            name: "h".into(),
            url: "https://example.com/hook".into(),
            secret: "whsec_x".into(),
            events: events.iter().map(|s| s.to_string()).collect(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_call_at: None,
        }
    }

    #[test]
    fn test_subscribes_to_exact_and_wildcard() {
        assert!(hook(&["policy.activated"]).subscribes_to("policy.activated"));
        assert!(!hook(&["policy.activated"]).subscribes_to("policy.revoked"));
        assert!(hook(&["*"]).subscribes_to("anything.at_all"));
    }
}
