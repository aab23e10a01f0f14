// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Immutable audit trail. Every state-changing operation emits exactly
//! one event through the [`AuditSink`] port; the infrastructure sink
//! persists the row and fans it out to tenant webhooks asynchronously.
//! Events are never mutated or deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub wallet_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<Uuid>,
    /// Dotted event type, e.g. `policy.activated`, `permission.minted`.
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An event as emitted by a service, before persistence.
#[derive(Debug, Clone)]
pub struct NewAuditEvent {
    pub wallet_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub policy_id: Option<Uuid>,
    pub permission_id: Option<Uuid>,
    pub event_type: String,
    pub details: Option<Value>,
}

impl NewAuditEvent {
    pub fn new(wallet_id: Uuid, event_type: &str) -> Self {
        Self {
            wallet_id,
            agent_id: None,
            policy_id: None,
            permission_id: None,
            event_type: event_type.to_string(),
            details: None,
        }
    }

    pub fn agent(mut self, id: Uuid) -> Self {
        self.agent_id = Some(id);
        self
    }

    pub fn policy(mut self, id: Uuid) -> Self {
        self.policy_id = Some(id);
        self
    }

    pub fn permission(mut self, id: Uuid) -> Self {
        self.permission_id = Some(id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Port through which services emit audit events. Recording is
/// fire-and-forget: sink failures are logged by the implementation and
/// never fail the originating request.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: NewAuditEvent);
}
