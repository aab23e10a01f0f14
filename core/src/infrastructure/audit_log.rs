// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The write side of the audit trail. Appends the immutable row, then
//! hands the event to the webhook dispatcher on a detached task — the
//! originating request never waits on delivery, and an insert failure is
//! logged rather than propagated (losing one audit row must not fail the
//! operation that produced it).

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::domain::audit::{AuditRecord, AuditSink, NewAuditEvent};
use crate::domain::repository::AuditRepository;
use crate::infrastructure::webhooks::WebhookDispatcher;

pub struct AuditLogger {
    audit: Arc<dyn AuditRepository>,
    dispatcher: Arc<WebhookDispatcher>,
}

impl AuditLogger {
    pub fn new(audit: Arc<dyn AuditRepository>, dispatcher: Arc<WebhookDispatcher>) -> Self {
        Self { audit, dispatcher }
    }
}

#[async_trait]
impl AuditSink for AuditLogger {
    async fn record(&self, event: NewAuditEvent) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            wallet_id: event.wallet_id,
            agent_id: event.agent_id,
            policy_id: event.policy_id,
            permission_id: event.permission_id,
            event_type: event.event_type.clone(),
            details: event.details.clone(),
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.audit.insert(&record).await {
            error!(event_type = %event.event_type, error = %e, "failed to log audit event");
        }

        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.fan_out(event).await;
        });
    }
}
