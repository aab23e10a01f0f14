// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Webhook endpoint management. Secrets are generated server-side
//! (`whsec_` + 32 random bytes) and surface only on create and direct
//! get; deletion is hard — webhooks are pure configuration, not audit
//! history.

use chrono::Utc;
use rand::RngCore;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::repository::{WebhookRepository, WebhookUpdate};
use crate::domain::webhook::Webhook;

pub struct WebhookService {
    webhooks: Arc<dyn WebhookRepository>,
    audit: Arc<dyn AuditSink>,
}

impl WebhookService {
    pub fn new(webhooks: Arc<dyn WebhookRepository>, audit: Arc<dyn AuditSink>) -> Self {
        Self { webhooks, audit }
    }

    pub async fn create(
        &self,
        wallet_id: Uuid,
        name: String,
        url: String,
        events: Vec<String>,
    ) -> Result<Webhook, ServiceError> {
        if name.is_empty() || url.is_empty() || events.is_empty() {
            return Err(ServiceError::invalid("name, url, and events are required"));
        }

        let mut secret_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret_bytes);

        let webhook = Webhook {
            id: Uuid::new_v4(),
            wallet_id,
            name: name.clone(),
            url,
            secret: format!("whsec_{}", hex::encode(secret_bytes)),
            events,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_call_at: None,
        };
        self.webhooks.insert(&webhook).await?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "webhook.created")
                    .details(json!({ "webhook_id": webhook.id, "name": name })),
            )
            .await;

        Ok(webhook)
    }

    pub async fn list(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, ServiceError> {
        Ok(self.webhooks.list(wallet_id).await?)
    }

    pub async fn get(&self, wallet_id: Uuid, id: Uuid) -> Result<Webhook, ServiceError> {
        self.webhooks
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("webhook not found"))
    }

    pub async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<Webhook, ServiceError> {
        let webhook = self
            .webhooks
            .update(wallet_id, id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found("webhook not found"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "webhook.updated")
                    .details(json!({ "webhook_id": id })),
            )
            .await;

        Ok(webhook)
    }

    pub async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if !self.webhooks.delete(wallet_id, id).await? {
            return Err(ServiceError::not_found("webhook not found"));
        }

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "webhook.deleted")
                    .details(json!({ "webhook_id": id })),
            )
            .await;

        Ok(())
    }
}
