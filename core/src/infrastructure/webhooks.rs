// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Webhook Fan-Out
//!
//! Delivers audit events to tenant-registered endpoints. Each delivery
//! POSTs a JSON payload signed with the endpoint's secret:
//!
//! - `Content-Type: application/json`
//! - `X-Webhook-Signature: hex(HMAC-SHA256(secret, body))`
//! - `X-Webhook-ID: <webhook id>`
//!
//! Up to three attempts with `attempt²`-second back-off (0, 1, 4) and a
//! 10-second per-request timeout. HTTP 2xx counts as delivered and bumps
//! `last_call_at`; failures are logged and never fail the originating
//! request.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::audit::NewAuditEvent;
use crate::domain::repository::WebhookRepository;
use crate::domain::webhook::Webhook;

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of the body under the endpoint secret.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub struct WebhookDispatcher {
    webhooks: Arc<dyn WebhookRepository>,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(webhooks: Arc<dyn WebhookRepository>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { webhooks, client }
    }

    /// Fan an event out to every subscribed active endpoint. Deliveries
    /// run as independent tasks so one slow endpoint cannot delay the
    /// others.
    pub async fn fan_out(self: Arc<Self>, event: NewAuditEvent) {
        let endpoints = match self.webhooks.active_for_wallet(event.wallet_id).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(error = %e, "failed to load webhooks for fan-out");
                return;
            }
        };

        for endpoint in endpoints {
            if !endpoint.subscribes_to(&event.event_type) {
                continue;
            }
            let dispatcher = self.clone();
            let event = event.clone();
            tokio::spawn(async move {
                dispatcher.deliver(endpoint, event).await;
            });
        }
    }

    async fn deliver(&self, endpoint: Webhook, event: NewAuditEvent) {
        let mut payload = json!({
            "id": Uuid::new_v4(),
            "type": event.event_type,
            "wallet_id": event.wallet_id,
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "details": event.details,
        });
        if let Some(agent_id) = event.agent_id {
            payload["agent_id"] = json!(agent_id);
        }
        if let Some(policy_id) = event.policy_id {
            payload["policy_id"] = json!(policy_id);
        }
        if let Some(permission_id) = event.permission_id {
            payload["permission_id"] = json!(permission_id);
        }

        let body = payload.to_string();
        let signature = sign_payload(&endpoint.secret, body.as_bytes());

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs((attempt * attempt) as u64)).await;
            }

            let response = self
                .client
                .post(&endpoint.url)
                .header("Content-Type", "application/json")
                .header("X-Webhook-Signature", &signature)
                .header("X-Webhook-ID", endpoint.id.to_string())
                .body(body.clone())
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    debug!(webhook_id = %endpoint.id, "webhook delivered");
                    if let Err(e) = self.webhooks.touch_last_call(endpoint.id).await {
                        warn!(webhook_id = %endpoint.id, error = %e, "failed to update last_call_at");
                    }
                    return;
                }
                Ok(response) => {
                    debug!(
                        webhook_id = %endpoint.id,
                        status = %response.status(),
                        attempt,
                        "webhook delivery rejected"
                    );
                }
                Err(e) => {
                    debug!(webhook_id = %endpoint.id, error = %e, attempt, "webhook delivery failed");
                }
            }
        }

        warn!(webhook_id = %endpoint.id, url = %endpoint.url, "webhook delivery failed after retries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_known_vector() {
        // RFC 2202-style test vector for HMAC-SHA256.
        let signature = sign_payload("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_sign_payload_depends_on_secret() {
        let body = br#"{"type":"policy.activated"}"#;
        assert_ne!(sign_payload("whsec_a", body), sign_payload("whsec_b", body));
    }
}
