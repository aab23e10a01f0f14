// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Lifecycle
//!
//! State machine: `draft → active ↔ revoked`, any state → `deleted`
//! (soft, local-only). Mirror ordering follows the two-store rule:
//! *acquire* transitions (activate, reactivate) call the chain first and
//! persist locally only on success, so `onchain_hash` is always backed by
//! a registry entry; *release* transitions (revoke) persist locally first
//! and mirror best-effort, so the local view is never left permissive by
//! a chain outage.

use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::chain::{parse_bytes32_hex, policy_content_hash};
use crate::domain::policy::{Definition, Policy, PolicyStatus, PolicyVersion};
use crate::domain::repository::{PolicyRepository, PolicyUpdate};
use crate::infrastructure::chain::MirrorRouter;

/// Fields accepted on policy update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PolicyChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub definition: Option<Definition>,
}

pub struct PolicyService {
    policies: Arc<dyn PolicyRepository>,
    mirrors: Arc<MirrorRouter>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyService {
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        mirrors: Arc<MirrorRouter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            policies,
            mirrors,
            audit,
        }
    }

    /// Create a draft. No chain interaction happens until activation.
    pub async fn create(
        &self,
        wallet_id: Uuid,
        name: String,
        description: Option<String>,
        definition: Definition,
    ) -> Result<Policy, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::invalid("name is required"));
        }
        definition
            .validate()
            .map_err(|e| ServiceError::invalid(e.to_string()))?;

        let policy = Policy::new(wallet_id, name.clone(), description, serde_json::to_value(&definition)?);
        self.policies.insert(&policy).await?;
        self.policies
            .append_version(&PolicyVersion::snapshot(
                policy.id,
                1,
                policy.definition.clone(),
                wallet_id,
            ))
            .await?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "policy.created")
                    .policy(policy.id)
                    .details(json!({ "name": name })),
            )
            .await;

        Ok(policy)
    }

    pub async fn list(&self, wallet_id: Uuid) -> Result<Vec<Policy>, ServiceError> {
        Ok(self.policies.list(wallet_id).await?)
    }

    pub async fn get(&self, wallet_id: Uuid, id: Uuid) -> Result<Policy, ServiceError> {
        self.policies
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found"))
    }

    /// Draft updates happen in place. Updating an **active** policy's
    /// definition bumps `version` and appends an immutable snapshot; the
    /// chain is deliberately not re-mirrored — existing grants keep
    /// referencing the hash they were minted against.
    pub async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        changes: PolicyChanges,
    ) -> Result<Policy, ServiceError> {
        let current = self
            .policies
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found"))?;

        if let Some(def) = &changes.definition {
            def.validate()
                .map_err(|e| ServiceError::invalid(e.to_string()))?;
        }

        // Draft edits are in place; only an active policy's definition
        // change appends a version snapshot.
        let version_bumped = current.status == PolicyStatus::Active && changes.definition.is_some();
        let new_version = if version_bumped {
            current.version + 1
        } else {
            current.version
        };

        let definition_value = changes
            .definition
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let updated = self
            .policies
            .update(
                wallet_id,
                id,
                PolicyUpdate {
                    name: changes.name,
                    description: changes.description,
                    definition: definition_value.clone(),
                    version: new_version,
                },
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found"))?;

        if version_bumped {
            if let Some(definition) = definition_value {
                self.policies
                    .append_version(&PolicyVersion::snapshot(id, new_version, definition, wallet_id))
                    .await?;
            }
        }

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "policy.updated")
                    .policy(id)
                    .details(json!({ "version": new_version })),
            )
            .await;

        Ok(updated)
    }

    pub async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if !self.policies.soft_delete(wallet_id, id).await? {
            return Err(ServiceError::not_found("policy not found"));
        }

        self.audit
            .record(NewAuditEvent::new(wallet_id, "policy.deleted").policy(id))
            .await;

        Ok(())
    }

    /// `draft → active`. The content hash is keccak256 over the canonical
    /// bytes the store holds for the definition; the mirror call runs
    /// first and a failure leaves the row in `draft`.
    pub async fn activate(&self, wallet_id: Uuid, id: Uuid) -> Result<Policy, ServiceError> {
        let definition = self
            .policies
            .draft_definition(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found or already active"))?;

        let canonical = serde_json::to_vec(&definition)?;
        let content_hash = policy_content_hash(&canonical);

        let mirror = self.mirrors.primary();
        let mirrored = mirror.create_policy(content_hash).await.map_err(|e| {
            error!(policy_id = %id, error = %e, "on-chain policy creation failed");
            ServiceError::Upstream(format!("on-chain policy creation failed: {e}"))
        })?;

        info!(
            policy_id = %id,
            onchain_policy_id = %mirrored.policy_id,
            tx_hash = %mirrored.tx_hash,
            "policy registered on-chain"
        );

        let policy = self
            .policies
            .activate(wallet_id, id, &mirrored.policy_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found or already active"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "policy.activated")
                    .policy(id)
                    .details(json!({
                        "onchain_hash": mirrored.policy_id,
                        "tx_hash": mirrored.tx_hash,
                        "simulated": mirror.is_simulated(),
                    })),
            )
            .await;

        Ok(policy)
    }

    /// `active → revoked`. Local state flips first: revocation must never
    /// leave the local view permissive, so the mirror call is best-effort
    /// and a failure is logged, not rolled back.
    pub async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<Policy, ServiceError> {
        let policy = self
            .policies
            .revoke(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found or not active"))?;

        if let Some(bytes) = policy
            .onchain_hash
            .as_deref()
            .and_then(parse_bytes32_hex)
        {
            match self.mirrors.primary().deactivate_policy(bytes).await {
                Ok(tx_hash) => {
                    info!(policy_id = %id, tx_hash = %tx_hash, "policy deactivated on-chain");
                }
                Err(e) => {
                    error!(
                        policy_id = %id,
                        error = %e,
                        "on-chain policy deactivation failed (local state already revoked)"
                    );
                }
            }
        }

        self.audit
            .record(NewAuditEvent::new(wallet_id, "policy.revoked").policy(id))
            .await;

        Ok(policy)
    }

    /// `revoked → active`. Acquire-style: the registry entry is
    /// reactivated first; the local flip only happens on success.
    pub async fn reactivate(&self, wallet_id: Uuid, id: Uuid) -> Result<Policy, ServiceError> {
        let onchain_hash = self
            .policies
            .revoked_onchain_hash(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found or not revoked"))?;

        let mirror = self.mirrors.primary();
        if let Some(bytes) = onchain_hash.as_deref().and_then(parse_bytes32_hex) {
            let tx_hash = mirror.reactivate_policy(bytes).await.map_err(|e| {
                error!(policy_id = %id, error = %e, "on-chain policy reactivation failed");
                ServiceError::Upstream(format!("on-chain policy reactivation failed: {e}"))
            })?;
            info!(policy_id = %id, tx_hash = %tx_hash, "policy reactivated on-chain");
        }

        let policy = self
            .policies
            .reactivate(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("policy not found or not revoked"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "policy.reactivated")
                    .policy(id)
                    .details(json!({ "simulated": mirror.is_simulated() })),
            )
            .await;

        Ok(policy)
    }
}
