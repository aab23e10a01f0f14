// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Permission Lifecycle
//!
//! Permissions are born active, optionally *minted* onto the chain
//! registry (acquire-style: grant first, persist on success), and revoked
//! at most once (release-style: local first, mirror best-effort). Minting
//! an enforced (smart-account) agent's permission additionally pushes the
//! policy's quantitative constraints to the enforcer contract on the
//! chain the account is bound to.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::chain::{
    action_hash, parse_bytes32_hex, policy_content_hash, uuid_to_bytes32, ConstraintUpdate,
};
use crate::domain::permission::Permission;
use crate::domain::policy::Definition;
use crate::domain::repository::{
    AgentRepository, MintContext, PermissionFilter, PermissionRepository, PolicyRepository,
};
use crate::domain::WalletType;
use crate::infrastructure::chain::MirrorRouter;

pub struct PermissionService {
    permissions: Arc<dyn PermissionRepository>,
    agents: Arc<dyn AgentRepository>,
    policies: Arc<dyn PolicyRepository>,
    mirrors: Arc<MirrorRouter>,
    audit: Arc<dyn AuditSink>,
}

impl PermissionService {
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        agents: Arc<dyn AgentRepository>,
        policies: Arc<dyn PolicyRepository>,
        mirrors: Arc<MirrorRouter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            permissions,
            agents,
            policies,
            mirrors,
            audit,
        }
    }

    /// Both the referenced agent and policy must be active and owned by
    /// the caller. `valid_from` defaults to now, `valid_until` to open.
    pub async fn create(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        policy_id: Uuid,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Result<Permission, ServiceError> {
        if !self.agents.is_active(wallet_id, agent_id).await? {
            return Err(ServiceError::invalid("agent not found or inactive"));
        }
        if !self.policies.is_active(wallet_id, policy_id).await? {
            return Err(ServiceError::invalid("policy not found or not active"));
        }

        let permission = Permission::new(wallet_id, agent_id, policy_id, valid_from, valid_until);
        self.permissions.insert(&permission).await?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "permission.created")
                    .agent(agent_id)
                    .policy(policy_id)
                    .permission(permission.id),
            )
            .await;

        Ok(permission)
    }

    pub async fn list(
        &self,
        wallet_id: Uuid,
        filter: PermissionFilter,
    ) -> Result<Vec<Permission>, ServiceError> {
        Ok(self.permissions.list(wallet_id, filter).await?)
    }

    pub async fn get(&self, wallet_id: Uuid, id: Uuid) -> Result<Permission, ServiceError> {
        self.permissions
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("permission not found"))
    }

    /// `active → revoked`. The local flip happens first; a minted
    /// permission is then revoked on-chain best-effort.
    pub async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        let permission = self
            .permissions
            .revoke(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("permission not found or already revoked"))?;

        if let Some(bytes) = permission
            .onchain_token_id
            .as_deref()
            .and_then(parse_bytes32_hex)
        {
            match self.mirrors.primary().revoke_permission(bytes).await {
                Ok(tx_hash) => {
                    info!(permission_id = %id, tx_hash = %tx_hash, "permission revoked on-chain");
                }
                Err(e) => {
                    error!(
                        permission_id = %id,
                        error = %e,
                        "on-chain permission revocation failed (local state already revoked)"
                    );
                }
            }
        }

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "permission.revoked")
                    .agent(permission.agent_id)
                    .policy(permission.policy_id)
                    .permission(id),
            )
            .await;

        Ok(())
    }

    /// Mint the permission onto the chain registry. Preconditions: the
    /// permission is active and unminted, the agent is registered
    /// on-chain, and the policy carries an `onchain_hash` — a permission
    /// must never be granted against a policy the chain has not seen.
    pub async fn mint(&self, wallet_id: Uuid, id: Uuid) -> Result<Permission, ServiceError> {
        let ctx = self
            .permissions
            .mint_context(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("permission not found or already minted"))?;

        if ctx.agent_registry_id.as_deref().unwrap_or("").is_empty() {
            return Err(ServiceError::invalid(
                "agent must be registered on-chain before minting a permission",
            ));
        }
        let onchain_hash = ctx.policy_onchain_hash.as_deref().unwrap_or("");
        if onchain_hash.is_empty() {
            return Err(ServiceError::invalid(
                "policy must be activated on-chain before minting a permission",
            ));
        }

        // Fall back to re-hashing the stored definition if the recorded
        // hash is not decodable bytes32 hex.
        let policy_hash = match parse_bytes32_hex(onchain_hash) {
            Some(bytes) => bytes,
            None => {
                warn!(permission_id = %id, onchain_hash, "undecodable on-chain policy hash, re-deriving");
                policy_content_hash(&serde_json::to_vec(&ctx.definition)?)
            }
        };

        let agent_bytes = uuid_to_bytes32(ctx.agent_id);
        let valid_from = ctx.valid_from.timestamp();
        let valid_until = ctx.valid_until.map(|t| t.timestamp()).unwrap_or(0);

        let mirror = self.mirrors.primary();
        let minted = mirror
            .grant_permission(policy_hash, agent_bytes, valid_from, valid_until)
            .await
            .map_err(|e| {
                error!(permission_id = %id, error = %e, "on-chain minting failed");
                ServiceError::Upstream(format!("on-chain minting failed: {e}"))
            })?;

        let permission = self
            .permissions
            .record_mint(wallet_id, id, &minted.permission_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("permission not found or already minted"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "permission.minted")
                    .agent(permission.agent_id)
                    .policy(permission.policy_id)
                    .permission(id)
                    .details(json!({
                        "token_id": minted.permission_id,
                        "simulated": mirror.is_simulated(),
                    })),
            )
            .await;

        // Enforced agents additionally get the constraint tuple pushed to
        // the enforcer; a sync failure leaves the permission minted.
        if ctx.agent_wallet_type == WalletType::SmartAccount {
            self.sync_constraints(&ctx, &permission).await;
        }

        Ok(permission)
    }

    /// Project the policy definition into the enforcer's constraint tuple
    /// and push it on the chain the agent's smart account is bound to
    /// (primary when unbound). Best-effort.
    async fn sync_constraints(&self, ctx: &MintContext, permission: &Permission) {
        let definition: Definition = match serde_json::from_value(ctx.definition.clone()) {
            Ok(d) => d,
            Err(e) => {
                warn!(permission_id = %permission.id, error = %e, "constraint sync skipped: unparseable definition");
                return;
            }
        };

        let permission_id = permission
            .onchain_token_id
            .as_deref()
            .and_then(parse_bytes32_hex)
            .unwrap_or_else(|| uuid_to_bytes32(permission.id));

        let update = ConstraintUpdate {
            permission_id,
            max_value_per_tx: definition
                .constraints
                .max_value_per_tx
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0".to_string()),
            max_daily_volume: definition
                .constraints
                .max_daily_volume
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "0".to_string()),
            max_tx_count: definition.constraints.max_tx_count.unwrap_or(0).max(0) as u64,
            allowed_actions: definition
                .actions
                .iter()
                .filter(|a| *a != "*")
                .map(|a| action_hash(a))
                .collect(),
            allowed_tokens: definition
                .assets
                .tokens
                .iter()
                .filter(|t| *t != "*")
                .cloned()
                .collect(),
            allowed_protocols: definition
                .assets
                .protocols
                .iter()
                .filter(|p| *p != "*")
                .cloned()
                .collect(),
            allowed_chains: definition
                .assets
                .chains
                .iter()
                .filter(|c| **c >= 0)
                .map(|c| *c as u64)
                .collect(),
        };

        let mirror = ctx
            .agent_chain_id
            .and_then(|chain_id| self.mirrors.for_chain(chain_id))
            .unwrap_or_else(|| self.mirrors.primary());

        match mirror.set_constraints(&update).await {
            Ok(tx_hash) => {
                info!(
                    permission_id = %permission.id,
                    agent_id = %ctx.agent_id,
                    chain_id = mirror.chain_id(),
                    tx_hash = %tx_hash,
                    "constraints synced to on-chain enforcer"
                );
            }
            Err(e) => {
                error!(
                    permission_id = %permission.id,
                    error = %e,
                    "constraint sync failed (permission still minted)"
                );
            }
        }
    }
}
