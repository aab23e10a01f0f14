// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository ports, one per aggregate root. The store is the single
//! shared mutable resource: state transitions are expressed as
//! conditional updates (`… WHERE status = <expected>`) returning the row
//! on success and `None` when a concurrent caller won the race or the
//! entity is absent — callers collapse both into "not found or bad
//! state". Every mutating operation is scoped by `wallet_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentStatus, WalletType};
use crate::domain::audit::AuditRecord;
use crate::domain::permission::Permission;
use crate::domain::policy::{Policy, PolicyVersion};
use crate::domain::validation::ValidationRecord;
use crate::domain::wallet::{ApiKey, Wallet};
use crate::domain::webhook::Webhook;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Insert-or-touch by (lowercase) address; bumps `last_login_at` on
    /// conflict.
    async fn upsert_by_address(&self, address: &str) -> Result<Wallet, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, RepositoryError>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn insert(&self, key: &ApiKey) -> Result<(), RepositoryError>;

    async fn list_active(&self, wallet_id: Uuid) -> Result<Vec<ApiKey>, RepositoryError>;

    /// Marks `revoked_at`; false when absent or already revoked.
    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    /// Resolve a non-revoked key by its sha256 hex digest and bump
    /// `last_used_at`.
    async fn resolve(&self, key_hash: &str) -> Result<Option<Uuid>, RepositoryError>;
}

/// Partial update for an agent; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub agent_address: Option<String>,
    pub status: Option<AgentStatus>,
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError>;

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Agent>, RepositoryError>;

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Agent>, RepositoryError>;

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: AgentUpdate,
    ) -> Result<Option<Agent>, RepositoryError>;

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    async fn is_active(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    /// Stamp `onchain_registry_id` + `onchain_registered_at` on a live
    /// (non-deleted) agent.
    async fn set_onchain_registration(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        registry_id: &str,
    ) -> Result<Option<Agent>, RepositoryError>;

    /// `(local id, onchain_registry_id)` for every non-deleted agent;
    /// feeds sync deduplication.
    async fn registry_keys(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<(Uuid, Option<String>)>, RepositoryError>;
}

/// Partial update for a policy. `definition` replaces the stored value
/// when present; `version` is the new version the caller computed.
#[derive(Debug, Clone, Default)]
pub struct PolicyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub definition: Option<Value>,
    pub version: i32,
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn insert(&self, policy: &Policy) -> Result<(), RepositoryError>;

    async fn append_version(&self, version: &PolicyVersion) -> Result<(), RepositoryError>;

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Policy>, RepositoryError>;

    /// Non-deleted policy by id.
    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError>;

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: PolicyUpdate,
    ) -> Result<Option<Policy>, RepositoryError>;

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    async fn is_active(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    /// The stored definition of a policy still in `draft`.
    async fn draft_definition(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Value>, RepositoryError>;

    /// `draft → active`, storing the on-chain hash. The mirror call has
    /// already succeeded when this runs.
    async fn activate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        onchain_hash: &str,
    ) -> Result<Option<Policy>, RepositoryError>;

    /// `active → revoked`; runs before the best-effort mirror call.
    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError>;

    /// `revoked → active`; runs after the mirror call succeeded.
    async fn reactivate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Policy>, RepositoryError>;

    /// The on-chain hash of a policy currently in `revoked` state, used
    /// by reactivation. `None` when the policy is absent or not revoked.
    async fn revoked_onchain_hash(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Option<String>>, RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub agent_id: Option<Uuid>,
    pub policy_id: Option<Uuid>,
}

/// A currently-valid permission joined to its active policy's stored
/// definition, in decision order.
#[derive(Debug, Clone)]
pub struct PermissionBinding {
    pub permission_id: Uuid,
    pub policy_id: Uuid,
    pub definition: Value,
}

/// Everything the mint path needs in one read, gated on
/// `status = active AND minted_at IS NULL`.
#[derive(Debug, Clone)]
pub struct MintContext {
    pub agent_id: Uuid,
    pub policy_id: Uuid,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub definition: Value,
    pub policy_onchain_hash: Option<String>,
    pub agent_registry_id: Option<String>,
    pub agent_wallet_type: WalletType,
    pub agent_chain_id: Option<i64>,
}

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn insert(&self, permission: &Permission) -> Result<(), RepositoryError>;

    async fn list(
        &self,
        wallet_id: Uuid,
        filter: PermissionFilter,
    ) -> Result<Vec<Permission>, RepositoryError>;

    async fn find(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError>;

    /// `active → revoked`; runs before the best-effort mirror call.
    async fn revoke(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError>;

    async fn mint_context(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MintContext>, RepositoryError>;

    /// Stamp `onchain_token_id` + `minted_at` after a successful grant;
    /// still gated on active-and-unminted.
    async fn record_mint(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        token_id: &str,
    ) -> Result<Option<Permission>, RepositoryError>;

    /// Currently valid permissions for (wallet, agent): permission and
    /// policy both active, `valid_from ≤ now < valid_until`. Ordered
    /// `created_at DESC, id ASC` so decisions are deterministic for a
    /// fixed store state.
    async fn active_bindings(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PermissionBinding>, RepositoryError>;
}

#[async_trait]
pub trait ValidationRepository: Send + Sync {
    async fn insert(&self, record: &ValidationRecord) -> Result<(), RepositoryError>;

    /// `action_data.amount` strings of allowed records for (wallet,
    /// agent) since the window start. The engine sums them at decision
    /// time; non-numeric entries contribute zero there.
    async fn allowed_amounts_since(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub event_type: Option<String>,
    pub agent_id: Option<Uuid>,
    pub policy_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError>;

    /// Page of matching rows (newest first) plus the wallet's total row
    /// count.
    async fn list(
        &self,
        wallet_id: Uuid,
        filter: &AuditFilter,
    ) -> Result<(Vec<AuditRecord>, i64), RepositoryError>;

    async fn export(
        &self,
        wallet_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, RepositoryError>;
}

#[derive(Debug, Clone, Default)]
pub struct WebhookUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn insert(&self, webhook: &Webhook) -> Result<(), RepositoryError>;

    /// All endpoints for the wallet, secrets cleared.
    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError>;

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Webhook>, RepositoryError>;

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<Option<Webhook>, RepositoryError>;

    /// Hard delete; webhooks are the one aggregate that does not
    /// soft-delete.
    async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError>;

    /// Active endpoints with secrets intact, for delivery.
    async fn active_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError>;

    async fn touch_last_call(&self, id: Uuid) -> Result<(), RepositoryError>;
}
