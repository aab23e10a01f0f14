// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory store. One mutex-guarded state shared by every port so the
//! joined reads (mint context, active bindings) see the same world a SQL
//! join would. Semantics mirror the PostgreSQL implementations exactly,
//! including the state-gated transitions; used by the test suite and for
//! credential-free local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::audit::AuditRecord;
use crate::domain::permission::{Permission, PermissionStatus};
use crate::domain::policy::{Policy, PolicyStatus, PolicyVersion};
use crate::domain::repository::{
    AgentRepository, AgentUpdate, ApiKeyRepository, AuditFilter, AuditRepository, MintContext,
    PermissionBinding, PermissionFilter, PermissionRepository, PolicyRepository, PolicyUpdate,
    RepositoryError, ValidationRepository, WalletRepository, WebhookRepository, WebhookUpdate,
};
use crate::domain::validation::ValidationRecord;
use crate::domain::wallet::{ApiKey, Wallet};
use crate::domain::webhook::Webhook;

#[derive(Default)]
struct Inner {
    wallets: HashMap<Uuid, Wallet>,
    api_keys: HashMap<Uuid, ApiKey>,
    agents: HashMap<Uuid, Agent>,
    policies: HashMap<Uuid, Policy>,
    policy_versions: Vec<PolicyVersion>,
    permissions: HashMap<Uuid, Permission>,
    validations: Vec<ValidationRecord>,
    audits: Vec<AuditRecord>,
    webhooks: HashMap<Uuid, Webhook>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn upsert_by_address(&self, address: &str) -> Result<Wallet, RepositoryError> {
        let mut inner = self.lock();
        if let Some(wallet) = inner
            .wallets
            .values_mut()
            .find(|w| w.address.eq_ignore_ascii_case(address))
        {
            wallet.last_login_at = Some(Utc::now());
            return Ok(wallet.clone());
        }

        let wallet = Wallet {
            id: Uuid::new_v4(),
            address: address.to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        inner.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, RepositoryError> {
        Ok(self.lock().wallets.get(&id).cloned())
    }
}

#[async_trait]
impl ApiKeyRepository for MemoryStore {
    async fn insert(&self, key: &ApiKey) -> Result<(), RepositoryError> {
        self.lock().api_keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn list_active(&self, wallet_id: Uuid) -> Result<Vec<ApiKey>, RepositoryError> {
        let inner = self.lock();
        let mut keys: Vec<ApiKey> = inner
            .api_keys
            .values()
            .filter(|k| k.wallet_id == wallet_id && k.revoked_at.is_none())
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner.api_keys.get_mut(&id) {
            Some(key) if key.wallet_id == wallet_id && key.revoked_at.is_none() => {
                key.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resolve(&self, key_hash: &str) -> Result<Option<Uuid>, RepositoryError> {
        let mut inner = self.lock();
        let key = inner
            .api_keys
            .values_mut()
            .find(|k| k.key_hash == key_hash && k.revoked_at.is_none());
        Ok(key.map(|k| {
            k.last_used_at = Some(Utc::now());
            k.wallet_id
        }))
    }
}

#[async_trait]
impl AgentRepository for MemoryStore {
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError> {
        self.lock().agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Agent>, RepositoryError> {
        let inner = self.lock();
        let mut agents: Vec<Agent> = inner
            .agents
            .values()
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agents)
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Agent>, RepositoryError> {
        Ok(self
            .lock()
            .agents
            .get(&id)
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
            .cloned())
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: AgentUpdate,
    ) -> Result<Option<Agent>, RepositoryError> {
        let mut inner = self.lock();
        let Some(agent) = inner
            .agents
            .get_mut(&id)
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
        else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            agent.name = name;
        }
        if let Some(description) = update.description {
            agent.description = Some(description);
        }
        if let Some(address) = update.agent_address {
            agent.agent_address = Some(address);
        }
        if let Some(status) = update.status {
            agent.status = status;
        }
        agent.updated_at = Utc::now();
        Ok(Some(agent.clone()))
    }

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner
            .agents
            .get_mut(&id)
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
        {
            Some(agent) => {
                agent.status = AgentStatus::Deleted;
                agent.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_active(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .agents
            .get(&id)
            .is_some_and(|a| a.wallet_id == wallet_id && a.status == AgentStatus::Active))
    }

    async fn set_onchain_registration(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        registry_id: &str,
    ) -> Result<Option<Agent>, RepositoryError> {
        let mut inner = self.lock();
        let Some(agent) = inner
            .agents
            .get_mut(&id)
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
        else {
            return Ok(None);
        };
        agent.onchain_registry_id = Some(registry_id.to_string());
        agent.onchain_registered_at = Some(Utc::now());
        agent.updated_at = Utc::now();
        Ok(Some(agent.clone()))
    }

    async fn registry_keys(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<(Uuid, Option<String>)>, RepositoryError> {
        Ok(self
            .lock()
            .agents
            .values()
            .filter(|a| a.wallet_id == wallet_id && a.status != AgentStatus::Deleted)
            .map(|a| (a.id, a.onchain_registry_id.clone()))
            .collect())
    }
}

#[async_trait]
impl PolicyRepository for MemoryStore {
    async fn insert(&self, policy: &Policy) -> Result<(), RepositoryError> {
        self.lock().policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn append_version(&self, version: &PolicyVersion) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        // (policy_id, version) is unique.
        if inner
            .policy_versions
            .iter()
            .any(|v| v.policy_id == version.policy_id && v.version == version.version)
        {
            return Err(RepositoryError::Database(format!(
                "duplicate policy version {} for {}",
                version.version, version.policy_id
            )));
        }
        inner.policy_versions.push(version.clone());
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Policy>, RepositoryError> {
        let inner = self.lock();
        let mut policies: Vec<Policy> = inner
            .policies
            .values()
            .filter(|p| p.wallet_id == wallet_id && p.status != PolicyStatus::Deleted)
            .cloned()
            .collect();
        policies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(policies)
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError> {
        Ok(self
            .lock()
            .policies
            .get(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status != PolicyStatus::Deleted)
            .cloned())
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: PolicyUpdate,
    ) -> Result<Option<Policy>, RepositoryError> {
        let mut inner = self.lock();
        let Some(policy) = inner
            .policies
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status != PolicyStatus::Deleted)
        else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            policy.name = name;
        }
        if let Some(description) = update.description {
            policy.description = Some(description);
        }
        if let Some(definition) = update.definition {
            policy.definition = definition;
        }
        policy.version = update.version;
        policy.updated_at = Utc::now();
        Ok(Some(policy.clone()))
    }

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner
            .policies
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status != PolicyStatus::Deleted)
        {
            Some(policy) => {
                policy.status = PolicyStatus::Deleted;
                policy.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn is_active(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()
            .policies
            .get(&id)
            .is_some_and(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Active))
    }

    async fn draft_definition(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Value>, RepositoryError> {
        Ok(self
            .lock()
            .policies
            .get(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Draft)
            .map(|p| p.definition.clone()))
    }

    async fn activate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        onchain_hash: &str,
    ) -> Result<Option<Policy>, RepositoryError> {
        let mut inner = self.lock();
        let Some(policy) = inner
            .policies
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Draft)
        else {
            return Ok(None);
        };
        policy.status = PolicyStatus::Active;
        policy.onchain_hash = Some(onchain_hash.to_string());
        policy.activated_at = Some(Utc::now());
        policy.updated_at = Utc::now();
        Ok(Some(policy.clone()))
    }

    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError> {
        let mut inner = self.lock();
        let Some(policy) = inner
            .policies
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Active)
        else {
            return Ok(None);
        };
        policy.status = PolicyStatus::Revoked;
        policy.revoked_at = Some(Utc::now());
        policy.updated_at = Utc::now();
        Ok(Some(policy.clone()))
    }

    async fn reactivate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Policy>, RepositoryError> {
        let mut inner = self.lock();
        let Some(policy) = inner
            .policies
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Revoked)
        else {
            return Ok(None);
        };
        policy.status = PolicyStatus::Active;
        policy.revoked_at = None;
        policy.updated_at = Utc::now();
        Ok(Some(policy.clone()))
    }

    async fn revoked_onchain_hash(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Option<String>>, RepositoryError> {
        Ok(self
            .lock()
            .policies
            .get(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PolicyStatus::Revoked)
            .map(|p| p.onchain_hash.clone()))
    }
}

#[async_trait]
impl PermissionRepository for MemoryStore {
    async fn insert(&self, permission: &Permission) -> Result<(), RepositoryError> {
        self.lock()
            .permissions
            .insert(permission.id, permission.clone());
        Ok(())
    }

    async fn list(
        &self,
        wallet_id: Uuid,
        filter: PermissionFilter,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let inner = self.lock();
        let mut permissions: Vec<Permission> = inner
            .permissions
            .values()
            .filter(|p| p.wallet_id == wallet_id)
            .filter(|p| filter.agent_id.map_or(true, |id| p.agent_id == id))
            .filter(|p| filter.policy_id.map_or(true, |id| p.policy_id == id))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(permissions)
    }

    async fn find(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError> {
        Ok(self
            .lock()
            .permissions
            .get(&id)
            .filter(|p| p.wallet_id == wallet_id)
            .cloned())
    }

    async fn revoke(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError> {
        let mut inner = self.lock();
        let Some(permission) = inner
            .permissions
            .get_mut(&id)
            .filter(|p| p.wallet_id == wallet_id && p.status == PermissionStatus::Active)
        else {
            return Ok(None);
        };
        permission.status = PermissionStatus::Revoked;
        permission.revoked_at = Some(Utc::now());
        Ok(Some(permission.clone()))
    }

    async fn mint_context(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MintContext>, RepositoryError> {
        let inner = self.lock();
        let Some(permission) = inner.permissions.get(&id).filter(|p| {
            p.wallet_id == wallet_id
                && p.status == PermissionStatus::Active
                && p.minted_at.is_none()
        }) else {
            return Ok(None);
        };
        let Some(policy) = inner.policies.get(&permission.policy_id) else {
            return Ok(None);
        };
        let Some(agent) = inner.agents.get(&permission.agent_id) else {
            return Ok(None);
        };

        Ok(Some(MintContext {
            agent_id: permission.agent_id,
            policy_id: permission.policy_id,
            valid_from: permission.valid_from,
            valid_until: permission.valid_until,
            definition: policy.definition.clone(),
            policy_onchain_hash: policy.onchain_hash.clone(),
            agent_registry_id: agent.onchain_registry_id.clone(),
            agent_wallet_type: agent.wallet_type,
            agent_chain_id: agent.chain_id,
        }))
    }

    async fn record_mint(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        token_id: &str,
    ) -> Result<Option<Permission>, RepositoryError> {
        let mut inner = self.lock();
        let Some(permission) = inner.permissions.get_mut(&id).filter(|p| {
            p.wallet_id == wallet_id
                && p.status == PermissionStatus::Active
                && p.minted_at.is_none()
        }) else {
            return Ok(None);
        };
        permission.onchain_token_id = Some(token_id.to_string());
        permission.minted_at = Some(Utc::now());
        Ok(Some(permission.clone()))
    }

    async fn active_bindings(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PermissionBinding>, RepositoryError> {
        let inner = self.lock();
        let mut candidates: Vec<&Permission> = inner
            .permissions
            .values()
            .filter(|p| {
                p.wallet_id == wallet_id
                    && p.agent_id == agent_id
                    && p.status == PermissionStatus::Active
                    && p.in_window(now)
            })
            .filter(|p| {
                inner
                    .policies
                    .get(&p.policy_id)
                    .is_some_and(|pol| pol.status == PolicyStatus::Active)
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(candidates
            .into_iter()
            .filter_map(|p| {
                inner.policies.get(&p.policy_id).map(|pol| PermissionBinding {
                    permission_id: p.id,
                    policy_id: p.policy_id,
                    definition: pol.definition.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl ValidationRepository for MemoryStore {
    async fn insert(&self, record: &ValidationRecord) -> Result<(), RepositoryError> {
        self.lock().validations.push(record.clone());
        Ok(())
    }

    async fn allowed_amounts_since(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .lock()
            .validations
            .iter()
            .filter(|r| {
                r.wallet_id == wallet_id
                    && r.agent_id == agent_id
                    && r.allowed
                    && r.created_at >= since
            })
            .filter_map(|r| {
                r.action_data
                    .get("amount")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        self.lock().audits.push(record.clone());
        Ok(())
    }

    async fn list(
        &self,
        wallet_id: Uuid,
        filter: &AuditFilter,
    ) -> Result<(Vec<AuditRecord>, i64), RepositoryError> {
        let inner = self.lock();
        let total = inner
            .audits
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .count() as i64;

        let mut matching: Vec<AuditRecord> = inner
            .audits
            .iter()
            .filter(|r| r.wallet_id == wallet_id)
            .filter(|r| {
                filter
                    .event_type
                    .as_deref()
                    .map_or(true, |t| r.event_type == t)
            })
            .filter(|r| filter.agent_id.map_or(true, |id| r.agent_id == Some(id)))
            .filter(|r| filter.policy_id.map_or(true, |id| r.policy_id == Some(id)))
            .filter(|r| filter.start.map_or(true, |t| r.created_at >= t))
            .filter(|r| filter.end.map_or(true, |t| r.created_at <= t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.max(0) as usize;
        let limit = filter.limit.max(0) as usize;
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn export(
        &self,
        wallet_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let filter = AuditFilter {
            start,
            end,
            limit,
            offset: 0,
            ..Default::default()
        };
        Ok(AuditRepository::list(self, wallet_id, &filter).await?.0)
    }
}

#[async_trait]
impl WebhookRepository for MemoryStore {
    async fn insert(&self, webhook: &Webhook) -> Result<(), RepositoryError> {
        self.lock().webhooks.insert(webhook.id, webhook.clone());
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        let inner = self.lock();
        let mut webhooks: Vec<Webhook> = inner
            .webhooks
            .values()
            .filter(|w| w.wallet_id == wallet_id)
            .cloned()
            .map(|mut w| {
                w.secret.clear();
                w
            })
            .collect();
        webhooks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(webhooks)
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Webhook>, RepositoryError> {
        Ok(self
            .lock()
            .webhooks
            .get(&id)
            .filter(|w| w.wallet_id == wallet_id)
            .cloned())
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<Option<Webhook>, RepositoryError> {
        let mut inner = self.lock();
        let Some(webhook) = inner
            .webhooks
            .get_mut(&id)
            .filter(|w| w.wallet_id == wallet_id)
        else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            webhook.name = name;
        }
        if let Some(url) = update.url {
            webhook.url = url;
        }
        if let Some(events) = update.events {
            webhook.events = events;
        }
        if let Some(active) = update.active {
            webhook.active = active;
        }
        webhook.updated_at = Utc::now();
        Ok(Some(webhook.clone()))
    }

    async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let owned = inner
            .webhooks
            .get(&id)
            .is_some_and(|w| w.wallet_id == wallet_id);
        if owned {
            inner.webhooks.remove(&id);
        }
        Ok(owned)
    }

    async fn active_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        Ok(self
            .lock()
            .webhooks
            .values()
            .filter(|w| w.wallet_id == wallet_id && w.active)
            .cloned()
            .collect())
    }

    async fn touch_last_call(&self, id: Uuid) -> Result<(), RepositoryError> {
        if let Some(webhook) = self.lock().webhooks.get_mut(&id) {
            webhook.last_call_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_gated_policy_transitions() {
        let store = MemoryStore::new();
        let wallet = Uuid::new_v4();
        let policy = Policy::new(wallet, "p".into(), None, serde_json::json!({"actions":["swap"]}));
        PolicyRepository::insert(&store, &policy).await.unwrap();

        // Revoking a draft does nothing.
        assert!(PolicyRepository::revoke(&store, wallet, policy.id)
            .await
            .unwrap()
            .is_none());

        let activated = store.activate(wallet, policy.id, "0xhash").await.unwrap();
        assert_eq!(activated.unwrap().status, PolicyStatus::Active);

        // Activating twice loses the state gate.
        assert!(store.activate(wallet, policy.id, "0xother").await.unwrap().is_none());

        let revoked = PolicyRepository::revoke(&store, wallet, policy.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revoked.status, PolicyStatus::Revoked);
        assert_eq!(revoked.onchain_hash.as_deref(), Some("0xhash"));
    }

    #[tokio::test]
    async fn test_wallet_scoping_hides_foreign_rows() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let policy = Policy::new(owner, "p".into(), None, serde_json::json!({"actions":["swap"]}));
        PolicyRepository::insert(&store, &policy).await.unwrap();

        assert!(PolicyRepository::find(&store, stranger, policy.id)
            .await
            .unwrap()
            .is_none());
        assert!(PolicyRepository::find(&store, owner, policy.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_duplicate_policy_version_rejected() {
        let store = MemoryStore::new();
        let policy_id = Uuid::new_v4();
        let created_by = Uuid::new_v4();
        let v1 = PolicyVersion::snapshot(policy_id, 1, serde_json::json!({}), created_by);
        store.append_version(&v1).await.unwrap();
        let dup = PolicyVersion::snapshot(policy_id, 1, serde_json::json!({}), created_by);
        assert!(store.append_version(&dup).await.is_err());
    }
}
