// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Lifecycle
//!
//! CRUD plus the two registry operations: `register_onchain` (idempotent
//! against the registry's `AgentAlreadyExists` revert) and
//! `sync_from_chain`, where the registry is the source of truth and local
//! writes are additive, deduplicated both by stored registry id and by
//! the bytes32 encoding of each local UUID — the two paths an agent can
//! have arrived through.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::agent::{Agent, WalletType};
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::chain::{bytes32_hex, uuid_to_bytes32, ChainError};
use crate::domain::repository::{AgentRepository, AgentUpdate};
use crate::infrastructure::chain::MirrorRouter;

pub struct AgentService {
    agents: Arc<dyn AgentRepository>,
    mirrors: Arc<MirrorRouter>,
    audit: Arc<dyn AuditSink>,
}

impl AgentService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        mirrors: Arc<MirrorRouter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            agents,
            mirrors,
            audit,
        }
    }

    pub async fn create(
        &self,
        wallet_id: Uuid,
        name: String,
        description: Option<String>,
        agent_address: Option<String>,
        wallet_type: WalletType,
        chain_id: Option<i64>,
    ) -> Result<Agent, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::invalid("name is required"));
        }

        let agent = Agent::new(wallet_id, name.clone(), description, agent_address, wallet_type, chain_id);
        self.agents.insert(&agent).await?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "agent.created")
                    .agent(agent.id)
                    .details(json!({ "name": name })),
            )
            .await;

        Ok(agent)
    }

    pub async fn list(&self, wallet_id: Uuid) -> Result<Vec<Agent>, ServiceError> {
        Ok(self.agents.list(wallet_id).await?)
    }

    pub async fn get(&self, wallet_id: Uuid, id: Uuid) -> Result<Agent, ServiceError> {
        self.agents
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("agent not found"))
    }

    pub async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: AgentUpdate,
    ) -> Result<Agent, ServiceError> {
        let changes = json!({
            "name": update.name.clone(),
            "description": update.description.clone(),
            "agent_address": update.agent_address.clone(),
            "status": update.status,
        });

        let agent = self
            .agents
            .update(wallet_id, id, update)
            .await?
            .ok_or_else(|| ServiceError::not_found("agent not found"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "agent.updated")
                    .agent(id)
                    .details(json!({ "changes": changes })),
            )
            .await;

        Ok(agent)
    }

    pub async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if !self.agents.soft_delete(wallet_id, id).await? {
            return Err(ServiceError::not_found("agent not found"));
        }

        self.audit
            .record(NewAuditEvent::new(wallet_id, "agent.deleted").agent(id))
            .await;

        Ok(())
    }

    /// Register the agent in the identity registry. Idempotent: an
    /// `AgentAlreadyExists` revert records the canonical bytes32 id and
    /// succeeds; a second local call conflicts.
    pub async fn register_onchain(&self, wallet_id: Uuid, id: Uuid) -> Result<Agent, ServiceError> {
        let agent = self
            .agents
            .find(wallet_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("agent not found"))?;

        if agent.onchain_registry_id.as_deref().unwrap_or("") != "" {
            return Err(ServiceError::Conflict(
                "agent is already registered on-chain".to_string(),
            ));
        }

        let agent_bytes = uuid_to_bytes32(id);
        let metadata = json!({
            "name": agent.name,
            "description": agent.description.clone().unwrap_or_default(),
        })
        .to_string();

        let mirror = self.mirrors.primary();
        let registry_id = match mirror.register_agent(agent_bytes, &metadata).await {
            Ok(registry_id) => registry_id,
            Err(ChainError::AgentAlreadyExists) => {
                info!(agent_id = %id, "agent already registered on-chain, recording existing id");
                bytes32_hex(agent_bytes)
            }
            Err(e) => {
                error!(agent_id = %id, error = %e, "on-chain registration failed");
                return Err(ServiceError::Upstream(format!(
                    "on-chain registration failed: {e}"
                )));
            }
        };

        let agent = self
            .agents
            .set_onchain_registration(wallet_id, id, &registry_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("agent not found"))?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "agent.registered_onchain")
                    .agent(id)
                    .details(json!({
                        "registry_id": registry_id,
                        "simulated": mirror.is_simulated(),
                    })),
            )
            .await;

        Ok(agent)
    }

    /// Pull the owner's registry entries and insert rows for ids not yet
    /// known locally. Additive and idempotent; an unreachable registry
    /// yields an empty import, never an error.
    pub async fn sync_from_chain(
        &self,
        wallet_id: Uuid,
        owner_address: &str,
    ) -> Result<Vec<Agent>, ServiceError> {
        let mirror = self.mirrors.primary();
        let onchain_ids = match mirror.owner_agents(owner_address).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to fetch on-chain agents, returning empty");
                return Ok(Vec::new());
            }
        };
        if onchain_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Known keys: stored registry ids, plus each local UUID's bytes32
        // encoding so rows created from the dashboard still match.
        let mut known: HashSet<String> = HashSet::new();
        for (local_id, registry_id) in self.agents.registry_keys(wallet_id).await? {
            if let Some(registry_id) = registry_id {
                if !registry_id.is_empty() {
                    known.insert(registry_id.to_lowercase());
                }
            }
            known.insert(bytes32_hex(uuid_to_bytes32(local_id)));
        }

        let mut imported = Vec::new();
        for onchain_id in onchain_ids {
            let registry_hex = bytes32_hex(onchain_id);
            if known.contains(&registry_hex) {
                continue;
            }

            let entry = match mirror.agent(onchain_id).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) => {
                    warn!(agent_id = %registry_hex, error = %e, "failed to read on-chain agent, skipping");
                    continue;
                }
            };
            // The local status set has no "inactive"; deactivated registry
            // entries are not imported.
            if !entry.active {
                continue;
            }

            let (name, description) = parse_registry_metadata(&entry.metadata, &registry_hex);

            let mut agent = Agent::new(wallet_id, name, description, None, WalletType::Eoa, None);
            agent.onchain_registry_id = Some(registry_hex.clone());
            agent.onchain_registered_at = registered_at(entry.registered_at);

            if let Err(e) = self.agents.insert(&agent).await {
                error!(registry_id = %registry_hex, error = %e, "failed to insert synced agent");
                continue;
            }
            imported.push(agent);
        }

        if !imported.is_empty() {
            self.audit
                .record(
                    NewAuditEvent::new(wallet_id, "agent.synced_from_chain")
                        .details(json!({ "count": imported.len() })),
                )
                .await;
        }

        Ok(imported)
    }
}

fn parse_registry_metadata(metadata: &str, registry_hex: &str) -> (String, Option<String>) {
    #[derive(serde::Deserialize)]
    struct Meta {
        #[serde(default)]
        name: String,
        #[serde(default)]
        description: String,
    }

    if let Ok(meta) = serde_json::from_str::<Meta>(metadata) {
        if !meta.name.is_empty() {
            let description = (!meta.description.is_empty()).then_some(meta.description);
            return (meta.name, description);
        }
    }
    if !metadata.is_empty() {
        return (metadata.to_string(), None);
    }
    (format!("On-chain Agent {}", &registry_hex[..10]), None)
}

fn registered_at(unix: i64) -> Option<DateTime<Utc>> {
    (unix > 0).then(|| DateTime::<Utc>::from_timestamp(unix, 0)).flatten()
}
