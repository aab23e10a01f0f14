// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent aggregate: a delegated actor whose actions are constrained by
//! bound permissions. Agents soft-delete; `wallet_type = smart_account`
//! implies enforced (on-chain) constraint checking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Deleted,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Deleted => "deleted",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "deleted" => AgentStatus::Deleted,
            _ => AgentStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletType {
    Eoa,
    SmartAccount,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::Eoa => "eoa",
            WalletType::SmartAccount => "smart_account",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "smart_account" => WalletType::SmartAccount,
            _ => WalletType::Eoa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementLevel {
    Advisory,
    Enforced,
}

impl EnforcementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementLevel::Advisory => "advisory",
            EnforcementLevel::Enforced => "enforced",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "enforced" => EnforcementLevel::Enforced,
            _ => EnforcementLevel::Advisory,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_address: Option<String>,
    pub status: AgentStatus,
    pub wallet_type: WalletType,
    pub enforcement_level: EnforcementLevel,
    /// Chain the agent's smart account is bound to; constraint sync
    /// routes to this chain's mirror. Null for EOA agents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_registry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_registered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// New active agent. Smart-account agents are always enforced.
    pub fn new(
        wallet_id: Uuid,
        name: String,
        description: Option<String>,
        agent_address: Option<String>,
        wallet_type: WalletType,
        chain_id: Option<i64>,
    ) -> Self {
        let enforcement_level = match wallet_type {
            WalletType::SmartAccount => EnforcementLevel::Enforced,
            WalletType::Eoa => EnforcementLevel::Advisory,
        };
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            name,
            description,
            agent_address,
            status: AgentStatus::Active,
            wallet_type,
            enforcement_level,
            chain_id,
            onchain_registry_id: None,
            onchain_registered_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
