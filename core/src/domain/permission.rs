// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Permission aggregate: a tenant-signed binding of one agent to one
//! policy for a validity window. Born active, optionally minted on-chain,
//! revoked at most once. Expiry is implicit: a permission is only *valid*
//! while `now ∈ [valid_from, valid_until)`; nothing is written back when
//! the window closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Active,
    Revoked,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::Active => "active",
            PermissionStatus::Revoked => "revoked",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "revoked" => PermissionStatus::Revoked,
            _ => PermissionStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub agent_id: Uuid,
    pub policy_id: Uuid,
    pub status: PermissionStatus,
    pub valid_from: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Set iff the permission has been minted (`minted_at` non-null).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onchain_token_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Permission {
    pub fn new(
        wallet_id: Uuid,
        agent_id: Uuid,
        policy_id: Uuid,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            agent_id,
            policy_id,
            status: PermissionStatus::Active,
            valid_from: valid_from.unwrap_or_else(Utc::now),
            valid_until,
            onchain_token_id: None,
            minted_at: None,
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    /// Whether the validity window contains `now`.
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && self.valid_until.map_or(true, |until| until > now)
    }
}
