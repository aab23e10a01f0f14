// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Chain Mirror Port
//!
//! Abstract collaborator for the on-chain registries: an identity
//! registry for agents, a policy registry for policy/permission state,
//! and a permission enforcer holding quantitative constraints. Two
//! implementations exist behind this trait — a live signer-backed client
//! and a deterministic simulated one — and callers must treat both modes'
//! outputs as opaque.
//!
//! ## Identifier encodings
//!
//! - Agent and permission ids place the 16 raw UUID bytes in the low 16
//!   bytes of a 32-byte value ([`uuid_to_bytes32`]).
//! - Action names and string ids hash via keccak256 of the lowercase
//!   bytes ([`action_hash`]).
//! - A policy's content hash is keccak256 of the canonical JSON bytes the
//!   store persisted at activation time ([`policy_content_hash`]).

use async_trait::async_trait;
use sha3::{Digest, Keccak256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The registry already holds this agent. Registration treats this as
    /// success.
    #[error("agent already exists in the identity registry")]
    AgentAlreadyExists,
    #[error("chain not configured: {0}")]
    NotConfigured(String),
    #[error("chain call failed: {0}")]
    Rpc(String),
}

/// Result of mirroring a policy creation.
#[derive(Debug, Clone)]
pub struct PolicyMirror {
    /// On-chain policy id (bytes32 hex).
    pub policy_id: String,
    pub tx_hash: String,
}

/// Result of mirroring a permission grant.
#[derive(Debug, Clone)]
pub struct PermissionMirror {
    /// On-chain permission id (bytes32 hex), stored as the token id.
    pub permission_id: String,
    pub tx_hash: String,
}

/// An agent's registry entry as read from chain.
#[derive(Debug, Clone)]
pub struct OnchainAgent {
    pub owner: String,
    pub metadata: String,
    pub active: bool,
    pub registered_at: i64,
}

/// Constraint tuple pushed to the permission enforcer. Amounts are
/// decimal strings ("0" when the policy leaves them unset).
#[derive(Debug, Clone)]
pub struct ConstraintUpdate {
    pub permission_id: [u8; 32],
    pub max_value_per_tx: String,
    pub max_daily_volume: String,
    pub max_tx_count: u64,
    /// keccak256 of each lowercase action name.
    pub allowed_actions: Vec<[u8; 32]>,
    pub allowed_tokens: Vec<String>,
    pub allowed_protocols: Vec<String>,
    pub allowed_chains: Vec<u64>,
}

#[async_trait]
pub trait ChainMirror: Send + Sync {
    /// True when the mirror produces deterministic pseudo-results instead
    /// of real transactions.
    fn is_simulated(&self) -> bool;

    fn chain_id(&self) -> i64;

    /// Idempotent: `AgentAlreadyExists` is surfaced so the caller can
    /// treat it as success. Returns the registry id.
    async fn register_agent(&self, agent_id: [u8; 32], metadata: &str)
        -> Result<String, ChainError>;

    /// View: every agent id registered for the owner address.
    async fn owner_agents(&self, owner: &str) -> Result<Vec<[u8; 32]>, ChainError>;

    /// View: a single registry entry, `None` when absent.
    async fn agent(&self, agent_id: [u8; 32]) -> Result<Option<OnchainAgent>, ChainError>;

    /// Not idempotent: the caller must not retry after success.
    async fn create_policy(&self, content_hash: [u8; 32]) -> Result<PolicyMirror, ChainError>;

    async fn deactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError>;

    async fn reactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError>;

    /// Not idempotent: the caller must not retry after success.
    async fn grant_permission(
        &self,
        policy_id: [u8; 32],
        agent_id: [u8; 32],
        valid_from: i64,
        valid_until: i64,
    ) -> Result<PermissionMirror, ChainError>;

    async fn revoke_permission(&self, permission_id: [u8; 32]) -> Result<String, ChainError>;

    /// Replaces the stored constraint tuple for the permission.
    async fn set_constraints(&self, update: &ConstraintUpdate) -> Result<String, ChainError>;
}

// ── Identifier encodings ─────────────────────────────────────────────────

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// UUID → bytes32: the 16 raw bytes right-aligned, zero left-padded.
pub fn uuid_to_bytes32(id: Uuid) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(id.as_bytes());
    out
}

/// keccak256 of the lowercase bytes of an action name or string id.
pub fn action_hash(name: &str) -> [u8; 32] {
    keccak256(name.to_lowercase().as_bytes())
}

/// Content hash of a policy definition: keccak256 over the canonical
/// JSON bytes persisted for the row.
pub fn policy_content_hash(definition_bytes: &[u8]) -> [u8; 32] {
    keccak256(definition_bytes)
}

/// `0x`-prefixed lowercase hex of a bytes32 value.
pub fn bytes32_hex(bytes: [u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a `0x`-prefixed (or bare) 64-char hex string into bytes32.
pub fn parse_bytes32_hex(raw: &str) -> Option<[u8; 32]> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let decoded = hex::decode(stripped).ok()?;
    if decoded.len() != 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&decoded);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_to_bytes32_right_aligned() {
        let id = Uuid::parse_str("01020304-0506-0708-090a-0b0c0d0e0f10").unwrap();
        let b = uuid_to_bytes32(id);
        assert_eq!(&b[..16], &[0u8; 16]);
        assert_eq!(&b[16..], id.as_bytes());
    }

    #[test]
    fn test_action_hash_is_case_insensitive() {
        assert_eq!(action_hash("SWAP"), action_hash("swap"));
        assert_ne!(action_hash("swap"), action_hash("transfer"));
    }

    #[test]
    fn test_keccak256_known_vector() {
        // keccak256("") from the Ethereum yellow paper.
        assert_eq!(
            bytes32_hex(keccak256(b"")),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_bytes32_hex_round_trip() {
        let value = keccak256(b"round trip");
        let encoded = bytes32_hex(value);
        assert_eq!(parse_bytes32_hex(&encoded), Some(value));
        assert_eq!(parse_bytes32_hex("0x1234"), None);
    }
}
