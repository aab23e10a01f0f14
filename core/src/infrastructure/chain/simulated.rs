// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Simulated chain mirror: deterministic pseudo-results, no network.
//! Policy and permission ids come from keccak256 over a tag plus the
//! payload; transaction hashes from sha256. Callers must treat the
//! outputs as opaque, exactly as they would live-mode values.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::chain::{
    bytes32_hex, keccak256, ChainError, ChainMirror, ConstraintUpdate, OnchainAgent,
    PermissionMirror, PolicyMirror,
};

pub struct SimulatedMirror {
    chain_id: i64,
}

impl SimulatedMirror {
    pub fn new(chain_id: i64) -> Self {
        Self { chain_id }
    }
}

fn sha256_tagged(tag: &str, payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}

fn keccak_tagged(tag: &str, payload: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(tag.len() + payload.len());
    input.extend_from_slice(tag.as_bytes());
    input.extend_from_slice(payload);
    keccak256(&input)
}

#[async_trait]
impl ChainMirror for SimulatedMirror {
    fn is_simulated(&self) -> bool {
        true
    }

    fn chain_id(&self) -> i64 {
        self.chain_id
    }

    async fn register_agent(
        &self,
        agent_id: [u8; 32],
        _metadata: &str,
    ) -> Result<String, ChainError> {
        Ok(bytes32_hex(sha256_tagged("register:", &agent_id)))
    }

    async fn owner_agents(&self, _owner: &str) -> Result<Vec<[u8; 32]>, ChainError> {
        Ok(Vec::new())
    }

    async fn agent(&self, _agent_id: [u8; 32]) -> Result<Option<OnchainAgent>, ChainError> {
        Ok(None)
    }

    async fn create_policy(&self, content_hash: [u8; 32]) -> Result<PolicyMirror, ChainError> {
        let policy_id = keccak_tagged("policy:", &content_hash);
        let tx_hash = sha256_tagged("createPolicy:", &policy_id);
        Ok(PolicyMirror {
            policy_id: bytes32_hex(policy_id),
            tx_hash: bytes32_hex(tx_hash),
        })
    }

    async fn deactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        Ok(bytes32_hex(sha256_tagged("deactivatePolicy:", &policy_id)))
    }

    async fn reactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        Ok(bytes32_hex(sha256_tagged("reactivatePolicy:", &policy_id)))
    }

    async fn grant_permission(
        &self,
        policy_id: [u8; 32],
        agent_id: [u8; 32],
        _valid_from: i64,
        _valid_until: i64,
    ) -> Result<PermissionMirror, ChainError> {
        let mut payload = Vec::with_capacity(64);
        payload.extend_from_slice(&policy_id);
        payload.extend_from_slice(&agent_id);
        let permission_id = keccak256(&payload);
        let tx_hash = sha256_tagged("mint:", &permission_id);
        Ok(PermissionMirror {
            permission_id: bytes32_hex(permission_id),
            tx_hash: bytes32_hex(tx_hash),
        })
    }

    async fn revoke_permission(&self, permission_id: [u8; 32]) -> Result<String, ChainError> {
        Ok(bytes32_hex(sha256_tagged("revokePermission:", &permission_id)))
    }

    async fn set_constraints(&self, update: &ConstraintUpdate) -> Result<String, ChainError> {
        info!(
            permission_id = %bytes32_hex(update.permission_id),
            chain_id = self.chain_id,
            "simulated: would call setConstraints"
        );
        Ok(bytes32_hex(sha256_tagged("sync:", &update.permission_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_results_are_deterministic_and_opaque() {
        let mirror = SimulatedMirror::new(31337);
        let content_hash = keccak256(b"{\"actions\":[\"swap\"]}");

        let a = mirror.create_policy(content_hash).await.unwrap();
        let b = mirror.create_policy(content_hash).await.unwrap();
        assert_eq!(a.policy_id, b.policy_id);
        assert_eq!(a.tx_hash, b.tx_hash);
        assert!(a.policy_id.starts_with("0x"));
        assert_eq!(a.policy_id.len(), 66);
        assert_ne!(a.policy_id, a.tx_hash);
    }

    #[tokio::test]
    async fn test_grant_depends_on_both_ids() {
        let mirror = SimulatedMirror::new(31337);
        let policy = keccak256(b"p");
        let agent_a = keccak256(b"a");
        let agent_b = keccak256(b"b");

        let first = mirror.grant_permission(policy, agent_a, 0, 0).await.unwrap();
        let second = mirror.grant_permission(policy, agent_b, 0, 0).await.unwrap();
        assert_ne!(first.permission_id, second.permission_id);
    }

    #[tokio::test]
    async fn test_owner_set_is_empty() {
        let mirror = SimulatedMirror::new(31337);
        assert!(mirror.owner_agents("0xabc").await.unwrap().is_empty());
        assert!(mirror.agent([0u8; 32]).await.unwrap().is_none());
    }
}
