// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Live chain mirror: signed transactions and view calls against the
//! deployed registries. Each call builds a fresh transaction through the
//! provider's fill pipeline, so concurrent submissions coordinate nonces
//! at the provider layer. Ids are read from the first event topic of the
//! receipt, with a deterministic fallback when a registry emits none.

use async_trait::async_trait;
use std::str::FromStr;
use tracing::info;

use alloy::consensus::TxReceipt;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;

use crate::domain::chain::{
    bytes32_hex, keccak256, ChainError, ChainMirror, ConstraintUpdate, OnchainAgent,
    PermissionMirror, PolicyMirror,
};
use crate::infrastructure::config::ChainConfig;

sol! {
    #[sol(rpc)]
    interface IIdentityRegistry {
        function registerAgent(bytes32 agentId, string metadata) external returns (bytes32);
        function getOwnerAgents(address owner) external view returns (bytes32[] memory);
        function getAgent(bytes32 agentId)
            external
            view
            returns (address owner, bytes32 id, string memory metadata, uint256 registeredAt, bool active);
    }

    #[sol(rpc)]
    interface IPolicyRegistry {
        function createPolicy(bytes32 contentHash) external returns (bytes32 policyId);
        function deactivatePolicy(bytes32 policyId) external;
        function reactivatePolicy(bytes32 policyId) external;
        function grantPermission(bytes32 policyId, bytes32 agentId, uint256 validFrom, uint256 validUntil)
            external
            returns (bytes32 permissionId);
        function revokePermission(bytes32 permissionId) external;
    }

    #[sol(rpc)]
    interface IPermissionEnforcer {
        function setConstraints(
            bytes32 permissionId,
            uint256 maxValuePerTx,
            uint256 maxDailyVolume,
            uint256 maxTxCount,
            bytes32[] calldata allowedActions,
            address[] calldata allowedTokens,
            address[] calldata allowedProtocols,
            uint256[] calldata allowedChains
        ) external;
    }
}

pub struct LiveMirror {
    provider: DynProvider,
    chain_id: i64,
    identity_registry: Option<Address>,
    policy_registry: Option<Address>,
    permission_enforcer: Option<Address>,
}

impl LiveMirror {
    /// Build a signer-backed provider for the chain. Fails when the key
    /// or RPC URL is malformed; the router falls back to simulated mode.
    pub fn connect(cfg: &ChainConfig) -> Result<Self, ChainError> {
        let key = cfg
            .deployer_private_key
            .trim()
            .trim_start_matches("0x");
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|e| ChainError::NotConfigured(format!("invalid deployer key: {e}")))?;

        let url = cfg
            .rpc_url
            .parse()
            .map_err(|e| ChainError::NotConfigured(format!("invalid rpc url: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            chain_id: cfg.chain_id,
            identity_registry: parse_address(&cfg.identity_registry),
            policy_registry: parse_address(&cfg.policy_registry),
            permission_enforcer: parse_address(&cfg.permission_enforcer),
        })
    }

    fn identity_registry(&self) -> Result<Address, ChainError> {
        self.identity_registry
            .ok_or_else(|| ChainError::NotConfigured("identity registry address".to_string()))
    }

    fn policy_registry(&self) -> Result<Address, ChainError> {
        self.policy_registry
            .ok_or_else(|| ChainError::NotConfigured("policy registry address".to_string()))
    }

    fn permission_enforcer(&self) -> Result<Address, ChainError> {
        self.permission_enforcer
            .ok_or_else(|| ChainError::NotConfigured("permission enforcer address".to_string()))
    }
}

fn parse_address(raw: &str) -> Option<Address> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Address::from_str(raw).ok()
}

/// Registry reverts carry the custom error name in the message; the
/// identity registry's `AgentAlreadyExists` is the one idempotency path.
fn map_send_error(e: alloy::contract::Error) -> ChainError {
    let message = e.to_string();
    if message.contains("AgentAlreadyExists") {
        ChainError::AgentAlreadyExists
    } else {
        ChainError::Rpc(message)
    }
}

fn checked(receipt: TransactionReceipt) -> Result<TransactionReceipt, ChainError> {
    if !receipt.status() {
        return Err(ChainError::Rpc(format!(
            "tx {} reverted",
            receipt.transaction_hash
        )));
    }
    info!(
        tx_hash = %receipt.transaction_hash,
        gas_used = receipt.gas_used,
        "transaction mined"
    );
    Ok(receipt)
}

/// Second topic of the first log: where the registries put the created
/// id. `None` when the contract emitted nothing recognizable.
fn id_from_logs(receipt: &TransactionReceipt) -> Option<B256> {
    receipt
        .inner
        .logs()
        .first()
        .and_then(|log| log.inner.data.topics().get(1).copied())
}

fn tagged(tag: &[u8], payload: &[u8]) -> [u8; 32] {
    let mut input = Vec::with_capacity(tag.len() + payload.len());
    input.extend_from_slice(tag);
    input.extend_from_slice(payload);
    keccak256(&input)
}

fn amount_word(raw: &str) -> U256 {
    U256::from_str(raw).unwrap_or(U256::ZERO)
}

#[async_trait]
impl ChainMirror for LiveMirror {
    fn is_simulated(&self) -> bool {
        false
    }

    fn chain_id(&self) -> i64 {
        self.chain_id
    }

    async fn register_agent(
        &self,
        agent_id: [u8; 32],
        metadata: &str,
    ) -> Result<String, ChainError> {
        let registry = IIdentityRegistry::new(self.identity_registry()?, self.provider.clone());
        let pending = registry
            .registerAgent(B256::from(agent_id), metadata.to_string())
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        checked(receipt)?;

        // The registry keys agents by the submitted bytes32, so that is
        // the canonical registry id.
        Ok(bytes32_hex(agent_id))
    }

    async fn owner_agents(&self, owner: &str) -> Result<Vec<[u8; 32]>, ChainError> {
        let owner = Address::from_str(owner)
            .map_err(|_| ChainError::Rpc(format!("invalid owner address: {owner}")))?;
        let registry = IIdentityRegistry::new(self.identity_registry()?, self.provider.clone());
        let ids = registry
            .getOwnerAgents(owner)
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(ids.into_iter().map(|id| id.0).collect())
    }

    async fn agent(&self, agent_id: [u8; 32]) -> Result<Option<OnchainAgent>, ChainError> {
        let registry = IIdentityRegistry::new(self.identity_registry()?, self.provider.clone());
        let entry = registry
            .getAgent(B256::from(agent_id))
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        if entry.owner == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(OnchainAgent {
            owner: entry.owner.to_string(),
            metadata: entry.metadata,
            active: entry.active,
            registered_at: i64::try_from(entry.registeredAt).unwrap_or(0),
        }))
    }

    async fn create_policy(&self, content_hash: [u8; 32]) -> Result<PolicyMirror, ChainError> {
        let registry = IPolicyRegistry::new(self.policy_registry()?, self.provider.clone());
        let pending = registry
            .createPolicy(B256::from(content_hash))
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;

        let policy_id = id_from_logs(&receipt)
            .map(|id| id.0)
            .unwrap_or_else(|| tagged(b"policy:", &content_hash));
        Ok(PolicyMirror {
            policy_id: bytes32_hex(policy_id),
            tx_hash: receipt.transaction_hash.to_string(),
        })
    }

    async fn deactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        let registry = IPolicyRegistry::new(self.policy_registry()?, self.provider.clone());
        let pending = registry
            .deactivatePolicy(B256::from(policy_id))
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;
        Ok(receipt.transaction_hash.to_string())
    }

    async fn reactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        let registry = IPolicyRegistry::new(self.policy_registry()?, self.provider.clone());
        let pending = registry
            .reactivatePolicy(B256::from(policy_id))
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;
        Ok(receipt.transaction_hash.to_string())
    }

    async fn grant_permission(
        &self,
        policy_id: [u8; 32],
        agent_id: [u8; 32],
        valid_from: i64,
        valid_until: i64,
    ) -> Result<PermissionMirror, ChainError> {
        let registry = IPolicyRegistry::new(self.policy_registry()?, self.provider.clone());
        let pending = registry
            .grantPermission(
                B256::from(policy_id),
                B256::from(agent_id),
                U256::from(valid_from.max(0) as u64),
                U256::from(valid_until.max(0) as u64),
            )
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;

        let permission_id = id_from_logs(&receipt).map(|id| id.0).unwrap_or_else(|| {
            let mut payload = Vec::with_capacity(64);
            payload.extend_from_slice(&policy_id);
            payload.extend_from_slice(&agent_id);
            keccak256(&payload)
        });
        Ok(PermissionMirror {
            permission_id: bytes32_hex(permission_id),
            tx_hash: receipt.transaction_hash.to_string(),
        })
    }

    async fn revoke_permission(&self, permission_id: [u8; 32]) -> Result<String, ChainError> {
        let registry = IPolicyRegistry::new(self.policy_registry()?, self.provider.clone());
        let pending = registry
            .revokePermission(B256::from(permission_id))
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;
        Ok(receipt.transaction_hash.to_string())
    }

    async fn set_constraints(&self, update: &ConstraintUpdate) -> Result<String, ChainError> {
        let enforcer = IPermissionEnforcer::new(self.permission_enforcer()?, self.provider.clone());

        let tokens: Vec<Address> = update
            .allowed_tokens
            .iter()
            .filter_map(|t| Address::from_str(t).ok())
            .collect();
        let protocols: Vec<Address> = update
            .allowed_protocols
            .iter()
            .filter_map(|p| Address::from_str(p).ok())
            .collect();

        let pending = enforcer
            .setConstraints(
                B256::from(update.permission_id),
                amount_word(&update.max_value_per_tx),
                amount_word(&update.max_daily_volume),
                U256::from(update.max_tx_count),
                update.allowed_actions.iter().map(|a| B256::from(*a)).collect(),
                tokens,
                protocols,
                update.allowed_chains.iter().map(|c| U256::from(*c)).collect(),
            )
            .send()
            .await
            .map_err(map_send_error)?;
        let receipt = checked(
            pending
                .get_receipt()
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?,
        )?;
        Ok(receipt.transaction_hash.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert!(parse_address("").is_none());
        assert!(parse_address("not-an-address").is_none());
        assert!(parse_address("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789").is_some());
    }

    #[test]
    fn test_amount_word_parses_decimal() {
        assert_eq!(amount_word("1000"), U256::from(1000u64));
        assert_eq!(amount_word(""), U256::ZERO);
        assert_eq!(amount_word("not-a-number"), U256::ZERO);
    }

    #[test]
    fn test_connect_rejects_bad_key() {
        let cfg = ChainConfig {
            chain_id: 31337,
            rpc_url: "http://localhost:8545".into(),
            deployer_private_key: "zz".into(),
            ..Default::default()
        };
        assert!(LiveMirror::connect(&cfg).is_err());
    }
}
