// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle-manager scenarios: mirror ordering on acquire vs release
//! transitions, mint preconditions, idempotence, registry sync.

mod common;

use serde_json::json;
use uuid::Uuid;
use warden_core::application::ServiceError;
use warden_core::domain::agent::WalletType;
use warden_core::domain::chain::{bytes32_hex, uuid_to_bytes32, OnchainAgent};
use warden_core::domain::permission::Permission;
use warden_core::domain::policy::PolicyStatus;
use warden_core::domain::repository::PermissionRepository;

use common::{swap_definition, TestEnv};

async fn draft_policy(env: &TestEnv, wallet: Uuid) -> Uuid {
    env.policies
        .create(wallet, "limits".into(), None, swap_definition())
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_activation_sets_stable_onchain_hash() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;

    let activated = env.policies.activate(wallet, policy).await.unwrap();
    let hash = activated.onchain_hash.clone().unwrap();
    assert_eq!(activated.status, PolicyStatus::Active);
    assert!(activated.activated_at.is_some());

    // Second activation: state gate lost, hash untouched.
    let again = env.policies.activate(wallet, policy).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
    let stored = env.policies.get(wallet, policy).await.unwrap();
    assert_eq!(stored.onchain_hash.as_deref(), Some(hash.as_str()));

    // The hash survives revoke and reactivate.
    env.policies.revoke(wallet, policy).await.unwrap();
    let back = env.policies.reactivate(wallet, policy).await.unwrap();
    assert_eq!(back.onchain_hash.as_deref(), Some(hash.as_str()));
}

#[tokio::test]
async fn test_activation_mirror_failure_keeps_draft() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;

    env.mirror.fail("create_policy");
    let result = env.policies.activate(wallet, policy).await;
    assert!(matches!(result, Err(ServiceError::Upstream(_))));

    // Acquire-style: local state did not move.
    let stored = env.policies.get(wallet, policy).await.unwrap();
    assert_eq!(stored.status, PolicyStatus::Draft);
    assert!(stored.onchain_hash.is_none());

    // And the operation is retryable once the chain recovers.
    env.mirror.heal("create_policy");
    assert!(env.policies.activate(wallet, policy).await.is_ok());
}

#[tokio::test]
async fn test_revoke_flips_local_even_when_mirror_fails() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;
    env.policies.activate(wallet, policy).await.unwrap();

    env.mirror.fail("deactivate_policy");
    let revoked = env.policies.revoke(wallet, policy).await.unwrap();

    // Release-style: the local view must never stay permissive.
    assert_eq!(revoked.status, PolicyStatus::Revoked);
    assert!(revoked.revoked_at.is_some());
}

#[tokio::test]
async fn test_reactivate_calls_mirror_first() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;
    env.policies.activate(wallet, policy).await.unwrap();
    env.policies.revoke(wallet, policy).await.unwrap();

    env.mirror.fail("reactivate_policy");
    let result = env.policies.reactivate(wallet, policy).await;
    assert!(matches!(result, Err(ServiceError::Upstream(_))));
    let stored = env.policies.get(wallet, policy).await.unwrap();
    assert_eq!(stored.status, PolicyStatus::Revoked);

    env.mirror.heal("reactivate_policy");
    let back = env.policies.reactivate(wallet, policy).await.unwrap();
    assert_eq!(back.status, PolicyStatus::Active);
}

#[tokio::test]
async fn test_active_update_bumps_version_and_draft_update_does_not() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;

    // Draft update with a new definition: in place, still version 1, no
    // new snapshot row.
    let changes = warden_core::application::policies::PolicyChanges {
        definition: Some(swap_definition()),
        ..Default::default()
    };
    let updated = env.policies.update(wallet, policy, changes).await.unwrap();
    assert_eq!(updated.version, 1);

    env.policies.activate(wallet, policy).await.unwrap();

    let changes = warden_core::application::policies::PolicyChanges {
        definition: Some(
            serde_json::from_value(json!({
                "actions": ["swap", "transfer"],
            }))
            .unwrap(),
        ),
        ..Default::default()
    };
    let updated = env.policies.update(wallet, policy, changes).await.unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.status, PolicyStatus::Active);
}

#[tokio::test]
async fn test_policy_audit_trail_in_order() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let policy = draft_policy(&env, wallet).await;

    let changes = warden_core::application::policies::PolicyChanges {
        name: Some("tightened".into()),
        ..Default::default()
    };
    env.policies.update(wallet, policy, changes).await.unwrap();
    env.policies.activate(wallet, policy).await.unwrap();
    env.policies.revoke(wallet, policy).await.unwrap();

    assert_eq!(
        env.audit.event_types(),
        vec![
            "policy.created".to_string(),
            "policy.updated".to_string(),
            "policy.activated".to_string(),
            "policy.revoked".to_string(),
        ]
    );
    assert!(env.audit.events().iter().all(|e| e.wallet_id == wallet));
}

async fn minted_setup(env: &TestEnv, wallet: Uuid) -> (Uuid, Uuid, Uuid) {
    let agent = env
        .agents
        .create(wallet, "bot".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();
    env.agents.register_onchain(wallet, agent.id).await.unwrap();

    let policy = draft_policy(env, wallet).await;
    env.policies.activate(wallet, policy).await.unwrap();

    let permission = env
        .permissions
        .create(wallet, agent.id, policy, None, None)
        .await
        .unwrap();
    (agent.id, policy, permission.id)
}

#[tokio::test]
async fn test_mint_sets_token_and_timestamp_together() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (_, _, permission) = minted_setup(&env, wallet).await;

    let minted = env.permissions.mint(wallet, permission).await.unwrap();
    assert!(minted.onchain_token_id.is_some());
    assert!(minted.minted_at.is_some());

    // Minting twice: the state gate is gone.
    let again = env.permissions.mint(wallet, permission).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_mint_requires_activated_policy() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let agent = env
        .agents
        .create(wallet, "bot".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();
    env.agents.register_onchain(wallet, agent.id).await.unwrap();

    // A permission row pointing at a draft policy (legacy data shape).
    let policy = draft_policy(&env, wallet).await;
    let permission = Permission::new(wallet, agent.id, policy, None, None);
    PermissionRepository::insert(env.store.as_ref(), &permission)
        .await
        .unwrap();

    let result = env.permissions.mint(wallet, permission.id).await;
    match result {
        Err(ServiceError::Invalid(message)) => assert_eq!(
            message,
            "policy must be activated on-chain before minting a permission"
        ),
        other => panic!("expected invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mint_requires_registered_agent() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let agent = env
        .agents
        .create(wallet, "bot".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();
    let policy = draft_policy(&env, wallet).await;
    env.policies.activate(wallet, policy).await.unwrap();
    let permission = env
        .permissions
        .create(wallet, agent.id, policy, None, None)
        .await
        .unwrap();

    let result = env.permissions.mint(wallet, permission.id).await;
    match result {
        Err(ServiceError::Invalid(message)) => assert_eq!(
            message,
            "agent must be registered on-chain before minting a permission"
        ),
        other => panic!("expected invalid, got {other:?}"),
    }
}

#[tokio::test]
async fn test_mint_failure_leaves_permission_unminted() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (_, _, permission) = minted_setup(&env, wallet).await;

    env.mirror.fail("grant_permission");
    let result = env.permissions.mint(wallet, permission).await;
    assert!(matches!(result, Err(ServiceError::Upstream(_))));

    let stored = env.permissions.get(wallet, permission).await.unwrap();
    assert!(stored.onchain_token_id.is_none());
    assert!(stored.minted_at.is_none());
}

#[tokio::test]
async fn test_revoke_minted_permission_survives_mirror_failure() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (_, _, permission) = minted_setup(&env, wallet).await;
    env.permissions.mint(wallet, permission).await.unwrap();

    env.mirror.fail("revoke_permission");
    env.permissions.revoke(wallet, permission).await.unwrap();

    let stored = env.permissions.get(wallet, permission).await.unwrap();
    assert_eq!(
        stored.status,
        warden_core::domain::permission::PermissionStatus::Revoked
    );

    // Second revoke: not found or bad state.
    let again = env.permissions.revoke(wallet, permission).await;
    assert!(matches!(again, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_mint_syncs_constraints_for_smart_accounts() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let agent = env
        .agents
        .create(
            wallet,
            "vault".into(),
            None,
            None,
            WalletType::SmartAccount,
            Some(common::TEST_CHAIN),
        )
        .await
        .unwrap();
    env.agents.register_onchain(wallet, agent.id).await.unwrap();

    let policy = draft_policy(&env, wallet).await;
    env.policies.activate(wallet, policy).await.unwrap();
    let permission = env
        .permissions
        .create(wallet, agent.id, policy, None, None)
        .await
        .unwrap();

    // A failing enforcer must not unmint the permission.
    env.mirror.fail("set_constraints");
    let minted = env.permissions.mint(wallet, permission.id).await.unwrap();
    assert!(minted.minted_at.is_some());
}

#[tokio::test]
async fn test_register_onchain_is_idempotent_against_registry() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let agent = env
        .agents
        .create(wallet, "bot".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();

    // The registry already holds this agent: the revert is success and
    // the canonical bytes32 id gets recorded.
    env.mirror.set_register_conflict();
    let registered = env.agents.register_onchain(wallet, agent.id).await.unwrap();
    assert_eq!(
        registered.onchain_registry_id.as_deref(),
        Some(bytes32_hex(uuid_to_bytes32(agent.id)).as_str())
    );

    // A second local call conflicts.
    let again = env.agents.register_onchain(wallet, agent.id).await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn test_sync_from_chain_is_additive_and_idempotent() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    // A locally created agent, registered on-chain.
    let known = env
        .agents
        .create(wallet, "known".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();
    env.agents.register_onchain(wallet, known.id).await.unwrap();

    // The registry reports the known agent (by its UUID encoding) plus a
    // foreign one created outside this control plane.
    let known_bytes = uuid_to_bytes32(known.id);
    let foreign_bytes = warden_core::domain::chain::keccak256(b"foreign-agent");
    env.mirror.set_owner_agents(vec![known_bytes, foreign_bytes]);
    env.mirror.put_registry_entry(
        foreign_bytes,
        OnchainAgent {
            owner: "0x1111111111111111111111111111111111111111".into(),
            metadata: r#"{"name":"external","description":"made elsewhere"}"#.into(),
            active: true,
            registered_at: 1_750_000_000,
        },
    );

    let imported = env.agents.sync_from_chain(wallet, "0x1111").await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].name, "external");
    assert_eq!(
        imported[0].onchain_registry_id.as_deref(),
        Some(bytes32_hex(foreign_bytes).as_str())
    );

    // Round trip: a second sync imports nothing new.
    let again = env.agents.sync_from_chain(wallet, "0x1111").await.unwrap();
    assert!(again.is_empty());
    assert_eq!(env.agents.list(wallet).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sync_skips_inactive_registry_entries() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let dormant = warden_core::domain::chain::keccak256(b"dormant");
    env.mirror.set_owner_agents(vec![dormant]);
    env.mirror.put_registry_entry(
        dormant,
        OnchainAgent {
            owner: "0x2222222222222222222222222222222222222222".into(),
            metadata: String::new(),
            active: false,
            registered_at: 0,
        },
    );

    let imported = env.agents.sync_from_chain(wallet, "0x2222").await.unwrap();
    assert!(imported.is_empty());
}

#[tokio::test]
async fn test_permission_create_requires_live_references() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let agent = env
        .agents
        .create(wallet, "bot".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();
    let policy = draft_policy(&env, wallet).await;

    // Draft policy: not bindable.
    let result = env
        .permissions
        .create(wallet, agent.id, policy, None, None)
        .await;
    assert!(matches!(result, Err(ServiceError::Invalid(_))));

    // Unknown agent: not bindable either.
    env.policies.activate(wallet, policy).await.unwrap();
    let result = env
        .permissions
        .create(wallet, Uuid::new_v4(), policy, None, None)
        .await;
    assert!(matches!(result, Err(ServiceError::Invalid(_))));
}
