// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Decision-path scenarios: allow/deny selection, rolling daily volume,
//! recording, batch, and simulation.

mod common;

use serde_json::json;
use uuid::Uuid;
use warden_core::domain::action::Action;
use warden_core::domain::agent::WalletType;
use warden_core::domain::permission::Permission;
use warden_core::domain::policy::{Policy, PolicyStatus};
use warden_core::domain::repository::{PermissionRepository, PolicyRepository};

use common::{swap_action, swap_definition, TestEnv};

/// Agent + activated policy + permission, ready to validate against.
async fn seed(env: &TestEnv, wallet: Uuid, definition: serde_json::Value) -> (Uuid, Uuid, Uuid) {
    let agent = env
        .agents
        .create(wallet, "trader".into(), None, None, WalletType::Eoa, None)
        .await
        .unwrap();

    let policy = env
        .policies
        .create(
            wallet,
            "swap-policy".into(),
            None,
            serde_json::from_value(definition).unwrap(),
        )
        .await
        .unwrap();
    env.policies.activate(wallet, policy.id).await.unwrap();

    let permission = env
        .permissions
        .create(wallet, agent.id, policy.id, None, None)
        .await
        .unwrap();

    (agent.id, policy.id, permission.id)
}

#[tokio::test]
async fn test_simple_swap_allow() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, policy, permission) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    let decision = env
        .validation
        .validate(wallet, agent, swap_action("500"))
        .await;

    assert!(decision.allowed);
    assert_eq!(decision.permission_id, Some(permission));
    assert_eq!(decision.policy_id, Some(policy));
    assert_eq!(
        decision.constraints,
        Some(json!({
            "maxValuePerTx": "1000",
            "maxDailyVolume": "",
            "requireApproval": false,
        }))
    );
}

#[tokio::test]
async fn test_per_tx_ceiling_is_inclusive() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    let at_limit = env
        .validation
        .validate(wallet, agent, swap_action("1000"))
        .await;
    assert!(at_limit.allowed);

    let over = env
        .validation
        .validate(wallet, agent, swap_action("1001"))
        .await;
    assert!(!over.allowed);
    assert_eq!(
        over.reason.as_deref(),
        Some("no matching policy found for this action")
    );
}

#[tokio::test]
async fn test_daily_volume_quota_breach() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) = seed(
        &env,
        wallet,
        json!({
            "actions": ["swap"],
            "assets": { "tokens": ["0xUSDC"] },
            "constraints": { "maxValuePerTx": "1000", "maxDailyVolume": "1000" }
        }),
    )
    .await;

    // 700 consumed today.
    let first = env
        .validation
        .validate(wallet, agent, swap_action("700"))
        .await;
    assert!(first.allowed);

    // 700 + 400 > 1000: denied with the standard miss reason.
    let second = env
        .validation
        .validate(wallet, agent, swap_action("400"))
        .await;
    assert!(!second.allowed);
    assert_eq!(
        second.reason.as_deref(),
        Some("no matching policy found for this action")
    );

    // 700 + 300 = 1000 still fits. Denied requests must not consume quota.
    let third = env
        .validation
        .validate(wallet, agent, swap_action("300"))
        .await;
    assert!(third.allowed);
}

#[tokio::test]
async fn test_revoked_policy_denies() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, policy, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    env.policies.revoke(wallet, policy).await.unwrap();

    let decision = env
        .validation
        .validate(wallet, agent, swap_action("500"))
        .await;
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason.as_deref(),
        Some("no matching policy found for this action")
    );
}

#[tokio::test]
async fn test_action_type_is_case_insensitive() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) = seed(&env, wallet, json!({ "actions": ["swap"] })).await;

    let mut action = Action::new("Swap");
    action.amount = "100".into();

    let decision = env.validation.validate(wallet, agent, action).await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_decision_is_deterministic_for_fixed_store() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    // A second binding for the same agent; iteration order must still be
    // stable across repeated calls.
    let policy = env
        .policies
        .create(wallet, "second".into(), None, swap_definition())
        .await
        .unwrap();
    env.policies.activate(wallet, policy.id).await.unwrap();
    env.permissions
        .create(wallet, agent, policy.id, None, None)
        .await
        .unwrap();

    let first = env
        .validation
        .simulate(wallet, agent, swap_action("10"))
        .await;
    for _ in 0..5 {
        let again = env
            .validation
            .simulate(wallet, agent, swap_action("10"))
            .await;
        assert_eq!(again.matching_policy, first.matching_policy);
        assert!(again.would_allow);
    }
}

#[tokio::test]
async fn test_malformed_stored_definition_is_skipped() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, good_policy, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    // A corrupt row created outside the validated path. It must be
    // skipped, not fail the decision.
    let mut broken = Policy::new(wallet, "broken".into(), None, json!({ "actions": 42 }));
    broken.status = PolicyStatus::Active;
    // Newest-first ordering puts the broken binding ahead of the good one.
    broken.created_at = chrono::Utc::now() + chrono::Duration::seconds(1);
    PolicyRepository::insert(env.store.as_ref(), &broken)
        .await
        .unwrap();
    let mut binding = Permission::new(wallet, agent, broken.id, None, None);
    binding.created_at = chrono::Utc::now() + chrono::Duration::seconds(1);
    PermissionRepository::insert(env.store.as_ref(), &binding)
        .await
        .unwrap();

    let decision = env
        .validation
        .validate(wallet, agent, swap_action("500"))
        .await;
    assert!(decision.allowed);
    assert_eq!(decision.policy_id, Some(good_policy));
}

#[tokio::test]
async fn test_validate_records_and_audits() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    let before = env.audit.events().len();
    let decision = env
        .validation
        .validate(wallet, agent, swap_action("500"))
        .await;

    let events = env.audit.events();
    assert_eq!(events.len(), before + 1);
    let event = events.last().unwrap();
    assert_eq!(event.event_type, "validation.request");
    assert_eq!(event.agent_id, Some(agent));
    let details = event.details.as_ref().unwrap();
    assert_eq!(details["allowed"], json!(true));
    assert_eq!(details["request_id"], json!(decision.request_id));
}

#[tokio::test]
async fn test_batch_caps_at_one_hundred() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let agent = Uuid::new_v4();

    let requests: Vec<(Uuid, Action)> = (0..101).map(|_| (agent, swap_action("1"))).collect();
    assert!(env.validation.validate_batch(wallet, requests).await.is_err());

    let requests: Vec<(Uuid, Action)> = (0..3).map(|_| (agent, swap_action("1"))).collect();
    let decisions = env
        .validation
        .validate_batch(wallet, requests)
        .await
        .unwrap();
    assert_eq!(decisions.len(), 3);

    // Each item produced an independent record.
    let mut request_ids: Vec<Uuid> = decisions.iter().map(|d| d.request_id).collect();
    request_ids.dedup();
    assert_eq!(request_ids.len(), 3);
}

#[tokio::test]
async fn test_simulate_reports_quota_and_records_nothing() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, policy, _) = seed(
        &env,
        wallet,
        json!({
            "actions": ["swap"],
            "constraints": { "maxDailyVolume": "1000" }
        }),
    )
    .await;

    // Consume 700 through the real path.
    env.validation
        .validate(wallet, agent, swap_action("700"))
        .await;

    let simulation = env
        .validation
        .simulate(wallet, agent, swap_action("100"))
        .await;
    assert!(simulation.would_allow);
    assert_eq!(simulation.matching_policy, Some(policy));
    assert_eq!(simulation.current_usage, Some(json!({ "daily": "700" })));
    assert_eq!(simulation.remaining_quota, Some(json!({ "daily": "300" })));

    // Simulation did not consume quota: 300 more still fits exactly.
    let decision = env
        .validation
        .validate(wallet, agent, swap_action("300"))
        .await;
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_simulate_miss_recommends_setup() {
    let env = TestEnv::new();
    let wallet = env.wallet();

    let simulation = env
        .validation
        .simulate(wallet, Uuid::new_v4(), swap_action("1"))
        .await;
    assert!(!simulation.would_allow);
    assert!(simulation.matching_policy.is_none());
    assert_eq!(simulation.recommendations.len(), 2);
}

#[tokio::test]
async fn test_empty_action_token_skips_asset_filter() {
    let env = TestEnv::new();
    let wallet = env.wallet();
    let (agent, _, _) =
        seed(&env, wallet, serde_json::to_value(swap_definition()).unwrap()).await;

    let mut action = Action::new("swap");
    action.amount = "10".into();
    // No token on the action: the token allowlist is skipped.
    let decision = env.validation.validate(wallet, agent, action).await;
    assert!(decision.allowed);

    let mut wrong_token = Action::new("swap");
    wrong_token.amount = "10".into();
    wrong_token.token = "0xDAI".into();
    let denied = env.validation.validate(wallet, agent, wrong_token).await;
    assert!(!denied.allowed);
}
