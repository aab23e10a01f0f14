// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared test fixtures: an audit sink that records instead of
//! persisting, a scriptable chain mirror, and a fully wired service set
//! over the in-memory store.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use warden_core::application::agents::AgentService;
use warden_core::application::permissions::PermissionService;
use warden_core::application::policies::PolicyService;
use warden_core::application::validation::ValidationEngine;
use warden_core::domain::action::Action;
use warden_core::domain::audit::{AuditSink, NewAuditEvent};
use warden_core::domain::chain::{
    ChainError, ChainMirror, ConstraintUpdate, OnchainAgent, PermissionMirror, PolicyMirror,
};
use warden_core::domain::policy::Definition;
use warden_core::infrastructure::chain::{MirrorRouter, SimulatedMirror};
use warden_core::infrastructure::repositories::MemoryStore;

pub const TEST_CHAIN: i64 = 31337;

/// Audit sink that captures events in memory for assertions.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<NewAuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<NewAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: NewAuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// A chain mirror whose individual operations can be scripted to fail,
/// and whose registry views can be pre-populated. Everything not
/// scripted delegates to the deterministic simulated mirror.
pub struct ScriptedMirror {
    inner: SimulatedMirror,
    failing: Mutex<HashSet<&'static str>>,
    register_conflict: Mutex<bool>,
    owner_agents: Mutex<Vec<[u8; 32]>>,
    registry: Mutex<HashMap<[u8; 32], OnchainAgent>>,
}

impl ScriptedMirror {
    pub fn new() -> Self {
        Self {
            inner: SimulatedMirror::new(TEST_CHAIN),
            failing: Mutex::new(HashSet::new()),
            register_conflict: Mutex::new(false),
            owner_agents: Mutex::new(Vec::new()),
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Make `register_agent` revert with `AgentAlreadyExists`.
    pub fn set_register_conflict(&self) {
        *self.register_conflict.lock().unwrap() = true;
    }

    pub fn set_owner_agents(&self, ids: Vec<[u8; 32]>) {
        *self.owner_agents.lock().unwrap() = ids;
    }

    pub fn put_registry_entry(&self, id: [u8; 32], entry: OnchainAgent) {
        self.registry.lock().unwrap().insert(id, entry);
    }

    fn check(&self, op: &'static str) -> Result<(), ChainError> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(ChainError::Rpc(format!("scripted failure: {op}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainMirror for ScriptedMirror {
    fn is_simulated(&self) -> bool {
        true
    }

    fn chain_id(&self) -> i64 {
        TEST_CHAIN
    }

    async fn register_agent(&self, agent_id: [u8; 32], metadata: &str)
        -> Result<String, ChainError> {
        self.check("register_agent")?;
        if *self.register_conflict.lock().unwrap() {
            return Err(ChainError::AgentAlreadyExists);
        }
        self.inner.register_agent(agent_id, metadata).await
    }

    async fn owner_agents(&self, _owner: &str) -> Result<Vec<[u8; 32]>, ChainError> {
        self.check("owner_agents")?;
        Ok(self.owner_agents.lock().unwrap().clone())
    }

    async fn agent(&self, agent_id: [u8; 32]) -> Result<Option<OnchainAgent>, ChainError> {
        self.check("agent")?;
        Ok(self.registry.lock().unwrap().get(&agent_id).cloned())
    }

    async fn create_policy(&self, content_hash: [u8; 32]) -> Result<PolicyMirror, ChainError> {
        self.check("create_policy")?;
        self.inner.create_policy(content_hash).await
    }

    async fn deactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        self.check("deactivate_policy")?;
        self.inner.deactivate_policy(policy_id).await
    }

    async fn reactivate_policy(&self, policy_id: [u8; 32]) -> Result<String, ChainError> {
        self.check("reactivate_policy")?;
        self.inner.reactivate_policy(policy_id).await
    }

    async fn grant_permission(
        &self,
        policy_id: [u8; 32],
        agent_id: [u8; 32],
        valid_from: i64,
        valid_until: i64,
    ) -> Result<PermissionMirror, ChainError> {
        self.check("grant_permission")?;
        self.inner
            .grant_permission(policy_id, agent_id, valid_from, valid_until)
            .await
    }

    async fn revoke_permission(&self, permission_id: [u8; 32]) -> Result<String, ChainError> {
        self.check("revoke_permission")?;
        self.inner.revoke_permission(permission_id).await
    }

    async fn set_constraints(&self, update: &ConstraintUpdate) -> Result<String, ChainError> {
        self.check("set_constraints")?;
        self.inner.set_constraints(update).await
    }
}

/// Services wired over one in-memory store, a recording audit sink, and
/// a scriptable mirror.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<RecordingAuditSink>,
    pub mirror: Arc<ScriptedMirror>,
    pub agents: AgentService,
    pub policies: PolicyService,
    pub permissions: PermissionService,
    pub validation: ValidationEngine,
}

impl TestEnv {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(RecordingAuditSink::default());
        let mirror = Arc::new(ScriptedMirror::new());

        let mut mirrors = HashMap::new();
        mirrors.insert(TEST_CHAIN, mirror.clone() as Arc<dyn ChainMirror>);
        let router = Arc::new(MirrorRouter::new(mirrors, TEST_CHAIN));

        let audit_sink: Arc<dyn AuditSink> = audit.clone();

        Self {
            agents: AgentService::new(store.clone(), router.clone(), audit_sink.clone()),
            policies: PolicyService::new(store.clone(), router.clone(), audit_sink.clone()),
            permissions: PermissionService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                router,
                audit_sink.clone(),
            ),
            validation: ValidationEngine::new(store.clone(), store.clone(), audit_sink),
            store,
            audit,
            mirror,
        }
    }

    pub fn wallet(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// A full HTTP application over the in-memory store, with the real auth
/// stack (nonce store, JWT codec, audit logger, webhook dispatcher).
pub fn app_over_memory() -> (axum::Router, Arc<MemoryStore>) {
    use warden_core::application::audit::AuditQueryService;
    use warden_core::application::auth::AuthService;
    use warden_core::application::webhooks::WebhookService;
    use warden_core::infrastructure::audit_log::AuditLogger;
    use warden_core::infrastructure::auth::nonce::NonceStore;
    use warden_core::infrastructure::auth::JwtCodec;
    use warden_core::infrastructure::webhooks::WebhookDispatcher;
    use warden_core::presentation::{app, AppState};

    let store = Arc::new(MemoryStore::new());
    let mut mirrors: HashMap<i64, Arc<dyn ChainMirror>> = HashMap::new();
    mirrors.insert(TEST_CHAIN, Arc::new(SimulatedMirror::new(TEST_CHAIN)));
    let router = Arc::new(MirrorRouter::new(mirrors, TEST_CHAIN));

    let dispatcher = Arc::new(WebhookDispatcher::new(store.clone()));
    let audit_sink: Arc<dyn AuditSink> = Arc::new(AuditLogger::new(store.clone(), dispatcher));

    let auth = Arc::new(AuthService::new(
        store.clone(),
        store.clone(),
        Arc::new(NonceStore::default()),
        JwtCodec::new("integration-test-secret", 1),
        audit_sink.clone(),
    ));

    let state = AppState {
        auth,
        agents: Arc::new(AgentService::new(
            store.clone(),
            router.clone(),
            audit_sink.clone(),
        )),
        policies: Arc::new(PolicyService::new(
            store.clone(),
            router.clone(),
            audit_sink.clone(),
        )),
        permissions: Arc::new(PermissionService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            router,
            audit_sink.clone(),
        )),
        validation: Arc::new(ValidationEngine::new(
            store.clone(),
            store.clone(),
            audit_sink.clone(),
        )),
        audit: Arc::new(AuditQueryService::new(store.clone())),
        webhooks: Arc::new(WebhookService::new(store.clone(), audit_sink)),
    };

    (app(state, &["http://localhost:3000".to_string()]), store)
}

/// The scenario-1 policy definition: swap-only, USDC-only, 1000 per tx.
pub fn swap_definition() -> Definition {
    serde_json::from_value(json!({
        "actions": ["swap"],
        "assets": { "tokens": ["0xUSDC"] },
        "constraints": { "maxValuePerTx": "1000" }
    }))
    .unwrap()
}

pub fn swap_action(amount: &str) -> Action {
    let mut action = Action::new("swap");
    action.token = "0xUSDC".into();
    action.amount = amount.into();
    action
}
