// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Warden Server
//!
//! The `warden` binary hosts the policy control plane: environment-keyed
//! configuration, PostgreSQL-backed storage (or an in-memory store for
//! local experiments), per-chain mirrors, and the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use warden_core::application::agents::AgentService;
use warden_core::application::audit::AuditQueryService;
use warden_core::application::auth::AuthService;
use warden_core::application::permissions::PermissionService;
use warden_core::application::policies::PolicyService;
use warden_core::application::validation::ValidationEngine;
use warden_core::application::webhooks::WebhookService;
use warden_core::domain::audit::AuditSink;
use warden_core::domain::repository::{
    AgentRepository, ApiKeyRepository, AuditRepository, PermissionRepository, PolicyRepository,
    ValidationRepository, WalletRepository, WebhookRepository,
};
use warden_core::infrastructure::audit_log::AuditLogger;
use warden_core::infrastructure::auth::nonce::NonceStore;
use warden_core::infrastructure::auth::JwtCodec;
use warden_core::infrastructure::chain::MirrorRouter;
use warden_core::infrastructure::repositories::{
    MemoryStore, PostgresAgentRepository, PostgresApiKeyRepository, PostgresAuditRepository,
    PostgresPermissionRepository, PostgresPolicyRepository, PostgresValidationRepository,
    PostgresWalletRepository, PostgresWebhookRepository,
};
use warden_core::infrastructure::webhooks::WebhookDispatcher;
use warden_core::infrastructure::{Config, Database};
use warden_core::presentation::{app, AppState};

/// Warden — policy and permission control plane for autonomous agents.
#[derive(Parser)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
struct Cli {
    /// HTTP port (overrides the PORT environment variable)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WARDEN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Run against the in-memory store; no PostgreSQL required. State
    /// does not survive a restart.
    #[arg(long)]
    in_memory: bool,
}

struct Repositories {
    wallets: Arc<dyn WalletRepository>,
    api_keys: Arc<dyn ApiKeyRepository>,
    agents: Arc<dyn AgentRepository>,
    policies: Arc<dyn PolicyRepository>,
    permissions: Arc<dyn PermissionRepository>,
    validations: Arc<dyn ValidationRepository>,
    audits: Arc<dyn AuditRepository>,
    webhooks: Arc<dyn WebhookRepository>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config::load();
    let port = cli.port.unwrap_or(config.server.port);

    let repos = if cli.in_memory {
        info!("running with the in-memory store");
        memory_repositories()
    } else {
        let db = Database::connect(&config.database.url, config.database.max_connections)
            .await
            .context("failed to connect to the database")?;
        db.run_migrations()
            .await
            .context("failed to run migrations")?;
        postgres_repositories(&db)
    };

    let state = build_state(&config, repos);
    let router = app(state, &config.server.allow_origins);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!(port, environment = %config.server.environment, "warden listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn memory_repositories() -> Repositories {
    let store = Arc::new(MemoryStore::new());
    Repositories {
        wallets: store.clone(),
        api_keys: store.clone(),
        agents: store.clone(),
        policies: store.clone(),
        permissions: store.clone(),
        validations: store.clone(),
        audits: store.clone(),
        webhooks: store,
    }
}

fn postgres_repositories(db: &Database) -> Repositories {
    let pool = db.pool().clone();
    Repositories {
        wallets: Arc::new(PostgresWalletRepository::new(pool.clone())),
        api_keys: Arc::new(PostgresApiKeyRepository::new(pool.clone())),
        agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
        policies: Arc::new(PostgresPolicyRepository::new(pool.clone())),
        permissions: Arc::new(PostgresPermissionRepository::new(pool.clone())),
        validations: Arc::new(PostgresValidationRepository::new(pool.clone())),
        audits: Arc::new(PostgresAuditRepository::new(pool.clone())),
        webhooks: Arc::new(PostgresWebhookRepository::new(pool)),
    }
}

fn build_state(config: &Config, repos: Repositories) -> AppState {
    let mirrors = Arc::new(MirrorRouter::from_config(&config.chains));
    let dispatcher = Arc::new(WebhookDispatcher::new(repos.webhooks.clone()));
    let audit_sink: Arc<dyn AuditSink> =
        Arc::new(AuditLogger::new(repos.audits.clone(), dispatcher));

    let auth = Arc::new(AuthService::new(
        repos.wallets.clone(),
        repos.api_keys.clone(),
        Arc::new(NonceStore::default()),
        JwtCodec::new(config.jwt.secret.clone(), config.jwt.expiration_hours),
        audit_sink.clone(),
    ));

    AppState {
        auth,
        agents: Arc::new(AgentService::new(
            repos.agents.clone(),
            mirrors.clone(),
            audit_sink.clone(),
        )),
        policies: Arc::new(PolicyService::new(
            repos.policies.clone(),
            mirrors.clone(),
            audit_sink.clone(),
        )),
        permissions: Arc::new(PermissionService::new(
            repos.permissions.clone(),
            repos.agents,
            repos.policies,
            mirrors,
            audit_sink.clone(),
        )),
        validation: Arc::new(ValidationEngine::new(
            repos.permissions,
            repos.validations,
            audit_sink.clone(),
        )),
        audit: Arc::new(AuditQueryService::new(repos.audits)),
        webhooks: Arc::new(WebhookService::new(repos.webhooks, audit_sink)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
