// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Router assembly. Everything lives under `/api/v1` except `/health`;
//! all routes are protected by the auth middleware except `/auth/*`.
//! CORS and the server-wide 60 s request timeout are layered here.

use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::agents::AgentService;
use crate::application::audit::AuditQueryService;
use crate::application::auth::AuthService;
use crate::application::permissions::PermissionService;
use crate::application::policies::PolicyService;
use crate::application::validation::ValidationEngine;
use crate::application::webhooks::WebhookService;
use crate::presentation::handlers;
use crate::presentation::middleware::require_auth;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub agents: Arc<AgentService>,
    pub policies: Arc<PolicyService>,
    pub permissions: Arc<PermissionService>,
    pub validation: Arc<ValidationEngine>,
    pub audit: Arc<AuditQueryService>,
    pub webhooks: Arc<WebhookService>,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub fn app(state: AppState, allow_origins: &[String]) -> Router {
    let public = Router::new()
        .route("/auth/nonce", post(handlers::auth::nonce))
        .route("/auth/verify", post(handlers::auth::verify));

    let protected = Router::new()
        .route(
            "/api-keys",
            post(handlers::auth::create_api_key).get(handlers::auth::list_api_keys),
        )
        .route("/api-keys/:id", delete(handlers::auth::delete_api_key))
        .route(
            "/agents",
            post(handlers::agents::create).get(handlers::agents::list),
        )
        .route("/agents/sync-onchain", post(handlers::agents::sync_onchain))
        .route(
            "/agents/:id",
            get(handlers::agents::get_one)
                .patch(handlers::agents::update)
                .delete(handlers::agents::delete),
        )
        .route(
            "/agents/:id/register-onchain",
            post(handlers::agents::register_onchain),
        )
        .route(
            "/policies",
            post(handlers::policies::create).get(handlers::policies::list),
        )
        .route(
            "/policies/:id",
            get(handlers::policies::get_one)
                .put(handlers::policies::update)
                .delete(handlers::policies::delete),
        )
        .route("/policies/:id/activate", post(handlers::policies::activate))
        .route("/policies/:id/revoke", post(handlers::policies::revoke))
        .route(
            "/policies/:id/reactivate",
            post(handlers::policies::reactivate),
        )
        .route(
            "/permissions",
            post(handlers::permissions::create).get(handlers::permissions::list),
        )
        .route(
            "/permissions/:id",
            get(handlers::permissions::get_one).delete(handlers::permissions::delete),
        )
        .route("/permissions/:id/mint", post(handlers::permissions::mint))
        .route("/validate", post(handlers::validation::validate))
        .route("/validate/batch", post(handlers::validation::validate_batch))
        .route("/validate/simulate", post(handlers::validation::simulate))
        .route("/audit", get(handlers::audit::list))
        .route("/audit/export", get(handlers::audit::export))
        .route(
            "/webhooks",
            post(handlers::webhooks::create).get(handlers::webhooks::list),
        )
        .route(
            "/webhooks/:id",
            get(handlers::webhooks::get_one)
                .patch(handlers::webhooks::update)
                .delete(handlers::webhooks::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors_layer(allow_origins))
        .with_state(state)
}

fn cors_layer(allow_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}
