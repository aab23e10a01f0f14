// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Identity Context
//!
//! Resolves credentials to a tenant principal. Two credential kinds:
//!
//! - **Sign-in-with-wallet**: a nonce-bearing message signed by the
//!   wallet key (EIP-191 personal sign). Verification recovers the signer
//!   address, upserts the wallet row by lowercase address, and mints an
//!   HS256 JWT `{sub, wallet, iat, exp}`.
//! - **API keys**: `wdn_`-prefixed random keys stored only as a sha256
//!   digest plus a 16-char visible prefix; the full key is returned
//!   exactly once at creation.

use rand::RngCore;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::audit::{AuditSink, NewAuditEvent};
use crate::domain::repository::{ApiKeyRepository, WalletRepository};
use crate::domain::wallet::{ApiKey, Principal};
use crate::infrastructure::auth::nonce::NonceStore;
use crate::infrastructure::auth::{parse_login_message, recover_signer, sha256_hex, JwtCodec};

/// Successful sign-in: bearer token plus the authenticated address.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub address: String,
}

/// Freshly issued API key; the only moment the key material exists in
/// the clear.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub id: Uuid,
    pub key: String,
    pub name: String,
}

pub struct AuthService {
    wallets: Arc<dyn WalletRepository>,
    api_keys: Arc<dyn ApiKeyRepository>,
    nonces: Arc<NonceStore>,
    jwt: JwtCodec,
    audit: Arc<dyn AuditSink>,
}

impl AuthService {
    pub fn new(
        wallets: Arc<dyn WalletRepository>,
        api_keys: Arc<dyn ApiKeyRepository>,
        nonces: Arc<NonceStore>,
        jwt: JwtCodec,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            wallets,
            api_keys,
            nonces,
            jwt,
            audit,
        }
    }

    /// 16 random bytes, hex-encoded, valid for five minutes, single use.
    pub fn issue_nonce(&self) -> String {
        self.nonces.issue()
    }

    pub async fn verify_login(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<LoginOutcome, ServiceError> {
        let parsed = parse_login_message(message)
            .ok_or_else(|| ServiceError::invalid("invalid sign-in message"))?;

        if !self.nonces.consume(&parsed.nonce) {
            return Err(ServiceError::invalid("invalid or expired nonce"));
        }

        let recovered = recover_signer(message, signature)
            .ok_or_else(|| ServiceError::Unauthorized("invalid signature".to_string()))?;
        if !recovered.eq_ignore_ascii_case(&parsed.address) {
            return Err(ServiceError::Unauthorized("invalid signature".to_string()));
        }

        let wallet = self
            .wallets
            .upsert_by_address(&parsed.address.to_lowercase())
            .await?;

        let token = self
            .jwt
            .issue(wallet.id, &wallet.address)
            .map_err(|e| {
                error!(error = %e, "failed to sign token");
                ServiceError::Unauthorized("failed to generate token".to_string())
            })?;

        self.audit
            .record(
                NewAuditEvent::new(wallet.id, "auth.login")
                    .details(json!({ "address": wallet.address })),
            )
            .await;

        Ok(LoginOutcome {
            token,
            address: wallet.address,
        })
    }

    pub async fn create_api_key(
        &self,
        wallet_id: Uuid,
        name: String,
    ) -> Result<IssuedApiKey, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::invalid("name is required"));
        }

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let key = format!("wdn_{}", hex::encode(bytes));

        let record = ApiKey {
            id: Uuid::new_v4(),
            wallet_id,
            name: name.clone(),
            key_hash: sha256_hex(key.as_bytes()),
            key_prefix: key[..16].to_string(),
            created_at: chrono::Utc::now(),
            last_used_at: None,
            revoked_at: None,
        };
        self.api_keys.insert(&record).await?;

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "api_key.created")
                    .details(json!({ "key_id": record.id, "name": name })),
            )
            .await;

        Ok(IssuedApiKey {
            id: record.id,
            key,
            name,
        })
    }

    pub async fn list_api_keys(&self, wallet_id: Uuid) -> Result<Vec<ApiKey>, ServiceError> {
        Ok(self.api_keys.list_active(wallet_id).await?)
    }

    pub async fn revoke_api_key(&self, wallet_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
        if !self.api_keys.revoke(wallet_id, id).await? {
            return Err(ServiceError::not_found("API key not found"));
        }

        self.audit
            .record(
                NewAuditEvent::new(wallet_id, "api_key.revoked")
                    .details(json!({ "key_id": id })),
            )
            .await;

        Ok(())
    }

    /// Resolve an `X-API-Key` credential. The wallet row supplies the
    /// address so key-authenticated requests can still reach the chain
    /// sync path.
    pub async fn principal_from_api_key(
        &self,
        key: &str,
    ) -> Result<Option<Principal>, ServiceError> {
        let Some(wallet_id) = self.api_keys.resolve(&sha256_hex(key.as_bytes())).await? else {
            return Ok(None);
        };
        let address = self
            .wallets
            .find_by_id(wallet_id)
            .await?
            .map(|w| w.address)
            .unwrap_or_default();
        Ok(Some(Principal { wallet_id, address }))
    }

    /// Resolve a bearer JWT. Stateless: the claims carry both ids.
    pub fn principal_from_token(&self, token: &str) -> Option<Principal> {
        let claims = self.jwt.decode(token)?;
        let wallet_id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Principal {
            wallet_id,
            address: claims.wallet,
        })
    }
}
