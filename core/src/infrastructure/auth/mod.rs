// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Auth plumbing: JWT codec, API-key hashing, and sign-in-with-wallet
//! message verification via EIP-191 signature recovery.

pub mod nonce;

use alloy::primitives::Signature;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Claims carried by the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Wallet (tenant) id.
    pub sub: String,
    /// Wallet address, lowercase hex.
    pub wallet: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 token mint/verify over the server secret.
#[derive(Clone)]
pub struct JwtCodec {
    secret: String,
    ttl: Duration,
}

impl JwtCodec {
    pub fn new(secret: impl Into<String>, expiration_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::hours(expiration_hours),
        }
    }

    pub fn issue(&self, wallet_id: Uuid, address: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: wallet_id.to_string(),
            wallet: address.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn decode(&self, token: &str) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .ok()
    }
}

/// sha256 hex digest; the only form in which API keys are persisted.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The fields pulled out of a sign-in-with-wallet message: the account
/// address on its own line and the issued nonce on a `Nonce:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginMessage {
    pub address: String,
    pub nonce: String,
}

pub fn parse_login_message(message: &str) -> Option<LoginMessage> {
    let mut address = None;
    let mut nonce = None;

    for line in message.lines() {
        let line = line.trim();
        if address.is_none() && line.len() == 42 && line.starts_with("0x") {
            address = Some(line.to_string());
        }
        if let Some(rest) = line.strip_prefix("Nonce:") {
            nonce = Some(rest.trim().to_string());
        }
    }

    Some(LoginMessage {
        address: address?,
        nonce: nonce.filter(|n| !n.is_empty())?,
    })
}

/// Recover the EIP-191 personal-sign signer of `message`. Returns the
/// lowercase `0x` address, or `None` for malformed signatures.
pub fn recover_signer(message: &str, signature: &str) -> Option<String> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw).ok()?;
    let signature = Signature::from_raw(&bytes).ok()?;
    let address = signature.recover_address_from_msg(message.as_bytes()).ok()?;
    Some(format!("0x{}", hex::encode(address.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    #[test]
    fn test_jwt_round_trip() {
        let codec = JwtCodec::new("unit-test-secret", 1);
        let wallet_id = Uuid::new_v4();
        let token = codec.issue(wallet_id, "0xabc").unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, wallet_id.to_string());
        assert_eq!(claims.wallet, "0xabc");
        assert!(claims.exp > claims.iat);

        assert!(codec.decode("not-a-token").is_none());
        let other = JwtCodec::new("different-secret", 1);
        assert!(other.decode(&token).is_none());
    }

    #[test]
    fn test_parse_login_message() {
        let message = "warden.example wants you to sign in with your Ethereum account:\n\
                       0x1111111111111111111111111111111111111111\n\
                       \n\
                       URI: https://warden.example\n\
                       Nonce: deadbeef00\n";
        let parsed = parse_login_message(message).unwrap();
        assert_eq!(parsed.address, "0x1111111111111111111111111111111111111111");
        assert_eq!(parsed.nonce, "deadbeef00");

        assert!(parse_login_message("no address, no nonce").is_none());
    }

    #[test]
    fn test_recover_signer_matches_signing_key() {
        let signer = PrivateKeySigner::random();
        let message = "sign me";
        let signature = signer.sign_message_sync(message.as_bytes()).unwrap();
        let signature_hex = format!("0x{}", hex::encode(signature.as_bytes()));

        let recovered = recover_signer(message, &signature_hex).unwrap();
        assert_eq!(
            recovered,
            format!("0x{}", hex::encode(signer.address().as_slice()))
        );

        // A different message must not recover the same address.
        let other = recover_signer("tampered", &signature_hex).unwrap();
        assert_ne!(other, recovered);
    }
}
