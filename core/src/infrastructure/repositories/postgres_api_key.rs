// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{ApiKeyRepository, RepositoryError};
use crate::domain::wallet::ApiKey;

pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn api_key_from_row(row: &PgRow) -> Result<ApiKey, RepositoryError> {
    Ok(ApiKey {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        name: row.try_get("name")?,
        key_hash: row.try_get("key_hash")?,
        key_prefix: row.try_get("key_prefix")?,
        created_at: row.try_get("created_at")?,
        last_used_at: row.try_get("last_used_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn insert(&self, key: &ApiKey) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, wallet_id, name, key_hash, key_prefix, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(key.id)
        .bind(key.wallet_id)
        .bind(&key.name)
        .bind(&key.key_hash)
        .bind(&key.key_prefix)
        .bind(key.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_active(&self, wallet_id: Uuid) -> Result<Vec<ApiKey>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, name, key_hash, key_prefix, created_at, last_used_at, revoked_at
            FROM api_keys
            WHERE wallet_id = $1 AND revoked_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(api_key_from_row).collect()
    }

    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys SET revoked_at = NOW()
            WHERE id = $1 AND wallet_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(wallet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn resolve(&self, key_hash: &str) -> Result<Option<Uuid>, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE api_keys SET last_used_at = NOW()
            WHERE key_hash = $1 AND revoked_at IS NULL
            RETURNING wallet_id
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_get("wallet_id").map_err(RepositoryError::from))
            .transpose()
    }
}
