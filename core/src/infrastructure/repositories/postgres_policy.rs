// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `PolicyRepository`. Lifecycle transitions are optimistic
//! state-gated updates: `UPDATE … WHERE status = <expected> … RETURNING`.
//! A losing concurrent caller gets no row back and surfaces
//! "not found or bad state".

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::policy::{Policy, PolicyStatus, PolicyVersion};
use crate::domain::repository::{PolicyRepository, PolicyUpdate, RepositoryError};

pub struct PostgresPolicyRepository {
    pool: PgPool,
}

impl PostgresPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POLICY_COLUMNS: &str = "id, wallet_id, name, description, definition, status, version, \
     onchain_hash, created_at, updated_at, activated_at, revoked_at";

fn policy_from_row(row: &PgRow) -> Result<Policy, RepositoryError> {
    let status: String = row.try_get("status")?;
    Ok(Policy {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        definition: row.try_get("definition")?,
        status: PolicyStatus::from_db(&status),
        version: row.try_get("version")?,
        onchain_hash: row.try_get("onchain_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        activated_at: row.try_get("activated_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

#[async_trait]
impl PolicyRepository for PostgresPolicyRepository {
    async fn insert(&self, policy: &Policy) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO policies (
                id, wallet_id, name, description, definition, status,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(policy.id)
        .bind(policy.wallet_id)
        .bind(&policy.name)
        .bind(&policy.description)
        .bind(&policy.definition)
        .bind(policy.status.as_str())
        .bind(policy.version)
        .bind(policy.created_at)
        .bind(policy.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_version(&self, version: &PolicyVersion) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO policy_versions (id, policy_id, version, definition, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(version.id)
        .bind(version.policy_id)
        .bind(version.version)
        .bind(&version.definition)
        .bind(version.created_by)
        .bind(version.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Policy>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {POLICY_COLUMNS} FROM policies \
             WHERE wallet_id = $1 AND status != 'deleted' \
             ORDER BY created_at DESC"
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(policy_from_row).collect()
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {POLICY_COLUMNS} FROM policies \
             WHERE id = $1 AND wallet_id = $2 AND status != 'deleted'"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(policy_from_row).transpose()
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: PolicyUpdate,
    ) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE policies SET \
                name = COALESCE($1, name), \
                description = COALESCE($2, description), \
                definition = COALESCE($3, definition), \
                version = $4, \
                updated_at = NOW() \
             WHERE id = $5 AND wallet_id = $6 AND status != 'deleted' \
             RETURNING {POLICY_COLUMNS}"
        ))
        .bind(update.name)
        .bind(update.description)
        .bind(update.definition)
        .bind(update.version)
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(policy_from_row).transpose()
    }

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE policies SET status = 'deleted', updated_at = NOW() \
             WHERE id = $1 AND wallet_id = $2 AND status != 'deleted'",
        )
        .bind(id)
        .bind(wallet_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_active(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM policies WHERE id = $1 AND wallet_id = $2 AND status = 'active') AS present",
        )
        .bind(id)
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("present")?)
    }

    async fn draft_definition(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query(
            "SELECT definition FROM policies \
             WHERE id = $1 AND wallet_id = $2 AND status = 'draft'",
        )
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_get("definition").map_err(RepositoryError::from))
            .transpose()
    }

    async fn activate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        onchain_hash: &str,
    ) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE policies SET \
                status = 'active', \
                onchain_hash = $1, \
                activated_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $2 AND wallet_id = $3 AND status = 'draft' \
             RETURNING {POLICY_COLUMNS}"
        ))
        .bind(onchain_hash)
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(policy_from_row).transpose()
    }

    async fn revoke(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE policies SET \
                status = 'revoked', \
                revoked_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 AND wallet_id = $2 AND status = 'active' \
             RETURNING {POLICY_COLUMNS}"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(policy_from_row).transpose()
    }

    async fn reactivate(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Policy>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE policies SET \
                status = 'active', \
                revoked_at = NULL, \
                updated_at = NOW() \
             WHERE id = $1 AND wallet_id = $2 AND status = 'revoked' \
             RETURNING {POLICY_COLUMNS}"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(policy_from_row).transpose()
    }

    async fn revoked_onchain_hash(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Option<String>>, RepositoryError> {
        let row = sqlx::query(
            "SELECT onchain_hash FROM policies \
             WHERE id = $1 AND wallet_id = $2 AND status = 'revoked'",
        )
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row.try_get("onchain_hash").map_err(RepositoryError::from))
            .transpose()
    }
}
