// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `PermissionRepository`. The decision-path query
//! (`active_bindings`) joins to the active policy and orders
//! `created_at DESC, id ASC` so evaluation order is deterministic for a
//! fixed store state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::agent::WalletType;
use crate::domain::permission::{Permission, PermissionStatus};
use crate::domain::repository::{
    MintContext, PermissionBinding, PermissionFilter, PermissionRepository, RepositoryError,
};

pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PERMISSION_COLUMNS: &str = "id, wallet_id, agent_id, policy_id, status, valid_from, \
     valid_until, onchain_token_id, minted_at, created_at, revoked_at";

fn permission_from_row(row: &PgRow) -> Result<Permission, RepositoryError> {
    let status: String = row.try_get("status")?;
    Ok(Permission {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        agent_id: row.try_get("agent_id")?,
        policy_id: row.try_get("policy_id")?,
        status: PermissionStatus::from_db(&status),
        valid_from: row.try_get("valid_from")?,
        valid_until: row.try_get("valid_until")?,
        onchain_token_id: row.try_get("onchain_token_id")?,
        minted_at: row.try_get("minted_at")?,
        created_at: row.try_get("created_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn insert(&self, permission: &Permission) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO permissions (
                id, wallet_id, agent_id, policy_id, status, valid_from,
                valid_until, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id)
        .bind(permission.wallet_id)
        .bind(permission.agent_id)
        .bind(permission.policy_id)
        .bind(permission.status.as_str())
        .bind(permission.valid_from)
        .bind(permission.valid_until)
        .bind(permission.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        wallet_id: Uuid,
        filter: PermissionFilter,
    ) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions \
             WHERE wallet_id = $1 \
             AND ($2::uuid IS NULL OR agent_id = $2) \
             AND ($3::uuid IS NULL OR policy_id = $3) \
             ORDER BY created_at DESC"
        ))
        .bind(wallet_id)
        .bind(filter.agent_id)
        .bind(filter.policy_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(permission_from_row).collect()
    }

    async fn find(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions \
             WHERE id = $1 AND wallet_id = $2"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    async fn revoke(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permission>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE permissions SET status = 'revoked', revoked_at = NOW() \
             WHERE id = $1 AND wallet_id = $2 AND status = 'active' \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    async fn mint_context(
        &self,
        wallet_id: Uuid,
        id: Uuid,
    ) -> Result<Option<MintContext>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT p.agent_id, p.policy_id, p.valid_from, p.valid_until,
                   pol.definition, pol.onchain_hash,
                   a.onchain_registry_id, a.wallet_type, a.chain_id
            FROM permissions p
            JOIN policies pol ON pol.id = p.policy_id
            JOIN agents a ON a.id = p.agent_id
            WHERE p.id = $1 AND p.wallet_id = $2
              AND p.status = 'active' AND p.minted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<MintContext, RepositoryError> {
            let wallet_type: String = row.try_get("wallet_type")?;
            Ok(MintContext {
                agent_id: row.try_get("agent_id")?,
                policy_id: row.try_get("policy_id")?,
                valid_from: row.try_get("valid_from")?,
                valid_until: row.try_get("valid_until")?,
                definition: row.try_get("definition")?,
                policy_onchain_hash: row.try_get("onchain_hash")?,
                agent_registry_id: row.try_get("onchain_registry_id")?,
                agent_wallet_type: WalletType::from_db(&wallet_type),
                agent_chain_id: row.try_get("chain_id")?,
            })
        })
        .transpose()
    }

    async fn record_mint(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        token_id: &str,
    ) -> Result<Option<Permission>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE permissions SET onchain_token_id = $1, minted_at = NOW() \
             WHERE id = $2 AND wallet_id = $3 AND status = 'active' AND minted_at IS NULL \
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(token_id)
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    async fn active_bindings(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PermissionBinding>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.policy_id, pol.definition
            FROM permissions p
            JOIN policies pol ON pol.id = p.policy_id
            WHERE p.wallet_id = $1 AND p.agent_id = $2
              AND p.status = 'active' AND pol.status = 'active'
              AND p.valid_from <= $3
              AND (p.valid_until IS NULL OR p.valid_until > $3)
            ORDER BY p.created_at DESC, p.id ASC
            "#,
        )
        .bind(wallet_id)
        .bind(agent_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(PermissionBinding {
                    permission_id: row.try_get("id")?,
                    policy_id: row.try_get("policy_id")?,
                    definition: row.try_get("definition")?,
                })
            })
            .collect()
    }
}
