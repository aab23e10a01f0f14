// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `AgentRepository`. Soft-deletion is `status = 'deleted'`;
//! every statement filters by `wallet_id` and excludes deleted rows from
//! reads and transitions.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentStatus, EnforcementLevel, WalletType};
use crate::domain::repository::{AgentRepository, AgentUpdate, RepositoryError};

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const AGENT_COLUMNS: &str = "id, wallet_id, name, description, agent_address, status, \
     wallet_type, enforcement_level, chain_id, onchain_registry_id, onchain_registered_at, \
     created_at, updated_at";

fn agent_from_row(row: &PgRow) -> Result<Agent, RepositoryError> {
    let status: String = row.try_get("status")?;
    let wallet_type: String = row.try_get("wallet_type")?;
    let enforcement: String = row.try_get("enforcement_level")?;

    Ok(Agent {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        agent_address: row.try_get("agent_address")?,
        status: AgentStatus::from_db(&status),
        wallet_type: WalletType::from_db(&wallet_type),
        enforcement_level: EnforcementLevel::from_db(&enforcement),
        chain_id: row.try_get("chain_id")?,
        onchain_registry_id: row.try_get("onchain_registry_id")?,
        onchain_registered_at: row.try_get("onchain_registered_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn insert(&self, agent: &Agent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, wallet_id, name, description, agent_address, status,
                wallet_type, enforcement_level, chain_id, onchain_registry_id,
                onchain_registered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(agent.id)
        .bind(agent.wallet_id)
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(&agent.agent_address)
        .bind(agent.status.as_str())
        .bind(agent.wallet_type.as_str())
        .bind(agent.enforcement_level.as_str())
        .bind(agent.chain_id)
        .bind(&agent.onchain_registry_id)
        .bind(agent.onchain_registered_at)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents \
             WHERE wallet_id = $1 AND status != 'deleted' \
             ORDER BY created_at DESC"
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(agent_from_row).collect()
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents \
             WHERE id = $1 AND wallet_id = $2 AND status != 'deleted'"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: AgentUpdate,
    ) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE agents SET \
                name = COALESCE($1, name), \
                description = COALESCE($2, description), \
                agent_address = COALESCE($3, agent_address), \
                status = COALESCE($4, status), \
                updated_at = NOW() \
             WHERE id = $5 AND wallet_id = $6 AND status != 'deleted' \
             RETURNING {AGENT_COLUMNS}"
        ))
        .bind(update.name)
        .bind(update.description)
        .bind(update.agent_address)
        .bind(update.status.map(|s| s.as_str()))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn soft_delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE agents SET status = 'deleted', updated_at = NOW() \
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
            "SELECT EXISTS(SELECT 1 FROM agents WHERE id = $1 AND wallet_id = $2 AND status = 'active') AS present",
        )
        .bind(id)
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("present")?)
    }

    async fn set_onchain_registration(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        registry_id: &str,
    ) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE agents SET \
                onchain_registry_id = $1, \
                onchain_registered_at = NOW(), \
                updated_at = NOW() \
             WHERE id = $2 AND wallet_id = $3 AND status != 'deleted' \
             RETURNING {AGENT_COLUMNS}"
        ))
        .bind(registry_id)
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(agent_from_row).transpose()
    }

    async fn registry_keys(
        &self,
        wallet_id: Uuid,
    ) -> Result<Vec<(Uuid, Option<String>)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, onchain_registry_id FROM agents \
             WHERE wallet_id = $1 AND status != 'deleted'",
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get("id")?,
                    row.try_get("onchain_registry_id")?,
                ))
            })
            .collect()
    }
}
