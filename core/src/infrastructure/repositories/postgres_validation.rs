// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `ValidationRepository`. Rows are append-only; the
//! rolling-usage read pulls the allowed `action_data.amount` strings for
//! the window and leaves the arbitrary-precision sum to the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{RepositoryError, ValidationRepository};
use crate::domain::validation::ValidationRecord;

pub struct PostgresValidationRepository {
    pool: PgPool,
}

impl PostgresValidationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ValidationRepository for PostgresValidationRepository {
    async fn insert(&self, record: &ValidationRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO validation_requests (
                id, wallet_id, agent_id, action_type, action_data, allowed,
                reason, permission_id, policy_id, latency_ms, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id)
        .bind(record.wallet_id)
        .bind(record.agent_id)
        .bind(&record.action_type)
        .bind(&record.action_data)
        .bind(record.allowed)
        .bind(&record.reason)
        .bind(record.permission_id)
        .bind(record.policy_id)
        .bind(record.latency_ms)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn allowed_amounts_since(
        &self,
        wallet_id: Uuid,
        agent_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT action_data->>'amount' AS amount
            FROM validation_requests
            WHERE wallet_id = $1 AND agent_id = $2 AND allowed = TRUE
              AND created_at >= $3
            "#,
        )
        .bind(wallet_id)
        .bind(agent_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.try_get::<Option<String>, _>("amount").ok().flatten())
            .collect())
    }
}
