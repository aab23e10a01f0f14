// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `AuditRepository`. Insert-and-read-only: there is no
//! update or delete statement in this file on purpose.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::audit::AuditRecord;
use crate::domain::repository::{AuditFilter, AuditRepository, RepositoryError};

pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const AUDIT_COLUMNS: &str = "id, wallet_id, agent_id, policy_id, permission_id, event_type, \
     details, ip_address, user_agent, created_at";

fn audit_from_row(row: &PgRow) -> Result<AuditRecord, RepositoryError> {
    Ok(AuditRecord {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        agent_id: row.try_get("agent_id")?,
        policy_id: row.try_get("policy_id")?,
        permission_id: row.try_get("permission_id")?,
        event_type: row.try_get("event_type")?,
        details: row.try_get("details")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, wallet_id, agent_id, policy_id, permission_id,
                event_type, details, ip_address, user_agent, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.wallet_id)
        .bind(record.agent_id)
        .bind(record.policy_id)
        .bind(record.permission_id)
        .bind(&record.event_type)
        .bind(&record.details)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(
        &self,
        wallet_id: Uuid,
        filter: &AuditFilter,
    ) -> Result<(Vec<AuditRecord>, i64), RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs \
             WHERE wallet_id = $1 \
             AND ($2::text IS NULL OR event_type = $2) \
             AND ($3::uuid IS NULL OR agent_id = $3) \
             AND ($4::uuid IS NULL OR policy_id = $4) \
             AND ($5::timestamptz IS NULL OR created_at >= $5) \
             AND ($6::timestamptz IS NULL OR created_at <= $6) \
             ORDER BY created_at DESC \
             LIMIT $7 OFFSET $8"
        ))
        .bind(wallet_id)
        .bind(&filter.event_type)
        .bind(filter.agent_id)
        .bind(filter.policy_id)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(audit_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM audit_logs WHERE wallet_id = $1")
            .bind(wallet_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        Ok((records, total))
    }

    async fn export(
        &self,
        wallet_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs \
             WHERE wallet_id = $1 \
             AND ($2::timestamptz IS NULL OR created_at >= $2) \
             AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at DESC \
             LIMIT $4"
        ))
        .bind(wallet_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(audit_from_row).collect()
    }
}
