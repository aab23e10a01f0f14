// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL `WebhookRepository`. Listing clears the secret column so
//! it can only surface on create and direct get; delivery reads keep it.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{RepositoryError, WebhookRepository, WebhookUpdate};
use crate::domain::webhook::Webhook;

pub struct PostgresWebhookRepository {
    pool: PgPool,
}

impl PostgresWebhookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const WEBHOOK_COLUMNS: &str =
    "id, wallet_id, name, url, secret, events, active, created_at, updated_at, last_call_at";

fn webhook_from_row(row: &PgRow) -> Result<Webhook, RepositoryError> {
    Ok(Webhook {
        id: row.try_get("id")?,
        wallet_id: row.try_get("wallet_id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        secret: row.try_get("secret")?,
        events: row.try_get("events")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_call_at: row.try_get("last_call_at")?,
    })
}

#[async_trait]
impl WebhookRepository for PostgresWebhookRepository {
    async fn insert(&self, webhook: &Webhook) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO webhooks (
                id, wallet_id, name, url, secret, events, active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(webhook.id)
        .bind(webhook.wallet_id)
        .bind(&webhook.name)
        .bind(&webhook.url)
        .bind(&webhook.secret)
        .bind(&webhook.events)
        .bind(webhook.active)
        .bind(webhook.created_at)
        .bind(webhook.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE wallet_id = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let mut webhook = webhook_from_row(row)?;
                webhook.secret.clear();
                Ok(webhook)
            })
            .collect()
    }

    async fn find(&self, wallet_id: Uuid, id: Uuid) -> Result<Option<Webhook>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE id = $1 AND wallet_id = $2"
        ))
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(webhook_from_row).transpose()
    }

    async fn update(
        &self,
        wallet_id: Uuid,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<Option<Webhook>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE webhooks SET \
                name = COALESCE($1, name), \
                url = COALESCE($2, url), \
                events = COALESCE($3, events), \
                active = COALESCE($4, active), \
                updated_at = NOW() \
             WHERE id = $5 AND wallet_id = $6 \
             RETURNING {WEBHOOK_COLUMNS}"
        ))
        .bind(update.name)
        .bind(update.url)
        .bind(update.events)
        .bind(update.active)
        .bind(id)
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(webhook_from_row).transpose()
    }

    async fn delete(&self, wallet_id: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1 AND wallet_id = $2")
            .bind(id)
            .bind(wallet_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn active_for_wallet(&self, wallet_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {WEBHOOK_COLUMNS} FROM webhooks \
             WHERE wallet_id = $1 AND active = TRUE"
        ))
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(webhook_from_row).collect()
    }

    async fn touch_last_call(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE webhooks SET last_call_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
