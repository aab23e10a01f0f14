// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::repository::{RepositoryError, WalletRepository};
use crate::domain::wallet::Wallet;

pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn wallet_from_row(row: &PgRow) -> Result<Wallet, RepositoryError> {
    Ok(Wallet {
        id: row.try_get("id")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
        last_login_at: row.try_get("last_login_at")?,
    })
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn upsert_by_address(&self, address: &str) -> Result<Wallet, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallets (address) VALUES ($1)
            ON CONFLICT (address) DO UPDATE SET last_login_at = NOW()
            RETURNING id, address, created_at, last_login_at
            "#,
        )
        .bind(address)
        .fetch_one(&self.pool)
        .await?;

        wallet_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Wallet>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, address, created_at, last_login_at FROM wallets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }
}
