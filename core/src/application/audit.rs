// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Read side of the audit trail: paginated, filterable listing and bulk
//! export. The write side lives in the infrastructure audit logger.

use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::domain::audit::AuditRecord;
use crate::domain::repository::{AuditFilter, AuditRepository};

/// Hard cap on export size.
pub const EXPORT_LIMIT: i64 = 10_000;

pub struct AuditQueryService {
    audit: Arc<dyn AuditRepository>,
}

impl AuditQueryService {
    pub fn new(audit: Arc<dyn AuditRepository>) -> Self {
        Self { audit }
    }

    /// Newest-first page plus the wallet's total event count.
    pub async fn list(
        &self,
        wallet_id: Uuid,
        filter: AuditFilter,
    ) -> Result<(Vec<AuditRecord>, i64), ServiceError> {
        Ok(self.audit.list(wallet_id, &filter).await?)
    }

    pub async fn export(
        &self,
        wallet_id: Uuid,
        start: Option<chrono::DateTime<chrono::Utc>>,
        end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<AuditRecord>, ServiceError> {
        Ok(self.audit.export(wallet_id, start, end, EXPORT_LIMIT).await?)
    }
}
