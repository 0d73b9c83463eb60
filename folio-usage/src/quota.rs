//! Monthly operation quota.
//!
//! `consume_operation` runs entirely under the lock of one
//! (tenant, window) key: read or create the record, check the projected
//! count against the tenant's limit, then write. A rejected call never
//! writes. A successful charge is never refunded, even when the operation it
//! paid for later fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use folio_core::{TenantDescriptor, TenantId};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{UsageError, UsageResult};
use crate::settings::UsageSettings;
use crate::store::UsageWindowStore;
use crate::window::{UsageWindowRecord, WindowKey};

pub struct UsageQuotaEnforcer {
    store: Arc<dyn UsageWindowStore>,
    lock_timeout: Duration,
}

impl UsageQuotaEnforcer {
    pub fn new(store: Arc<dyn UsageWindowStore>, settings: &UsageSettings) -> Self {
        Self {
            store,
            lock_timeout: settings.lock_timeout(),
        }
    }

    pub fn store(&self) -> &Arc<dyn UsageWindowStore> {
        &self.store
    }

    /// Charge `count` operations to the tenant's current window.
    pub async fn consume_operation(&self, tenant: &TenantDescriptor, count: u64) -> UsageResult<()> {
        self.consume_operation_at(tenant, count, Utc::now()).await
    }

    /// Same as [`Self::consume_operation`] with an explicit clock.
    pub async fn consume_operation_at(
        &self,
        tenant: &TenantDescriptor,
        count: u64,
        now: DateTime<Utc>,
    ) -> UsageResult<()> {
        if count == 0 {
            return Ok(());
        }

        let key = WindowKey::current(tenant.id, now);
        let guard = match self.store.lock_window(key, self.lock_timeout).await {
            Ok(guard) => guard,
            Err(err) => {
                if let UsageError::LockContention { waited_ms, .. } = &err {
                    warn!(
                        "Gave up waiting {} ms for usage window {} of tenant '{}'",
                        waited_ms, key.window_start, tenant.slug
                    );
                }
                return Err(err);
            }
        };

        let current = guard.record().map_or(0, |r| r.operations);
        let projected = current.saturating_add(count);
        if let Some(limit) = tenant.monthly_operation_limit {
            if projected > limit {
                info!(
                    "Tenant '{}' exceeded monthly quota: limit {}, attempted {}",
                    tenant.slug, limit, projected
                );
                return Err(UsageError::QuotaExceeded {
                    limit,
                    attempted: projected,
                });
            }
        }

        let mut record = guard
            .record()
            .cloned()
            .unwrap_or_else(|| UsageWindowRecord::empty(tenant, key.window_start, now));
        record.operations = projected;
        record.tenant_slug = tenant.slug.clone();
        record.updated_at = now;
        guard.commit(record)
    }

    /// The tenant's record for the current window, if any operation was
    /// charged to it yet.
    pub async fn current_usage(&self, tenant: &TenantDescriptor) -> UsageResult<Option<UsageWindowRecord>> {
        self.current_usage_at(tenant, Utc::now()).await
    }

    /// Waits for a held window no longer than a charge would.
    pub async fn current_usage_at(
        &self,
        tenant: &TenantDescriptor,
        now: DateTime<Utc>,
    ) -> UsageResult<Option<UsageWindowRecord>> {
        let key = WindowKey::current(tenant.id, now);
        match tokio::time::timeout(self.lock_timeout, self.store.find(key)).await {
            Ok(found) => found,
            Err(_) => {
                warn!(
                    "Gave up reading usage window {} of tenant '{}' after {} ms",
                    key.window_start,
                    tenant.slug,
                    self.lock_timeout.as_millis()
                );
                Err(UsageError::LockContention {
                    tenant_id: key.tenant_id,
                    window_start: key.window_start,
                    waited_ms: u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    pub async fn usage_report(&self, tenant: &TenantDescriptor) -> UsageResult<TenantUsageReport> {
        let now = Utc::now();
        let record = self.current_usage_at(tenant, now).await?;
        Ok(TenantUsageReport::new(tenant, WindowKey::current(tenant.id, now).window_start, record))
    }
}

/// Current-window usage as reported to the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUsageReport {
    pub tenant: String,
    pub tenant_id: TenantId,
    pub window_start: NaiveDate,
    pub operations: u64,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
}

impl TenantUsageReport {
    pub fn new(
        tenant: &TenantDescriptor,
        window_start: NaiveDate,
        record: Option<UsageWindowRecord>,
    ) -> Self {
        let operations = record.map_or(0, |r| r.operations);
        let limit = tenant.monthly_operation_limit;
        Self {
            tenant: tenant.slug.clone(),
            tenant_id: tenant.id,
            window_start,
            operations,
            limit,
            remaining: limit.map(|l| l.saturating_sub(operations)),
        }
    }
}
