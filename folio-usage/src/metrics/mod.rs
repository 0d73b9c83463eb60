//! In-memory usage metrics.
//!
//! Counters are atomics inside a sharded concurrent map, two levels deep:
//! tenant -> operation -> stats, plus global totals. Writers never take a
//! lock wider than one map shard. Nothing here is durable.

pub mod snapshot;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use folio_core::{TenantContext, TenantDescriptor, TenantId};
use tracing::{debug, info};

pub use snapshot::{
    sort_entries, sort_tenants, TenantUsageMetrics, UsageMetricEntry, UsageMetricsSnapshot,
    GLOBAL_TENANT_SLUG,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TenantKey {
    id: Option<TenantId>,
    slug: String,
}

impl TenantKey {
    fn global() -> Self {
        Self {
            id: None,
            slug: GLOBAL_TENANT_SLUG.to_string(),
        }
    }
}

impl From<&TenantDescriptor> for TenantKey {
    fn from(tenant: &TenantDescriptor) -> Self {
        Self {
            id: Some(tenant.id),
            slug: tenant.slug.clone(),
        }
    }
}

#[derive(Default)]
struct OperationStats {
    invocations: AtomicU64,
    files_processed: AtomicU64,
    /// Unix millis; 0 = never.
    last_invocation_ms: AtomicI64,
}

impl OperationStats {
    fn last_invocation(&self) -> Option<DateTime<Utc>> {
        match self.last_invocation_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }
}

#[derive(Default)]
struct TenantStats {
    total_operations: AtomicU64,
    total_files_processed: AtomicU64,
    operations: DashMap<String, Arc<OperationStats>>,
}

impl TenantStats {
    fn operation(&self, name: &str) -> Arc<OperationStats> {
        if let Some(stats) = self.operations.get(name) {
            return Arc::clone(stats.value());
        }
        Arc::clone(self.operations.entry(name.to_string()).or_default().value())
    }
}

/// Process-wide usage counters.
#[derive(Default)]
pub struct UsageMetricsAggregator {
    tenants: DashMap<TenantKey, Arc<TenantStats>>,
    total_operations: AtomicU64,
    total_files_processed: AtomicU64,
}

impl UsageMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one invocation of `operation` touching `files` files.
    ///
    /// Attributed to `tenant`, else to the tenant bound in
    /// [`TenantContext`], else to the global pseudo-tenant. A blank
    /// operation name is ignored.
    pub fn record(&self, operation: &str, files: u64, tenant: Option<&TenantDescriptor>) {
        let operation = operation.trim();
        if operation.is_empty() {
            debug!("Ignoring usage record with blank operation name");
            return;
        }

        self.total_operations.fetch_add(1, Ordering::Relaxed);
        self.total_files_processed.fetch_add(files, Ordering::Relaxed);

        let key = match tenant {
            Some(tenant) => TenantKey::from(tenant),
            None => TenantContext::current()
                .map(|bound| TenantKey::from(bound.as_ref()))
                .unwrap_or_else(TenantKey::global),
        };
        let tenant_stats = self.tenant_stats(key);
        tenant_stats.total_operations.fetch_add(1, Ordering::Relaxed);
        tenant_stats
            .total_files_processed
            .fetch_add(files, Ordering::Relaxed);

        let stats = tenant_stats.operation(operation);
        stats.invocations.fetch_add(1, Ordering::Relaxed);
        stats.files_processed.fetch_add(files, Ordering::Relaxed);
        stats
            .last_invocation_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Weakly consistent traversal; see [`UsageMetricsSnapshot`].
    pub fn snapshot(&self) -> UsageMetricsSnapshot {
        let mut rollup: HashMap<String, UsageMetricEntry> = HashMap::new();
        let mut tenants = Vec::with_capacity(self.tenants.len());

        for tenant in self.tenants.iter() {
            let stats = tenant.value();
            let mut entries = Vec::with_capacity(stats.operations.len());

            for op in stats.operations.iter() {
                let entry = UsageMetricEntry {
                    operation: op.key().clone(),
                    invocations: op.invocations.load(Ordering::Relaxed),
                    files_processed: op.files_processed.load(Ordering::Relaxed),
                    last_invocation: op.last_invocation(),
                };

                let global = rollup
                    .entry(entry.operation.clone())
                    .or_insert_with(|| UsageMetricEntry {
                        operation: entry.operation.clone(),
                        invocations: 0,
                        files_processed: 0,
                        last_invocation: None,
                    });
                global.invocations += entry.invocations;
                global.files_processed += entry.files_processed;
                global.last_invocation = global.last_invocation.max(entry.last_invocation);

                entries.push(entry);
            }
            sort_entries(&mut entries);

            tenants.push(TenantUsageMetrics {
                tenant_id: tenant.key().id,
                tenant_slug: tenant.key().slug.clone(),
                total_operations: stats.total_operations.load(Ordering::Relaxed),
                total_files_processed: stats.total_files_processed.load(Ordering::Relaxed),
                entries,
            });
        }
        sort_tenants(&mut tenants);

        let mut entries: Vec<_> = rollup.into_values().collect();
        sort_entries(&mut entries);

        UsageMetricsSnapshot {
            total_operations: self.total_operations.load(Ordering::Relaxed),
            total_files_processed: self.total_files_processed.load(Ordering::Relaxed),
            generated_at: Utc::now(),
            entries,
            tenants,
        }
    }

    /// Drop every counter. A write racing with this may be lost.
    pub fn reset(&self) {
        self.tenants.clear();
        self.total_operations.store(0, Ordering::Relaxed);
        self.total_files_processed.store(0, Ordering::Relaxed);
        info!("Usage metrics reset");
    }

    fn tenant_stats(&self, key: TenantKey) -> Arc<TenantStats> {
        if let Some(stats) = self.tenants.get(&key) {
            return Arc::clone(stats.value());
        }
        Arc::clone(self.tenants.entry(key).or_default().value())
    }
}
