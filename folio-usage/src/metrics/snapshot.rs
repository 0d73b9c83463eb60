use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use folio_core::TenantId;
use serde::Serialize;

/// Slug used for operations recorded without any tenant.
pub const GLOBAL_TENANT_SLUG: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetricEntry {
    pub operation: String,
    pub invocations: u64,
    pub files_processed: u64,
    pub last_invocation: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUsageMetrics {
    /// `None` for the global pseudo-tenant.
    pub tenant_id: Option<TenantId>,
    pub tenant_slug: String,
    pub total_operations: u64,
    pub total_files_processed: u64,
    pub entries: Vec<UsageMetricEntry>,
}

impl TenantUsageMetrics {
    pub fn is_global(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// Point-in-time view of the aggregator.
///
/// Weakly consistent: a write racing with the traversal may or may not be
/// reflected, and totals may disagree with the per-operation sums by the
/// writes in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetricsSnapshot {
    pub total_operations: u64,
    pub total_files_processed: u64,
    pub generated_at: DateTime<Utc>,
    /// Per-operation rollup across all tenants.
    pub entries: Vec<UsageMetricEntry>,
    pub tenants: Vec<TenantUsageMetrics>,
}

impl UsageMetricsSnapshot {
    pub fn tenant(&self, slug: &str) -> Option<&TenantUsageMetrics> {
        self.tenants
            .iter()
            .find(|t| !t.is_global() && t.tenant_slug.eq_ignore_ascii_case(slug))
    }

    pub fn global_tenant(&self) -> Option<&TenantUsageMetrics> {
        self.tenants.iter().find(|t| t.is_global())
    }

    pub fn entry(&self, operation: &str) -> Option<&UsageMetricEntry> {
        self.entries.iter().find(|e| e.operation == operation)
    }
}

/// Most-invoked first; ties broken by operation name.
pub fn sort_entries(entries: &mut [UsageMetricEntry]) {
    entries.sort_by(|a, b| {
        b.invocations
            .cmp(&a.invocations)
            .then_with(|| a.operation.cmp(&b.operation))
    });
}

/// Case-insensitive slug order with the global pseudo-tenant last.
pub fn sort_tenants(tenants: &mut [TenantUsageMetrics]) {
    tenants.sort_by(compare_tenants);
}

fn compare_tenants(a: &TenantUsageMetrics, b: &TenantUsageMetrics) -> Ordering {
    a.is_global()
        .cmp(&b.is_global())
        .then_with(|| {
            a.tenant_slug
                .to_lowercase()
                .cmp(&b.tenant_slug.to_lowercase())
        })
        .then_with(|| a.tenant_id.cmp(&b.tenant_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tenant(id: Option<u64>, slug: &str) -> TenantUsageMetrics {
        TenantUsageMetrics {
            tenant_id: id.map(TenantId),
            tenant_slug: slug.to_string(),
            total_operations: 0,
            total_files_processed: 0,
            entries: Vec::new(),
        }
    }

    #[test]
    fn global_sorts_after_everything() {
        let mut tenants = vec![
            tenant(None, GLOBAL_TENANT_SLUG),
            tenant(Some(2), "Zeta"),
            tenant(Some(1), "alpha"),
            tenant(Some(3), "zz-top"),
        ];
        sort_tenants(&mut tenants);
        let slugs: Vec<_> = tenants.iter().map(|t| t.tenant_slug.as_str()).collect();
        assert_eq!(slugs, ["alpha", "Zeta", "zz-top", "global"]);
    }

    proptest! {
        #[test]
        fn entries_are_ordered_by_invocations_descending(
            counts in proptest::collection::vec((0u64..50, "[a-c]{1,3}"), 0..40)
        ) {
            let mut entries: Vec<_> = counts
                .into_iter()
                .map(|(invocations, operation)| UsageMetricEntry {
                    operation,
                    invocations,
                    files_processed: 0,
                    last_invocation: None,
                })
                .collect();
            sort_entries(&mut entries);
            for pair in entries.windows(2) {
                prop_assert!(pair[0].invocations >= pair[1].invocations);
                if pair[0].invocations == pair[1].invocations {
                    prop_assert!(pair[0].operation <= pair[1].operation);
                }
            }
        }

        #[test]
        fn tenant_order_is_case_insensitive_with_global_last(
            slugs in proptest::collection::vec("[a-zA-Z]{1,6}", 0..20)
        ) {
            let mut tenants: Vec<_> = slugs
                .iter()
                .enumerate()
                .map(|(i, slug)| tenant(Some(i as u64), slug))
                .collect();
            tenants.push(tenant(None, GLOBAL_TENANT_SLUG));
            sort_tenants(&mut tenants);

            prop_assert!(tenants.last().unwrap().is_global());
            for pair in tenants[..tenants.len() - 1].windows(2) {
                prop_assert!(pair[0].tenant_slug.to_lowercase() <= pair[1].tenant_slug.to_lowercase());
            }
        }
    }
}
