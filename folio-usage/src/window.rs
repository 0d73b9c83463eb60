//! Monthly usage windows.
//!
//! A window is a calendar month in UTC, identified by its first day.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use folio_core::{TenantDescriptor, TenantId};
use serde::{Deserialize, Serialize};

/// First day of the UTC month containing `now`.
pub fn window_start_for(now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    today.with_day(1).unwrap_or(today)
}

/// Oldest window start kept when retaining `retention_months` windows,
/// the current one included. Windows starting before it are purged.
pub fn retention_cutoff(now: DateTime<Utc>, retention_months: u32) -> NaiveDate {
    let current = window_start_for(now);
    let keep_back = retention_months.max(1) - 1;
    current
        .checked_sub_months(Months::new(keep_back))
        .unwrap_or(NaiveDate::MIN)
}

/// Uniqueness key of a usage window record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowKey {
    pub tenant_id: TenantId,
    pub window_start: NaiveDate,
}

impl WindowKey {
    pub fn new(tenant_id: TenantId, window_start: NaiveDate) -> Self {
        Self {
            tenant_id,
            window_start,
        }
    }

    pub fn current(tenant_id: TenantId, now: DateTime<Utc>) -> Self {
        Self::new(tenant_id, window_start_for(now))
    }
}

/// Durable operation counter for one tenant and one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWindowRecord {
    pub tenant_id: TenantId,
    pub tenant_slug: String,
    pub window_start: NaiveDate,
    pub operations: u64,
    pub storage_mb_used: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageWindowRecord {
    /// Zeroed record for the tenant's window.
    pub fn empty(tenant: &TenantDescriptor, window_start: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id: tenant.id,
            tenant_slug: tenant.slug.clone(),
            window_start,
            operations: 0,
            storage_mb_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> WindowKey {
        WindowKey::new(self.tenant_id, self.window_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn window_starts_on_the_first_of_the_utc_month() {
        assert_eq!(
            window_start_for(at(2026, 2, 28, 23)),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert_eq!(
            window_start_for(at(2026, 3, 1, 0)),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
    }

    #[test]
    fn cutoff_counts_the_current_window() {
        let now = at(2026, 10, 16, 12);
        assert_eq!(retention_cutoff(now, 1), NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(retention_cutoff(now, 12), NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(retention_cutoff(now, 0), retention_cutoff(now, 1));
    }

    proptest! {
        #[test]
        fn window_start_is_first_day_of_same_month(secs in 0i64..4_102_444_800i64) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let start = window_start_for(now);
            prop_assert_eq!(start.day(), 1);
            prop_assert_eq!(start.month(), now.month());
            prop_assert_eq!(start.year(), now.year());
            prop_assert!(start <= now.date_naive());
        }
    }
}
