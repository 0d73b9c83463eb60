//! # folio-usage
//!
//! Usage accounting for Folio tenants:
//!
//! - [`UsageQuotaEnforcer`]: monthly operation quota, serialized per
//!   (tenant, window) key and never across keys
//! - [`RetentionSweeper`]: periodic purge of expired windows
//! - [`UsageMetricsAggregator`]: lock-free, in-memory invocation counters
//!
//! ```rust
//! use std::sync::Arc;
//! use folio_core::{TenantDescriptor, TenantId, TenantPlan};
//! use folio_usage::{MemoryWindowStore, UsageQuotaEnforcer, UsageSettings};
//!
//! # async fn demo() -> folio_usage::UsageResult<()> {
//! let quota = UsageQuotaEnforcer::new(Arc::new(MemoryWindowStore::new()), &UsageSettings::default());
//! let acme = TenantDescriptor::new(TenantId(1), "acme", TenantPlan::Free)
//!     .with_monthly_operation_limit(250);
//!
//! quota.consume_operation(&acme, 1).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod metrics;
pub mod quota;
pub mod settings;
pub mod store;
pub mod sweeper;
pub mod window;

pub use error::{UsageError, UsageResult};
pub use metrics::{
    TenantUsageMetrics, UsageMetricEntry, UsageMetricsAggregator, UsageMetricsSnapshot,
    GLOBAL_TENANT_SLUG,
};
pub use quota::{TenantUsageReport, UsageQuotaEnforcer};
pub use settings::UsageSettings;
pub use store::{MemoryWindowStore, UsageWindowStore, WindowGuard};
pub use sweeper::RetentionSweeper;
pub use window::{retention_cutoff, window_start_for, UsageWindowRecord, WindowKey};
