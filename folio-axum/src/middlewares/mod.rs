pub mod quota_gate;
pub mod tenant_context;
pub mod usage_metrics;

pub use quota_gate::{QuotaGateLayer, QuotaGateSettings};
pub use tenant_context::{TenantContextLayer, TENANT_RESOLVED_HEADER};
pub use usage_metrics::{operation_name, FilesProcessed, UsageMetricsLayer};
