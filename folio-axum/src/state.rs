use std::sync::Arc;

use folio_core::{LicenseFeatureGate, TenantResolver};
use folio_usage::{UsageMetricsAggregator, UsageQuotaEnforcer};

use crate::admin::AdminAuthorizer;
use crate::middlewares::QuotaGateSettings;

/// Shared handles for the Folio middleware and routes.
#[derive(Clone)]
pub struct FolioState {
    pub resolver: Arc<TenantResolver>,
    pub quota: Arc<UsageQuotaEnforcer>,
    pub metrics: Arc<UsageMetricsAggregator>,
    pub license: Arc<LicenseFeatureGate>,
    pub admin: Arc<dyn AdminAuthorizer>,
    pub quota_gate: QuotaGateSettings,
}
