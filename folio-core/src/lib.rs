//! folio-core: framework-agnostic multi-tenancy core for Folio.

pub mod config;
pub mod context;
pub mod errors;
pub mod license;
pub mod resolver;
pub mod store;
pub mod tenant;

pub use config::{ConfigSnapshot, FolioConfig};
pub use context::TenantContext;
pub use errors::{ErrorKind, FolioError, FolioResult};
pub use license::{
    CustomMetadataSettings, EnterpriseFeatureSettings, LicenseFeatureGate, LicenseLevel,
    LicenseStatus, PremiumFeature, PremiumSettings, ProFeatureSettings, Toggle,
};
pub use resolver::{RequestSignals, TenancySettings, TenantResolver, TENANT_QUERY_PARAM};
pub use store::{MemoryTenantStore, TenantLimits, TenantStore};
pub use tenant::{normalize_slug, Tenant, TenantDescriptor, TenantId, TenantPlan};
