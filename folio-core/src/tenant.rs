//! Core multi-tenant types for Folio.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable numeric tenant identifier assigned by the tenant store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Commercial plan a tenant is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantPlan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl TenantPlan {
    /// Operations allowed per calendar month. `None` means unmetered.
    pub fn monthly_operation_limit(&self) -> Option<u64> {
        match self {
            TenantPlan::Free => Some(250),
            TenantPlan::Pro => Some(5_000),
            TenantPlan::Enterprise => None,
        }
    }

    /// Storage reserved for generated artifacts, in megabytes.
    pub fn storage_limit_mb(&self) -> Option<u64> {
        match self {
            TenantPlan::Free => Some(512),
            TenantPlan::Pro => Some(10_240),
            TenantPlan::Enterprise => None,
        }
    }

    /// Fill limits the tenant does not set itself (missing or zero).
    pub fn apply_defaults(&self, tenant: &mut Tenant) {
        if tenant.monthly_operation_limit.map_or(true, |l| l == 0) {
            if let Some(limit) = self.monthly_operation_limit() {
                tenant.monthly_operation_limit = Some(limit);
            }
        }
        if tenant.storage_limit_mb.map_or(true, |l| l == 0) {
            if let Some(limit) = self.storage_limit_mb() {
                tenant.storage_limit_mb = Some(limit);
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantPlan::Free => "FREE",
            TenantPlan::Pro => "PRO",
            TenantPlan::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for TenantPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(TenantPlan::Free),
            "PRO" => Ok(TenantPlan::Pro),
            "ENTERPRISE" => Ok(TenantPlan::Enterprise),
            other => Err(format!("unknown tenant plan: {other}")),
        }
    }
}

/// A tenant as stored by a [`crate::TenantStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub slug: String,
    pub display_name: String,
    pub plan: TenantPlan,
    pub monthly_operation_limit: Option<u64>,
    pub storage_limit_mb: Option<u64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable per-request view of the tenant a request runs for.
///
/// Built once by the resolver and shared behind an `Arc`; nothing mutates
/// it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDescriptor {
    pub id: TenantId,
    pub slug: String,
    pub plan: TenantPlan,
    pub monthly_operation_limit: Option<u64>,
    pub storage_limit_mb: Option<u64>,
}

impl TenantDescriptor {
    pub fn new(id: TenantId, slug: impl Into<String>, plan: TenantPlan) -> Self {
        Self {
            id,
            slug: slug.into(),
            plan,
            monthly_operation_limit: None,
            storage_limit_mb: None,
        }
    }

    pub fn with_monthly_operation_limit(mut self, limit: u64) -> Self {
        self.monthly_operation_limit = Some(limit);
        self
    }

    pub fn is_metered(&self) -> bool {
        self.monthly_operation_limit.is_some()
    }
}

impl From<&Tenant> for TenantDescriptor {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            slug: tenant.slug.clone(),
            plan: tenant.plan,
            monthly_operation_limit: tenant.monthly_operation_limit,
            storage_limit_mb: tenant.storage_limit_mb,
        }
    }
}

/// Trim + lowercase. Returns `None` for blank input.
pub fn normalize_slug(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
