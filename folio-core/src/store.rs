//! Tenant storage seam.
//!
//! The resolver only ever reads through [`TenantStore`]. The in-memory
//! implementation backs tests and single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;

use crate::errors::{FolioError, FolioResult};
use crate::resolver::TenancySettings;
use crate::tenant::{normalize_slug, Tenant, TenantId, TenantPlan};

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Look a tenant up by (already normalized) slug.
    async fn find_by_slug(&self, slug: &str) -> FolioResult<Option<Tenant>>;

    async fn find_by_id(&self, id: TenantId) -> FolioResult<Option<Tenant>>;

    /// Return the default tenant, provisioning it from `settings` if absent.
    async fn get_or_create_default(&self, settings: &TenancySettings) -> FolioResult<Tenant>;
}

/// Limits for a tenant created through [`MemoryTenantStore::create_tenant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantLimits {
    pub monthly_operation_limit: Option<u64>,
    pub storage_limit_mb: Option<u64>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TenantId, Tenant>,
    slug_index: HashMap<String, TenantId>,
    next_id: u64,
}

impl Tables {
    fn insert(&mut self, mut tenant: Tenant) -> Tenant {
        self.next_id += 1;
        tenant.id = TenantId(self.next_id);
        self.slug_index.insert(tenant.slug.clone(), tenant.id);
        self.by_id.insert(tenant.id, tenant.clone());
        tenant
    }

    fn by_slug(&self, slug: &str) -> Option<&Tenant> {
        self.slug_index.get(slug).and_then(|id| self.by_id.get(id))
    }
}

/// In-memory tenant store.
#[derive(Default)]
pub struct MemoryTenantStore {
    tables: RwLock<Tables>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tenant. Missing limits are filled from the plan defaults.
    pub fn create_tenant(
        &self,
        slug: &str,
        display_name: impl Into<String>,
        plan: TenantPlan,
        limits: TenantLimits,
    ) -> FolioResult<Tenant> {
        let slug = normalize_slug(slug)
            .ok_or_else(|| FolioError::bad_request("Tenant slug must not be blank").into_anyhow())?;

        let mut tables = self.tables.write();
        if tables.slug_index.contains_key(&slug) {
            return Err(
                FolioError::conflict(format!("Tenant slug already exists: {slug}")).into_anyhow(),
            );
        }

        let now = Utc::now();
        let mut tenant = Tenant {
            id: TenantId(0),
            slug,
            display_name: display_name.into(),
            plan,
            monthly_operation_limit: limits.monthly_operation_limit,
            storage_limit_mb: limits.storage_limit_mb,
            active: true,
            created_at: now,
            updated_at: now,
        };
        plan.apply_defaults(&mut tenant);
        Ok(tables.insert(tenant))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tables.read().by_id.len()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_by_slug(&self, slug: &str) -> FolioResult<Option<Tenant>> {
        Ok(self.tables.read().by_slug(slug).cloned())
    }

    async fn find_by_id(&self, id: TenantId) -> FolioResult<Option<Tenant>> {
        Ok(self.tables.read().by_id.get(&id).cloned())
    }

    async fn get_or_create_default(&self, settings: &TenancySettings) -> FolioResult<Tenant> {
        let slug = settings.default_slug();
        if let Some(existing) = self.tables.read().by_slug(&slug) {
            return Ok(existing.clone());
        }

        // Re-check under the write lock: concurrent first requests race here.
        let mut tables = self.tables.write();
        if let Some(existing) = tables.by_slug(&slug) {
            return Ok(existing.clone());
        }

        info!("Provisioning default tenant with slug '{}'.", slug);
        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId(0),
            display_name: capitalize(&slug),
            slug,
            plan: settings.default_plan,
            monthly_operation_limit: settings.default_monthly_operation_limit,
            storage_limit_mb: settings.default_storage_limit_mb,
            active: true,
            created_at: now,
            updated_at: now,
        };
        Ok(tables.insert(tenant))
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
