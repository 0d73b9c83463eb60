//! Tenant resolution from per-request signals.
//!
//! Order, first match wins:
//! 1. the configured tenant header
//! 2. the `tenant` query parameter
//! 3. the host's subdomain under the configured base domain
//! 4. the default tenant (provisioned on first use)
//!
//! A hint that names no known tenant is logged and skipped. Resolution
//! itself never fails.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::ConfigSnapshot;
use crate::store::TenantStore;
use crate::tenant::{normalize_slug, TenantDescriptor, TenantId, TenantPlan};

pub const TENANT_QUERY_PARAM: &str = "tenant";

/// Multi-tenancy settings (`saas.*` keys).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancySettings {
    pub enabled: bool,
    pub tenant_header: Option<String>,
    pub base_domain: Option<String>,
    pub default_tenant_slug: String,
    pub default_plan: TenantPlan,
    pub default_monthly_operation_limit: Option<u64>,
    pub default_storage_limit_mb: Option<u64>,
}

impl Default for TenancySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            tenant_header: None,
            base_domain: None,
            default_tenant_slug: "default".to_string(),
            default_plan: TenantPlan::Free,
            default_monthly_operation_limit: None,
            default_storage_limit_mb: None,
        }
    }
}

impl TenancySettings {
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            enabled: config.get_bool("saas.enabled").unwrap_or(defaults.enabled),
            tenant_header: config.get_string("saas.tenant_header"),
            base_domain: config.get_string("saas.domain"),
            default_tenant_slug: config
                .get_string("saas.default_tenant_slug")
                .unwrap_or(defaults.default_tenant_slug),
            default_plan: config
                .get_string("saas.default_plan")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.default_plan),
            default_monthly_operation_limit: config
                .get_u64("saas.default_monthly_operation_limit"),
            default_storage_limit_mb: config.get_u64("saas.default_storage_limit_mb"),
        }
    }

    /// Normalized default slug; falls back to `default` when configured blank.
    pub fn default_slug(&self) -> String {
        normalize_slug(&self.default_tenant_slug).unwrap_or_else(|| "default".to_string())
    }
}

/// Transport-neutral view of the request inputs the resolver looks at.
///
/// Header names are stored lowercase.
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestSignals {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    settings: TenancySettings,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn TenantStore>, settings: TenancySettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &TenancySettings {
        &self.settings
    }

    pub async fn resolve(&self, signals: &RequestSignals) -> Arc<TenantDescriptor> {
        if !self.settings.enabled {
            return self.default_tenant().await;
        }

        if let Some(header) = self.settings.tenant_header.as_deref() {
            let source = format!("header '{header}'");
            if let Some(found) = self.lookup(signals.header(header), &source).await {
                return found;
            }
        }

        if let Some(found) = self
            .lookup(
                signals.query_param(TENANT_QUERY_PARAM),
                "query parameter 'tenant'",
            )
            .await
        {
            return found;
        }

        if let (Some(host), Some(domain)) =
            (signals.host.as_deref(), self.settings.base_domain.as_deref())
        {
            if let Some(found) = self.lookup(subdomain_of(host, domain), "host subdomain").await {
                return found;
            }
        }

        let fallback = self.default_tenant().await;
        debug!(
            "Falling back to default tenant '{}' (id={}) for request {} {}",
            fallback.slug, fallback.id, signals.method, signals.path
        );
        fallback
    }

    async fn lookup(&self, candidate: Option<&str>, source: &str) -> Option<Arc<TenantDescriptor>> {
        let slug = normalize_slug(candidate?)?;
        match self.store.find_by_slug(&slug).await {
            Ok(Some(tenant)) => {
                debug!("Resolved tenant '{}' from {}.", tenant.slug, source);
                Some(Arc::new(TenantDescriptor::from(&tenant)))
            }
            Ok(None) => {
                warn!("Tenant '{}' referenced via {} does not exist.", slug, source);
                None
            }
            Err(err) => {
                warn!("Tenant lookup via {} failed: {:#}", source, err);
                None
            }
        }
    }

    async fn default_tenant(&self) -> Arc<TenantDescriptor> {
        match self.store.get_or_create_default(&self.settings).await {
            Ok(tenant) => Arc::new(TenantDescriptor::from(&tenant)),
            Err(err) => {
                // Store unavailable: serve the request under a synthesized
                // default so resolution still never fails.
                error!(
                    "Default tenant unavailable at {}: {:#}",
                    Utc::now().to_rfc3339(),
                    err
                );
                Arc::new(TenantDescriptor {
                    id: TenantId(0),
                    slug: self.settings.default_slug(),
                    plan: self.settings.default_plan,
                    monthly_operation_limit: self.settings.default_monthly_operation_limit,
                    storage_limit_mb: self.settings.default_storage_limit_mb,
                })
            }
        }
    }
}

/// `acme.pdf.example.com` under `pdf.example.com` -> `acme`.
///
/// The host must end with `.<domain>`; a bare suffix match such as
/// `evilexample.com` under `example.com` does not count. Ports are ignored.
pub fn subdomain_of<'a>(host: &'a str, domain: &str) -> Option<&'a str> {
    let host = host.split(':').next().unwrap_or(host).trim_end_matches('.');
    let domain = domain.trim().trim_start_matches('.').trim_end_matches('.');
    if domain.is_empty() || host.len() <= domain.len() {
        return None;
    }
    let split = host.len() - domain.len();
    if !host.is_char_boundary(split) {
        return None;
    }
    let (prefix, suffix) = host.split_at(split);
    if !suffix.eq_ignore_ascii_case(domain) {
        return None;
    }
    prefix.strip_suffix('.').filter(|sub| !sub.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FolioResult;
    use crate::store::{MemoryTenantStore, TenantLimits};
    use crate::tenant::Tenant;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn saas_settings() -> TenancySettings {
        TenancySettings {
            enabled: true,
            tenant_header: Some("X-Tenant-Slug".to_string()),
            base_domain: Some("pdf.example.com".to_string()),
            ..TenancySettings::default()
        }
    }

    fn store_with(slugs: &[&str]) -> Arc<MemoryTenantStore> {
        let store = Arc::new(MemoryTenantStore::new());
        for slug in slugs {
            store
                .create_tenant(slug, *slug, TenantPlan::Pro, TenantLimits::default())
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn header_wins_over_query_and_subdomain() {
        let resolver = TenantResolver::new(store_with(&["acme", "globex", "initech"]), saas_settings());
        let signals = RequestSignals::new("POST", "/api/v1/merge")
            .with_header("x-tenant-slug", "acme")
            .with_query("tenant", "globex")
            .with_host("initech.pdf.example.com");

        assert_eq!(resolver.resolve(&signals).await.slug, "acme");
    }

    #[tokio::test]
    async fn query_then_subdomain_are_used_in_order() {
        let resolver = TenantResolver::new(store_with(&["globex", "initech"]), saas_settings());

        let by_query = RequestSignals::new("POST", "/api")
            .with_query("tenant", " GLOBEX ")
            .with_host("initech.pdf.example.com");
        assert_eq!(resolver.resolve(&by_query).await.slug, "globex");

        let by_host = RequestSignals::new("POST", "/api").with_host("Initech.pdf.example.com:8443");
        assert_eq!(resolver.resolve(&by_host).await.slug, "initech");
    }

    #[tokio::test]
    #[traced_test]
    async fn unknown_hints_are_skipped_and_logged() {
        let resolver = TenantResolver::new(store_with(&["globex"]), saas_settings());
        let signals = RequestSignals::new("POST", "/api")
            .with_header("X-Tenant-Slug", "nobody")
            .with_query("tenant", "globex");

        assert_eq!(resolver.resolve(&signals).await.slug, "globex");
        assert!(logs_contain("Tenant 'nobody' referenced via header 'X-Tenant-Slug' does not exist."));
    }

    #[tokio::test]
    async fn falls_back_to_default_tenant() {
        let store = store_with(&[]);
        let resolver = TenantResolver::new(store.clone(), saas_settings());
        let signals = RequestSignals::new("GET", "/").with_host("pdf.example.com");

        let resolved = resolver.resolve(&signals).await;
        assert_eq!(resolved.slug, "default");
        assert_eq!(store.len(), 1);
    }

    struct CountingStore {
        inner: MemoryTenantStore,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl TenantStore for CountingStore {
        async fn find_by_slug(&self, slug: &str) -> FolioResult<Option<Tenant>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_slug(slug).await
        }

        async fn find_by_id(&self, id: TenantId) -> FolioResult<Option<Tenant>> {
            self.inner.find_by_id(id).await
        }

        async fn get_or_create_default(&self, settings: &TenancySettings) -> FolioResult<Tenant> {
            self.inner.get_or_create_default(settings).await
        }
    }

    #[tokio::test]
    async fn disabled_multi_tenancy_skips_all_lookups() {
        let store = Arc::new(CountingStore {
            inner: MemoryTenantStore::new(),
            lookups: AtomicUsize::new(0),
        });
        let settings = TenancySettings {
            enabled: false,
            ..saas_settings()
        };
        let resolver = TenantResolver::new(store.clone(), settings);
        let signals = RequestSignals::new("POST", "/api")
            .with_header("X-Tenant-Slug", "acme")
            .with_query("tenant", "acme");

        assert_eq!(resolver.resolve(&signals).await.slug, "default");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subdomain_requires_a_dot_boundary() {
        assert_eq!(subdomain_of("acme.example.com", "example.com"), Some("acme"));
        assert_eq!(subdomain_of("acme.example.com.", ".example.com"), Some("acme"));
        assert_eq!(subdomain_of("evilexample.com", "example.com"), None);
        assert_eq!(subdomain_of("example.com", "example.com"), None);
        assert_eq!(subdomain_of("acme.other.org", "example.com"), None);
    }

    #[test]
    fn settings_read_saas_keys() {
        let mut config = crate::FolioConfig::new();
        config.set("saas.enabled", "true");
        config.set("saas.tenant_header", "X-Tenant");
        config.set("saas.default_plan", "pro");
        config.set("saas.default_monthly_operation_limit", "100");
        let settings = TenancySettings::from_config(&config.snapshot());

        assert!(settings.enabled);
        assert_eq!(settings.tenant_header.as_deref(), Some("X-Tenant"));
        assert_eq!(settings.default_plan, TenantPlan::Pro);
        assert_eq!(settings.default_monthly_operation_limit, Some(100));
        assert_eq!(settings.default_slug(), "default");
    }
}
