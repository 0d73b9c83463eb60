use std::sync::Arc;

use anyhow::Result;
use folio_axum::{AdminToken, FolioApp, FolioState, QuotaGateSettings};
use folio_core::{ConfigSnapshot, FolioConfig, LicenseFeatureGate, MemoryTenantStore, TenancySettings, TenantResolver};
use folio_usage::{MemoryWindowStore, RetentionSweeper, UsageMetricsAggregator, UsageQuotaEnforcer, UsageSettings};
use tokio::task::JoinHandle;

/// Everything the binary needs: the routed app plus the stores behind it.
pub struct FolioServer {
    pub app: FolioApp,
    pub config: ConfigSnapshot,
    pub tenants: Arc<MemoryTenantStore>,
    pub usage: Arc<MemoryWindowStore>,
}

pub fn default_config() -> FolioConfig {
    let mut config = FolioConfig::new();
    config.set("http.host", "127.0.0.1");
    config.set("http.port", "8080");
    config
}

pub fn folio_server(config: &FolioConfig) -> Result<FolioServer> {
    let snapshot = config.snapshot();

    let tenancy = TenancySettings::from_config(&snapshot);
    let usage_settings = UsageSettings::from_config(&snapshot);

    let tenants = Arc::new(MemoryTenantStore::new());
    let usage = Arc::new(MemoryWindowStore::new());

    let state = FolioState {
        resolver: Arc::new(TenantResolver::new(tenants.clone(), tenancy)),
        quota: Arc::new(UsageQuotaEnforcer::new(usage.clone(), &usage_settings)),
        metrics: Arc::new(UsageMetricsAggregator::new()),
        license: Arc::new(LicenseFeatureGate::from_config(&snapshot)),
        admin: Arc::new(AdminToken::new(snapshot.get_string("admin.token"))),
        quota_gate: QuotaGateSettings::from_config(&snapshot),
    };

    Ok(FolioServer {
        app: FolioApp::new(state),
        config: snapshot,
        tenants,
        usage,
    })
}

impl FolioServer {
    /// Start the usage retention sweeper. Only runs with multi-tenancy on.
    pub fn spawn_maintenance(&self) -> Option<JoinHandle<()>> {
        if !self.app.state.resolver.settings().enabled {
            return None;
        }
        let settings = UsageSettings::from_config(&self.config);
        Some(RetentionSweeper::new(self.usage.clone(), &settings).spawn())
    }

    pub fn addr(&self) -> String {
        let host = self
            .config
            .get_string("http.host")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self.config.get_u32("http.port").unwrap_or(8080);
        format!("{host}:{port}")
    }
}
