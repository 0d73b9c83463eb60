use std::time::Duration;

use folio_core::ConfigSnapshot;
use serde::Deserialize;

/// `usage.*` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UsageSettings {
    /// Upper bound on waiting for a usage window lock.
    pub lock_timeout_ms: u64,
    /// Windows kept, the current one included. Values below 1 count as 1.
    pub retention_months: u32,
    pub sweep_interval_secs: u64,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            retention_months: 12,
            sweep_interval_secs: 3_600,
        }
    }
}

impl UsageSettings {
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            lock_timeout_ms: config
                .get_u64("usage.lock_timeout_ms")
                .unwrap_or(defaults.lock_timeout_ms),
            retention_months: config
                .get_u32("usage.retention_months")
                .unwrap_or(defaults.retention_months),
            sweep_interval_secs: config
                .get_u64("usage.sweep_interval_secs")
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn retention_months(&self) -> u32 {
        self.retention_months.max(1)
    }

    /// Never zero; `tokio::time::interval` rejects a zero period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
