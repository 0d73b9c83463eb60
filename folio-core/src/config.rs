//! # Folio Configuration
//!
//! Folio keeps configuration as a flat string key/value store. Every
//! component reads the keys it cares about from an immutable
//! [`ConfigSnapshot`] and builds its own typed settings from it.
//!
//! ## Setting and reading values
//! ```rust
//! use folio_core::FolioConfig;
//! let mut config = FolioConfig::new();
//!
//! config.set("saas.enabled", "true");
//! config.set("saas.tenant_header", "X-Tenant-Slug");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_bool("saas.enabled"), Some(true));
//! ```
//!
//! ## Environment overrides
//! [`FolioConfig::load_env`] maps prefixed environment variables onto keys:
//!
//! ```bash
//! export FOLIO__SAAS__ENABLED=true        # saas.enabled
//! export FOLIO__USAGE__RETENTION_MONTHS=6 # usage.retention_months
//! ```

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct FolioConfig {
    values: HashMap<String, String>,
}

impl FolioConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Import every variable starting with `prefix`.
    ///
    /// `FOLIO__PREMIUM__PRO__DATABASE` with prefix `FOLIO__` becomes
    /// `premium.pro.database`. Returns how many keys were imported.
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    pub(crate) fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut imported = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
                imported += 1;
            }
        }
        imported
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable view over configuration values with typed getters.
///
/// Unparseable values read as `None`, so callers fall back to their
/// defaults instead of failing.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Trimmed, non-blank string value.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)
            .and_then(|v| v.trim().to_ascii_lowercase().parse::<bool>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(|v| v.trim().parse::<u32>().ok())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse::<i64>().ok())
    }

    /// Comma-separated list; blank items are dropped. `Some(vec![])` means
    /// the key was set to an empty value.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_are_normalized() {
        let mut config = FolioConfig::new();
        let imported = config.load_vars(
            "FOLIO__",
            vec![
                ("FOLIO__SAAS__ENABLED".to_string(), "TRUE".to_string()),
                ("FOLIO__USAGE__RETENTION_MONTHS".to_string(), "6".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
        );

        assert_eq!(imported, 2);
        let snapshot = config.snapshot();
        assert_eq!(snapshot.get_bool("saas.enabled"), Some(true));
        assert_eq!(snapshot.get_u32("usage.retention_months"), Some(6));
        assert!(!snapshot.has("path"));
    }

    #[test]
    fn typed_getters_tolerate_garbage() {
        let mut config = FolioConfig::new();
        config.set("a", "not-a-number");
        config.set("b", "   ");
        config.set("c", "/public/signup, ,/api/v1/admin");
        let snapshot = config.snapshot();

        assert_eq!(snapshot.get_u64("a"), None);
        assert_eq!(snapshot.get_string("b"), None);
        assert_eq!(
            snapshot.get_list("c"),
            Some(vec!["/public/signup".to_string(), "/api/v1/admin".to_string()])
        );
        assert_eq!(snapshot.get_list("missing"), None);
    }
}
