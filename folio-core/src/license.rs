//! Premium license level and feature gating.
//!
//! Everything here is derived from static [`PremiumSettings`] on every call.
//! No I/O, no caching, cheap enough to query per request.
//!
//! `license_verified` is only "enabled and a non-blank key is present". It is
//! not a signature check and must not be used as an authorization boundary.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigSnapshot;

/// License tier. Ordered: `Community < Pro < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseLevel {
    Community,
    Pro,
    Enterprise,
}

impl LicenseLevel {
    pub fn at_least(self, other: LicenseLevel) -> bool {
        self >= other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseLevel::Community => "COMMUNITY",
            LicenseLevel::Pro => "PRO",
            LicenseLevel::Enterprise => "ENTERPRISE",
        }
    }
}

impl fmt::Display for LicenseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiumFeature {
    SsoAutoLogin,
    DatabaseBackup,
    CustomMetadata,
    GoogleDrive,
    AuditLogs,
    PersistentMetrics,
}

impl PremiumFeature {
    pub const ALL: [PremiumFeature; 6] = [
        PremiumFeature::SsoAutoLogin,
        PremiumFeature::DatabaseBackup,
        PremiumFeature::CustomMetadata,
        PremiumFeature::GoogleDrive,
        PremiumFeature::AuditLogs,
        PremiumFeature::PersistentMetrics,
    ];

    pub fn minimum_level(&self) -> LicenseLevel {
        match self {
            PremiumFeature::SsoAutoLogin
            | PremiumFeature::DatabaseBackup
            | PremiumFeature::CustomMetadata
            | PremiumFeature::GoogleDrive => LicenseLevel::Pro,
            PremiumFeature::AuditLogs | PremiumFeature::PersistentMetrics => {
                LicenseLevel::Enterprise
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CustomMetadataSettings {
    pub auto_update_metadata: bool,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

impl CustomMetadataSettings {
    /// On when toggled, or when any descriptive field carries text.
    pub fn is_active(&self) -> bool {
        self.auto_update_metadata
            || [&self.author, &self.creator, &self.producer]
                .iter()
                .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProFeatureSettings {
    pub sso_auto_login: bool,
    pub database: bool,
    pub custom_metadata: Option<CustomMetadataSettings>,
    pub google_drive: Option<Toggle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnterpriseFeatureSettings {
    pub audit: Option<Toggle>,
    pub persistent_metrics: Option<Toggle>,
}

impl EnterpriseFeatureSettings {
    fn audit_enabled(&self) -> bool {
        self.audit.is_some_and(|t| t.enabled)
    }

    fn persistent_metrics_enabled(&self) -> bool {
        self.persistent_metrics.is_some_and(|t| t.enabled)
    }
}

/// `premium.*` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PremiumSettings {
    pub enabled: bool,
    pub key: Option<String>,
    pub max_users: i64,
    pub pro: Option<ProFeatureSettings>,
    pub enterprise: Option<EnterpriseFeatureSettings>,
}

impl PremiumSettings {
    /// `None` when `premium.enabled` is not configured at all.
    pub fn from_config(config: &ConfigSnapshot) -> Option<Self> {
        let enabled = config.get_bool("premium.enabled")?;

        let custom_metadata = CustomMetadataSettings {
            auto_update_metadata: config
                .get_bool("premium.pro.custom_metadata.auto_update_metadata")
                .unwrap_or(false),
            author: config.get_string("premium.pro.custom_metadata.author"),
            creator: config.get_string("premium.pro.custom_metadata.creator"),
            producer: config.get_string("premium.pro.custom_metadata.producer"),
        };
        let toggle = |key: &str| Toggle {
            enabled: config.get_bool(key).unwrap_or(false),
        };

        Some(Self {
            enabled,
            key: config.get_string("premium.key"),
            max_users: config.get_i64("premium.max_users").unwrap_or(0),
            pro: Some(ProFeatureSettings {
                sso_auto_login: config.get_bool("premium.pro.sso_auto_login").unwrap_or(false),
                database: config.get_bool("premium.pro.database").unwrap_or(false),
                custom_metadata: Some(custom_metadata),
                google_drive: Some(toggle("premium.pro.google_drive.enabled")),
            }),
            enterprise: Some(EnterpriseFeatureSettings {
                audit: Some(toggle("premium.enterprise.audit.enabled")),
                persistent_metrics: Some(toggle("premium.enterprise.persistent_metrics.enabled")),
            }),
        })
    }
}

/// Derived license state; recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStatus {
    pub level: LicenseLevel,
    pub license_configured: bool,
    pub license_verified: bool,
    pub max_users: u64,
    pub expires_at: Option<DateTime<Utc>>,
    pub enabled_features: BTreeSet<PremiumFeature>,
}

impl LicenseStatus {
    pub fn community_fallback() -> Self {
        Self {
            level: LicenseLevel::Community,
            license_configured: false,
            license_verified: false,
            max_users: 0,
            expires_at: None,
            enabled_features: BTreeSet::new(),
        }
    }

    pub fn is_feature_enabled(&self, feature: PremiumFeature) -> bool {
        self.enabled_features.contains(&feature)
    }
}

pub struct LicenseFeatureGate {
    settings: Option<PremiumSettings>,
}

impl LicenseFeatureGate {
    /// `None` settings behave like a missing configuration section.
    pub fn new(settings: Option<PremiumSettings>) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &ConfigSnapshot) -> Self {
        Self::new(PremiumSettings::from_config(config))
    }

    pub fn status(&self) -> LicenseStatus {
        let premium = match &self.settings {
            Some(premium) if premium.enabled => premium,
            _ => return LicenseStatus::community_fallback(),
        };

        let level = resolve_level(premium);
        let enabled_features = resolve_features(premium)
            .into_iter()
            .filter(|feature| level.at_least(feature.minimum_level()))
            .collect();

        LicenseStatus {
            level,
            license_configured: true,
            license_verified: premium
                .key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty()),
            max_users: u64::try_from(premium.max_users).unwrap_or(0),
            expires_at: None,
            enabled_features,
        }
    }

    pub fn current_level(&self) -> LicenseLevel {
        self.status().level
    }

    /// Toggle on *and* level high enough for the feature.
    pub fn is_feature_enabled(&self, feature: PremiumFeature) -> bool {
        let status = self.status();
        status.level.at_least(feature.minimum_level()) && status.is_feature_enabled(feature)
    }
}

fn resolve_level(premium: &PremiumSettings) -> LicenseLevel {
    match &premium.enterprise {
        Some(enterprise)
            if enterprise.audit_enabled() || enterprise.persistent_metrics_enabled() =>
        {
            LicenseLevel::Enterprise
        }
        _ => LicenseLevel::Pro,
    }
}

fn resolve_features(premium: &PremiumSettings) -> BTreeSet<PremiumFeature> {
    let mut features = BTreeSet::new();

    if let Some(pro) = &premium.pro {
        if pro.sso_auto_login {
            features.insert(PremiumFeature::SsoAutoLogin);
        }
        if pro.database {
            features.insert(PremiumFeature::DatabaseBackup);
        }
        if pro.custom_metadata.as_ref().is_some_and(CustomMetadataSettings::is_active) {
            features.insert(PremiumFeature::CustomMetadata);
        }
        if pro.google_drive.is_some_and(|t| t.enabled) {
            features.insert(PremiumFeature::GoogleDrive);
        }
    }

    if let Some(enterprise) = &premium.enterprise {
        if enterprise.audit_enabled() {
            features.insert(PremiumFeature::AuditLogs);
        }
        if enterprise.persistent_metrics_enabled() {
            features.insert(PremiumFeature::PersistentMetrics);
        }
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolioConfig;

    fn enabled() -> PremiumSettings {
        PremiumSettings {
            enabled: true,
            key: Some("abc-123".to_string()),
            max_users: 25,
            ..PremiumSettings::default()
        }
    }

    #[test]
    fn levels_are_totally_ordered() {
        assert!(LicenseLevel::Community < LicenseLevel::Pro);
        assert!(LicenseLevel::Pro < LicenseLevel::Enterprise);
        assert!(LicenseLevel::Enterprise.at_least(LicenseLevel::Pro));
        assert!(!LicenseLevel::Community.at_least(LicenseLevel::Pro));
    }

    #[test]
    fn disabled_or_missing_premium_is_community() {
        for gate in [
            LicenseFeatureGate::new(None),
            LicenseFeatureGate::new(Some(PremiumSettings {
                enabled: false,
                pro: Some(ProFeatureSettings {
                    database: true,
                    ..ProFeatureSettings::default()
                }),
                ..enabled()
            })),
        ] {
            assert_eq!(gate.status(), LicenseStatus::community_fallback());
            for feature in PremiumFeature::ALL {
                assert!(!gate.is_feature_enabled(feature));
            }
        }
    }

    #[test]
    fn database_toggle_alone_is_pro() {
        let gate = LicenseFeatureGate::new(Some(PremiumSettings {
            pro: Some(ProFeatureSettings {
                database: true,
                ..ProFeatureSettings::default()
            }),
            ..enabled()
        }));

        let status = gate.status();
        assert_eq!(status.level, LicenseLevel::Pro);
        assert!(status.license_configured);
        assert!(status.license_verified);
        assert_eq!(status.max_users, 25);
        assert!(gate.is_feature_enabled(PremiumFeature::DatabaseBackup));
        assert!(!gate.is_feature_enabled(PremiumFeature::AuditLogs));
    }

    #[test]
    fn audit_toggle_makes_enterprise() {
        let gate = LicenseFeatureGate::new(Some(PremiumSettings {
            enterprise: Some(EnterpriseFeatureSettings {
                audit: Some(Toggle { enabled: true }),
                persistent_metrics: None,
            }),
            ..enabled()
        }));

        assert_eq!(gate.current_level(), LicenseLevel::Enterprise);
        assert!(gate.is_feature_enabled(PremiumFeature::AuditLogs));
        assert!(!gate.is_feature_enabled(PremiumFeature::PersistentMetrics));
    }

    #[test]
    fn custom_metadata_needs_toggle_or_text() {
        let with = |custom: CustomMetadataSettings| {
            LicenseFeatureGate::new(Some(PremiumSettings {
                pro: Some(ProFeatureSettings {
                    custom_metadata: Some(custom),
                    ..ProFeatureSettings::default()
                }),
                ..enabled()
            }))
            .is_feature_enabled(PremiumFeature::CustomMetadata)
        };

        assert!(!with(CustomMetadataSettings {
            author: Some("   ".to_string()),
            ..CustomMetadataSettings::default()
        }));
        assert!(with(CustomMetadataSettings {
            producer: Some("Folio".to_string()),
            ..CustomMetadataSettings::default()
        }));
        assert!(with(CustomMetadataSettings {
            auto_update_metadata: true,
            ..CustomMetadataSettings::default()
        }));
    }

    #[test]
    fn blank_key_is_unverified_and_negative_users_clamp() {
        let status = LicenseFeatureGate::new(Some(PremiumSettings {
            key: Some("  ".to_string()),
            max_users: -4,
            ..enabled()
        }))
        .status();

        assert!(!status.license_verified);
        assert_eq!(status.max_users, 0);
        assert_eq!(status.expires_at, None);
    }

    #[test]
    fn every_reported_feature_respects_its_minimum_level() {
        let everything = PremiumSettings {
            pro: Some(ProFeatureSettings {
                sso_auto_login: true,
                database: true,
                custom_metadata: Some(CustomMetadataSettings {
                    auto_update_metadata: true,
                    ..CustomMetadataSettings::default()
                }),
                google_drive: Some(Toggle { enabled: true }),
            }),
            enterprise: Some(EnterpriseFeatureSettings {
                audit: Some(Toggle { enabled: true }),
                persistent_metrics: Some(Toggle { enabled: true }),
            }),
            ..enabled()
        };
        let status = LicenseFeatureGate::new(Some(everything)).status();

        assert_eq!(status.enabled_features.len(), PremiumFeature::ALL.len());
        for feature in &status.enabled_features {
            assert!(status.level.at_least(feature.minimum_level()));
        }
    }

    #[test]
    fn settings_come_from_premium_keys() {
        let mut config = FolioConfig::new();
        assert_eq!(PremiumSettings::from_config(&config.snapshot()), None);

        config.set("premium.enabled", "true");
        config.set("premium.key", "k");
        config.set("premium.pro.google_drive.enabled", "true");
        config.set("premium.enterprise.persistent_metrics.enabled", "true");
        let gate = LicenseFeatureGate::from_config(&config.snapshot());

        assert_eq!(gate.current_level(), LicenseLevel::Enterprise);
        assert!(gate.is_feature_enabled(PremiumFeature::GoogleDrive));
        assert!(gate.is_feature_enabled(PremiumFeature::PersistentMetrics));
        assert!(!gate.is_feature_enabled(PremiumFeature::AuditLogs));
    }
}
