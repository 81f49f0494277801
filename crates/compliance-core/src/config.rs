//! Compliance configuration
//!
//! [`ComplianceConfig`] is plain serde data with defaults for every field, so
//! a config file only needs to name what it overrides. Files are read as TOML
//! or YAML depending on their extension.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Mount point of the feature, e.g. `/app/compliance`
    pub base_path: String,
    /// Absolute origin used in links sent by email
    pub public_base_url: String,
    /// Recipient of help requests
    pub support_email: String,
    /// Enhanced rendering of PMC and preprint links
    pub enhanced_article_rendering: bool,
    pub source: SourceConfig,
    pub menu: MenuConfig,
    pub cron: CronConfig,
}

impl ComplianceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With base path
    #[inline]
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// With public origin
    #[inline]
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    /// With fetch timeout
    #[inline]
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.source.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With cron secret for the warm-up hook
    #[inline]
    #[must_use]
    pub fn with_cron_secret(mut self, secret: impl Into<String>) -> Self {
        self.cron.secret = Some(secret.into());
        self
    }

    /// Load from a `.toml`, `.yaml` or `.yml` file and validate
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::UnsupportedFormat` for other extensions
    /// - parse and validation errors otherwise
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config: Self = match extension.as_str() {
            "toml" => toml::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded compliance config");
        Ok(config)
    }

    /// Reject values the services cannot run with
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "base_path",
                reason: format!("must start with '/', got {:?}", self.base_path),
            });
        }
        if self.source.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "source.fetch_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.source.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "source.cache_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cron.secret.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "cron.secret",
                reason: "must not be blank; omit it to disable the hook".to_string(),
            });
        }
        Ok(())
    }

    /// Base path without trailing slashes
    #[must_use]
    pub fn base(&self) -> &str {
        let trimmed = self.base_path.trim_end_matches('/');
        if trimmed.is_empty() {
            "/"
        } else {
            trimmed
        }
    }

    /// Absolute URL for an app path
    #[must_use]
    pub fn as_base_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            base_path: "/app/compliance".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            support_email: "compliance-support@localhost".to_string(),
            enhanced_article_rendering: false,
            source: SourceConfig::default(),
            menu: MenuConfig::default(),
            cron: CronConfig::default(),
        }
    }
}

/// External data source settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Budget for a single fetch
    pub fetch_timeout_ms: u64,
    /// Time a cached answer stays valid
    pub cache_ttl_secs: u64,
    /// Maximum cached answers
    pub cache_capacity: u64,
}

impl SourceConfig {
    #[inline]
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 25_000,
            cache_ttl_secs: 300,
            cache_capacity: 1_000,
        }
    }
}

/// Menu reconciliation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Resolutions slower than this are logged
    pub slow_resolution_ms: u64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            slow_resolution_ms: 1_000,
        }
    }
}

/// Cron hook settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    /// Bearer secret; the hook is disabled when absent
    pub secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = ComplianceConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.base(), "/app/compliance");
        assert_eq!(config.menu.slow_resolution_ms, 1_000);
    }

    #[test]
    fn base_trims_trailing_slashes() {
        let config = ComplianceConfig::new().with_base_path("/compliance//");
        assert_eq!(config.base(), "/compliance");
        assert_eq!(ComplianceConfig::new().with_base_path("/").base(), "/");
    }

    #[test]
    fn as_base_url_joins_cleanly() {
        let config = ComplianceConfig::new().with_public_base_url("https://example.org/");
        assert_eq!(
            config.as_base_url("/app/compliance/share"),
            "https://example.org/app/compliance/share"
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let relative = ComplianceConfig::new().with_base_path("app");
        assert!(matches!(
            relative.validate(),
            Err(ConfigError::Invalid { field: "base_path", .. })
        ));

        let zero = ComplianceConfig::new().with_fetch_timeout(Duration::ZERO);
        assert!(matches!(
            zero.validate(),
            Err(ConfigError::Invalid { field: "source.fetch_timeout_ms", .. })
        ));

        let blank = ComplianceConfig::new().with_cron_secret(" ");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn load_toml_overrides_only_named_fields() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_path = \"/compliance\"\n[source]\nfetch_timeout_ms = 500\n[cron]\nsecret = \"s3cret\""
        )
        .unwrap();

        let config = ComplianceConfig::load(file.path()).unwrap();
        assert_eq!(config.base_path, "/compliance");
        assert_eq!(config.source.fetch_timeout_ms, 500);
        assert_eq!(config.source.cache_ttl_secs, 300);
        assert_eq!(config.cron.secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn load_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "support_email: help@example.org\nmenu:\n  slow_resolution_ms: 250").unwrap();

        let config = ComplianceConfig::load(file.path()).unwrap();
        assert_eq!(config.support_email, "help@example.org");
        assert_eq!(config.menu.slow_resolution_ms, 250);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            ComplianceConfig::load(file.path()),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ComplianceConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
