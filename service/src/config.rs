//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{LogFormat, ServiceError};

/// Configuration for a custody service instance.
///
/// Loaded from a TOML file via [`ServiceConfig::from_toml_file`] or built
/// programmatically. Every field has a default, so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound of the LMDB memory map, in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive, e.g. `"info"` or `"warn,canopy_trust=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./canopy_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        if config.map_size_mb == 0 {
            return Err(ServiceError::Config("map_size_mb must be positive".into()));
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// The memory map size in bytes.
    pub fn map_size(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ServiceConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert_eq!(ServiceConfig::from_toml_str(&toml_str).unwrap(), config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./canopy_data"));
        assert_eq!(config.map_size(), 1024 * 1024 * 1024);
        assert_eq!(config.log_format, LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = ServiceConfig::from_toml_str(
            r#"
                data_dir = "/var/lib/canopy"
                log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/canopy"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn zero_map_size_and_bad_format_are_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml_str("map_size_mb = 0"),
            Err(ServiceError::Config(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("log_format = \"xml\""),
            Err(ServiceError::Config(_))
        ));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = ServiceConfig::from_toml_file(Path::new("/nonexistent/canopy.toml")).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
