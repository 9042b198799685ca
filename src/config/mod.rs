//! Configuration for ClawCtl
//!
//! Loads `~/.clawctl/config.json`, which carries the gateway connection
//! settings exposed to plugins. A missing file yields defaults; commands
//! never require a config file to exist.
//!
//! # Example
//!
//! ```json
//! {
//!   "gateway": {
//!     "host": "https://gateway.example.com",
//!     "api_path": "/api/v1",
//!     "bearer_token": "s3cret",
//!     "timeout_secs": 30
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ClawError, Result};

/// Top-level configuration, stored as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    /// Configuration directory, `~/.clawctl`.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".clawctl")
    }

    /// Default configuration file path.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| ClawError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| ClawError::Config(format!("invalid config {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Gateway connection settings, exposed to plugins through the environment.
///
/// All fields default to empty or zero; field presence is not validated
/// here. Whether a given plugin needs credentials or TLS material is the
/// plugin's own business.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway.
    #[serde(default)]
    pub host: String,

    /// Path prefix for API endpoints.
    #[serde(default)]
    pub api_path: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub bearer_token: String,

    /// Identity assumed for requests when acting on behalf of another user.
    #[serde(default)]
    pub impersonate: ImpersonateConfig,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// TLS server name override.
    #[serde(default)]
    pub server_name: String,

    #[serde(default)]
    pub cert_file: String,

    #[serde(default)]
    pub key_file: String,

    #[serde(default)]
    pub ca_file: String,

    #[serde(default)]
    pub cert_data: String,

    #[serde(default)]
    pub key_data: String,

    #[serde(default)]
    pub ca_data: String,

    #[serde(default)]
    pub user_agent: String,

    /// Request timeout in seconds; 0 means no timeout.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Human-readable rendering of the timeout, e.g. `30s`.
    pub fn timeout_string(&self) -> String {
        format!("{}s", self.timeout_secs)
    }

    /// Millisecond rendering of the timeout.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_secs.saturating_mul(1000)
    }
}

/// Identity assumed for gateway requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpersonateConfig {
    #[serde(default)]
    pub user_name: String,

    #[serde(default)]
    pub groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.gateway.host.is_empty());
        assert_eq!(config.gateway.timeout_secs, 0);
    }

    #[test]
    fn test_load_from_reads_gateway_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "gateway": {
                    "host": "https://gateway.example.com",
                    "api_path": "/api/v1",
                    "bearer_token": "s3cret",
                    "impersonate": { "user_name": "admin", "groups": ["ops"] },
                    "timeout_secs": 45
                }
            }"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.gateway.host, "https://gateway.example.com");
        assert_eq!(config.gateway.api_path, "/api/v1");
        assert_eq!(config.gateway.bearer_token, "s3cret");
        assert_eq!(config.gateway.impersonate.user_name, "admin");
        assert_eq!(config.gateway.impersonate.groups, vec!["ops"]);
        assert_eq!(config.gateway.timeout_secs, 45);
        // Unset fields fall back to defaults.
        assert!(config.gateway.username.is_empty());
        assert!(!config.gateway.insecure);
    }

    #[test]
    fn test_load_from_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ClawError::Config(_)));
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn test_timeout_renderings() {
        let gateway = GatewayConfig {
            timeout_secs: 30,
            ..GatewayConfig::default()
        };
        assert_eq!(gateway.timeout_string(), "30s");
        assert_eq!(gateway.timeout_ms(), 30_000);

        let zero = GatewayConfig::default();
        assert_eq!(zero.timeout_string(), "0s");
        assert_eq!(zero.timeout_ms(), 0);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config {
            gateway: GatewayConfig {
                host: "https://gw".to_string(),
                insecure: true,
                ..GatewayConfig::default()
            },
        };

        let json_str = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json_str).unwrap();
        assert_eq!(deserialized.gateway.host, "https://gw");
        assert!(deserialized.gateway.insecure);
    }
}
