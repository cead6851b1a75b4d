//! # Configuration
//!
//! Runtime configuration for the stakeledger binary.
//!
//! Layers, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `stakeledger.toml` when present)
//! 3. Environment: `STAKELEDGER_DATABASE`, `STAKELEDGER_OWNER`,
//!    `STAKELEDGER_HOST`, `STAKELEDGER_PORT`
//! 4. CLI flags
//!
//! HTTP hardening (`STAKELEDGER_API_KEY`, `STAKELEDGER_HOLDER_KEYS`,
//! `STAKELEDGER_RATE_LIMIT`, `STAKELEDGER_CORS_ORIGINS`) is read by the API
//! layer directly.

use serde::Deserialize;
use stakeledger_core::{Holder, LedgerError};
use std::path::{Path, PathBuf};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "stakeledger.toml";

/// Label the development owner is derived from.
const DEV_OWNER_LABEL: &str = "owner";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Path to the redb stake database.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Ledger owner. Defaults to a derived development account.
    #[serde(default = "default_owner")]
    pub owner: Holder,

    /// Host address for the HTTP server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database() -> PathBuf {
    PathBuf::from("stakeledger.redb")
}

fn default_owner() -> Holder {
    Holder::derive(&Holder::ZERO, DEV_OWNER_LABEL)
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            owner: default_owner(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Values given on the command line; `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub owner: Option<Holder>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, LedgerError> {
        toml::from_str(contents)
            .map_err(|e| LedgerError::Serialization(format!("Invalid config: {}", e)))
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            LedgerError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(LedgerError::Serialization(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build the effective configuration from every layer.
    ///
    /// An explicit `config_path` must exist; the default file is optional.
    pub fn load(
        config_path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, LedgerError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);

        tracing::debug!(
            database = %config.database.display(),
            owner = %config.owner,
            host = %config.host,
            port = config.port,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply the environment layer through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), LedgerError> {
        if let Some(database) = lookup("STAKELEDGER_DATABASE").filter(|v| !v.is_empty()) {
            self.database = PathBuf::from(database);
        }
        if let Some(owner) = lookup("STAKELEDGER_OWNER").filter(|v| !v.is_empty()) {
            self.owner = owner.parse()?;
        }
        if let Some(host) = lookup("STAKELEDGER_HOST").filter(|v| !v.is_empty()) {
            self.host = host;
        }
        if let Some(port) = lookup("STAKELEDGER_PORT").filter(|v| !v.is_empty()) {
            self.port = port.parse().map_err(|e| {
                LedgerError::Serialization(format!("Invalid STAKELEDGER_PORT '{}': {}", port, e))
            })?;
        }
        Ok(())
    }

    /// Apply the command-line layer.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(database) = &overrides.database {
            self.database.clone_from(database);
        }
        if let Some(owner) = overrides.owner {
            self.owner = owner;
        }
        if let Some(host) = &overrides.host {
            self.host.clone_from(host);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database, PathBuf::from("stakeledger.redb"));
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert!(!config.owner.is_zero());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("port = 9000\n").expect("parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn toml_owner_is_hex() {
        let owner = Holder::new([0xaa; 20]);
        let doc = format!("owner = \"{}\"\ndatabase = \"data/ledger.redb\"\n", owner);
        let config = AppConfig::from_toml_str(&doc).expect("parse");
        assert_eq!(config.owner, owner);
        assert_eq!(config.database, PathBuf::from("data/ledger.redb"));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(AppConfig::from_toml_str("colour = \"blue\"\n").is_err());
    }

    #[test]
    fn env_then_flags() {
        let env: BTreeMap<&str, &str> = [
            ("STAKELEDGER_PORT", "7000"),
            ("STAKELEDGER_HOST", "0.0.0.0"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| (*v).to_string()))
            .expect("env");
        assert_eq!(config.bind_address(), "0.0.0.0:7000");

        config.apply_overrides(&ConfigOverrides {
            port: Some(7001),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.bind_address(), "0.0.0.0:7001");
    }

    #[test]
    fn bad_env_values_rejected() {
        let mut config = AppConfig::default();
        assert!(
            config
                .apply_env(|key| (key == "STAKELEDGER_PORT").then(|| "http".to_string()))
                .is_err()
        );
        assert!(
            config
                .apply_env(|key| (key == "STAKELEDGER_OWNER").then(|| "0x12".to_string()))
                .is_err()
        );
    }

    #[test]
    fn file_layer() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("stakeledger.toml");
        std::fs::write(&path, "host = \"10.0.0.1\"\n").expect("write");

        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.host, "10.0.0.1");
        assert!(AppConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
