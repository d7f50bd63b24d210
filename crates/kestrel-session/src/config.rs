//! Session configuration
//!
//! Loaded from TOML. Every field has a default so a missing file or a partial
//! table still yields a usable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::ports::Capabilities;

fn default_true() -> bool {
    true
}

fn default_explorer_url() -> String {
    "https://explorer.kestrel.invalid/".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_fiat() -> String {
    "USD".to_string()
}

/// Session orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Run peer-messaging deferred-entry routing after launch
    #[serde(default = "default_true")]
    pub contacts_enabled: bool,

    /// Allow the purchase gate to start
    #[serde(default = "default_true")]
    pub buy_sell_permitted: bool,

    /// Block explorer base URL reported to the UI
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    /// `tracing` filter directive used by frontends
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Fiat currency used when the user has not picked one
    #[serde(default = "default_fiat")]
    pub default_fiat: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            contacts_enabled: true,
            buy_sell_permitted: true,
            explorer_url: default_explorer_url(),
            log_filter: default_log_filter(),
            default_fiat: default_fiat(),
        }
    }
}

impl SessionConfig {
    /// Create config for testing (verbose logging, every feature on)
    pub fn for_testing() -> Self {
        Self {
            log_filter: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Capabilities fixed to this config's feature flags.
    pub fn capabilities(&self) -> StaticCapabilities {
        StaticCapabilities {
            contacts_enabled: self.contacts_enabled,
            buy_sell_permitted: self.buy_sell_permitted,
        }
    }
}

/// Feature predicates fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticCapabilities {
    /// See [`Capabilities::contacts_enabled`].
    pub contacts_enabled: bool,
    /// See [`Capabilities::buy_sell_permitted`].
    pub buy_sell_permitted: bool,
}

impl Capabilities for StaticCapabilities {
    fn contacts_enabled(&self) -> bool {
        self.contacts_enabled
    }

    fn buy_sell_permitted(&self) -> bool {
        self.buy_sell_permitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_table_keeps_defaults() {
        let config = SessionConfig::from_toml_str("contacts_enabled = false\n").unwrap();
        assert!(!config.contacts_enabled);
        assert!(config.buy_sell_permitted);
        assert_eq!(config.default_fiat, "USD");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SessionConfig::from_toml_str("contacts_enabled = \"maybe\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kestrel.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "explorer_url = \"https://example.org/\"").unwrap();
        writeln!(file, "buy_sell_permitted = false").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.explorer_url, "https://example.org/");
        assert!(!config.capabilities().buy_sell_permitted());
    }
}
