//! Client configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use sealbid_crypto::{CryptoError, KeySizing};

/// Default auction length: 24 hours.
pub const DEFAULT_AUCTION_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

/// Default `tracing` filter for the CLI.
pub const DEFAULT_LOG_FILTER: &str = "sealbid=info";

/// Client configuration, read from a JSON file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientConfig {
    /// Key generation parameters
    pub key_sizing: KeySizing,
    /// Auction length assumed when only an open time is known
    pub default_auction_duration_ms: u64,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            key_sizing: KeySizing::default(),
            default_auction_duration_ms: DEFAULT_AUCTION_DURATION_MS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl ClientConfig {
    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.key_sizing.validate().map_err(ConfigError::KeySizing)?;

        if self.default_auction_duration_ms == 0 {
            return Err(ConfigError::InvalidDuration);
        }

        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }

        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid key sizing: {0}")]
    KeySizing(CryptoError),

    #[error("Auction duration cannot be zero")]
    InvalidDuration,

    #[error("Log filter cannot be empty")]
    EmptyLogFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.key_sizing.modulus_bits, 1024);
        assert_eq!(config.default_auction_duration_ms, 86_400_000);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ClientConfig::from_json(r#"{"keySizing":{"modulusBits":512}}"#).unwrap();
        assert_eq!(config.key_sizing, KeySizing::new(512));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ClientConfig::from_json(r#"{"keySizing":{"modulusBits":100}}"#),
            Err(ConfigError::KeySizing(_))
        ));
        assert_eq!(
            ClientConfig::from_json(r#"{"defaultAuctionDurationMs":0}"#),
            Err(ConfigError::InvalidDuration)
        );
        assert!(matches!(
            ClientConfig::from_json(r#"{"unknown":true}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = Path::new("/nonexistent/sealbid/config.json");
        assert_eq!(ClientConfig::load(path).unwrap(), ClientConfig::default());
    }
}
