//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::dcc::DccConfig;
use super::irc::IrcConfig;
use super::search::{BotConfig, SearchConfig, TokenConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Client configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// IRC server and identity.
    #[serde(default)]
    pub irc: IrcConfig,
    /// Search requests.
    #[serde(default)]
    pub search: SearchConfig,
    /// DCC transfers.
    #[serde(default)]
    pub dcc: DccConfig,
    /// Request tokens handed to front ends.
    #[serde(default)]
    pub tokens: TokenConfig,
    /// Serving bot (`kindling serve`).
    #[serde(default)]
    pub bot: BotConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
