//! Search, token and serving-bot configuration.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    default_bot_nick, default_library, default_listing, default_response_timeout,
    default_token_ttl, default_trigger,
};

/// Search request configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Channel command prefix; a query is sent as `<trigger> <query>`.
    #[serde(default = "default_trigger")]
    pub trigger: String,
    /// Nick of the search bot that reports "returned no matches".
    #[serde(default = "default_bot_nick")]
    pub bot_nick: String,
    /// Seconds to wait for a DCC offer or a no-matches notice.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            bot_nick: default_bot_nick(),
            response_timeout_secs: default_response_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// Request token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Token lifetime in seconds (default: 600).
    #[serde(default = "default_token_ttl")]
    pub ttl_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_token_ttl(),
        }
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Serving bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// File offered in answer to a search trigger.
    #[serde(default = "default_listing")]
    pub listing: PathBuf,
    /// Directory files are served from on `!<nick> <file>` requests.
    #[serde(default = "default_library")]
    pub library: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            listing: default_listing(),
            library: default_library(),
        }
    }
}
