//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::path::PathBuf;

// =============================================================================
// IRC Defaults
// =============================================================================

pub fn default_host() -> String {
    "irc.irchighway.net".to_string()
}

pub fn default_port() -> u16 {
    6667
}

pub fn default_nickname() -> String {
    "kindling".to_string()
}

pub fn default_channel() -> String {
    "#ebooks".to_string()
}

pub fn default_version_reply() -> String {
    format!("kindling {}", env!("CARGO_PKG_VERSION"))
}

pub fn default_connect_timeout() -> u64 {
    10
}

pub fn default_registration_timeout() -> u64 {
    10
}

pub fn default_bus_capacity() -> usize {
    1024
}

// =============================================================================
// Search Defaults
// =============================================================================

pub fn default_trigger() -> String {
    "@search".to_string()
}

pub fn default_bot_nick() -> String {
    "Search".to_string()
}

pub fn default_response_timeout() -> u64 {
    10
}

// =============================================================================
// DCC Defaults
// =============================================================================

pub fn default_transfer_timeout() -> u64 {
    30
}

pub fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

// =============================================================================
// Token / Bot Defaults
// =============================================================================

pub fn default_token_ttl() -> u64 {
    600
}

pub fn default_listing() -> PathBuf {
    PathBuf::from("listing.zip")
}

pub fn default_library() -> PathBuf {
    PathBuf::from("library")
}
