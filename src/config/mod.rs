//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: the top-level [`Config`] and file loading
//! - [`irc`]: server connection and registration settings (IrcConfig)
//! - [`dcc`]: transfer timeouts, acknowledgements and listener addresses (DccConfig)
//! - [`search`]: search trigger and bot, request tokens, serving bot (SearchConfig, TokenConfig, BotConfig)
//! - [`validation`]: startup checks returning every problem found

mod dcc;
mod defaults;
mod irc;
mod search;
mod types;
pub mod validation;

pub use dcc::DccConfig;
pub use irc::IrcConfig;
pub use search::{BotConfig, SearchConfig, TokenConfig};
pub use types::{Config, ConfigError};
pub use validation::{ValidationError, validate};
