//! IRC connection and registration configuration.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    default_bus_capacity, default_channel, default_connect_timeout, default_host,
    default_nickname, default_port, default_registration_timeout, default_version_reply,
};

/// IRC server and identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connect with TLS, verifying against the system roots.
    #[serde(default)]
    pub tls: bool,
    /// Requested nickname. Random digits are appended once if it is taken.
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Username sent in USER (defaults to the nickname).
    #[serde(default)]
    pub username: String,
    /// Real name sent in USER (defaults to the nickname).
    #[serde(default)]
    pub realname: String,
    /// Channel where searches and requests are posted.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Text returned for CTCP VERSION.
    #[serde(default = "default_version_reply")]
    pub version_reply: String,
    /// Seconds allowed for the TCP (and TLS) connect.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Seconds allowed between NICK/USER and RPL_WELCOME.
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_secs: u64,
    /// Lines buffered per subscriber before it starts lagging.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: false,
            nickname: default_nickname(),
            username: String::new(),
            realname: String::new(),
            channel: default_channel(),
            version_reply: default_version_reply(),
            connect_timeout_secs: default_connect_timeout(),
            registration_timeout_secs: default_registration_timeout(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl IrcConfig {
    /// Username for USER, falling back to the nickname.
    pub fn username(&self) -> &str {
        if self.username.is_empty() {
            &self.nickname
        } else {
            &self.username
        }
    }

    /// Real name for USER, falling back to the nickname.
    pub fn realname(&self) -> &str {
        if self.realname.is_empty() {
            &self.nickname
        } else {
            &self.realname
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }
}
