//! DCC transfer configuration.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use super::defaults::{default_bind_address, default_transfer_timeout};

/// DCC transfer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DccConfig {
    /// Seconds to wait for a connection or for the next chunk of data.
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,
    /// Send 32-bit big-endian byte-count acknowledgements while receiving.
    #[serde(default)]
    pub acknowledge: bool,
    /// Address the sender role listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port the sender role listens on (0 picks an ephemeral port).
    #[serde(default)]
    pub listen_port: u16,
    /// IPv4 address announced in outgoing DCC SEND offers.
    /// Empty means the local address of the IRC connection.
    #[serde(default)]
    pub announce_address: String,
}

impl Default for DccConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_secs: default_transfer_timeout(),
            acknowledge: false,
            bind_address: default_bind_address(),
            listen_port: 0,
            announce_address: String::new(),
        }
    }
}

impl DccConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    /// Parsed bind address; validation rejects unparsable values.
    pub fn bind_ip(&self) -> IpAddr {
        self.bind_address
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Configured announce address, if any.
    pub fn announce_ip(&self) -> Option<Ipv4Addr> {
        self.announce_address.parse().ok()
    }
}
