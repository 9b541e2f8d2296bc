//! DCC file transfers.
//!
//! Offers and resume negotiation travel over IRC (see
//! [`kindling_proto::dcc`]); the bytes travel over a separate TCP connection
//! per transfer:
//!
//! - [`receive`] connects to an offer and streams it into a [`TransferSink`];
//!   [`resume`] first negotiates `DCC RESUME`/`DCC ACCEPT` for a sink that
//!   already holds part of the file.
//! - [`DccSender`] listens, announces a `DCC SEND`, honours a `DCC RESUME`
//!   and streams a [`Payload`] to the one peer that connects.
//!
//! Each transfer owns its socket and byte counter, and releases the socket
//! on every exit path.

mod receiver;
mod sender;
mod sink;

pub use receiver::{receive, resume};
pub use sender::{DccSender, Payload};
pub use sink::{FileSink, MemorySink, TransferSink};

use std::time::Duration;

use kindling_proto::DccSend;

use crate::config::DccConfig;

/// Read buffer size for data connections.
pub(crate) const CHUNK_SIZE: usize = 8 * 1024;

/// Receiver-side transfer settings.
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Upper bound on connecting and on waiting for each chunk.
    pub timeout: Duration,
    /// Send cumulative 32-bit byte-count acknowledgements.
    pub acknowledge: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::from(&DccConfig::default())
    }
}

impl From<&DccConfig> for TransferOptions {
    fn from(config: &DccConfig) -> Self {
        Self {
            timeout: config.transfer_timeout(),
            acknowledge: config.acknowledge,
        }
    }
}

/// Outcome of a finished transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The offer that was served or received.
    pub offer: DccSend,
    /// Byte offset the stream started at (non-zero after a resume).
    pub start_offset: u64,
    /// Bytes moved over the data connection.
    pub transferred: u64,
    /// Whether the full declared length is now held by the receiver.
    pub complete: bool,
}

impl Transfer {
    /// Total bytes held by the receiver.
    pub fn total(&self) -> u64 {
        self.start_offset + self.transferred
    }
}
