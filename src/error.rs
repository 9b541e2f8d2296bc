//! Unified error handling for kindling.
//!
//! One error hierarchy per layer: the IRC session, DCC transfers and the
//! search/download orchestrator. Every variant has a static label for
//! structured logging.

use std::net::SocketAddr;
use std::time::Duration;

use kindling_proto::DccParseError;
use thiserror::Error;

// ============================================================================
// Message Bus Errors
// ============================================================================

/// Why a bus subscription stopped yielding lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// The connection went away.
    #[error("connection closed")]
    Closed,

    /// The subscription's deadline passed.
    #[error("subscription timed out")]
    TimedOut,

    /// The subscription was cancelled by its owner.
    #[error("subscription cancelled")]
    Cancelled,
}

// ============================================================================
// Session Errors (connection and registration)
// ============================================================================

/// Errors raised while connecting to or talking with the IRC server.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {reason}")]
    Tls { host: String, reason: String },

    #[error("connecting to {addr} timed out")]
    ConnectTimeout { addr: String },

    #[error("registration timed out")]
    RegistrationTimeout,

    #[error("nickname rejected: {0}")]
    NickRejected(String),

    #[error("connection closed")]
    ConnectionClosed,
}

impl SessionError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect_failed",
            Self::Tls { .. } => "tls_failed",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::RegistrationTimeout => "registration_timeout",
            Self::NickRejected(_) => "nick_rejected",
            Self::ConnectionClosed => "connection_closed",
        }
    }
}

impl From<BusError> for SessionError {
    fn from(_: BusError) -> Self {
        Self::ConnectionClosed
    }
}

// ============================================================================
// Transfer Errors (DCC data connections)
// ============================================================================

/// Errors raised by a DCC transfer in either role.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to connect to {peer}: {source}")]
    Connect {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no data or connection within {0:?}")]
    Timeout(Duration),

    #[error("transfer incomplete: received {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },

    #[error("transfer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resume rejected: {0}")]
    ResumeRejected(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl TransferError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "transfer_connect_failed",
            Self::Timeout(_) => "transfer_timeout",
            Self::Incomplete { .. } => "incomplete_transfer",
            Self::Io(_) => "transfer_io",
            Self::ResumeRejected(_) => "resume_rejected",
            Self::Session(_) => "session",
        }
    }
}

// ============================================================================
// Search Errors (orchestrator)
// ============================================================================

/// Errors returned by search and download requests.
///
/// Failures tied to a bot carry its nick so the caller can retry elsewhere.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no response to search for {query:?}")]
    NoSearchResponse { query: String },

    #[error("{bot} did not offer the requested file")]
    OfferTimeout { bot: String },

    #[error("malformed DCC offer from {bot}: {source}")]
    MalformedDccOffer {
        bot: String,
        #[source]
        source: DccParseError,
    },

    #[error("transfer from {bot} failed: {source}")]
    Transfer {
        bot: String,
        #[source]
        source: TransferError,
    },

    #[error("failed to decode search results: {0}")]
    DecodeFailure(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SearchError {
    /// Get a static error code string for logging.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSearchResponse { .. } => "no_search_response",
            Self::OfferTimeout { .. } => "offer_timeout",
            Self::MalformedDccOffer { .. } => "malformed_dcc_offer",
            Self::Transfer { .. } => "transfer_failed",
            Self::DecodeFailure(_) => "decode_failure",
            Self::Session(_) => "session",
        }
    }

    /// The bot involved, when the failure is attributable to one.
    pub fn bot(&self) -> Option<&str> {
        match self {
            Self::OfferTimeout { bot }
            | Self::MalformedDccOffer { bot, .. }
            | Self::Transfer { bot, .. } => Some(bot),
            _ => None,
        }
    }
}
