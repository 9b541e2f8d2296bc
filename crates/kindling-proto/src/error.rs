//! Error types for the wire layer.
//!
//! This module defines errors for line framing, IRC message parsing and
//! DCC payload parsing.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors raised while framing lines off a byte stream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Length seen so far.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty or only whitespace.
    #[error("empty message")]
    EmptyMessage,

    /// Command was missing or not `1*letter / 3digit`.
    #[error("invalid command: {0:?}")]
    InvalidCommand(String),
}

/// Errors encountered when parsing a DCC payload.
///
/// Callers waiting for an offer treat any of these as "not a DCC offer".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DccParseError {
    /// Payload is not a `DCC ...` CTCP.
    #[error("not a DCC payload")]
    NotDcc,

    /// Subcommand other than SEND, RESUME or ACCEPT.
    #[error("unsupported DCC subcommand: {0}")]
    UnknownSubcommand(String),

    /// Wrong number of fields after the subcommand.
    #[error("wrong field count for DCC {subcommand}: expected {expected}, got {got}")]
    FieldCount {
        /// The subcommand being parsed.
        subcommand: &'static str,
        /// Expected number of fields (including the filename).
        expected: usize,
        /// Actual number of fields.
        got: usize,
    },

    /// A quoted filename had no closing quote.
    #[error("unterminated quoted filename")]
    UnterminatedQuote,

    /// The IP field was not an unsigned 32-bit integer.
    #[error("invalid DCC address: {0}")]
    InvalidAddress(String),

    /// The port field was not a 16-bit integer.
    #[error("invalid DCC port: {0}")]
    InvalidPort(String),

    /// A size or position field was not an unsigned integer.
    #[error("invalid DCC number: {0}")]
    InvalidNumber(String),
}
