//! # kindling-proto
//!
//! Wire formats spoken by the kindling e-book client: IRC line framing,
//! message parsing, CTCP payloads and the DCC SEND/RESUME/ACCEPT
//! negotiation strings.
//!
//! ## Features
//!
//! - Tolerant IRC message parsing (tags, prefix, command, parameters)
//! - `\r\n` line codec with a windows-1252 fallback for non-UTF-8 lines
//! - CTCP framing and DCC payload encoding/decoding
//!
//! ## Quick Start
//!
//! ```rust
//! use kindling_proto::{DccMessage, Message};
//!
//! let raw = ":Bot!b@h PRIVMSG kindling :\x01DCC SEND book.epub 2130706433 5000 42\x01";
//! let message: Message = raw.parse().expect("valid IRC message");
//! let ctcp = message.ctcp().expect("CTCP payload");
//! let offer = DccMessage::from_ctcp(&ctcp).expect("DCC payload");
//! assert!(matches!(offer, DccMessage::Send(_)));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod ctcp;
pub mod dcc;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::ctcp::{Ctcp, CtcpKind, CTCP_DELIM};
pub use self::dcc::{decode_ip, encode_ip, DccAccept, DccMessage, DccResume, DccSend};
pub use self::error::{DccParseError, MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, MAX_LINE_LEN};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;
