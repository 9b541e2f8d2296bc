//! CTCP payloads.
//!
//! CTCP rides inside PRIVMSG (queries) and NOTICE (replies) bodies, framed
//! by `\x01` on both sides: `\x01<KIND>[ <params>]\x01`.
//!
//! # Example
//!
//! ```
//! use kindling_proto::ctcp::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01DCC SEND book.epub 3232235521 1027 4096\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Dcc);
//! assert_eq!(ctcp.params, Some("SEND book.epub 3232235521 1027 4096"));
//!
//! let version = Ctcp::version_reply("kindling 0.3.0");
//! assert_eq!(version.to_string(), "\x01VERSION kindling 0.3.0\x01");
//! ```

use std::fmt;

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// The CTCP kinds the client tells apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// Client version query.
    Version,
    /// Latency probe, echoed back verbatim.
    Ping,
    /// Local time query.
    Time,
    /// DCC negotiation (see [`crate::dcc`]).
    Dcc,
    /// Anything else, as sent.
    Other(String),
}

impl CtcpKind {
    fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("VERSION") {
            Self::Version
        } else if name.eq_ignore_ascii_case("PING") {
            Self::Ping
        } else if name.eq_ignore_ascii_case("TIME") {
            Self::Time
        } else if name.eq_ignore_ascii_case("DCC") {
            Self::Dcc
        } else {
            Self::Other(name.to_owned())
        }
    }

    /// Wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Dcc => "DCC",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CTCP payload borrowed from a message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// What is being asked or answered.
    pub kind: CtcpKind,
    /// Everything after the kind, if non-empty.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// A payload of `kind` carrying `params`.
    pub fn new(kind: CtcpKind, params: Option<&'a str>) -> Self {
        Self { kind, params }
    }

    /// `\x01VERSION <version>\x01`
    pub fn version_reply(version: &'a str) -> Self {
        Self::new(CtcpKind::Version, Some(version))
    }

    /// Parse a PRIVMSG/NOTICE body.
    ///
    /// Bodies not starting with the delimiter are not CTCP. Some clients
    /// omit the closing delimiter; that is accepted.
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(CTCP_DELIM)?;
        let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);

        let (name, params) = match body.split_once(' ') {
            Some((name, params)) => (name, Some(params).filter(|p| !p.is_empty())),
            None => (body, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self::new(CtcpKind::from_name(name), params))
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params {
            Some(params) => write!(f, "{CTCP_DELIM}{} {params}{CTCP_DELIM}", self.kind),
            None => write!(f, "{CTCP_DELIM}{}{CTCP_DELIM}", self.kind),
        }
    }
}
