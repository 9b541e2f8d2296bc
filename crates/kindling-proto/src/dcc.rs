//! DCC (Direct Client-to-Client) negotiation payloads.
//!
//! DCC offers and resume negotiation travel as CTCP payloads over IRC:
//!
//! ```text
//! DCC SEND <filename> <ip> <port> <filesize>
//! DCC RESUME <filename> <port> <position>
//! DCC ACCEPT <filename> <port> <position>
//! ```
//!
//! `<ip>` is an IPv4 address packed into one unsigned 32-bit integer in
//! network byte order and written in decimal, as mIRC-style clients do. A
//! filename containing spaces may be double-quoted.
//!
//! # Reference
//! - mIRC resume protocol: <https://www.mirc.com/help/html/index.html?dcc_resume_protocol.html>
//!
//! # Example
//!
//! ```
//! use kindling_proto::dcc::DccMessage;
//!
//! let msg: DccMessage = "\x01DCC SEND book.epub 3232235521 1027 4096\x01".parse().unwrap();
//! let DccMessage::Send(offer) = msg else { panic!("not a SEND") };
//! assert_eq!(offer.ip().to_string(), "192.168.0.1");
//! assert_eq!(offer.port, 1027);
//! assert_eq!(offer.size, 4096);
//! ```

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use crate::ctcp::{Ctcp, CtcpKind, CTCP_DELIM};
use crate::error::DccParseError;

/// Pack an IPv4 address into the DCC integer form.
pub fn encode_ip(ip: Ipv4Addr) -> u32 {
    let [b0, b1, b2, b3] = ip.octets();
    (u32::from(b0) << 24) | (u32::from(b1) << 16) | (u32::from(b2) << 8) | u32::from(b3)
}

/// Unpack the DCC integer form into an IPv4 address.
pub fn decode_ip(ip: u32) -> Ipv4Addr {
    Ipv4Addr::new(
        ((ip >> 24) & 0xFF) as u8,
        ((ip >> 16) & 0xFF) as u8,
        ((ip >> 8) & 0xFF) as u8,
        (ip & 0xFF) as u8,
    )
}

/// Replace spaces with underscores for transmission.
pub fn wire_filename(name: &str) -> String {
    name.replace(' ', "_")
}

/// A `DCC SEND` offer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DccSend {
    /// Filename as transmitted (spaces replaced with underscores).
    pub filename: String,
    /// Sender address in DCC integer form.
    pub address: u32,
    /// Port the sender is listening on.
    pub port: u16,
    /// Declared file length in bytes.
    pub size: u64,
}

impl DccSend {
    /// Build an offer, normalizing spaces in the filename.
    pub fn new(filename: &str, ip: Ipv4Addr, port: u16, size: u64) -> Self {
        Self {
            filename: wire_filename(filename),
            address: encode_ip(ip),
            port,
            size,
        }
    }

    /// The sender address.
    pub fn ip(&self) -> Ipv4Addr {
        decode_ip(self.address)
    }

    /// Where to connect to receive the file.
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip(), self.port)
    }

    /// Filename with underscores turned back into spaces.
    pub fn display_name(&self) -> String {
        self.filename.replace('_', " ")
    }
}

/// A `DCC RESUME` request from a receiver.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DccResume {
    /// Filename of the original offer.
    pub filename: String,
    /// Port of the original offer.
    pub port: u16,
    /// Byte offset to resume from.
    pub position: u64,
}

/// A `DCC ACCEPT` reply from a sender.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DccAccept {
    /// Filename of the original offer.
    pub filename: String,
    /// Port of the original offer.
    pub port: u16,
    /// Byte offset the sender will stream from.
    pub position: u64,
}

impl DccResume {
    /// The ACCEPT that grants this request.
    pub fn accept(&self) -> DccAccept {
        DccAccept {
            filename: self.filename.clone(),
            port: self.port,
            position: self.position,
        }
    }
}

/// Any DCC payload this crate understands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DccMessage {
    /// File offer.
    Send(DccSend),
    /// Resume request (receiver to sender).
    Resume(DccResume),
    /// Resume grant (sender to receiver).
    Accept(DccAccept),
}

impl DccMessage {
    /// Parse the parameters of a CTCP whose kind is DCC.
    pub fn from_ctcp(ctcp: &Ctcp<'_>) -> Result<Self, DccParseError> {
        if ctcp.kind != CtcpKind::Dcc {
            return Err(DccParseError::NotDcc);
        }
        parse_params(ctcp.params.unwrap_or_default())
    }

    /// Render as a complete CTCP body, delimiters included.
    pub fn to_ctcp_string(&self) -> String {
        format!("{}{}{}", CTCP_DELIM, self, CTCP_DELIM)
    }
}

/// Split DCC fields, honouring a double-quoted filename in first position.
fn split_fields(rest: &str) -> Result<Vec<&str>, DccParseError> {
    let rest = rest.trim();
    if let Some(quoted) = rest.strip_prefix('"') {
        let end = quoted.find('"').ok_or(DccParseError::UnterminatedQuote)?;
        let mut fields = vec![&quoted[..end]];
        fields.extend(quoted[end + 1..].split_whitespace());
        Ok(fields)
    } else {
        Ok(rest.split_whitespace().collect())
    }
}

/// Read an unquoted filename containing spaces by taking the last
/// `expected - 1` fields as the numeric tail and the rest as the name.
///
/// The tail must be all digits and the name must not itself end in a
/// numeric word, otherwise the field count stays ambiguous.
fn unquoted_spaced(rest: &str, expected: usize) -> Option<Vec<&str>> {
    let mut head = rest.trim();
    let mut tail = Vec::with_capacity(expected);
    for _ in 1..expected {
        let (before, field) = head.rsplit_once(char::is_whitespace)?;
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        tail.push(field);
        head = before.trim_end();
    }

    let last_word = head.rsplit(char::is_whitespace).next()?;
    if head.is_empty() || last_word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.push(head);
    tail.reverse();
    Some(tail)
}

fn expect_fields<'a>(
    subcommand: &'static str,
    rest: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, DccParseError> {
    let mut fields = split_fields(rest)?;
    if fields.len() > expected && !rest.trim_start().starts_with('"') {
        if let Some(spaced) = unquoted_spaced(rest, expected) {
            fields = spaced;
        }
    }
    if fields.len() != expected {
        return Err(DccParseError::FieldCount {
            subcommand,
            expected,
            got: fields.len(),
        });
    }
    Ok(fields)
}

fn parse_port(field: &str) -> Result<u16, DccParseError> {
    field
        .parse()
        .map_err(|_| DccParseError::InvalidPort(field.to_owned()))
}

fn parse_number(field: &str) -> Result<u64, DccParseError> {
    field
        .parse()
        .map_err(|_| DccParseError::InvalidNumber(field.to_owned()))
}

/// Parse `SEND ...`, `RESUME ...` or `ACCEPT ...`.
fn parse_params(params: &str) -> Result<DccMessage, DccParseError> {
    let params = params.trim_start();
    let (subcommand, rest) = params.split_once(' ').unwrap_or((params, ""));

    match subcommand.to_ascii_uppercase().as_str() {
        "SEND" => {
            let fields = expect_fields("SEND", rest, 4)?;
            let address = fields[1]
                .parse::<u32>()
                .map_err(|_| DccParseError::InvalidAddress(fields[1].to_owned()))?;
            let port = parse_port(fields[2])?;
            if port == 0 {
                return Err(DccParseError::InvalidPort(fields[2].to_owned()));
            }
            Ok(DccMessage::Send(DccSend {
                filename: fields[0].to_owned(),
                address,
                port,
                size: parse_number(fields[3])?,
            }))
        }
        "RESUME" => {
            let fields = expect_fields("RESUME", rest, 3)?;
            Ok(DccMessage::Resume(DccResume {
                filename: fields[0].to_owned(),
                port: parse_port(fields[1])?,
                position: parse_number(fields[2])?,
            }))
        }
        "ACCEPT" => {
            let fields = expect_fields("ACCEPT", rest, 3)?;
            Ok(DccMessage::Accept(DccAccept {
                filename: fields[0].to_owned(),
                port: parse_port(fields[1])?,
                position: parse_number(fields[2])?,
            }))
        }
        "" => Err(DccParseError::NotDcc),
        other => Err(DccParseError::UnknownSubcommand(other.to_owned())),
    }
}

impl FromStr for DccMessage {
    type Err = DccParseError;

    /// Parse `DCC ...`, with or without the surrounding CTCP delimiters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix(CTCP_DELIM).unwrap_or(s);
        let body = body.strip_suffix(CTCP_DELIM).unwrap_or(body);
        let (kind, params) = body.split_once(' ').unwrap_or((body, ""));
        if !kind.eq_ignore_ascii_case("DCC") {
            return Err(DccParseError::NotDcc);
        }
        parse_params(params)
    }
}

struct Filename<'a>(&'a str);

impl fmt::Display for Filename<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.contains(' ') {
            write!(f, "\"{}\"", self.0)
        } else {
            f.write_str(self.0)
        }
    }
}

impl fmt::Display for DccMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DccMessage::Send(send) => write!(
                f,
                "DCC SEND {} {} {} {}",
                Filename(&send.filename),
                send.address,
                send.port,
                send.size
            ),
            DccMessage::Resume(resume) => write!(
                f,
                "DCC RESUME {} {} {}",
                Filename(&resume.filename),
                resume.port,
                resume.position
            ),
            DccMessage::Accept(accept) => write!(
                f,
                "DCC ACCEPT {} {} {}",
                Filename(&accept.filename),
                accept.port,
                accept.position
            ),
        }
    }
}
