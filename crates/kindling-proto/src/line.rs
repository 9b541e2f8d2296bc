//! Line-based codec for tokio.
//!
//! Frames a byte stream into `\n`-terminated lines (a preceding `\r` is
//! dropped) and serializes outbound lines with a `\r\n` terminator.
//!
//! Inbound bytes are decoded as UTF-8 first. Lines that are not valid UTF-8
//! fall back to a single-byte decoding (windows-1252, a superset of
//! Latin-1), so a line is never lost because of its encoding.

use bytes::BytesMut;
use encoding::WINDOWS_1252;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;

/// Maximum line length (8191 bytes, matching modern IRC servers with tags).
pub const MAX_LINE_LEN: usize = 8191;

/// Line-based codec that handles `\r\n`-terminated protocol lines.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new codec with the default maximum line length.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a new codec with custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Truncate outgoing data at its first line ending.
    ///
    /// A caller can never smuggle a second protocol line through a single
    /// write.
    pub fn sanitize(data: &str) -> &str {
        match data.find(['\r', '\n']) {
            Some(pos) => &data[..pos],
            None => data,
        }
    }
}

/// Decode raw line bytes into text.
///
/// Strict UTF-8 is attempted first; otherwise every byte is mapped through
/// windows-1252.
pub fn decode_text(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_owned(),
        Err(_) => {
            let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(raw);
            if had_errors {
                tracing::warn!(len = raw.len(), "undecodable bytes replaced in line");
            } else {
                tracing::debug!(len = raw.len(), "line decoded as windows-1252");
            }
            text.into_owned()
        }
    }
}

fn strip_terminator(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            // Look for newline starting from where we left off
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                // No complete line yet - remember where we stopped
                self.next_index = src.len();

                if src.len() > self.max_len {
                    return Err(error::ProtocolError::MessageTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }

                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let body = strip_terminator(&line);
            if body.is_empty() {
                continue;
            }

            return Ok(Some(decode_text(body)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        // Peer closed mid-line: hand out what is left.
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        let body = strip_terminator(&rest);
        if body.is_empty() {
            Ok(None)
        } else {
            Ok(Some(decode_text(body)))
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        Encoder::<&str>::encode(self, msg.as_str(), dst)
    }
}

impl Encoder<&str> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: &str, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(msg);
        if line.len() + 2 > self.max_len {
            return Err(error::ProtocolError::MessageTooLong {
                actual: line.len() + 2,
                limit: self.max_len,
            });
        }
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
