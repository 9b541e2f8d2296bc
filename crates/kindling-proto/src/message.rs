//! Owned IRC messages.
//!
//! ```text
//! [@tags] [:prefix] <command> [params...] [:trailing]
//! ```
//!
//! The front of the line (tags, prefix, command) is parsed with nom; the
//! parameter list is split by hand since the trailing parameter swallows
//! everything after its colon.
//!
//! # Example
//!
//! ```
//! use kindling_proto::Message;
//!
//! let msg: Message = ":Search!s@host NOTICE kindling :Your search returned no matches"
//!     .parse()
//!     .unwrap();
//! assert_eq!(msg.command, "NOTICE");
//! assert_eq!(msg.source_nickname(), Some("Search"));
//! assert_eq!(msg.text(), Some("Your search returned no matches"));
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    sequence::preceded,
    IResult,
};

use crate::ctcp::Ctcp;
use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::Response;

/// An owned IRC message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Raw IRCv3 tag section (without the leading `@`), kept verbatim.
    pub tags: Option<String>,
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// Command name, upper-cased (`PRIVMSG`, `001`, ...).
    pub command: String,
    /// Parameters, the trailing one included.
    pub params: Vec<String>,
    /// Whether the last parameter is written with a leading `:`.
    pub trailing: bool,
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till1(|c: char| c == ' '))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c: char| c != ' '))(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

/// Split the parameter section. Returns the params and whether the last one
/// was a `:`-trailing parameter.
fn parse_params(mut rest: &str) -> (Vec<String>, bool) {
    let mut params = Vec::new();

    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return (params, false);
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing.to_owned());
            return (params, true);
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(rest[..end].to_owned());
        rest = &rest[end..];
    }
}

impl Message {
    /// Create a message from a command and its parameters.
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: None,
            prefix: None,
            command: command.to_ascii_uppercase(),
            params: params.into_iter().map(Into::into).collect(),
            trailing: false,
        }
    }

    /// Force the last parameter to be written as a trailing parameter.
    #[must_use]
    pub fn with_trailing(mut self) -> Self {
        self.trailing = !self.params.is_empty();
        self
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text]).with_trailing()
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", [target, text]).with_trailing()
    }

    /// `NOTICE <target> :\x01...\x01`
    pub fn ctcp_reply(target: &str, ctcp: &Ctcp<'_>) -> Self {
        Self::notice(target, &ctcp.to_string())
    }

    /// `JOIN <channel>`
    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", [channel])
    }

    /// `NICK <nickname>`
    pub fn nick(nickname: &str) -> Self {
        Self::new("NICK", [nickname])
    }

    /// `USER <username> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname]).with_trailing()
    }

    /// `PONG :<token>`, or a bare `PONG` when the PING carried nothing.
    pub fn pong(token: Option<&str>) -> Self {
        match token {
            Some(token) => Self::new("PONG", [token]).with_trailing(),
            None => Self::new("PONG", Vec::<String>::new()),
        }
    }

    /// `QUIT [:<reason>]`
    pub fn quit(reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Self::new("QUIT", [reason]).with_trailing(),
            None => Self::new("QUIT", Vec::<String>::new()),
        }
    }

    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric value when the command is a three-digit reply.
    pub fn numeric_code(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// The named [`Response`] for known numerics.
    pub fn response(&self) -> Option<Response> {
        self.numeric_code().and_then(Response::from_code)
    }

    /// Get a parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The body of a PRIVMSG or NOTICE.
    pub fn text(&self) -> Option<&str> {
        if self.is("PRIVMSG") || self.is("NOTICE") {
            self.param(1)
        } else {
            None
        }
    }

    /// The CTCP payload carried by a PRIVMSG or NOTICE, if any.
    pub fn ctcp(&self) -> Option<Ctcp<'_>> {
        self.text().and_then(Ctcp::parse)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let invalid = || MessageParseError::InvalidCommand(line.to_owned());

        let (input, tags) = opt(parse_tags)(line).map_err(|_| invalid())?;
        let (input, _) = space0::<_, nom::error::Error<&str>>(input).map_err(|_| invalid())?;
        let (input, prefix) = opt(parse_prefix)(input).map_err(|_| invalid())?;
        let (input, _) = space0::<_, nom::error::Error<&str>>(input).map_err(|_| invalid())?;
        let (rest, command) = parse_command(input).map_err(|_| invalid())?;

        // RFC 2812: command = 1*letter / 3digit
        let is_all_letters = command.chars().all(|c| c.is_ascii_alphabetic());
        let is_three_digits = command.len() == 3 && command.chars().all(|c| c.is_ascii_digit());
        if !(is_all_letters || is_three_digits) {
            return Err(invalid());
        }
        if !rest.is_empty() && !rest.starts_with(' ') {
            return Err(invalid());
        }

        let (params, trailing) = parse_params(rest);

        Ok(Self {
            tags: tags.map(str::to_owned),
            prefix: prefix.map(Prefix::parse),
            command: command.to_ascii_uppercase(),
            params,
            trailing,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            write!(f, "@{} ", tags)?;
        }
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", param)?;
            }
            let needs_colon =
                self.trailing || last.is_empty() || last.contains(' ') || last.starts_with(':');
            if needs_colon {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }
}
