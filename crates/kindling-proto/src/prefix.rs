//! Message origin.
//!
//! A prefix is either a server name or a `nick[!user][@host]` mask. Only the
//! nickname matters to the client: it picks out which bot sent an offer or
//! a notice, and whom to answer a CTCP query.

use std::fmt;

/// Where a message came from.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// A server, e.g. `irc.example.net`.
    Server(String),
    /// A user mask. `user` and `host` are empty when not sent.
    User {
        /// Nickname.
        nick: String,
        /// Username after `!`.
        user: String,
        /// Hostname after `@`.
        host: String,
    },
}

impl Prefix {
    /// Parse a prefix without validating it.
    ///
    /// A mask containing `!` or `@` is a user; otherwise a dot marks a
    /// server and anything else is a bare nickname.
    pub fn parse(raw: &str) -> Self {
        let (head, host) = match raw.split_once('@') {
            Some((head, host)) => (head, Some(host)),
            None => (raw, None),
        };
        let (nick, user) = match head.split_once('!') {
            Some((nick, user)) => (nick, Some(user)),
            None => (head, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            return Prefix::Server(raw.to_owned());
        }
        Prefix::User {
            nick: nick.to_owned(),
            user: user.unwrap_or_default().to_owned(),
            host: host.unwrap_or_default().to_owned(),
        }
    }

    /// Nickname of a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, user, host } => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}
