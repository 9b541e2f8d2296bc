//! IRC numeric replies the client reacts to.
//!
//! Only the registration-relevant subset of RFC 2812 numerics is named here;
//! any other three-digit command still parses and is available through
//! [`Message::numeric_code`](crate::Message::numeric_code).

#![allow(non_camel_case_types)]

/// IRC server response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use
    ERR_NICKNAMEINUSE = 433,
    /// 436 - Nickname collision
    ERR_NICKCOLLISION = 436,
}

impl Response {
    /// Numeric value of this response.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a known response by numeric value.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::RPL_WELCOME),
            432 => Some(Self::ERR_ERRONEUSNICKNAME),
            433 => Some(Self::ERR_NICKNAMEINUSE),
            436 => Some(Self::ERR_NICKCOLLISION),
            _ => None,
        }
    }

    /// Whether this numeric means the requested nickname was refused.
    pub fn is_nick_rejection(self) -> bool {
        matches!(
            self,
            Self::ERR_ERRONEUSNICKNAME | Self::ERR_NICKNAMEINUSE | Self::ERR_NICKCOLLISION
        )
    }
}
