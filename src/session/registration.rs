//! Registration handshake.

use kindling_proto::{Message, Response};
use rand::Rng;
use tracing::{info, warn};

use super::{IrcSession, SessionState};
use crate::error::{BusError, SessionError};

/// A fallback nickname: the requested one with three random digits appended.
pub fn nick_variant(nick: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(100..1000);
    format!("{nick}{suffix}")
}

impl IrcSession {
    /// Send NICK/USER and wait for RPL_WELCOME.
    ///
    /// A rejected nickname is retried once with [`nick_variant`]. The
    /// registration timeout covers the whole exchange, retry included.
    pub(super) async fn register(&self) -> Result<(), SessionError> {
        let mut replies = self
            .messages()
            .with_timeout(self.config.registration_timeout());

        let requested = self.config.nickname.clone();
        let mut nick = requested.clone();
        let mut retried = false;

        self.send_message(Message::nick(&nick)).await?;
        self.send_message(Message::user(
            self.config.username(),
            self.config.realname(),
        ))
        .await?;

        loop {
            let incoming = match replies.recv().await {
                Ok(incoming) => incoming,
                Err(BusError::TimedOut) => {
                    warn!(nick = %nick, "Registration timed out");
                    return Err(SessionError::RegistrationTimeout);
                }
                Err(_) => return Err(SessionError::ConnectionClosed),
            };
            let message = &incoming.message;

            match message.response() {
                Some(Response::RPL_WELCOME) => {
                    if let Some(accepted) = message.param(0) {
                        nick = accepted.to_string();
                    }
                    *self.nickname.write() = nick.clone();
                    self.state.send_replace(SessionState::Registered);
                    info!(nick = %nick, "Registered");
                    return Ok(());
                }
                Some(response) if response.is_nick_rejection() => {
                    if retried {
                        warn!(nick = %nick, code = response.code(), "Nickname rejected again");
                        return Err(SessionError::NickRejected(nick));
                    }
                    retried = true;
                    nick = nick_variant(&requested);
                    warn!(code = response.code(), retry = %nick, "Nickname rejected, retrying");
                    self.send_message(Message::nick(&nick)).await?;
                }
                _ if message.is("ERROR") => return Err(SessionError::ConnectionClosed),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nick_variant_appends_digits() {
        for _ in 0..20 {
            let variant = nick_variant("kindling");
            let suffix = variant.strip_prefix("kindling").unwrap();
            assert_eq!(suffix.len(), 3);
            assert!(suffix.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
