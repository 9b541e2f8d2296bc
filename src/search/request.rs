//! Waiting on the bus for a bot's answer.

use kindling_proto::{DccMessage, DccParseError, DccSend, Message};
use tracing::{debug, warn};

use crate::error::BusError;
use crate::session::Subscription;

/// Phrase a search bot uses when a query found nothing.
const NO_MATCHES: &str = "returned no matches";

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    QuerySent,
    AwaitingResponse,
    ResultsReady,
    NoMatches,
    TimedOut,
    Failed,
}

impl RequestState {
    /// Whether the request has finished, one way or another.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ResultsReady | Self::NoMatches | Self::TimedOut | Self::Failed
        )
    }
}

/// A DCC offer and who sent it.
#[derive(Debug, Clone)]
pub(crate) struct Offer {
    pub from: String,
    pub send: DccSend,
}

/// Why no offer was taken.
#[derive(Debug)]
pub(crate) enum OfferWaitError {
    /// The deadline passed. Carries the last malformed payload seen, if any.
    TimedOut {
        malformed: Option<(String, DccParseError)>,
    },
    /// The subscription was cancelled or the connection closed.
    Closed,
}

/// Take the first `DCC SEND` offer on `sub`, optionally only from `bot`.
///
/// Malformed DCC payloads are skipped and remembered, never fatal.
pub(crate) async fn wait_for_offer(
    sub: &mut Subscription,
    bot: Option<&str>,
) -> Result<Offer, OfferWaitError> {
    let mut malformed = None;

    loop {
        let incoming = match sub.recv().await {
            Ok(incoming) => incoming,
            Err(BusError::TimedOut) => return Err(OfferWaitError::TimedOut { malformed }),
            Err(BusError::Closed | BusError::Cancelled) => return Err(OfferWaitError::Closed),
        };

        let message = &incoming.message;
        if !message.is("PRIVMSG") {
            continue;
        }
        let Some(from) = message.source_nickname() else {
            continue;
        };
        if bot.is_some_and(|bot| !from.eq_ignore_ascii_case(bot)) {
            continue;
        }
        let Some(ctcp) = message.ctcp() else {
            continue;
        };

        match DccMessage::from_ctcp(&ctcp) {
            Ok(DccMessage::Send(send)) => {
                debug!(from = %from, filename = %send.filename, size = send.size, "Offer received");
                return Ok(Offer {
                    from: from.to_string(),
                    send,
                });
            }
            Ok(_) | Err(DccParseError::NotDcc) => {}
            Err(e) => {
                warn!(from = %from, error = %e, "Ignoring malformed DCC payload");
                malformed = Some((from.to_string(), e));
            }
        }
    }
}

/// Wait for `bot_nick` to report that `query` found nothing.
///
/// Resolves only on such a notice; errors when the subscription ends.
pub(crate) async fn wait_for_no_matches(
    sub: &mut Subscription,
    bot_nick: &str,
    query: &str,
) -> Result<(), BusError> {
    sub.wait_for(|incoming| is_no_matches(&incoming.message, bot_nick, query))
        .await
        .map(|_| ())
}

/// A NOTICE from `bot_nick` naming `query` and saying it returned no matches.
pub fn is_no_matches(message: &Message, bot_nick: &str, query: &str) -> bool {
    if !message.is("NOTICE") {
        return false;
    }
    if !message
        .source_nickname()
        .is_some_and(|from| from.eq_ignore_ascii_case(bot_nick))
    {
        return false;
    }
    message
        .text()
        .is_some_and(|text| text.contains(query) && cleanse(text).contains(NO_MATCHES))
}

/// Replace punctuation with spaces and collapse whitespace runs.
fn cleanse(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{IncomingMessage, MessageBus};
    use std::time::Duration;

    fn parse(raw: &str) -> Message {
        raw.parse().unwrap()
    }

    fn line(raw: &str) -> IncomingMessage {
        IncomingMessage::parse(raw.to_string()).unwrap()
    }

    #[test]
    fn test_no_matches_notice() {
        let notice = parse(
            ":Search!s@h NOTICE kindling :Sorry, your search for \"dune messiah\" returned no matches.",
        );
        assert!(is_no_matches(&notice, "Search", "dune messiah"));
        assert!(!is_no_matches(&notice, "Search", "children of dune"));
        assert!(!is_no_matches(&notice, "Other", "dune messiah"));

        let privmsg = parse(":Search!s@h PRIVMSG kindling :dune returned no matches");
        assert!(!is_no_matches(&privmsg, "Search", "dune"));
    }

    #[test]
    fn test_cleanse_collapses_punctuation() {
        assert_eq!(cleanse("returned--no   matches!!"), "returned no matches");
        assert_eq!(cleanse("  a_b.c  "), "a_b c");
    }

    #[tokio::test]
    async fn test_offer_filtered_by_bot() {
        let bus = MessageBus::new(16);
        let mut sub = bus.subscribe().with_timeout(Duration::from_secs(5));

        bus.publish(line(
            ":Other!o@h PRIVMSG me :\x01DCC SEND other.epub 2130706433 4000 10\x01",
        ));
        bus.publish(line(":BotA!b@h PRIVMSG me :\x01DCC SEND book.epub 2130706433 4001 20\x01"));

        let offer = wait_for_offer(&mut sub, Some("bota")).await.unwrap();
        assert_eq!(offer.from, "BotA");
        assert_eq!(offer.send.filename, "book.epub");
        assert_eq!(offer.send.port, 4001);
    }

    #[tokio::test]
    async fn test_malformed_offer_is_remembered() {
        let bus = MessageBus::new(16);
        let mut sub = bus.subscribe().with_timeout(Duration::from_millis(50));

        bus.publish(line(":BotA!b@h PRIVMSG me :\x01DCC SEND book.epub nope 4001 20\x01"));

        match wait_for_offer(&mut sub, None).await {
            Err(OfferWaitError::TimedOut {
                malformed: Some((bot, DccParseError::InvalidAddress(_))),
            }) => assert_eq!(bot, "BotA"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
