//! Multicast message bus.
//!
//! The connection's read loop is the only publisher. Every subscriber gets
//! its own receiver, so each one sees every line in arrival order and can
//! time out or be cancelled without affecting the others.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use kindling_proto::Message;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::BusError;

/// One decoded line from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// The line as received, without its terminator.
    pub raw: String,
    /// The parsed message.
    pub message: Message,
}

impl IncomingMessage {
    /// Parse a raw line. Returns `None` for lines that are not IRC messages.
    pub fn parse(raw: String) -> Option<Self> {
        let message = raw.parse().ok()?;
        Some(Self { raw, message })
    }
}

/// Publishing side of the bus. Cheap to clone.
#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Arc<IncomingMessage>>,
    closed: CancellationToken,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            closed: CancellationToken::new(),
        }
    }

    /// Deliver a line to every current subscriber.
    pub fn publish(&self, message: IncomingMessage) {
        // No subscribers is not an error: the line is simply unobserved.
        let _ = self.tx.send(Arc::new(message));
    }

    /// Start receiving lines published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            deadline: None,
            cancel: CancellationToken::new(),
            closed: self.closed.clone(),
        }
    }

    /// Mark the connection as gone. Subscribers drain what is buffered, then
    /// get [`BusError::Closed`].
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}

/// A receiver with an optional deadline and its own cancellation token.
pub struct Subscription {
    rx: broadcast::Receiver<Arc<IncomingMessage>>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    closed: CancellationToken,
}

impl Subscription {
    /// Fail with [`BusError::TimedOut`] once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail with [`BusError::TimedOut`] at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// A handle that cancels this subscription from elsewhere.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next line, in arrival order.
    pub async fn recv(&mut self) -> Result<Arc<IncomingMessage>, BusError> {
        let deadline = self.deadline;
        let timed_out = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::pin!(timed_out);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(BusError::Cancelled),
                received = self.rx.recv() => match received {
                    Ok(message) => return Ok(message),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Subscriber lagged, lines dropped");
                    }
                    Err(RecvError::Closed) => return Err(BusError::Closed),
                },
                _ = self.closed.cancelled() => return Err(BusError::Closed),
                _ = &mut timed_out => return Err(BusError::TimedOut),
            }
        }
    }

    /// Skip lines until one satisfies `predicate`.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Result<Arc<IncomingMessage>, BusError>
    where
        F: FnMut(&IncomingMessage) -> bool,
    {
        loop {
            let message = self.recv().await?;
            if predicate(&message) {
                return Ok(message);
            }
        }
    }

    /// Skip lines until `f` extracts a value from one.
    pub async fn find_map<T, F>(&mut self, mut f: F) -> Result<T, BusError>
    where
        F: FnMut(&IncomingMessage) -> Option<T>,
    {
        loop {
            let message = self.recv().await?;
            if let Some(value) = f(&message) {
                return Ok(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(raw: &str) -> IncomingMessage {
        IncomingMessage::parse(raw.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_line() {
        let bus = MessageBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(line("PING :one"));
        bus.publish(line("PING :two"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.unwrap().raw, "PING :one");
            assert_eq!(sub.recv().await.unwrap().raw, "PING :two");
        }
    }

    #[tokio::test]
    async fn test_cancel_is_per_subscription() {
        let bus = MessageBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        a.cancel();
        bus.publish(line("PING :x"));

        assert_eq!(a.recv().await.unwrap_err(), BusError::Cancelled);
        assert_eq!(b.recv().await.unwrap().raw, "PING :x");
    }

    #[tokio::test]
    async fn test_deadline() {
        let bus = MessageBus::new(16);
        let mut sub = bus.subscribe().with_timeout(Duration::from_millis(50));

        assert_eq!(sub.recv().await.unwrap_err(), BusError::TimedOut);
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_closed() {
        let bus = MessageBus::new(16);
        let mut sub = bus.subscribe();

        bus.publish(line("NOTICE kindling :last words"));
        bus.close();

        assert_eq!(
            sub.recv().await.unwrap().raw,
            "NOTICE kindling :last words"
        );
        assert_eq!(sub.recv().await.unwrap_err(), BusError::Closed);
    }

    #[tokio::test]
    async fn test_wait_for_skips_unmatched() {
        let bus = MessageBus::new(16);
        let mut sub = bus.subscribe();

        bus.publish(line(":irc.example.net 375 kindling :- MOTD -"));
        bus.publish(line(":irc.example.net 001 kindling :Welcome"));

        let welcome = sub
            .wait_for(|m| m.message.numeric_code() == Some(1))
            .await
            .unwrap();
        assert_eq!(welcome.message.param(0), Some("kindling"));
    }

    #[test]
    fn test_unparseable_line_is_none() {
        assert!(IncomingMessage::parse(":prefix-only".to_string()).is_none());
    }
}
