//! IRC session.
//!
//! [`IrcSession`] owns a [`Connection`] through three tasks:
//!
//! - the read loop, sole reader of the socket and sole publisher on the
//!   [`MessageBus`];
//! - the write loop, which drains a queue so whole lines never interleave;
//! - the responder, a bus subscriber answering PING and CTCP queries.
//!
//! Everything else (registration, searches, DCC negotiation) subscribes to
//! the bus and writes through [`IrcSession::send_message`].

mod bus;
mod registration;
mod responder;

pub use bus::{IncomingMessage, MessageBus, Subscription};
pub use registration::nick_variant;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kindling_proto::{DccMessage, Message};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};

use crate::config::IrcConfig;
use crate::error::SessionError;
use crate::network::{Connection, LineReader, LineWriter};
use crate::telemetry::spans;

/// Outbound lines queued ahead of the socket.
const OUTBOUND_QUEUE: usize = 256;

/// How long `quit` waits for queued lines to reach the socket.
const QUIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, registration not yet confirmed.
    Connecting,
    /// RPL_WELCOME received.
    Registered,
    /// Socket closed or session shut down.
    Closed,
}

pub(crate) enum Outbound {
    Line(Message),
    Close(oneshot::Sender<()>),
}

/// A registered IRC connection.
pub struct IrcSession {
    config: IrcConfig,
    outbound: mpsc::Sender<Outbound>,
    bus: MessageBus,
    state: Arc<watch::Sender<SessionState>>,
    nickname: RwLock<String>,
    local_addr: Option<SocketAddr>,
    shutdown: CancellationToken,
}

impl IrcSession {
    /// Connect to the configured server and register.
    pub async fn connect(config: &IrcConfig) -> Result<Self, SessionError> {
        let conn = Connection::open(
            &config.host,
            config.port,
            config.tls,
            config.connect_timeout(),
        )
        .await?;
        Self::start(conn, config.clone()).await
    }

    /// Register over an already open connection.
    ///
    /// On failure the session is dropped, which stops its tasks and closes
    /// the connection.
    pub async fn start(conn: Connection, config: IrcConfig) -> Result<Self, SessionError> {
        let session = Self::spawn(conn, config);
        session.register().await?;
        Ok(session)
    }

    fn spawn(conn: Connection, config: IrcConfig) -> Self {
        let span = spans::session(conn.peer(), &config.nickname);
        let local_addr = conn.local_addr();
        let (reader, writer) = conn.into_split();

        let bus = MessageBus::new(config.bus_capacity);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (state, _) = watch::channel(SessionState::Connecting);
        let state = Arc::new(state);
        let shutdown = CancellationToken::new();

        // Subscribe before the read loop starts so an early PING is seen.
        let responder_sub = bus.subscribe();

        tokio::spawn(
            read_loop(reader, bus.clone(), Arc::clone(&state), shutdown.clone())
                .instrument(span.clone()),
        );
        tokio::spawn(write_loop(writer, outbound_rx, shutdown.clone()).instrument(span.clone()));
        tokio::spawn(
            responder::run(
                responder_sub,
                outbound.clone(),
                config.version_reply.clone(),
                shutdown.clone(),
            )
            .instrument(span),
        );

        Self {
            nickname: RwLock::new(config.nickname.clone()),
            config,
            outbound,
            bus,
            state,
            local_addr,
            shutdown,
        }
    }

    /// Queue a message for the server.
    pub async fn send_message(&self, message: Message) -> Result<(), SessionError> {
        self.outbound
            .send(Outbound::Line(message))
            .await
            .map_err(|_| SessionError::ConnectionClosed)
    }

    /// `JOIN <channel>`
    pub async fn join(&self, channel: &str) -> Result<(), SessionError> {
        info!(channel = %channel, "Joining");
        self.send_message(Message::join(channel)).await
    }

    /// `PRIVMSG <channel> :<text>`
    pub async fn send(&self, text: &str, channel: &str) -> Result<(), SessionError> {
        self.send_message(Message::privmsg(channel, text)).await
    }

    /// `NOTICE <target> :<text>`
    pub async fn notice(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.send_message(Message::notice(target, text)).await
    }

    /// Send a DCC payload as a CTCP request.
    pub async fn send_dcc(&self, target: &str, dcc: &DccMessage) -> Result<(), SessionError> {
        debug!(target = %target, dcc = %dcc, "Sending DCC");
        self.send_message(Message::privmsg(target, &dcc.to_ctcp_string()))
            .await
    }

    /// Subscribe to every line received from now on.
    pub fn messages(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// The nickname the server accepted.
    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    pub fn config(&self) -> &IrcConfig {
        &self.config
    }

    /// Local address of the IRC socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.bus.is_closed()
    }

    /// Resolves once the connection is gone.
    pub async fn closed(&self) {
        self.bus.closed().await;
    }

    /// Send QUIT, give the queue a moment to flush, then shut down.
    pub async fn quit(&self, reason: Option<&str>) -> Result<(), SessionError> {
        self.send_message(Message::quit(reason)).await?;

        let (done_tx, done_rx) = oneshot::channel();
        if self.outbound.send(Outbound::Close(done_tx)).await.is_ok() {
            let _ = timeout(QUIT_FLUSH_TIMEOUT, done_rx).await;
        }
        self.shutdown.cancel();
        info!("Session closed");
        Ok(())
    }
}

impl Drop for IrcSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn read_loop(
    mut reader: LineReader,
    bus: MessageBus,
    state: Arc<watch::Sender<SessionState>>,
    shutdown: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = reader.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                trace!(line = %line, "<<");
                match IncomingMessage::parse(line) {
                    Some(message) => bus.publish(message),
                    None => debug!("Ignoring unparseable line"),
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "Read failed");
                break;
            }
            None => {
                info!("Server closed the connection");
                break;
            }
        }
    }

    state.send_replace(SessionState::Closed);
    bus.close();
    shutdown.cancel();
}

async fn write_loop(
    mut writer: LineWriter,
    mut queue: mpsc::Receiver<Outbound>,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            next = queue.recv() => next,
            _ = shutdown.cancelled() => break,
        };

        match next {
            Some(Outbound::Line(message)) => {
                let line = message.to_string();
                trace!(line = %line, ">>");
                if let Err(e) = writer.send(line).await {
                    warn!(error = %e, "Write failed");
                    shutdown.cancel();
                    break;
                }
            }
            Some(Outbound::Close(done)) => {
                if let Err(e) = SinkExt::<String>::close(&mut writer).await {
                    debug!(error = %e, "Close failed");
                }
                let _ = done.send(());
                break;
            }
            None => break,
        }
    }
}
