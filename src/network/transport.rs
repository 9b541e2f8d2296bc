//! Line transport.
//!
//! A [`Connection`] owns one duplex byte stream and frames it into protocol
//! lines with [`LineCodec`]. The session splits it into a reader, driven by a
//! single read loop, and a writer, driven by a single write queue.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kindling_proto::{LineCodec, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info};

use super::tls;
use crate::error::SessionError;

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Inbound half: yields decoded lines until the peer closes.
pub type LineReader = FramedRead<BoxedRead, LineCodec>;
/// Outbound half: accepts lines and appends `\r\n`.
pub type LineWriter = FramedWrite<BoxedWrite, LineCodec>;

/// A framed connection to an IRC server.
pub struct Connection {
    reader: LineReader,
    writer: LineWriter,
    local_addr: Option<SocketAddr>,
    peer: String,
}

impl Connection {
    /// Connect to `host:port`, optionally upgrading to TLS.
    ///
    /// The timeout covers the TCP connect and the TLS handshake separately.
    pub async fn open(
        host: &str,
        port: u16,
        tls: bool,
        connect_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let addr = format!("{host}:{port}");

        let tcp = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(SessionError::Connect { addr, source }),
            Err(_) => return Err(SessionError::ConnectTimeout { addr }),
        };
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        let local_addr = tcp.local_addr().ok();
        info!(addr = %addr, tls, "Connected");

        if tls {
            let stream = timeout(connect_timeout, tls::connect(host, tcp))
                .await
                .map_err(|_| SessionError::ConnectTimeout { addr: addr.clone() })??;
            Ok(Self::from_stream(stream, local_addr, addr))
        } else {
            let (read_half, write_half) = tcp.into_split();
            Ok(Self::from_parts(
                Box::new(read_half),
                Box::new(write_half),
                local_addr,
                addr,
            ))
        }
    }

    /// Wrap any duplex stream (TLS, in-memory pipes in tests, ...).
    pub fn from_stream<S>(stream: S, local_addr: Option<SocketAddr>, peer: impl Into<String>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Self::from_parts(
            Box::new(read_half),
            Box::new(write_half),
            local_addr,
            peer.into(),
        )
    }

    fn from_parts(
        read_half: BoxedRead,
        write_half: BoxedWrite,
        local_addr: Option<SocketAddr>,
        peer: String,
    ) -> Self {
        Self {
            reader: FramedRead::new(read_half, LineCodec::new()),
            writer: FramedWrite::new(write_half, LineCodec::new()),
            local_addr,
            peer,
        }
    }

    /// Next complete line, or `None` once the peer has closed.
    pub async fn read_line(&mut self) -> Option<Result<String, ProtocolError>> {
        self.reader.next().await
    }

    /// Write one line; anything after an embedded line break is dropped.
    pub async fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        self.writer.send(line).await
    }

    /// Local socket address, used as the default DCC announce address.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// `host:port` (or a caller-supplied label) for logging.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Split into independently owned halves.
    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}
