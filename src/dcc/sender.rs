//! Sender role: listen, announce a DCC SEND and stream to the one peer.

use std::io::{self, Cursor};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use kindling_proto::{DccMessage, DccResume, DccSend, Message};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout};
use tracing::{Instrument, debug, info, warn};

use super::{CHUNK_SIZE, Transfer};
use crate::config::DccConfig;
use crate::error::{BusError, SessionError, TransferError};
use crate::session::IrcSession;
use crate::telemetry::spans;

/// How long to wait for the receiver to hang up after the last byte.
const LINGER: Duration = Duration::from_secs(5);

/// What a [`DccSender`] serves.
#[derive(Debug, Clone)]
pub enum Payload {
    /// In-memory content.
    Bytes(Bytes),
    /// A file on disk, read when the peer connects.
    File(PathBuf),
}

impl Payload {
    async fn len(&self) -> io::Result<u64> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.len() as u64),
            Self::File(path) => Ok(tokio::fs::metadata(path).await?.len()),
        }
    }

    async fn open_at(&self, offset: u64) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Self::Bytes(bytes) => {
                let mut cursor = Cursor::new(bytes.clone());
                cursor.set_position(offset);
                Ok(Box::new(cursor))
            }
            Self::File(path) => {
                let mut file = File::open(path).await?;
                if offset > 0 {
                    file.seek(SeekFrom::Start(offset)).await?;
                }
                Ok(Box::new(file))
            }
        }
    }
}

/// Serves files to peers over DCC.
pub struct DccSender<'a> {
    session: &'a IrcSession,
    bind: IpAddr,
    port: u16,
    announce: Ipv4Addr,
    timeout: Duration,
}

impl<'a> DccSender<'a> {
    /// Listener and announce settings come from `config`; without an
    /// announce address the local address of the IRC socket is used.
    pub fn new(session: &'a IrcSession, config: &DccConfig) -> Self {
        let announce = config
            .announce_ip()
            .or_else(|| match session.local_addr() {
                Some(SocketAddr::V4(addr)) => Some(*addr.ip()),
                _ => None,
            })
            .unwrap_or_else(|| {
                warn!("No IPv4 address to announce, using loopback");
                Ipv4Addr::LOCALHOST
            });

        Self {
            session,
            bind: config.bind_ip(),
            port: config.listen_port,
            announce,
            timeout: config.transfer_timeout(),
        }
    }

    /// Override the announced address.
    #[must_use]
    pub fn with_announce(mut self, announce: Ipv4Addr) -> Self {
        self.announce = announce;
        self
    }

    /// Offer `payload` to `target` as `name` and stream it once they connect.
    ///
    /// A `DCC RESUME` for the offered filename that arrives before the peer
    /// connects is answered with `DCC ACCEPT`, and the stream then starts at
    /// the requested offset. Nobody connecting within the timeout fails with
    /// [`TransferError::Timeout`].
    pub async fn send(
        &self,
        target: &str,
        name: &str,
        payload: Payload,
    ) -> Result<Transfer, TransferError> {
        let size = payload.len().await?;
        let listener = TcpListener::bind((self.bind, self.port)).await?;
        let port = listener.local_addr()?.port();
        let offer = DccSend::new(name, self.announce, port, size);

        let span = spans::transfer(&offer.filename, SocketAddr::from((self.announce, port)));
        self.serve(listener, target, offer, payload)
            .instrument(span)
            .await
    }

    async fn serve(
        &self,
        listener: TcpListener,
        target: &str,
        offer: DccSend,
        payload: Payload,
    ) -> Result<Transfer, TransferError> {
        let deadline = Instant::now() + self.timeout;
        let mut requests = self.session.messages().with_deadline(deadline);

        self.session
            .send_dcc(target, &DccMessage::Send(offer.clone()))
            .await?;
        info!(target = %target, size = offer.size, port = offer.port, "Offered");

        let mut start_offset = 0;
        let (stream, peer) = loop {
            tokio::select! {
                biased;
                accepted = listener.accept() => break accepted?,
                incoming = requests.recv() => {
                    let incoming = match incoming {
                        Ok(incoming) => incoming,
                        Err(BusError::TimedOut) => {
                            warn!(target = %target, "Nobody connected");
                            return Err(TransferError::Timeout(self.timeout));
                        }
                        Err(_) => return Err(SessionError::ConnectionClosed.into()),
                    };
                    let Some((from, resume)) = resume_request(&incoming.message, target, &offer) else {
                        continue;
                    };
                    start_offset = resume.position;
                    self.session
                        .send_dcc(from, &DccMessage::Accept(resume.accept()))
                        .await?;
                    info!(position = start_offset, "Resume accepted");
                }
            }
        };
        drop(requests);
        drop(listener);

        debug!(peer = %peer, offset = start_offset, "Peer connected");
        let transferred = self
            .stream(stream, &payload, start_offset, offer.size)
            .await?;

        info!(bytes = transferred, "Transfer complete");
        Ok(Transfer {
            offer,
            start_offset,
            transferred,
            complete: true,
        })
    }

    async fn stream(
        &self,
        mut stream: TcpStream,
        payload: &Payload,
        offset: u64,
        size: u64,
    ) -> Result<u64, TransferError> {
        let to_send = size - offset;
        let mut reader = payload.open_at(offset).await?.take(to_send);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut sent: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            timeout(self.timeout, stream.write_all(&buf[..n]))
                .await
                .map_err(|_| TransferError::Timeout(self.timeout))??;
            sent += n as u64;
        }
        stream.shutdown().await?;

        // Drain acknowledgements until the receiver hangs up, so unread
        // acks never turn our close into a reset.
        let _ = timeout(LINGER, async {
            while let Ok(n) = stream.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        })
        .await;

        if sent < to_send {
            return Err(TransferError::Incomplete {
                received: offset + sent,
                expected: size,
            });
        }
        Ok(sent)
    }
}

/// A `DCC RESUME` from `target` for the offered file.
///
/// Returns the nick to answer and the request. Positions at or past the end
/// of the file are ignored.
fn resume_request<'m>(
    message: &'m Message,
    target: &str,
    offer: &DccSend,
) -> Option<(&'m str, DccResume)> {
    if !message.is("PRIVMSG") {
        return None;
    }
    let from = message.source_nickname()?;
    if !from.eq_ignore_ascii_case(target) {
        return None;
    }
    let DccMessage::Resume(resume) = DccMessage::from_ctcp(&message.ctcp()?).ok()? else {
        return None;
    };
    if resume.filename != offer.filename {
        debug!(requested = %resume.filename, "Resume for another file");
        return None;
    }
    if resume.position >= offer.size {
        warn!(position = resume.position, size = offer.size, "Resume past end of file");
        return None;
    }
    Some((from, resume))
}
