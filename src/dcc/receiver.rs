//! Receiver role: connect to an offer and read it to the declared length.

use std::net::SocketAddr;

use kindling_proto::{DccMessage, DccResume, DccSend};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{Instrument, debug, info, warn};

use super::{CHUNK_SIZE, Transfer, TransferOptions, TransferSink};
use crate::error::{BusError, SessionError, TransferError};
use crate::progress::ProgressReporter;
use crate::session::IrcSession;
use crate::telemetry::spans;

/// Report progress on the first chunk and then every this many chunks.
const PROGRESS_EVERY: u64 = 10;

/// Receive `offer` into `sink`.
///
/// The sender is expected to stream from `sink.position()`, which is zero
/// unless a resume was negotiated first (see [`resume`]). Closing the
/// connection before the declared length fails with
/// [`TransferError::Incomplete`]; waiting longer than the timeout for the
/// connection or for any chunk fails with [`TransferError::Timeout`].
pub async fn receive<S>(
    offer: &DccSend,
    sink: &mut S,
    options: TransferOptions,
    progress: &ProgressReporter,
) -> Result<Transfer, TransferError>
where
    S: TransferSink + ?Sized,
{
    let peer = SocketAddr::V4(offer.socket_addr());
    receive_from(peer, offer, sink, options, progress)
        .instrument(spans::transfer(&offer.filename, peer))
        .await
}

async fn receive_from<S>(
    peer: SocketAddr,
    offer: &DccSend,
    sink: &mut S,
    options: TransferOptions,
    progress: &ProgressReporter,
) -> Result<Transfer, TransferError>
where
    S: TransferSink + ?Sized,
{
    let start_offset = sink.position();
    let expected = offer.size;

    let mut stream = match timeout(options.timeout, TcpStream::connect(peer)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransferError::Connect { peer, source }),
        Err(_) => return Err(TransferError::Timeout(options.timeout)),
    };
    info!(size = expected, offset = start_offset, "Receiving");

    let mut received = start_offset;
    let mut chunks: u64 = 0;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while received < expected {
        let n = match timeout(options.timeout, stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_) => {
                warn!(received, expected, "Transfer stalled");
                return Err(TransferError::Timeout(options.timeout));
            }
        };
        if n == 0 {
            warn!(received, expected, "Peer closed before the declared length");
            return Err(TransferError::Incomplete { received, expected });
        }

        // Anything past the declared length is not part of the file.
        let remaining = usize::try_from(expected - received).unwrap_or(usize::MAX);
        let take = n.min(remaining);
        sink.write(&buf[..take]).await?;
        received += take as u64;
        chunks += 1;

        if options.acknowledge {
            let ack = ((received & 0xFFFF_FFFF) as u32).to_be_bytes();
            if let Err(e) = stream.write_all(&ack).await {
                debug!(error = %e, "Failed to send acknowledgement");
            }
        }
        if chunks == 1 || chunks % PROGRESS_EVERY == 0 {
            progress.transfer(&offer.filename, received, expected);
        }
    }

    sink.finish().await?;
    progress.transfer(&offer.filename, received, expected);
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "Shutdown after transfer failed");
    }

    info!(bytes = received - start_offset, "Transfer complete");
    Ok(Transfer {
        offer: offer.clone(),
        start_offset,
        transferred: received - start_offset,
        complete: true,
    })
}

/// Receive `offer` from `sender`, resuming when `sink` already holds part
/// of the file.
///
/// Sends `DCC RESUME <file> <port> <position>` and waits for the matching
/// `DCC ACCEPT` before connecting. No ACCEPT within the timeout, or an
/// ACCEPT past the held length, fails with [`TransferError::ResumeRejected`].
pub async fn resume<S>(
    session: &IrcSession,
    sender: &str,
    offer: &DccSend,
    sink: &mut S,
    options: TransferOptions,
    progress: &ProgressReporter,
) -> Result<Transfer, TransferError>
where
    S: TransferSink + ?Sized,
{
    let held = sink.position();

    if held == offer.size {
        info!(filename = %offer.filename, "Already complete");
        return Ok(Transfer {
            offer: offer.clone(),
            start_offset: held,
            transferred: 0,
            complete: true,
        });
    }
    if held > offer.size {
        warn!(held, size = offer.size, "Local file larger than offer, restarting");
        sink.truncate(0).await?;
    }
    if sink.position() == 0 {
        return receive(offer, sink, options, progress).await;
    }

    let mut replies = session.messages().with_timeout(options.timeout);
    let request = DccResume {
        filename: offer.filename.clone(),
        port: offer.port,
        position: held,
    };
    session
        .send_dcc(sender, &DccMessage::Resume(request))
        .await?;

    let accepted = replies
        .find_map(|incoming| {
            let message = &incoming.message;
            if !message.is("PRIVMSG") {
                return None;
            }
            let from = message.source_nickname()?;
            if !from.eq_ignore_ascii_case(sender) {
                return None;
            }
            match DccMessage::from_ctcp(&message.ctcp()?) {
                Ok(DccMessage::Accept(accept)) if accept.port == offer.port => Some(accept.position),
                _ => None,
            }
        })
        .await;
    drop(replies);

    let position = match accepted {
        Ok(position) => position,
        Err(BusError::TimedOut) => {
            return Err(TransferError::ResumeRejected(format!(
                "{sender} did not accept resume of {} at {held}",
                offer.filename
            )));
        }
        Err(_) => return Err(SessionError::ConnectionClosed.into()),
    };

    if position > held {
        return Err(TransferError::ResumeRejected(format!(
            "{sender} accepted {} at {position} but only {held} bytes are held",
            offer.filename
        )));
    }
    if position < held {
        debug!(requested = held, accepted = position, "Sender chose an earlier offset");
        sink.truncate(position).await?;
    }
    info!(position, "Resume accepted");
    receive(offer, sink, options, progress).await
}
