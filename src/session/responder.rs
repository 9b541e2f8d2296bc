//! Automatic replies: PING keepalive and CTCP queries.

use kindling_proto::{Ctcp, CtcpKind, Message};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Outbound, Subscription};

/// Answer lines from the bus until the session shuts down.
pub(super) async fn run(
    mut lines: Subscription,
    outbound: mpsc::Sender<Outbound>,
    version_reply: String,
    shutdown: CancellationToken,
) {
    loop {
        let incoming = tokio::select! {
            _ = shutdown.cancelled() => break,
            incoming = lines.recv() => match incoming {
                Ok(incoming) => incoming,
                Err(_) => break,
            },
        };

        if let Some(reply) = reply_to(&incoming.message, &version_reply)
            && outbound.send(Outbound::Line(reply)).await.is_err()
        {
            break;
        }
    }
}

/// The automatic reply a line calls for, if any.
///
/// CTCP queries arrive as PRIVMSG; CTCP replies (NOTICE) are never answered.
pub(super) fn reply_to(message: &Message, version_reply: &str) -> Option<Message> {
    if message.is("PING") {
        return Some(Message::pong(message.params.last().map(String::as_str)));
    }
    if !message.is("PRIVMSG") {
        return None;
    }

    let ctcp = message.ctcp()?;
    let source = message.source_nickname()?;
    let now;
    let reply = match ctcp.kind {
        CtcpKind::Version => Ctcp::version_reply(version_reply),
        CtcpKind::Ping => Ctcp::new(CtcpKind::Ping, ctcp.params),
        CtcpKind::Time => {
            now = chrono::Local::now().to_rfc2822();
            Ctcp::new(CtcpKind::Time, Some(now.as_str()))
        }
        _ => return None,
    };

    debug!(from = %source, kind = %ctcp.kind, "Answering CTCP");
    Some(Message::ctcp_reply(source, &reply))
}
