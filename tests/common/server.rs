//! Mock IRC server and DCC fixtures.

use std::io::{Cursor, Write};
use std::net::Ipv4Addr;
use std::sync::Arc;

use kindling::config::Config;
use kindling::session::IrcSession;
use kindling_proto::DccSend;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::peer::ServerPeer;

/// A listening mock server on an ephemeral loopback port.
pub struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    #[allow(dead_code)]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client configuration pointing at this server, with short timeouts.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.irc.host = "127.0.0.1".to_string();
        config.irc.port = self.port;
        config.irc.registration_timeout_secs = 2;
        config.search.response_timeout_secs = 1;
        config.dcc.transfer_timeout_secs = 5;
        config
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> anyhow::Result<ServerPeer> {
        let (stream, _) = self.listener.accept().await?;
        Ok(ServerPeer::new(stream))
    }

    /// Connect a session with `config` and complete registration.
    pub async fn session(&self, config: &Config) -> anyhow::Result<(Arc<IrcSession>, ServerPeer)> {
        let server = async {
            let mut peer = self.accept().await?;
            peer.register().await?;
            anyhow::Ok(peer)
        };
        let (session, peer) = tokio::join!(IrcSession::connect(&config.irc), server);
        Ok((Arc::new(session?), peer?))
    }
}

/// Listen on loopback and write `data` to the first connection, then close.
///
/// Returns the offer a bot would send for it, declaring `declared` bytes.
pub async fn serve_bytes(
    filename: &str,
    data: Vec<u8>,
    declared: u64,
) -> anyhow::Result<(DccSend, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let handle = tokio::spawn(async move {
        if let Ok((mut stream, _)) = listener.accept().await {
            // The receiver may hang up once it has the declared length.
            let _ = stream.write_all(&data).await;
            let _ = stream.shutdown().await;
        }
    });
    Ok((DccSend::new(filename, Ipv4Addr::LOCALHOST, port, declared), handle))
}

/// A zip archive with a single `results.txt` entry holding `text`.
pub fn zip_listing(text: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("results.txt", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(text.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}
