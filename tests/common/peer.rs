//! Server side of a mock IRC connection.

use std::time::Duration;

use kindling_proto::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// The server's end of one client connection.
pub struct ServerPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl ServerPeer {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send a raw line to the client.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the client.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("client closed the connection");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive lines until one satisfies `predicate`, returning that one.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Message>
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok(msg);
            }
        }
    }

    /// Read NICK and USER, then welcome the client. Returns the nickname.
    pub async fn register(&mut self) -> anyhow::Result<String> {
        let nick = self.recv_until(|msg| msg.is("NICK")).await?;
        let nick = nick
            .param(0)
            .ok_or_else(|| anyhow::anyhow!("NICK without a nickname"))?
            .to_string();
        self.recv_until(|msg| msg.is("USER")).await?;
        self.welcome(&nick).await?;
        Ok(nick)
    }

    /// Send RPL_WELCOME for `nick`.
    pub async fn welcome(&mut self, nick: &str) -> anyhow::Result<()> {
        self.send_raw(&format!(":mock.server 001 {nick} :Welcome to the mock network"))
            .await
    }

    /// Assert the client sends nothing for `dur`.
    #[allow(dead_code)]
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Ok(msg) => anyhow::bail!("unexpected line from client: {msg}"),
            Err(_) => Ok(()),
        }
    }
}
