//! Destinations for received bytes.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};

/// Where a receiver writes the bytes it gets.
#[async_trait]
pub trait TransferSink: Send {
    /// Bytes already held; a non-zero position can be resumed from.
    fn position(&self) -> u64;

    /// Append a chunk.
    async fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Discard everything after `len` bytes.
    async fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Called once after the last chunk.
    async fn finish(&mut self) -> io::Result<()>;
}

/// Collects a transfer in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: BytesMut,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for a declared length.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[async_trait]
impl TransferSink for MemorySink {
    fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        self.buf.truncate(len);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes a transfer to disk, appending to whatever the file already holds.
#[derive(Debug)]
pub struct FileSink {
    file: File,
    path: PathBuf,
    position: u64,
}

impl FileSink {
    /// Open `path` for appending, creating it when missing.
    ///
    /// Existing content counts as already received.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .await?;
        let position = file.seek(SeekFrom::End(0)).await?;
        Ok(Self {
            file,
            path,
            position,
        })
    }

    /// Create `path`, discarding any previous content.
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            file,
            path,
            position: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TransferSink for FileSink {
    fn position(&self) -> u64 {
        self.position
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk).await?;
        self.position += chunk.len() as u64;
        Ok(())
    }

    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len).await?;
        self.position = self.file.seek(SeekFrom::Start(len)).await?;
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await
    }
}
