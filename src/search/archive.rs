//! Unpacking search listings.

use std::io::{Cursor, Read};

use kindling_proto::line::decode_text;
use tracing::debug;

use crate::error::SearchError;

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Decompression collaborator: raw archive bytes in, entries out, in the
/// order the archive stores them.
pub trait ArchiveReader: Send + Sync {
    fn entries(&self, data: &[u8]) -> Result<Vec<ArchiveEntry>, SearchError>;
}

/// [`ArchiveReader`] for zip files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn entries(&self, data: &[u8]) -> Result<Vec<ArchiveEntry>, SearchError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| SearchError::DecodeFailure(format!("not a zip archive: {e}")))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| SearchError::DecodeFailure(format!("zip entry {index}: {e}")))?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)
                .map_err(|e| SearchError::DecodeFailure(format!("{}: {e}", file.name())))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(entries)
    }
}

/// Text of a received listing.
///
/// Files named `*.zip` are unpacked and their first entry is read; anything
/// else is taken as a plain-text listing.
pub fn read_listing(
    filename: &str,
    data: &[u8],
    reader: &dyn ArchiveReader,
) -> Result<String, SearchError> {
    if !filename.to_ascii_lowercase().ends_with(".zip") {
        debug!(filename = %filename, "Listing is not an archive, reading as text");
        return Ok(decode_text(data));
    }

    let entries = reader.entries(data)?;
    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| SearchError::DecodeFailure(format!("{filename} is empty")))?;
    debug!(entry = %first.name, bytes = first.data.len(), "Unpacked listing");
    Ok(decode_text(&first.data))
}
