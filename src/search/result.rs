//! Search-result lines.
//!
//! A listing holds one line per file, in the form
//! `!<bot>[ %<hash>%] <filename>[ ::INFO:: <size>][ ::HASH:: <hash>]`.
//! The raw line is kept verbatim: sending it back to the channel is how a
//! file is requested.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::metadata::ProbableMetadata;

static RESULT_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^!(?P<bot>[\w-]+)( %?(?P<inline_hash>[a-fA-F0-9]{12}) ?[%|])? (?P<title>.+?)( ::INFO:: (?P<size>.+?))?( ::HASH:: (?P<hash>.+))?$",
    )
    .ok()
});

/// One file advertised in a search listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// The line as listed, re-sent verbatim to request the file.
    pub raw: String,
    /// Nick of the bot serving the file.
    pub bot: String,
    /// Filename as listed.
    pub title: String,
    /// Human-readable size, e.g. `100KB`.
    pub size: Option<String>,
    /// Content hash, lower-cased.
    pub hash: Option<String>,
}

impl SearchResult {
    /// Parse one listing line. Lines that do not match the grammar yield
    /// `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let caps = RESULT_LINE.as_ref()?.captures(line)?;

        let hash = caps
            .name("hash")
            .or_else(|| caps.name("inline_hash"))
            .map(|m| m.as_str().to_lowercase());

        Some(Self {
            raw: line.to_string(),
            bot: caps["bot"].to_string(),
            title: caps["title"].to_string(),
            size: caps.name("size").map(|m| m.as_str().to_string()),
            hash,
        })
    }

    /// Every result in a listing; banner and blank lines are skipped.
    pub fn parse_listing(text: &str) -> Vec<Self> {
        text.lines()
            .map(str::trim)
            .filter(|line| line.starts_with('!'))
            .filter_map(Self::parse)
            .collect()
    }

    /// File extension of the listed filename, without the dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.title).extension()?.to_str()
    }

    /// Author, title and series guessed from the filename.
    pub fn metadata(&self) -> Option<ProbableMetadata> {
        ProbableMetadata::from_filename(&self.title)
    }
}

impl FromStr for SearchResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a search result line: {s:?}"))
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
