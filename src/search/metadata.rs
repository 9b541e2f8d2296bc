//! Author/title/series guesses from listing filenames.
//!
//! Listings usually name files `Author - Title.ext`, sometimes with a series
//! in brackets (`Author - [Series 03] - Title.ext`) and trailing tags such as
//! `(retail)` or `[v5.0]`. None of this is guaranteed, so a filename that
//! fits no pattern simply has no metadata.

use std::sync::LazyLock;

use regex::Regex;

/// Tags and the extension at the end of a filename.
static TRAILING_TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?)(?: [\[(][\w.]+[)\]])* ?(?P<ext>\.[A-Za-z0-9]{2,4})$").ok()
});

/// A whole component that is a bracketed series name.
static SERIES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\[(](?P<series>(?:[^ ]+ ?)+\d{0,3})[\])]$").ok());

/// Best guess at who wrote what.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbableMetadata {
    pub title: String,
    pub author: String,
    pub series: Option<String>,
}

impl ProbableMetadata {
    /// Guess metadata from a listed filename.
    ///
    /// The title keeps the file extension; trailing tags are dropped.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let name = strip_tags(filename);
        let parts: Vec<&str> = name.split(" - ").collect();

        match parts.as_slice() {
            [author, title] => Some(Self {
                title: (*title).to_string(),
                author: (*author).to_string(),
                series: None,
            }),
            [first, second, title] => {
                if let Some(series) = series_of(second) {
                    Some(Self {
                        title: (*title).to_string(),
                        author: (*first).to_string(),
                        series: Some(series),
                    })
                } else {
                    series_of(first).map(|series| Self {
                        title: (*title).to_string(),
                        author: (*second).to_string(),
                        series: Some(series),
                    })
                }
            }
            _ => None,
        }
    }
}

fn strip_tags(filename: &str) -> String {
    let Some(caps) = TRAILING_TAGS.as_ref().and_then(|re| re.captures(filename)) else {
        return filename.to_string();
    };
    format!("{}{}", &caps["name"], &caps["ext"])
}

fn series_of(part: &str) -> Option<String> {
    let caps = SERIES.as_ref()?.captures(part)?;
    Some(caps["series"].to_string())
}
