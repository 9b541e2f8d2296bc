//! Serving bot.
//!
//! The other side of a search: answers `<trigger> <query>` with a DCC SEND
//! of a prepared listing, and answers listing lines addressed to it
//! (`!<nick> <file> ...`) with a DCC SEND of that file from the library
//! directory. Every transfer runs in its own task and honours `DCC RESUME`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use kindling_proto::Message;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::config::{BotConfig, Config, DccConfig, SearchConfig};
use crate::dcc::{DccSender, Payload};
use crate::error::{BusError, SessionError};
use crate::search::SearchResult;
use crate::session::IrcSession;

/// Something a channel member asked the bot for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotRequest {
    /// `<trigger> <query>`
    Listing { from: String, query: String },
    /// A listing line naming this bot.
    File { from: String, name: String },
}

impl BotRequest {
    pub fn from(&self) -> &str {
        match self {
            Self::Listing { from, .. } | Self::File { from, .. } => from,
        }
    }
}

/// Serves the listing and library over DCC.
pub struct ServingBot {
    session: Arc<IrcSession>,
    search: SearchConfig,
    dcc: DccConfig,
    files: BotConfig,
}

impl ServingBot {
    pub fn new(session: Arc<IrcSession>, config: &Config) -> Self {
        Self {
            session,
            search: config.search.clone(),
            dcc: config.dcc.clone(),
            files: config.bot.clone(),
        }
    }

    /// Answer requests until `shutdown` fires or the connection closes.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), SessionError> {
        let mut messages = self.session.messages();
        info!(
            listing = %self.files.listing.display(),
            library = %self.files.library.display(),
            "Serving"
        );

        loop {
            let incoming = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                incoming = messages.recv() => incoming,
            };
            let incoming = match incoming {
                Ok(incoming) => incoming,
                Err(BusError::Cancelled) => return Ok(()),
                Err(_) => return Err(SessionError::ConnectionClosed),
            };

            let nickname = self.session.nickname();
            let Some(request) = parse_request(&incoming.message, &self.search.trigger, &nickname)
            else {
                continue;
            };
            self.dispatch(request);
        }
    }

    fn dispatch(&self, request: BotRequest) {
        let (name, payload) = match &request {
            BotRequest::Listing { from, query } => {
                info!(from = %from, query = %query, "Listing requested");
                let name = file_name(&self.files.listing).unwrap_or_else(|| "listing.zip".into());
                (name, Payload::File(self.files.listing.clone()))
            }
            BotRequest::File { from, name } => {
                info!(from = %from, file = %name, "File requested");
                let Some(path) = library_path(&self.files.library, name) else {
                    warn!(from = %from, file = %name, "Refusing path outside the library");
                    return;
                };
                (name.clone(), Payload::File(path))
            }
        };

        let session = Arc::clone(&self.session);
        let dcc = self.dcc.clone();
        let to = request.from().to_string();
        let span = info_span!("serve", to = %to, file = %name);
        tokio::spawn(
            async move {
                let sender = DccSender::new(&session, &dcc);
                match sender.send(&to, &name, payload).await {
                    Ok(transfer) => info!(bytes = transfer.transferred, "Served"),
                    Err(e) => {
                        warn!(error = %e, code = e.error_code(), "Serving failed");
                        let _ = session.notice(&to, &format!("Transfer failed: {e}")).await;
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// What `message` asks of a bot called `nickname`, if anything.
pub fn parse_request(message: &Message, trigger: &str, nickname: &str) -> Option<BotRequest> {
    if !message.is("PRIVMSG") || message.ctcp().is_some() {
        return None;
    }
    let from = message.source_nickname()?;
    if from.eq_ignore_ascii_case(nickname) {
        return None;
    }
    let text = message.text()?.trim();

    if let Some(query) = strip_trigger(text, trigger) {
        return Some(BotRequest::Listing {
            from: from.to_string(),
            query: query.to_string(),
        });
    }

    let result = SearchResult::parse(text)?;
    if !result.bot.eq_ignore_ascii_case(nickname) {
        return None;
    }
    Some(BotRequest::File {
        from: from.to_string(),
        name: result.title,
    })
}

fn strip_trigger<'a>(text: &'a str, trigger: &str) -> Option<&'a str> {
    let head = text.get(..trigger.len())?;
    if !head.eq_ignore_ascii_case(trigger) {
        return None;
    }
    let rest = &text[trigger.len()..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim())
}

/// `name` inside `library`, refusing anything but a bare filename.
fn library_path(library: &Path, name: &str) -> Option<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => Some(library.join(file)),
        _ => None,
    }
}

fn file_name(path: &Path) -> Option<String> {
    Some(path.file_name()?.to_str()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Message {
        raw.parse().unwrap()
    }

    #[test]
    fn test_trigger_request() {
        let message = parse(":reader!r@h PRIVMSG #ebooks :@search dune messiah");
        assert_eq!(
            parse_request(&message, "@search", "Librarian"),
            Some(BotRequest::Listing {
                from: "reader".into(),
                query: "dune messiah".into()
            })
        );

        let shouting = parse(":reader!r@h PRIVMSG #ebooks :@SEARCH dune");
        assert!(parse_request(&shouting, "@search", "Librarian").is_some());

        let other = parse(":reader!r@h PRIVMSG #ebooks :@searching dune");
        assert_eq!(parse_request(&other, "@search", "Librarian"), None);
    }

    #[test]
    fn test_file_request_for_this_bot_only() {
        let mine =
            parse(":reader!r@h PRIVMSG #ebooks :!Librarian Author - Title.epub ::INFO:: 100KB");
        assert_eq!(
            parse_request(&mine, "@search", "librarian"),
            Some(BotRequest::File {
                from: "reader".into(),
                name: "Author - Title.epub".into()
            })
        );

        let theirs = parse(":reader!r@h PRIVMSG #ebooks :!OtherBot Author - Title.epub");
        assert_eq!(parse_request(&theirs, "@search", "Librarian"), None);
    }

    #[test]
    fn test_own_and_ctcp_lines_ignored() {
        let own = parse(":Librarian!l@h PRIVMSG #ebooks :@search dune");
        assert_eq!(parse_request(&own, "@search", "Librarian"), None);

        let ctcp = parse(":reader!r@h PRIVMSG Librarian :\x01VERSION\x01");
        assert_eq!(parse_request(&ctcp, "@search", "Librarian"), None);
    }

    #[test]
    fn test_library_path_rejects_traversal() {
        let library = Path::new("/srv/library");
        assert_eq!(
            library_path(library, "Author - Title.epub"),
            Some(PathBuf::from("/srv/library/Author - Title.epub"))
        );
        assert_eq!(library_path(library, "../etc/passwd"), None);
        assert_eq!(library_path(library, "/etc/passwd"), None);
        assert_eq!(library_path(library, "sub/book.epub"), None);
        assert_eq!(library_path(library, ""), None);
    }
}
