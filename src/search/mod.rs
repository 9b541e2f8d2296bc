//! Search and download orchestration.
//!
//! A search is a channel line (`@search <query>`) answered either by a DCC
//! offer of a listing or by a NOTICE saying the query returned no matches.
//! Both answers are watched on separate bus subscriptions under one shared
//! deadline; the first to arrive wins and both subscriptions are cancelled.
//!
//! A download re-sends a listing line verbatim and waits for the named bot
//! to offer the file.
//!
//! One search or download at a time per session: concurrent requests on the
//! same session would race for the same offers.

mod archive;
mod metadata;
mod request;
mod result;

pub use archive::{ArchiveEntry, ArchiveReader, ZipArchiveReader, read_listing};
pub use metadata::ProbableMetadata;
pub use request::{RequestState, is_no_matches};
pub use result::SearchResult;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{Instrument, info, warn};

use request::{Offer, OfferWaitError, wait_for_no_matches, wait_for_offer};

use crate::config::{Config, SearchConfig};
use crate::dcc::{self, MemorySink, Transfer, TransferOptions, TransferSink};
use crate::error::{SearchError, SessionError};
use crate::progress::ProgressReporter;
use crate::session::IrcSession;
use crate::telemetry::spans;

const SEARCH_STEPS: u8 = 6;
const DOWNLOAD_STEPS: u8 = 4;

/// Largest listing buffer reserved up front.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The bot sent a listing.
    Results(Vec<SearchResult>),
    /// The bot said nothing matched.
    NoMatches,
}

impl SearchOutcome {
    /// The results, empty for [`SearchOutcome::NoMatches`].
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Results(results) => results,
            Self::NoMatches => Vec::new(),
        }
    }
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct Download {
    /// Filename as offered.
    pub filename: String,
    pub bytes: Bytes,
}

impl Download {
    /// Filename with underscores turned back into spaces.
    pub fn display_name(&self) -> String {
        self.filename.replace('_', " ")
    }
}

/// Searches and downloads over a registered session.
pub struct SearchClient {
    session: Arc<IrcSession>,
    config: SearchConfig,
    channel: String,
    transfer: TransferOptions,
    archive: Arc<dyn ArchiveReader>,
    progress: ProgressReporter,
    state: watch::Sender<RequestState>,
}

impl SearchClient {
    pub fn new(session: Arc<IrcSession>, config: &Config) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            session,
            config: config.search.clone(),
            channel: config.irc.channel.clone(),
            transfer: TransferOptions::from(&config.dcc),
            archive: Arc::new(ZipArchiveReader),
            progress: ProgressReporter::disabled(),
            state,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the zip reader used for listings.
    #[must_use]
    pub fn with_archive_reader(mut self, archive: Arc<dyn ArchiveReader>) -> Self {
        self.archive = archive;
        self
    }

    pub fn session(&self) -> &IrcSession {
        &self.session
    }

    /// State of the current or last request.
    pub fn state(&self) -> RequestState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    /// Search the channel for `query`.
    ///
    /// Resolves to [`SearchOutcome::NoMatches`] when the search bot says so,
    /// and fails with [`SearchError::NoSearchResponse`] when neither a
    /// listing nor a no-matches notice arrives in time.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let result = self
            .run_search(query)
            .instrument(spans::request("search", query))
            .await;
        self.finish(&result);
        result
    }

    async fn run_search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let progress = &self.progress;
        let deadline = Instant::now() + self.config.response_timeout();

        // Subscribe before sending so a fast answer is not missed.
        let mut offers = self.session.messages().with_deadline(deadline);
        let mut notices = self.session.messages().with_deadline(deadline);

        progress.step(1, SEARCH_STEPS, "Sending query");
        self.session
            .send(&format!("{} {}", self.config.trigger, query), &self.channel)
            .await?;
        self.state.send_replace(RequestState::QuerySent);
        info!(query = %query, "Query sent");

        progress.step(2, SEARCH_STEPS, "Waiting for response");
        self.state.send_replace(RequestState::AwaitingResponse);
        let answer = tokio::select! {
            biased;
            offer = wait_for_offer(&mut offers, None) => Some(offer),
            Ok(()) = wait_for_no_matches(&mut notices, &self.config.bot_nick, query) => None,
        };
        offers.cancel();
        notices.cancel();
        drop((offers, notices));

        let Some(offer) = answer else {
            info!(query = %query, "No matches");
            self.state.send_replace(RequestState::NoMatches);
            progress.step(SEARCH_STEPS, SEARCH_STEPS, "Done");
            return Ok(SearchOutcome::NoMatches);
        };
        let Offer { from, send } = offer.map_err(|e| match e {
            OfferWaitError::TimedOut { .. } => SearchError::NoSearchResponse {
                query: query.to_string(),
            },
            OfferWaitError::Closed => SessionError::ConnectionClosed.into(),
        })?;

        progress.step(3, SEARCH_STEPS, "Downloading results");
        let mut sink = MemorySink::with_capacity(prealloc(send.size));
        dcc::receive(&send, &mut sink, self.transfer, progress)
            .await
            .map_err(|source| SearchError::Transfer {
                bot: from.clone(),
                source,
            })?;

        progress.step(4, SEARCH_STEPS, "Unpacking");
        let data = sink.into_bytes();
        let text = read_listing(&send.filename, &data, self.archive.as_ref())?;

        progress.step(5, SEARCH_STEPS, "Parsing");
        let results = SearchResult::parse_listing(&text);
        info!(from = %from, results = results.len(), "Results received");

        self.state.send_replace(RequestState::ResultsReady);
        progress.step(6, SEARCH_STEPS, "Done");
        Ok(SearchOutcome::Results(results))
    }

    /// Request `result` from its bot and receive it in memory.
    pub async fn download(&self, result: &SearchResult) -> Result<Download, SearchError> {
        let outcome = self
            .run_download(result)
            .instrument(spans::request("download", &result.bot))
            .await;
        self.finish(&outcome);
        outcome
    }

    /// Request `result` from its bot and receive it into `sink`, resuming
    /// when the sink already holds part of the file.
    pub async fn download_to<S>(
        &self,
        result: &SearchResult,
        sink: &mut S,
    ) -> Result<Transfer, SearchError>
    where
        S: TransferSink + ?Sized,
    {
        let outcome = self
            .run_download_to(result, sink)
            .instrument(spans::request("download", &result.bot))
            .await;
        self.finish(&outcome);
        outcome
    }

    async fn run_download(&self, result: &SearchResult) -> Result<Download, SearchError> {
        let Offer { from, send } = self.request_offer(result).await?;

        self.progress.step(3, DOWNLOAD_STEPS, "Downloading");
        let mut sink = MemorySink::with_capacity(prealloc(send.size));
        dcc::receive(&send, &mut sink, self.transfer, &self.progress)
            .await
            .map_err(|source| SearchError::Transfer { bot: from, source })?;

        self.state.send_replace(RequestState::ResultsReady);
        self.progress.step(4, DOWNLOAD_STEPS, "Done");
        Ok(Download {
            filename: send.filename,
            bytes: sink.into_bytes(),
        })
    }

    async fn run_download_to<S>(
        &self,
        result: &SearchResult,
        sink: &mut S,
    ) -> Result<Transfer, SearchError>
    where
        S: TransferSink + ?Sized,
    {
        let Offer { from, send } = self.request_offer(result).await?;

        self.progress.step(3, DOWNLOAD_STEPS, "Downloading");
        let transfer = dcc::resume(
            &self.session,
            &from,
            &send,
            sink,
            self.transfer,
            &self.progress,
        )
        .await
        .map_err(|source| SearchError::Transfer { bot: from, source })?;

        self.state.send_replace(RequestState::ResultsReady);
        self.progress.step(4, DOWNLOAD_STEPS, "Done");
        Ok(transfer)
    }

    async fn request_offer(&self, result: &SearchResult) -> Result<Offer, SearchError> {
        let mut offers = self
            .session
            .messages()
            .with_timeout(self.config.response_timeout());

        self.progress.step(1, DOWNLOAD_STEPS, "Requesting file");
        self.session.send(&result.raw, &self.channel).await?;
        self.state.send_replace(RequestState::QuerySent);
        info!(bot = %result.bot, title = %result.title, "File requested");

        self.progress.step(2, DOWNLOAD_STEPS, "Waiting for offer");
        self.state.send_replace(RequestState::AwaitingResponse);
        let offer = wait_for_offer(&mut offers, Some(&result.bot)).await;
        offers.cancel();

        offer.map_err(|e| match e {
            OfferWaitError::TimedOut {
                malformed: Some((bot, source)),
            } => SearchError::MalformedDccOffer { bot, source },
            OfferWaitError::TimedOut { malformed: None } => SearchError::OfferTimeout {
                bot: result.bot.clone(),
            },
            OfferWaitError::Closed => SessionError::ConnectionClosed.into(),
        })
    }

    fn finish<T>(&self, outcome: &Result<T, SearchError>) {
        let Err(e) = outcome else {
            return;
        };
        warn!(error = %e, code = e.error_code(), bot = ?e.bot(), "Request failed");
        let state = match e {
            SearchError::NoSearchResponse { .. } | SearchError::OfferTimeout { .. } => {
                RequestState::TimedOut
            }
            _ => RequestState::Failed,
        };
        self.state.send_replace(state);
    }
}

fn prealloc(size: u64) -> usize {
    usize::try_from(size.min(MAX_PREALLOC)).unwrap_or(0)
}
