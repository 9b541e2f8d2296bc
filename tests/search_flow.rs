//! Integration tests for search and download requests against a scripted
//! server and loopback DCC listeners.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use common::{MockServer, serve_bytes, zip_listing};
use kindling::dcc::{FileSink, TransferSink};
use kindling::error::{SearchError, TransferError};
use kindling::search::{RequestState, SearchClient, SearchOutcome, SearchResult};
use kindling_proto::{DccMessage, DccSend};

const LISTING_LINE: &str = "!BotA Author - Title.epub ::INFO:: 100KB";

fn offer_line(from: &str, offer: DccSend) -> String {
    format!(
        ":{from}!bot@host PRIVMSG kindling :{}",
        DccMessage::Send(offer).to_ctcp_string()
    )
}

fn book(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_search_returns_parsed_listing() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);

    let listing = zip_listing(&format!(
        "Search results for \"title\" from SearchBot\r\n{LISTING_LINE}\r\n"
    ));
    let bot = async {
        let query = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        assert_eq!(query.to_string(), "PRIVMSG #ebooks :@search title");

        let declared = listing.len() as u64;
        let (offer, data) = serve_bytes("SearchBot_results_for_title.txt.zip", listing, declared)
            .await
            .unwrap();
        peer.send_raw(&offer_line("SearchBot", offer)).await.unwrap();
        data
    };
    let (outcome, data) = tokio::join!(client.search("title"), bot);
    data.await.unwrap();

    let results = match outcome.expect("search succeeds") {
        SearchOutcome::Results(results) => results,
        SearchOutcome::NoMatches => panic!("expected results"),
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].bot, "BotA");
    assert_eq!(results[0].raw, LISTING_LINE);

    let meta = results[0].metadata().expect("metadata");
    assert_eq!(meta.author, "Author");
    assert_eq!(meta.title, "Title.epub");
    assert_eq!(client.state(), RequestState::ResultsReady);
}

#[tokio::test]
async fn test_no_matches_notice_is_empty_result() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        peer.send_raw(
            ":Search!search@host NOTICE kindling :Sorry, your search for \"zzyzx\" returned no matches.",
        )
        .await
        .unwrap();
    };
    let (outcome, ()) = tokio::join!(client.search("zzyzx"), bot);

    let outcome = outcome.expect("no matches is not an error");
    assert_eq!(outcome, SearchOutcome::NoMatches);
    assert!(outcome.into_results().is_empty());
    assert_eq!(client.state(), RequestState::NoMatches);
}

#[tokio::test]
async fn test_silence_is_no_search_response() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
    };
    let (outcome, ()) = tokio::join!(client.search("dune"), bot);

    match outcome {
        Err(SearchError::NoSearchResponse { query }) => assert_eq!(query, "dune"),
        other => panic!("expected NoSearchResponse, got {other:?}"),
    }
    assert_eq!(client.state(), RequestState::TimedOut);
}

#[tokio::test]
async fn test_download_takes_offer_from_named_bot() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();
    let content = book(3000);

    let bot = async {
        let request = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        assert_eq!(request.text(), Some(LISTING_LINE));

        // Another bot's offer must not be taken.
        let stray = DccSend::new("Other.epub", Ipv4Addr::LOCALHOST, 1, 10);
        peer.send_raw(&offer_line("Imposter", stray)).await.unwrap();

        let (offer, data) = serve_bytes("Author - Title.epub", content.clone(), 3000)
            .await
            .unwrap();
        peer.send_raw(&offer_line("BotA", offer)).await.unwrap();
        data
    };
    let (download, data) = tokio::join!(client.download(&result), bot);
    data.await.unwrap();

    let download = download.expect("download succeeds");
    assert_eq!(download.filename, "Author_-_Title.epub");
    assert_eq!(download.display_name(), "Author - Title.epub");
    assert_eq!(download.bytes.as_ref(), content.as_slice());
}

#[tokio::test]
async fn test_stray_malformed_dcc_during_search_is_no_response() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        peer.send_raw(":someone!u@h PRIVMSG kindling :\x01DCC SEND x nowhere 5000 10\x01")
            .await
            .unwrap();
    };
    let (outcome, ()) = tokio::join!(client.search("dune"), bot);

    match outcome {
        Err(SearchError::NoSearchResponse { query }) => assert_eq!(query, "dune"),
        other => panic!("expected NoSearchResponse, got {other:?}"),
    }
    assert_eq!(client.state(), RequestState::TimedOut);
}

#[tokio::test]
async fn test_download_without_offer_names_bot() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
    };
    let (download, ()) = tokio::join!(client.download(&result), bot);

    let err = download.expect_err("no offer arrives");
    assert!(matches!(err, SearchError::OfferTimeout { .. }));
    assert_eq!(err.bot(), Some("BotA"));
}

#[tokio::test]
async fn test_malformed_offer_is_reported() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        peer.send_raw(":BotA!bot@host PRIVMSG kindling :\x01DCC SEND book.epub nowhere 5000 10\x01")
            .await
            .unwrap();
    };
    let (download, ()) = tokio::join!(client.download(&result), bot);

    match download {
        Err(SearchError::MalformedDccOffer { bot, .. }) => assert_eq!(bot, "BotA"),
        other => panic!("expected MalformedDccOffer, got {other:?}"),
    }
}

#[tokio::test]
async fn test_short_transfer_is_incomplete() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        let (offer, data) = serve_bytes("Author - Title.epub", book(600), 1000)
            .await
            .unwrap();
        peer.send_raw(&offer_line("BotA", offer)).await.unwrap();
        data
    };
    let (download, data) = tokio::join!(client.download(&result), bot);
    data.await.unwrap();

    match download {
        Err(SearchError::Transfer {
            bot,
            source: TransferError::Incomplete { received, expected },
        }) => {
            assert_eq!(bot, "BotA");
            assert_eq!((received, expected), (600, 1000));
        }
        other => panic!("expected an incomplete transfer, got {other:?}"),
    }
    assert_eq!(client.state(), RequestState::Failed);
}

#[tokio::test]
async fn test_download_to_resumes_partial_file() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();

    let content = book(4096);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Author - Title.epub");
    std::fs::write(&path, &content[..2048]).unwrap();
    let mut sink = FileSink::open(&path).await.unwrap();
    assert_eq!(sink.position(), 2048);

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        let (offer, data) = serve_bytes("Author - Title.epub", content[2048..].to_vec(), 4096)
            .await
            .unwrap();
        let port = offer.port;
        peer.send_raw(&offer_line("BotA", offer)).await.unwrap();

        let resume = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        assert_eq!(
            resume.to_string(),
            format!("PRIVMSG BotA :\x01DCC RESUME Author_-_Title.epub {port} 2048\x01")
        );
        peer.send_raw(&format!(
            ":BotA!bot@host PRIVMSG kindling :\x01DCC ACCEPT Author_-_Title.epub {port} 2048\x01"
        ))
        .await
        .unwrap();
        data
    };
    let (transfer, data) = tokio::join!(client.download_to(&result, &mut sink), bot);
    data.await.unwrap();

    let transfer = transfer.expect("resumed download");
    assert_eq!(transfer.start_offset, 2048);
    assert_eq!(transfer.transferred, 2048);
    drop(sink);
    assert_eq!(std::fs::read(&path).unwrap(), content);
}

#[tokio::test]
async fn test_accept_past_held_bytes_leaves_file_untouched() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let client = SearchClient::new(Arc::clone(&session), &config);
    let result = SearchResult::parse(LISTING_LINE).unwrap();

    let content = book(4096);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Author - Title.epub");
    std::fs::write(&path, &content[..2048]).unwrap();
    let mut sink = FileSink::open(&path).await.unwrap();

    let bot = async {
        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        let (offer, _data) = serve_bytes("Author - Title.epub", content[3000..].to_vec(), 4096)
            .await
            .unwrap();
        let port = offer.port;
        peer.send_raw(&offer_line("BotA", offer)).await.unwrap();

        peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
        peer.send_raw(&format!(
            ":BotA!bot@host PRIVMSG kindling :\x01DCC ACCEPT Author_-_Title.epub {port} 3000\x01"
        ))
        .await
        .unwrap();
    };
    let (transfer, ()) = tokio::join!(client.download_to(&result, &mut sink), bot);

    match transfer {
        Err(SearchError::Transfer {
            source: TransferError::ResumeRejected(_),
            ..
        }) => {}
        other => panic!("expected a rejected resume, got {other:?}"),
    }
    drop(sink);
    assert_eq!(std::fs::read(&path).unwrap(), &content[..2048]);
}
