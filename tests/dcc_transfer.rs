//! Integration tests for the DCC sender role and the serving bot.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use bytes::Bytes;
use common::MockServer;
use kindling::bot::ServingBot;
use kindling::dcc::{DccSender, MemorySink, Payload, TransferOptions, receive};
use kindling::error::TransferError;
use kindling::progress::ProgressReporter;
use kindling_proto::{DccMessage, DccSend, Message};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

fn book(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn offer_in(message: &Message) -> DccSend {
    let ctcp = message.ctcp().expect("CTCP payload");
    match DccMessage::from_ctcp(&ctcp).expect("DCC payload") {
        DccMessage::Send(offer) => offer,
        other => panic!("expected DCC SEND, got {other}"),
    }
}

#[tokio::test]
async fn test_sender_honours_resume() {
    let server = MockServer::bind().await.expect("bind");
    let config = server.config();
    let (session, mut peer) = server.session(&config).await.expect("registration");
    let content = book(4096);

    let sender = {
        let session = Arc::clone(&session);
        let dcc = config.dcc.clone();
        let payload = Payload::Bytes(Bytes::from(content.clone()));
        tokio::spawn(async move {
            DccSender::new(&session, &dcc)
                .send("reader", "book.epub", payload)
                .await
        })
    };

    let announced = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
    assert_eq!(announced.param(0), Some("reader"));
    let offer = offer_in(&announced);
    assert_eq!(offer.filename, "book.epub");
    assert_eq!(offer.size, 4096);
    assert_eq!(offer.ip(), Ipv4Addr::LOCALHOST);

    peer.send_raw(":reader!r@host PRIVMSG kindling :\x01DCC RESUME book.epub 5000 2048\x01")
        .await
        .unwrap();
    let accept = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
    assert_eq!(
        accept.to_string(),
        "PRIVMSG reader :\x01DCC ACCEPT book.epub 5000 2048\x01"
    );

    let mut stream = TcpStream::connect(offer.socket_addr()).await.unwrap();
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();
    drop(stream);
    assert_eq!(received, content[2048..]);

    let transfer = sender.await.unwrap().expect("transfer succeeds");
    assert_eq!(transfer.start_offset, 2048);
    assert_eq!(transfer.transferred, 2048);
    assert_eq!(transfer.total(), 4096);
}

#[tokio::test]
async fn test_sender_times_out_without_peer() {
    let server = MockServer::bind().await.expect("bind");
    let mut config = server.config();
    config.dcc.transfer_timeout_secs = 1;
    let (session, mut peer) = server.session(&config).await.expect("registration");

    let sender = DccSender::new(&session, &config.dcc);
    let send = sender.send(
        "reader",
        "book.epub",
        Payload::Bytes(Bytes::from_static(b"data")),
    );
    let announce = async { peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap() };
    let (result, _) = tokio::join!(send, announce);

    assert!(matches!(result, Err(TransferError::Timeout(_))));
}

#[tokio::test]
async fn test_receiver_reports_incomplete_transfer() {
    let (offer, data) = common::serve_bytes("book.epub", book(600), 1000)
        .await
        .unwrap();
    let mut sink = MemorySink::new();

    let err = receive(
        &offer,
        &mut sink,
        TransferOptions::default(),
        &ProgressReporter::disabled(),
    )
    .await
    .expect_err("600 of 1000 bytes is not a file");
    data.await.unwrap();

    assert!(matches!(
        err,
        TransferError::Incomplete {
            received: 600,
            expected: 1000
        }
    ));
}

#[tokio::test]
async fn test_bot_serves_library_file() {
    let server = MockServer::bind().await.expect("bind");
    let mut config = server.config();
    let library = tempfile::tempdir().unwrap();
    let content = book(1500);
    std::fs::write(library.path().join("Author - Title.epub"), &content).unwrap();
    config.bot.library = library.path().to_path_buf();

    let (session, mut peer) = server.session(&config).await.expect("registration");
    let shutdown = CancellationToken::new();
    let bot = {
        let bot = ServingBot::new(Arc::clone(&session), &config);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { bot.run(shutdown).await })
    };

    // Give the bot a moment to subscribe before the request arrives.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    peer.send_raw(":reader!r@host PRIVMSG #ebooks :!kindling Author - Title.epub ::INFO:: 2KB")
        .await
        .unwrap();

    let announced = peer.recv_until(|m| m.is("PRIVMSG")).await.unwrap();
    assert_eq!(announced.param(0), Some("reader"));
    let offer = offer_in(&announced);
    assert_eq!(offer.filename, "Author_-_Title.epub");
    assert_eq!(offer.size, 1500);

    let mut sink = MemorySink::new();
    receive(
        &offer,
        &mut sink,
        TransferOptions::default(),
        &ProgressReporter::disabled(),
    )
    .await
    .expect("served in full");
    assert_eq!(sink.into_bytes().as_ref(), content.as_slice());

    shutdown.cancel();
    bot.await.unwrap().expect("bot stops cleanly");
}
