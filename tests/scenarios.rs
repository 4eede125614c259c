#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! End-to-end vote sends against loopback servers
//! Each test spins up a one-shot TCP listener that plays the plugin's side

use futures::StreamExt;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use votifier_client::config::TransportConfig;
use votifier_client::core::codec::VoteFrameCodec;
use votifier_client::core::envelope::Envelope;
use votifier_client::utils::Metrics;
use votifier_client::{send_vote, Dispatcher, ProtocolError, ServerIdentity, Vote};

const TOKEN: &str = "secret";

fn vote() -> Vote {
    Vote::new("alice", "svc", "1.2.3.4")
}

fn quick_transport() -> TransportConfig {
    TransportConfig {
        connect_timeout: Duration::from_secs(2),
        greeting_timeout: Duration::from_millis(300),
        response_timeout: Duration::from_millis(300),
        ..TransportConfig::default()
    }
}

fn v2_dispatcher(port: u16) -> Dispatcher {
    Dispatcher::new(ServerIdentity::v2("127.0.0.1", port, TOKEN))
        .with_transport(quick_transport())
        .with_metrics(Arc::new(Metrics::new()))
}

/// One-shot v2 server: greet, read a frame, answer with `response` (if any)
async fn v2_server(
    greeting: &'static [u8],
    response: Option<&'static [u8]>,
) -> (u16, JoinHandle<Option<Envelope>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(greeting).await.unwrap();

        let (reader, mut writer) = stream.split();
        let mut frames = FramedRead::new(reader, VoteFrameCodec);
        let envelope = match frames.next().await {
            Some(Ok(envelope)) => envelope,
            _ => return None,
        };

        match response {
            Some(body) => writer.write_all(body).await.unwrap(),
            None => tokio::time::sleep(Duration::from_millis(600)).await,
        }
        Some(envelope)
    });

    (port, handle)
}

#[tokio::test]
async fn scenario_a_v2_accepted() {
    let (port, server) = v2_server(b"VOTIFIER 2.0 abc123\n", Some(b"{\"status\":\"ok\"}")).await;

    let stamped = v2_dispatcher(port).send(&vote()).await.unwrap();

    let envelope = server.await.unwrap().expect("server should receive a frame");
    assert!(envelope.verify(TOKEN));
    let payload = envelope.vote_payload().unwrap();
    assert_eq!(payload.challenge, "abc123");
    assert_eq!(payload.username, "alice");
    assert_eq!(payload.timestamp, stamped.timestamp());
}

#[tokio::test]
async fn scenario_b_v2_rejected() {
    let (port, server) = v2_server(
        b"VOTIFIER 2.0 abc123\n",
        Some(br#"{"status":"error","cause":"bad signature","error":"Invalid"}"#),
    )
    .await;

    let result = v2_dispatcher(port).send(&vote()).await;
    match result {
        Err(ProtocolError::ServerRejected { cause, .. }) => {
            assert_eq!(cause.as_deref(), Some("bad signature"));
        }
        other => panic!("expected ServerRejected, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn scenario_c_greeting_mismatch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"HELLO world\n").await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    let result = v2_dispatcher(port).send(&vote()).await;
    assert!(matches!(result, Err(ProtocolError::ProtocolMismatch(_))));

    let received = server.await.unwrap();
    assert!(received.is_empty(), "no bytes may be sent after a bad greeting");
}

#[tokio::test]
async fn scenario_d_no_response() {
    let (port, server) = v2_server(b"VOTIFIER 2.0 abc123\n", None).await;

    let result = v2_dispatcher(port).send(&vote()).await;
    assert!(matches!(result, Err(ProtocolError::NoResponse(_))));

    assert!(server.await.unwrap().is_some());
}

#[tokio::test]
async fn scenario_e_v1_block() {
    let private = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
    let pem = RsaPublicKey::from(&private)
        .to_public_key_pem(LineEnding::LF)
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });

    let dispatcher = Dispatcher::new(ServerIdentity::v1("127.0.0.1", port, pem))
        .with_transport(quick_transport())
        .with_metrics(Arc::new(Metrics::new()));
    let stamped = dispatcher.send(&vote()).await.unwrap();

    let block = server.await.unwrap();
    assert_eq!(block.len(), 128);

    let clear = private.decrypt(Pkcs1v15Encrypt, &block).unwrap();
    let expected = format!("VOTE\nsvc\nalice\n1.2.3.4\n{}\n", stamped.timestamp());
    assert_eq!(clear, expected.as_bytes());
}

#[tokio::test]
async fn v1_bad_key_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let result = send_vote(&vote(), &ServerIdentity::v1("127.0.0.1", port, "garbage!")).await;
    assert!(matches!(result, Err(ProtocolError::Encryption(_))));

    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should have been opened");
}

#[tokio::test]
async fn unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dispatcher = v2_dispatcher(port);
    let result = dispatcher.send(&vote()).await;
    assert!(matches!(result, Err(ProtocolError::Connection { .. })));
    assert_eq!(dispatcher.metrics().snapshot().connection_errors, 1);
}

#[test]
fn blocking_send() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (port, server) = runtime.block_on(v2_server(
        b"VOTIFIER 2.0 xyz\n",
        Some(b"{\"status\":\"ok\"}"),
    ));

    // The listener task keeps running on the multi-thread runtime's workers
    let dispatcher = v2_dispatcher(port);
    dispatcher.send_blocking(&vote()).unwrap();

    let envelope = runtime.block_on(server).unwrap().unwrap();
    assert_eq!(envelope.vote_payload().unwrap().challenge, "xyz");
}
