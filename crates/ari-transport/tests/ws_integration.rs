//! Integration test for the WebSocket transport's reconnect behavior (P9,
//! S7), driven against a tiny in-process mock WebSocket server built
//! directly on `tokio::net::TcpListener` + `tokio_tungstenite::accept_async`
//! — the transport being tested has no external mock-server crate to lean
//! on, so the server side is hand-rolled the way `spec.md` §8 anticipates
//! ("a mock WebSocket server that closes the socket on command").

use std::time::Duration;

use ari_core::{Connection, Scheme};
use ari_transport::config::WsReconnectConfig;
use ari_transport::WsLifecycleEvent;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

#[tokio::test]
async fn reconnects_on_unexpected_close_but_not_after_stop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        // First connection: accept the handshake, then drop it immediately
        // to simulate an unexpected close.
        let (stream, _) = listener.accept().await.expect("accept first connection");
        let ws = accept_async(stream).await.expect("ws handshake");
        drop(ws);

        // Second connection: accept and hold it open past the client's stop().
        let (stream, _) = listener.accept().await.expect("accept second connection");
        let _ws = accept_async(stream).await.expect("ws handshake");
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let connection = Connection::new(Scheme::Http, addr.to_string(), "user", "secret");
    let config = WsReconnectConfig::new()
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(50));

    let (handle, mut lifecycle_rx, _frame_rx) = ari_transport::ws::connect(&connection, &["test-app".to_string()], config)
        .await
        .expect("initial connect");

    assert!(matches!(
        lifecycle_rx.recv().await.expect("connected event"),
        WsLifecycleEvent::Connected
    ));
    assert!(matches!(
        lifecycle_rx.recv().await.expect("reconnecting event"),
        WsLifecycleEvent::Reconnecting
    ));
    assert!(matches!(
        lifecycle_rx.recv().await.expect("reconnected event"),
        WsLifecycleEvent::Connected
    ));

    handle.stop();

    // Closing on purpose must not trigger another reconnect attempt: the
    // lifecycle channel should go quiet (then close) rather than emit more
    // `Reconnecting`/`Connected` events.
    match tokio::time::timeout(Duration::from_millis(300), lifecycle_rx.recv()).await {
        Ok(None) | Err(_) => {}
        Ok(Some(event)) => panic!("unexpected lifecycle event after stop: {event:?}"),
    }
}

/// I6 — calling `stop()` while a reconnect backoff delay is in flight must
/// prevent the pending reconnect attempt from completing; no further
/// `Connected` event may arrive afterward.
#[tokio::test]
async fn stop_during_backoff_delay_prevents_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        // First connection: accept the handshake, then drop it immediately
        // to simulate an unexpected close. The test calls `stop()` before a
        // second connection attempt could ever be made, so no further
        // accept is needed.
        let (stream, _) = listener.accept().await.expect("accept first connection");
        let ws = accept_async(stream).await.expect("ws handshake");
        drop(ws);
    });

    let connection = Connection::new(Scheme::Http, addr.to_string(), "user", "secret");
    let config = WsReconnectConfig::new()
        .with_initial_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_millis(200));

    let (handle, mut lifecycle_rx, _frame_rx) = ari_transport::ws::connect(&connection, &["test-app".to_string()], config)
        .await
        .expect("initial connect");

    assert!(matches!(
        lifecycle_rx.recv().await.expect("connected event"),
        WsLifecycleEvent::Connected
    ));
    assert!(matches!(
        lifecycle_rx.recv().await.expect("reconnecting event"),
        WsLifecycleEvent::Reconnecting
    ));

    // The backoff delay is 200ms; stop while it's still in flight.
    handle.stop();

    match tokio::time::timeout(Duration::from_millis(400), lifecycle_rx.recv()).await {
        Ok(None) | Err(_) => {}
        Ok(Some(event)) => panic!("unexpected lifecycle event after stop during backoff: {event:?}"),
    }
}
