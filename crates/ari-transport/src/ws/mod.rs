//! WebSocket event transport with exponential-backoff reconnection.
//!
//! Adapted directly from `alloy-transport::websocket::client`'s
//! `run_client_loop`/`try_reconnect`: a `tokio::select!` loop owning the
//! split sink/stream, a `watch` channel for idempotent shutdown, and a
//! backoff delay that doubles (by `backoff_multiplier`) on each failed
//! reconnect attempt and resets on a successful read.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{info, trace, warn};

use ari_core::Connection;

use crate::config::WsReconnectConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Lifecycle events the transport emits about itself, distinct from the ARI
/// events arriving over the socket (§6's "Reserved lifecycle event names").
#[derive(Debug, Clone)]
pub enum WsLifecycleEvent {
    Connected,
    Reconnecting,
    MaxRetries { last_error: String },
}

/// A raw text frame read from the socket, handed to the demultiplexer
/// unparsed.
#[derive(Debug, Clone)]
pub struct WsFrame(pub String);

/// Handle to a running WebSocket client task.
pub struct WsHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl WsHandle {
    /// Closes the socket and inhibits any further reconnect attempt (I6).
    /// Idempotent: calling `stop` twice is a no-op the second time.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Opens `{ws|wss}://{host}/ari/events?app={csv}&api_key={user}:{secret}`
/// and spawns the reconnect-driving loop. Returns a handle to stop the
/// loop, a channel of parsed lifecycle events, and a channel of raw text
/// frames for the demultiplexer to consume.
pub async fn connect(
    connection: &Connection,
    apps: &[String],
    config: WsReconnectConfig,
) -> ari_core::ClientResult<(WsHandle, mpsc::UnboundedReceiver<WsLifecycleEvent>, mpsc::UnboundedReceiver<WsFrame>)> {
    let url = build_url(connection, apps);

    let (ws_stream, _response) = connect_async(&url)
        .await
        .map_err(|e| ari_core::ClientError::HostIsNotReachable { cause: e.to_string() })?;
    let (ws_tx, ws_rx) = ws_stream.split();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();

    let _ = lifecycle_tx.send(WsLifecycleEvent::Connected);
    info!(url = %url, "ARI event WebSocket connected");

    tokio::spawn(run_client_loop(
        ws_tx,
        ws_rx,
        shutdown_rx,
        url,
        config,
        lifecycle_tx,
        frame_tx,
    ));

    Ok((WsHandle { shutdown_tx }, lifecycle_rx, frame_rx))
}

fn build_url(connection: &Connection, apps: &[String]) -> String {
    let csv = apps.join(",");
    format!(
        "{}?app={}&api_key={}:{}",
        connection.events_base_url(),
        csv,
        connection.user,
        connection.secret
    )
}

async fn run_client_loop(
    ws_tx: WsSink,
    ws_rx: WsSource,
    mut shutdown_rx: watch::Receiver<bool>,
    url: String,
    config: WsReconnectConfig,
    lifecycle_tx: mpsc::UnboundedSender<WsLifecycleEvent>,
    frame_tx: mpsc::UnboundedSender<WsFrame>,
) {
    let mut current_ws_tx = ws_tx;
    let mut current_ws_rx = ws_rx;
    let mut retry_count = 0u32;
    let mut current_delay = config.initial_delay;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("ARI event WebSocket shutting down");
                    let _ = current_ws_tx.close().await;
                    break;
                }
            }

            msg = current_ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "received event frame");
                        let _ = frame_tx.send(WsFrame(text.to_string()));
                        retry_count = 0;
                        current_delay = config.initial_delay;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = current_ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Binary(_))) => {
                        trace!("received unexpected binary frame, ignoring");
                    }
                    Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) | None => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        if !reconnect_or_break(
                            &url, &config, &mut retry_count, &mut current_delay,
                            &lifecycle_tx, &mut current_ws_tx, &mut current_ws_rx,
                            &mut shutdown_rx,
                        ).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "ARI event WebSocket error");
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        if !reconnect_or_break(
                            &url, &config, &mut retry_count, &mut current_delay,
                            &lifecycle_tx, &mut current_ws_tx, &mut current_ws_rx,
                            &mut shutdown_rx,
                        ).await {
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Attempts to reconnect per `config`'s backoff policy. Returns `false`
/// when the loop should stop entirely (reconnect disabled, exhausted, or
/// `stop()` was called while a backoff delay or connect attempt was in
/// flight — I6: `stop()` must prevent any subsequent reconnect attempt).
async fn reconnect_or_break(
    url: &str,
    config: &WsReconnectConfig,
    retry_count: &mut u32,
    current_delay: &mut Duration,
    lifecycle_tx: &mpsc::UnboundedSender<WsLifecycleEvent>,
    current_ws_tx: &mut WsSink,
    current_ws_rx: &mut WsSource,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    if !config.auto_reconnect {
        return false;
    }

    loop {
        if *shutdown_rx.borrow() {
            return false;
        }

        if let Some(max) = config.max_retries {
            if *retry_count >= max {
                let _ = lifecycle_tx.send(WsLifecycleEvent::MaxRetries {
                    last_error: "max reconnect attempts exceeded".to_string(),
                });
                return false;
            }
        }

        let _ = lifecycle_tx.send(WsLifecycleEvent::Reconnecting);
        warn!(delay = ?current_delay, "reconnecting to ARI event WebSocket");

        tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("ARI event WebSocket shutdown requested during backoff delay");
                return false;
            }
            _ = tokio::time::sleep(*current_delay) => {}
        }

        let connect_result = tokio::select! {
            _ = shutdown_rx.changed() => {
                info!("ARI event WebSocket shutdown requested during reconnect attempt");
                return false;
            }
            result = connect_async(url) => result,
        };

        match connect_result {
            Ok((stream, _)) => {
                let (tx, rx) = stream.split();
                *current_ws_tx = tx;
                *current_ws_rx = rx;
                *retry_count = 0;
                *current_delay = config.initial_delay;
                let _ = lifecycle_tx.send(WsLifecycleEvent::Connected);
                info!("reconnected to ARI event WebSocket");
                return true;
            }
            Err(e) => {
                warn!(error = %e, "reconnect attempt failed");
                *retry_count += 1;
                *current_delay = std::cmp::min(
                    Duration::from_secs_f64(current_delay.as_secs_f64() * config.backoff_multiplier),
                    config.max_delay,
                );
            }
        }
    }
}
