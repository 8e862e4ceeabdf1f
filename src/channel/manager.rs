//! Push channel lifecycle and message fan-out.
//!
//! The manager is the only component that opens or closes the WebSocket to
//! the sensing backend. It owns the connection task, applies the bounded
//! reconnection policy, publishes [`ConnectionState`] transitions on a
//! watch channel, and fans decoded inbound frames out to per-kind
//! subscribers. Dependents are handed an explicitly constructed manager
//! rather than reaching for a process-wide instance.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{Alert, Inbound, Outbound, QueryReply};
use super::state::ConnectionState;
use crate::data::tracking::TrackingUpdate;

/// In-flight frames buffered per fan-out subscription.
const FANOUT_CAPACITY: usize = 64;
/// Outbound frames buffered ahead of the socket writer.
const OUTBOUND_CAPACITY: usize = 16;

/// Connection policy for the push channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL of the sensing backend.
    pub url: String,
    /// Failed attempts tolerated before giving up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(2000),
        }
    }
}

/// Error returned when an outbound frame cannot be handed to the channel.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("channel is not connected")]
    NotConnected,
    #[error("outbound queue is full")]
    QueueFull,
}

/// Per-kind fan-out senders. Cloned into the connection task; recreated on
/// manual disconnect so outstanding receivers observe closure.
#[derive(Clone)]
struct FanOut {
    tracking: broadcast::Sender<TrackingUpdate>,
    replies: broadcast::Sender<QueryReply>,
    alerts: broadcast::Sender<Alert>,
}

impl FanOut {
    fn new() -> Self {
        let (tracking, _) = broadcast::channel(FANOUT_CAPACITY);
        let (replies, _) = broadcast::channel(FANOUT_CAPACITY);
        let (alerts, _) = broadcast::channel(FANOUT_CAPACITY);
        Self {
            tracking,
            replies,
            alerts,
        }
    }
}

struct Inner {
    task: Option<JoinHandle<()>>,
    outbound: Option<mpsc::Sender<Outbound>>,
    fanout: FanOut,
}

/// Owns the persistent channel to the sensing backend.
///
/// All lifecycle transitions go through this type; dependents observe them
/// through [`ChannelManager::state`] and receive messages through the
/// typed subscription methods. Dropping the manager aborts the connection
/// task, so no reconnect timer outlives it.
pub struct ChannelManager {
    config: ChannelConfig,
    state_tx: watch::Sender<ConnectionState>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager").field("url", &self.config.url).finish()
    }
}

impl ChannelManager {
    pub fn new(config: ChannelConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::fresh());
        Self {
            config,
            state_tx,
            inner: Mutex::new(Inner {
                task: None,
                outbound: None,
                fanout: FanOut::new(),
            }),
        }
    }

    /// Watch connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The state as of right now.
    pub fn current_state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state_tx.borrow().connected
    }

    /// Subscribe to tracking-update frames.
    pub fn subscribe_tracking(&self) -> broadcast::Receiver<TrackingUpdate> {
        self.inner.lock().unwrap().fanout.tracking.subscribe()
    }

    /// Subscribe to query-reply frames.
    pub fn subscribe_replies(&self) -> broadcast::Receiver<QueryReply> {
        self.inner.lock().unwrap().fanout.replies.subscribe()
    }

    /// Subscribe to unsolicited alert frames.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<Alert> {
        self.inner.lock().unwrap().fanout.alerts.subscribe()
    }

    /// Queue a frame for the backend.
    ///
    /// Fails when the channel is down; frames are never queued across a
    /// disconnection.
    pub fn send(&self, frame: Outbound) -> Result<(), SendError> {
        let inner = self.inner.lock().unwrap();
        if !self.state_tx.borrow().connected {
            return Err(SendError::NotConnected);
        }
        let Some(tx) = inner.outbound.as_ref() else {
            return Err(SendError::NotConnected);
        };
        tx.try_send(frame).map_err(|_| SendError::QueueFull)
    }

    /// Ask the backend for an immediate telemetry publish.
    pub fn request_telemetry(&self) -> Result<(), SendError> {
        self.send(Outbound::TelemetryRequest)
    }

    /// Open the channel if it is not already open.
    ///
    /// Idempotent: a second call while the connection task is live is a
    /// no-op. Never returns an error; failures surface as reason strings on
    /// the published [`ConnectionState`].
    pub fn connect(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = &inner.task {
            if !task.is_finished() {
                return;
            }
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.state_tx.send_replace(ConnectionState::fresh());

        let task = tokio::spawn(run_connection(
            self.config.clone(),
            self.state_tx.clone(),
            inner.fanout.clone(),
            outbound_rx,
        ));
        inner.task = Some(task);
        inner.outbound = Some(outbound_tx);
    }

    /// Close the channel and clear all subscriptions.
    ///
    /// Cancels any pending reconnect delay. Outstanding subscription
    /// receivers observe closure; new subscriptions start clean.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.outbound = None;
        inner.fanout = FanOut::new();
        self.state_tx.send_replace(ConnectionState::closed());
        info!("channel closed");
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(task) = inner.task.take() {
                task.abort();
            }
        }
    }
}

/// Connection task: connect, run the session, retry on failure with a
/// fixed delay up to the configured bound.
async fn run_connection(
    config: ChannelConfig,
    state: watch::Sender<ConnectionState>,
    fanout: FanOut,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    let mut attempts: u32 = 0;
    loop {
        state.send_replace(ConnectionState::connecting(attempts));
        match connect_async(config.url.as_str()).await {
            Ok((ws, _)) => {
                info!(url = %config.url, "channel connected");
                attempts = 0;
                state.send_replace(ConnectionState::connected());
                let reason = run_session(ws, &fanout, &mut outbound).await;
                warn!(%reason, "channel dropped");
                state.send_replace(ConnectionState::disconnected(&reason, attempts));
            }
            Err(e) => {
                attempts += 1;
                let reason = format!("connect failed: {e}");
                if attempts >= config.max_reconnect_attempts {
                    warn!(%reason, attempts, "reconnect budget exhausted");
                    state.send_replace(ConnectionState::gave_up(&reason, attempts));
                    return;
                }
                warn!(%reason, attempt = attempts, "retrying");
                state.send_replace(ConnectionState::disconnected(&reason, attempts));
            }
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

/// Pump one established session until it ends; returns the reason.
async fn run_session(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    fanout: &FanOut,
    outbound: &mut mpsc::Receiver<Outbound>,
) -> String {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(&text, fanout),
                Some(Ok(Message::Ping(payload))) => {
                    if sink.send(Message::Pong(payload)).await.is_err() {
                        return "write error: pong failed".to_string();
                    }
                }
                Some(Ok(Message::Close(_))) => return "closed by peer".to_string(),
                Some(Ok(_)) => {}
                Some(Err(e)) => return format!("read error: {e}"),
                None => return "connection closed".to_string(),
            },
            frame = outbound.recv() => match frame {
                Some(frame) => match serde_json::to_string(&frame) {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            return format!("write error: {e}");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to encode outbound frame"),
                },
                None => return "outbound queue closed".to_string(),
            },
        }
    }
}

/// Decode a text frame and route it to the matching subscribers.
///
/// Undecodable frames are dropped here; the last-known-good snapshot held
/// by each monitor stays authoritative.
fn dispatch(text: &str, fanout: &FanOut) {
    match serde_json::from_str::<Inbound>(text) {
        Ok(Inbound::TrackingUpdate(update)) => {
            let _ = fanout.tracking.send(update);
        }
        Ok(Inbound::QueryReply(reply)) => {
            let _ = fanout.replies.send(reply);
        }
        Ok(Inbound::Alert(alert)) => {
            let _ = fanout.alerts.send(alert);
        }
        Err(e) => debug!(error = %e, "dropping undecodable frame"),
    }
}
