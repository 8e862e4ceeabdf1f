//! In-process WebSocket peer for exercising the channel against a live
//! socket in tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Notify};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use super::state::ConnectionState;

/// A loopback backend that records frames it receives and pushes frames to
/// whichever client is currently connected. Accepts repeated connections
/// so reconnect behavior can be observed.
pub(crate) struct TestBackend {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    push_tx: mpsc::UnboundedSender<String>,
    kick: Arc<Notify>,
    connections: Arc<AtomicUsize>,
}

impl TestBackend {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<String>();
        let kick = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));

        let received_handle = received.clone();
        let kick_handle = kick.clone();
        let connections_handle = connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                connections_handle.fetch_add(1, Ordering::SeqCst);
                let Ok(mut ws) = accept_async(stream).await else {
                    continue;
                };
                loop {
                    tokio::select! {
                        frame = ws.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                received_handle.lock().unwrap().push(text);
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        },
                        frame = push_rx.recv() => match frame {
                            Some(text) => {
                                if ws.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            None => return,
                        },
                        _ = kick_handle.notified() => {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
            }
        });

        Self {
            addr,
            received,
            push_tx,
            kick,
            connections,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Push a raw text frame to the connected client.
    pub fn push(&self, frame: &str) {
        let _ = self.push_tx.send(frame.to_string());
    }

    /// Drop the current connection.
    pub fn kick(&self) {
        self.kick.notify_one();
    }

    /// Text frames received from the client so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// How many connections have been accepted.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Wait until the watched connection state satisfies `predicate`, with a
/// hard timeout so a broken transition hangs the test loudly, not forever.
pub(crate) async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    predicate: impl Fn(&ConnectionState) -> bool,
) {
    let wait = async {
        loop {
            if predicate(&rx.borrow()) {
                return;
            }
            if rx.changed().await.is_err() {
                panic!("state channel closed before condition was met");
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for connection state");
}
