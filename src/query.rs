//! Query/response bridge.
//!
//! Layers a single-in-flight natural-language exchange on the push channel.
//! Replies carry no correlation id, so at most one query may be outstanding
//! at a time: a second submit is rejected with [`QueryError::Busy`] rather
//! than queued. Unsolicited alerts ride the same channel and pass through at
//! any time without touching the pending query. If the channel drops while a
//! query is outstanding, the bridge synthesizes exactly one failure event
//! after a grace delay so the caller is never left waiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::channel::{
    Alert, ChannelManager, ConnectionState, Outbound, QueryContext, QueryReply, SendError,
};

/// Default wait before a dropped channel fails the outstanding query.
pub const DEFAULT_QUERY_GRACE: Duration = Duration::from_millis(1500);

/// Why a query submission was rejected.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A query is already outstanding; retry after it settles.
    #[error("a query is already pending")]
    Busy,
    #[error(transparent)]
    Channel(#[from] SendError),
}

/// The one permitted in-flight query.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub text: String,
    pub issued_at: Instant,
}

/// Events surfaced to the presentation layer by [`QueryBridge::poll`].
#[derive(Debug, Clone)]
pub enum QueryEvent {
    /// Direct reply to the outstanding query.
    Reply(QueryReply),
    /// Unsolicited system notification, unrelated to any query.
    Alert(Alert),
    /// Synthetic failure for a query the channel lost.
    Failed { reason: String },
}

/// Serializes one logical request at a time over the manager's channel and
/// demultiplexes direct replies from unsolicited alerts.
pub struct QueryBridge {
    manager: Arc<ChannelManager>,
    replies: broadcast::Receiver<QueryReply>,
    alerts: broadcast::Receiver<Alert>,
    state: watch::Receiver<ConnectionState>,
    grace: Duration,
    pending: Option<PendingQuery>,
    failure_at: Option<Instant>,
}

impl QueryBridge {
    pub fn new(manager: Arc<ChannelManager>, grace: Duration) -> Self {
        let replies = manager.subscribe_replies();
        let alerts = manager.subscribe_alerts();
        let state = manager.state();
        Self {
            manager,
            replies,
            alerts,
            state,
            grace,
            pending: None,
            failure_at: None,
        }
    }

    /// The outstanding query, if any.
    pub fn pending(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Submit a query with the caller's current stream context.
    ///
    /// Rejected synchronously while a query is outstanding or the channel is
    /// down; a rejected query is never queued for later.
    pub fn submit(&mut self, text: &str, context: QueryContext) -> Result<(), QueryError> {
        if self.pending.is_some() {
            return Err(QueryError::Busy);
        }
        self.manager.send(Outbound::QuerySubmit {
            text: text.to_string(),
            context,
        })?;
        self.pending = Some(PendingQuery {
            text: text.to_string(),
            issued_at: Instant::now(),
        });
        Ok(())
    }

    /// Drain bridge events. Non-blocking.
    pub fn poll(&mut self) -> Vec<QueryEvent> {
        let mut events = Vec::new();

        loop {
            match self.replies.try_recv() {
                Ok(reply) => {
                    if self.pending.take().is_some() {
                        self.failure_at = None;
                        events.push(QueryEvent::Reply(reply));
                    } else {
                        // Without a correlation id a reply arriving after the
                        // query already settled cannot be matched to anything.
                        debug!("dropping reply with no query outstanding");
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "reply stream lagged");
                }
                Err(_) => break,
            }
        }

        loop {
            match self.alerts.try_recv() {
                Ok(alert) => events.push(QueryEvent::Alert(alert)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "alert stream lagged");
                }
                Err(_) => break,
            }
        }

        if self.pending.is_some() {
            // Arm the failure once the channel is seen down. The backend lost
            // the in-flight query with the old connection, so a reply can no
            // longer arrive; once armed the failure fires even if the channel
            // reconnects within the grace window.
            if self.failure_at.is_none() && !self.state.borrow().connected {
                self.failure_at = Some(Instant::now() + self.grace);
            }
            if let Some(at) = self.failure_at {
                if Instant::now() >= at {
                    let pending = self.pending.take();
                    self.failure_at = None;
                    if let Some(pending) = pending {
                        debug!(query = %pending.text, "synthesizing failure for lost query");
                    }
                    events.push(QueryEvent::Failed {
                        reason: "connection lost before a reply arrived".to_string(),
                    });
                }
            }
        }

        events
    }

    /// Re-attach to the manager after a manual disconnect/reconnect cycle
    /// (manual disconnect closes all subscriptions).
    pub fn resubscribe(&mut self) {
        self.replies = self.manager.subscribe_replies();
        self.alerts = self.manager.subscribe_alerts();
        self.state = self.manager.state();
    }
}
