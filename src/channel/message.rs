//! Wire frames exchanged over the push channel.
//!
//! Frames are JSON text, internally tagged on `"type"`. Inbound frames the
//! decoder does not recognize fail to parse and are dropped at the channel
//! boundary; the current snapshot stays authoritative.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::tracking::TrackingUpdate;

/// Severity attached to unsolicited alert frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Success,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Success => write!(f, "success"),
        }
    }
}

/// Direct reply to the in-flight query. Carries no correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReply {
    pub text: String,
}

/// System-generated notification, uncorrelated with any query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub severity: AlertSeverity,
}

/// Frames the backend pushes to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    TrackingUpdate(TrackingUpdate),
    QueryReply(QueryReply),
    Alert(Alert),
}

/// Stream context attached to an outbound query so the backend can answer
/// questions about what the operator is currently seeing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryContext {
    pub active_entity_count: u64,
    pub fps: f64,
}

/// Frames we send to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    QuerySubmit { text: String, context: QueryContext },
    /// Ask for an immediate telemetry publish, off the poll schedule.
    TelemetryRequest,
}
