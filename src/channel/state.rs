//! Observable connection lifecycle state.

/// Lifecycle phase of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No connection has been requested yet.
    Idle,
    Connecting,
    Connected,
    /// Closed, either manually or while automatic retries remain.
    Disconnected,
    /// The retry budget is exhausted; only a manual `connect()` resumes.
    /// Status surfaces render this distinctly from a transient drop.
    GaveUp,
}

impl ConnectionPhase {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Connected => "up",
            ConnectionPhase::Disconnected => "down",
            ConnectionPhase::GaveUp => "gave-up",
        }
    }
}

/// Snapshot of the channel's state, published on every transition.
///
/// Failures surface here as reason strings; nothing in the connection
/// lifecycle is reported to callers as an error value.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    pub connected: bool,
    pub last_error: Option<String>,
    /// Failed attempts since the last successful connection.
    pub reconnect_attempts: u32,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::fresh()
    }
}

impl ConnectionState {
    /// Clean-slate state, used before any connection and on fresh connect.
    pub fn fresh() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
            connected: false,
            last_error: None,
            reconnect_attempts: 0,
        }
    }

    pub(crate) fn connecting(attempts: u32) -> Self {
        Self {
            phase: ConnectionPhase::Connecting,
            connected: false,
            last_error: None,
            reconnect_attempts: attempts,
        }
    }

    pub(crate) fn connected() -> Self {
        Self {
            phase: ConnectionPhase::Connected,
            connected: true,
            last_error: None,
            reconnect_attempts: 0,
        }
    }

    pub(crate) fn disconnected(reason: &str, attempts: u32) -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            connected: false,
            last_error: Some(reason.to_string()),
            reconnect_attempts: attempts,
        }
    }

    /// Manual close: no error, retry counter cleared.
    pub(crate) fn closed() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            connected: false,
            last_error: None,
            reconnect_attempts: 0,
        }
    }

    pub(crate) fn gave_up(reason: &str, attempts: u32) -> Self {
        Self {
            phase: ConnectionPhase::GaveUp,
            connected: false,
            last_error: Some(reason.to_string()),
            reconnect_attempts: attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = ConnectionState::fresh();
        assert_eq!(state.phase, ConnectionPhase::Idle);
        assert!(!state.connected);
        assert!(state.last_error.is_none());
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn test_connected_resets_attempts() {
        let state = ConnectionState::connected();
        assert!(state.connected);
        assert_eq!(state.reconnect_attempts, 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_gave_up_carries_reason() {
        let state = ConnectionState::gave_up("connect failed: refused", 5);
        assert_eq!(state.phase, ConnectionPhase::GaveUp);
        assert_eq!(state.reconnect_attempts, 5);
        assert_eq!(
            state.last_error.as_deref(),
            Some("connect failed: refused")
        );
        assert_eq!(state.phase.symbol(), "gave-up");
    }
}
