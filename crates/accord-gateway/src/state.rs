//! Connection lifecycle state and the injected transition observer.

use std::fmt;

use tracing::{debug, info, warn};

/// Lifecycle state of one logical gateway connection.
///
/// Exactly one instance exists per logical connection, owned exclusively
/// by the connection state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started.
    Idle,
    /// Opening the socket.
    Connecting,
    /// Socket open, waiting for the server's initial control frame.
    AwaitingHandshake,
    /// Fresh handshake sent, waiting for completion.
    Identifying,
    /// Resume handshake sent, waiting for completion.
    Resuming,
    /// Handshake complete; events flowing.
    Connected,
    /// Local shutdown in progress.
    Closing,
    /// Terminal failure; no further automatic retry.
    Failed,
}

impl ConnectionState {
    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingHandshake => "awaiting_handshake",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Injected listener for connection diagnostics.
///
/// The state machine reports every transition and notable event here
/// instead of depending on a concrete logging implementation. All methods
/// have no-op-compatible default behavior expectations: implementations
/// must not block.
pub trait ConnectionObserver: Send + Sync {
    /// A state transition occurred.
    fn on_transition(&self, from: ConnectionState, to: ConnectionState);

    /// A heartbeat went unacknowledged and the connection was force-closed.
    fn on_zombie(&self) {}

    /// The socket closed with the given code (if any).
    fn on_close(&self, _code: Option<u16>, _reason: &str) {}

    /// An inbound payload could not be decoded and was dropped.
    fn on_decode_dropped(&self, _detail: &str) {}

    /// A reconnect attempt is about to be made after a delay.
    fn on_reconnect_scheduled(&self, _attempt: u32, _delay_ms: u64) {}
}

/// Default observer: structured tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ConnectionObserver for TracingObserver {
    fn on_transition(&self, from: ConnectionState, to: ConnectionState) {
        info!(%from, %to, "gateway state transition");
    }

    fn on_zombie(&self) {
        warn!("heartbeat unacknowledged; closing zombie connection");
    }

    fn on_close(&self, code: Option<u16>, reason: &str) {
        info!(?code, reason, "gateway socket closed");
    }

    fn on_decode_dropped(&self, detail: &str) {
        warn!(detail, "dropped undecodable gateway payload");
    }

    fn on_reconnect_scheduled(&self, attempt: u32, delay_ms: u64) {
        debug!(attempt, delay_ms, "reconnect scheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn only_failed_is_terminal() {
        assert!(ConnectionState::Failed.is_terminal());
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::AwaitingHandshake,
            ConnectionState::Identifying,
            ConnectionState::Resuming,
            ConnectionState::Connected,
            ConnectionState::Closing,
        ] {
            assert!(!state.is_terminal(), "{state}");
        }
    }

    #[test]
    fn display_names_are_snake_case() {
        assert_eq!(ConnectionState::AwaitingHandshake.to_string(), "awaiting_handshake");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    #[test]
    fn custom_observer_sees_transitions() {
        #[derive(Default)]
        struct Recorder {
            transitions: Mutex<Vec<(ConnectionState, ConnectionState)>>,
        }
        impl ConnectionObserver for Recorder {
            fn on_transition(&self, from: ConnectionState, to: ConnectionState) {
                self.transitions.lock().push((from, to));
            }
        }

        let recorder = Arc::new(Recorder::default());
        let observer: Arc<dyn ConnectionObserver> = recorder.clone();
        observer.on_transition(ConnectionState::Idle, ConnectionState::Connecting);
        observer.on_zombie(); // default impl is a no-op

        let seen = recorder.transitions.lock();
        assert_eq!(
            *seen,
            vec![(ConnectionState::Idle, ConnectionState::Connecting)]
        );
    }

    #[test]
    fn tracing_observer_is_zero_sized_and_callable() {
        let observer = TracingObserver;
        observer.on_transition(ConnectionState::Connecting, ConnectionState::AwaitingHandshake);
        observer.on_close(Some(1000), "bye");
        observer.on_decode_dropped("bad json");
        observer.on_reconnect_scheduled(2, 4000);
    }
}
