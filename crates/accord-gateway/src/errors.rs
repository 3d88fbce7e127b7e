//! Gateway error types.

use thiserror::Error;

/// Failure in the gateway connection or its transport.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Establishing the socket failed (resolve, connect, TLS, upgrade).
    #[error("failed to connect to gateway: {0}")]
    Connect(String),

    /// The socket failed mid-session.
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// A frame violated the protocol (not a close-code classification).
    #[error("gateway protocol error: {0}")]
    Protocol(String),

    /// The server closed the connection with a fatal close code
    /// (bad credentials, disallowed capability bits, sharding required).
    #[error("gateway closed with fatal code {code}: {reason}")]
    FatalClose {
        /// The close code.
        code: u16,
        /// Server-provided reason, possibly empty.
        reason: String,
    },

    /// Too many consecutive reconnect attempts failed.
    #[error("gateway gave up after {attempts} consecutive failed reconnects")]
    ReconnectExhausted {
        /// Number of consecutive failures observed.
        attempts: u32,
    },

    /// The server never sent its initial control frame.
    #[error("timed out waiting for the server hello")]
    HelloTimeout,
}

impl GatewayError {
    /// Whether reconnecting could help.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connect(_) | Self::Transport(_) | Self::Protocol(_) | Self::HelloTimeout
        )
    }
}
