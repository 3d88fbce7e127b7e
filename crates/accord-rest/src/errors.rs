//! REST-side error types.

use serde_json::Value;
use thiserror::Error;

/// A failure before a well-formed response was obtained.
#[derive(Debug, Error)]
pub enum RestError {
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Terminal outcome of a queued command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The server answered with a non-success status.
    #[error("api error: status {status}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as received.
        body: Value,
    },

    /// The client shut down before the command completed.
    #[error("client shut down")]
    Shutdown,
}
