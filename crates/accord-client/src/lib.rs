//! Top-level client runtime.
//!
//! Wires the gateway connection, the event dispatcher, the cache, the
//! serialized command queue, and the readiness gate into one object
//! with a two-phase shutdown.

#![deny(unsafe_code)]

pub mod client;
pub mod logging;
pub mod shutdown;

pub use client::Client;
pub use shutdown::ShutdownCoordinator;
