//! # accord-gateway
//!
//! The persistent duplex connection to the platform's event stream.
//!
//! One [`GatewayConnection`] keeps one logical session alive across
//! physical reconnects. It orchestrates:
//!
//! - a [`GatewayTransport`] (tokio-tungstenite in production, scripted in
//!   tests) for the raw duplex socket
//! - the [`Heartbeater`], which paces liveness pings on its own timer so a
//!   blocked read can never starve a heartbeat
//! - the [`SessionTracker`], pure resume-vs-identify decision logic
//! - the [`ReadinessGate`], merging independent "subsystem ready" signals
//!
//! Decoded dispatch events leave this crate through an mpsc channel; cache
//! application lives in `accord-cache`.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod heartbeat;
pub mod readiness;
pub mod session;
pub mod state;
pub mod testing;
pub mod transport;

pub use connection::{DispatchedEvent, GatewayConfig, GatewayConnection, GatewayHandle};
pub use errors::GatewayError;
pub use heartbeat::{HeartbeatSignal, HeartbeatSnapshot, Heartbeater};
pub use readiness::ReadinessGate;
pub use session::{HandshakePlan, SessionTracker};
pub use state::{ConnectionObserver, ConnectionState, TracingObserver};
pub use transport::{Frame, GatewayStream, GatewayTransport, WsTransport};
