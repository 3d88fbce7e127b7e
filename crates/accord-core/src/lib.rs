//! # accord-core
//!
//! Foundation types for the accord chat-platform client.
//!
//! This crate provides the shared vocabulary that all other accord crates
//! depend on:
//!
//! - **Wire payloads**: `GatewayPayload` envelope and `Opcode` for the
//!   persistent gateway connection
//! - **Close codes**: `CloseCodePolicy` classifying disconnect reasons into
//!   resume / re-identify / fatal
//! - **Intents**: capability bitflags sent during the handshake
//! - **Branded IDs**: `ResourceId` newtype for platform snowflakes
//! - **Backoff**: pure exponential and linear backoff math, no I/O
//! - **Decode contracts**: `DecodeResource` / `EncodeResource` with
//!   structured field-level decode errors

#![deny(unsafe_code)]

pub mod backoff;
pub mod close;
pub mod decode;
pub mod errors;
pub mod ids;
pub mod intents;
pub mod payload;

pub use close::{CloseAction, CloseCodePolicy};
pub use decode::{DecodeResource, EncodeResource, FieldReader};
pub use errors::DecodeError;
pub use ids::ResourceId;
pub use intents::Intents;
pub use payload::{GatewayPayload, Opcode};
