//! # accord-settings
//!
//! Recognized configuration options for the accord client, loaded from a
//! JSON file with deep merge over compiled defaults and environment
//! variable overrides.
//!
//! All field names are camelCase on disk. Every type tolerates partial
//! JSON — missing fields get their default value during deserialization.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{
    CacheFlags, ClientSettings, CopyOnUpdateFlags, QueueSettings, ReconnectSettings,
};
