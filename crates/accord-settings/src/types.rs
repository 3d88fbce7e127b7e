//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a user
//! settings file can specify any subset of fields; the rest fall back to the
//! compiled defaults below.

use serde::{Deserialize, Serialize};

/// Root settings type for the accord client.
///
/// # JSON format
///
/// ```json
/// {
///   "enableGateway": true,
///   "cache": { "presences": false },
///   "copyOnUpdate": { "channels": true },
///   "maxShutdownTimeMs": 5000
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Whether to establish the persistent realtime connection at all.
    pub enable_gateway: bool,
    /// Gateway endpoint URL.
    pub gateway_url: String,
    /// Base URL for the one-shot request channel.
    pub rest_base_url: String,
    /// Known endpoint used by the request queue's reachability probe.
    pub probe_url: String,
    /// Which resource kinds the cache mirrors.
    pub cache: CacheFlags,
    /// Which resource kinds snapshot the previous value on update.
    pub copy_on_update: CopyOnUpdateFlags,
    /// Keep thread entries cached after they archive.
    pub retain_archived_threads: bool,
    /// Whether the command-sync manager is active. Recognized and
    /// persisted; this core does not run command synchronization.
    pub command_sync_manager: bool,
    /// Minimal-footprint preset: disables high-churn caches and all
    /// copy-on-update snapshots.
    pub basic_cache: bool,
    /// Upper bound on graceful shutdown before tasks are force-aborted.
    pub max_shutdown_time_ms: u64,
    /// Reconnect behavior of the gateway connection.
    pub reconnect: ReconnectSettings,
    /// Hold-and-retry behavior of the request queue.
    pub queue: QueueSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            enable_gateway: true,
            gateway_url: "wss://gateway.accord.gg/?v=1&encoding=json".into(),
            rest_base_url: "https://api.accord.gg/v1".into(),
            probe_url: "https://api.accord.gg/".into(),
            cache: CacheFlags::default(),
            copy_on_update: CopyOnUpdateFlags::default(),
            retain_archived_threads: false,
            command_sync_manager: false,
            basic_cache: false,
            max_shutdown_time_ms: 10_000,
            reconnect: ReconnectSettings::default(),
            queue: QueueSettings::default(),
        }
    }
}

impl ClientSettings {
    /// Cache flags with the `basicCache` preset applied.
    #[must_use]
    pub fn effective_cache(&self) -> CacheFlags {
        let mut flags = self.cache.clone();
        if self.basic_cache {
            flags.presences = false;
            flags.voice_states = false;
            flags.emojis = false;
        }
        flags
    }

    /// Copy-on-update flags with the `basicCache` preset applied.
    #[must_use]
    pub fn effective_copy_on_update(&self) -> CopyOnUpdateFlags {
        if self.basic_cache {
            CopyOnUpdateFlags::none()
        } else {
            self.copy_on_update.clone()
        }
    }
}

/// Per-resource-kind cache enablement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheFlags {
    /// Cache guilds.
    pub guilds: bool,
    /// Cache roles.
    pub roles: bool,
    /// Cache members.
    pub members: bool,
    /// Cache channels.
    pub channels: bool,
    /// Cache threads.
    pub threads: bool,
    /// Cache presences.
    pub presences: bool,
    /// Cache voice states.
    pub voice_states: bool,
    /// Cache custom emojis.
    pub emojis: bool,
}

impl Default for CacheFlags {
    fn default() -> Self {
        Self {
            guilds: true,
            roles: true,
            members: true,
            channels: true,
            threads: true,
            presences: true,
            voice_states: true,
            emojis: true,
        }
    }
}

/// Per-resource-kind copy-on-update policy.
///
/// When enabled for a kind, updates snapshot the previous value so
/// subscribers receive a before/after pair. High-churn kinds default off.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopyOnUpdateFlags {
    /// Snapshot guilds.
    pub guilds: bool,
    /// Snapshot roles.
    pub roles: bool,
    /// Snapshot members.
    pub members: bool,
    /// Snapshot channels.
    pub channels: bool,
    /// Snapshot threads.
    pub threads: bool,
    /// Snapshot presences.
    pub presences: bool,
    /// Snapshot voice states.
    pub voice_states: bool,
    /// Snapshot custom emojis.
    pub emojis: bool,
}

impl Default for CopyOnUpdateFlags {
    fn default() -> Self {
        Self {
            guilds: true,
            roles: true,
            members: true,
            channels: true,
            threads: true,
            presences: false,
            voice_states: false,
            emojis: true,
        }
    }
}

impl CopyOnUpdateFlags {
    /// All kinds disabled.
    #[must_use]
    pub fn none() -> Self {
        Self {
            guilds: false,
            roles: false,
            members: false,
            channels: false,
            threads: false,
            presences: false,
            voice_states: false,
            emojis: false,
        }
    }
}

/// Gateway reconnect tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectSettings {
    /// Base delay for exponential reconnect backoff, ms.
    pub base_delay_ms: u64,
    /// Ceiling for reconnect backoff, ms.
    pub max_delay_ms: u64,
    /// Consecutive failed reconnects before the connection is declared
    /// failed and surfaced to the application.
    pub max_consecutive_failures: u32,
    /// How long to wait for the server's initial control frame, ms.
    pub hello_timeout_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            max_consecutive_failures: 7,
            hello_timeout_ms: 20_000,
        }
    }
}

/// Request queue hold-and-retry tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSettings {
    /// First hold duration after a connectivity failure, ms.
    pub start_delay_ms: u64,
    /// Fixed growth per consecutive failure, ms.
    pub increment_ms: u64,
    /// Hold duration ceiling, ms.
    pub cap_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            start_delay_ms: 500,
            increment_ms: 500,
            cap_ms: 10_000,
        }
    }
}
