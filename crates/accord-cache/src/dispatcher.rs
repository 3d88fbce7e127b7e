//! Event-name parsing and the cache consistency layer.
//!
//! `apply` is called from the single gateway dispatch context, so cache
//! mutations are serialized; subscribers run synchronously in
//! registration order and an erroring subscriber never stops the rest.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, warn};

use accord_core::ids::ResourceId;

use crate::resource::{Resource, ResourceKind};
use crate::store::{Applied, Cache};
use crate::update::CacheUpdate;

/// Dispatch event names this layer understands.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum GatewayEvent {
    Ready,
    Resumed,
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    ThreadCreate,
    ThreadUpdate,
    ThreadDelete,
    GuildRoleCreate,
    GuildRoleUpdate,
    GuildRoleDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    PresenceUpdate,
    VoiceStateUpdate,
    GuildEmojisUpdate,
    Unknown(String),
}

impl GatewayEvent {
    /// Parse a wire event name. Unrecognized names are preserved.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "READY" => Self::Ready,
            "RESUMED" => Self::Resumed,
            "GUILD_CREATE" => Self::GuildCreate,
            "GUILD_UPDATE" => Self::GuildUpdate,
            "GUILD_DELETE" => Self::GuildDelete,
            "CHANNEL_CREATE" => Self::ChannelCreate,
            "CHANNEL_UPDATE" => Self::ChannelUpdate,
            "CHANNEL_DELETE" => Self::ChannelDelete,
            "THREAD_CREATE" => Self::ThreadCreate,
            "THREAD_UPDATE" => Self::ThreadUpdate,
            "THREAD_DELETE" => Self::ThreadDelete,
            "GUILD_ROLE_CREATE" => Self::GuildRoleCreate,
            "GUILD_ROLE_UPDATE" => Self::GuildRoleUpdate,
            "GUILD_ROLE_DELETE" => Self::GuildRoleDelete,
            "GUILD_MEMBER_ADD" => Self::GuildMemberAdd,
            "GUILD_MEMBER_UPDATE" => Self::GuildMemberUpdate,
            "GUILD_MEMBER_REMOVE" => Self::GuildMemberRemove,
            "PRESENCE_UPDATE" => Self::PresenceUpdate,
            "VOICE_STATE_UPDATE" => Self::VoiceStateUpdate,
            "GUILD_EMOJIS_UPDATE" => Self::GuildEmojisUpdate,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

/// Receives cache updates synchronously, in registration order.
pub trait CacheSubscriber: Send + Sync {
    /// Label used when logging subscriber failures.
    fn name(&self) -> &str {
        "subscriber"
    }

    /// Handle one update. An `Err` is logged and dispatch continues.
    fn on_update(&self, update: &CacheUpdate) -> Result<(), String>;
}

/// Applies dispatch payloads to the cache and fans updates out.
pub struct EventDispatcher {
    cache: Arc<Cache>,
    subscribers: RwLock<Vec<Arc<dyn CacheSubscriber>>>,
}

impl EventDispatcher {
    /// Dispatcher over the given cache with no subscribers yet.
    #[must_use]
    pub fn new(cache: Arc<Cache>) -> Self {
        Self {
            cache,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// The cache this dispatcher mutates.
    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Register a subscriber. Order of registration is the order of
    /// delivery.
    pub fn subscribe(&self, subscriber: Arc<dyn CacheSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Apply one dispatch payload. Returns the cache updates it caused,
    /// after delivering them to all subscribers.
    pub fn apply(&self, event_name: &str, raw: &Value) -> Vec<CacheUpdate> {
        let event = GatewayEvent::parse(event_name);
        let updates = match &event {
            GatewayEvent::Ready => self.seed_ready(raw),
            GatewayEvent::Resumed => Vec::new(),
            GatewayEvent::GuildCreate | GatewayEvent::GuildUpdate => {
                collect(self.upsert(ResourceKind::Guild, raw))
            }
            GatewayEvent::GuildDelete => {
                // An outage marks the guild unavailable; only a real
                // removal (leave/ban) evicts it.
                if raw.get("unavailable").and_then(Value::as_bool) == Some(true) {
                    collect(self.upsert(ResourceKind::Guild, raw))
                } else {
                    collect(self.remove(ResourceKind::Guild, raw))
                }
            }
            GatewayEvent::ChannelCreate
            | GatewayEvent::ChannelUpdate
            | GatewayEvent::ThreadCreate
            | GatewayEvent::ThreadUpdate => collect(self.upsert(ResourceKind::Channel, raw)),
            GatewayEvent::ChannelDelete | GatewayEvent::ThreadDelete => {
                collect(self.remove(ResourceKind::Channel, raw))
            }
            GatewayEvent::GuildRoleCreate | GatewayEvent::GuildRoleUpdate => collect(
                raw.get("role")
                    .and_then(|role| self.upsert(ResourceKind::Role, role)),
            ),
            GatewayEvent::GuildRoleDelete => collect(
                raw.get("role_id")
                    .and_then(Value::as_str)
                    .and_then(|id| self.remove(ResourceKind::Role, &json!({"id": id}))),
            ),
            GatewayEvent::GuildMemberAdd | GatewayEvent::GuildMemberUpdate => {
                collect(self.upsert(ResourceKind::Member, raw))
            }
            GatewayEvent::GuildMemberRemove => collect(self.remove(ResourceKind::Member, raw)),
            GatewayEvent::PresenceUpdate => collect(self.upsert(ResourceKind::Presence, raw)),
            GatewayEvent::VoiceStateUpdate => {
                // A null channel means the user left voice entirely.
                if raw.get("channel_id") == Some(&Value::Null) {
                    collect(self.remove(ResourceKind::VoiceState, raw))
                } else {
                    collect(self.upsert(ResourceKind::VoiceState, raw))
                }
            }
            GatewayEvent::GuildEmojisUpdate => self.apply_emojis(raw),
            GatewayEvent::Unknown(name) => {
                debug!(event = %name, "no cache handling for event");
                Vec::new()
            }
        };

        for update in &updates {
            self.fan_out(update);
        }
        updates
    }

    /// READY seeds the guild map from the initial guild list.
    fn seed_ready(&self, raw: &Value) -> Vec<CacheUpdate> {
        raw.get("guilds")
            .and_then(Value::as_array)
            .map(|guilds| {
                guilds
                    .iter()
                    .filter_map(|guild| self.upsert(ResourceKind::Guild, guild))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// GUILD_EMOJIS_UPDATE carries the full emoji list for one guild.
    fn apply_emojis(&self, raw: &Value) -> Vec<CacheUpdate> {
        let guild_id = raw.get("guild_id").and_then(Value::as_str);
        raw.get("emojis")
            .and_then(Value::as_array)
            .map(|emojis| {
                emojis
                    .iter()
                    .filter_map(|emoji| {
                        let mut emoji = emoji.clone();
                        if let (Some(gid), Some(obj)) = (guild_id, emoji.as_object_mut()) {
                            let _ = obj.entry("guild_id").or_insert_with(|| json!(gid));
                        }
                        self.upsert(ResourceKind::Emoji, &emoji)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up or decode, merge partials, store. Decode failures are
    /// logged and the payload dropped; the cache is never corrupted.
    fn upsert(&self, kind: ResourceKind, raw: &Value) -> Option<CacheUpdate> {
        let existing = extract_id(kind, raw).and_then(|id| self.cache.get(kind, &id));
        let resource = match existing {
            Some(existing) => {
                let mut merged = (*existing).clone();
                merged.merge(raw);
                merged
            }
            None => match Resource::decode(kind, raw) {
                Ok(resource) => resource,
                Err(e) => {
                    warn!(%kind, error = %e, "dropping undecodable payload");
                    return None;
                }
            },
        };

        if resource.is_archived_thread() && !self.cache.policy().retain_archived_threads {
            let id = resource.id().clone();
            let snapshot = self
                .cache
                .evict(kind, &id)
                .unwrap_or_else(|| Arc::new(resource));
            return Some(CacheUpdate::removed(kind, snapshot));
        }

        match self.cache.store(resource) {
            Applied::Stored { old, new } => Some(CacheUpdate::stored(kind, old, new)),
            Applied::NotCached(resource) => Some(CacheUpdate::stored(kind, None, resource)),
            Applied::Stale => None,
        }
    }

    /// Handle a delete-type event: evict, tombstone, report the removed
    /// snapshot (decoded from the payload when nothing was cached).
    fn remove(&self, kind: ResourceKind, raw: &Value) -> Option<CacheUpdate> {
        let id = match extract_id(kind, raw) {
            Some(id) => id,
            None => {
                warn!(%kind, "delete event without a resource id");
                return None;
            }
        };
        let snapshot = self
            .cache
            .remove(kind, &id)
            .or_else(|| Resource::decode(kind, raw).ok().map(Arc::new))?;
        Some(CacheUpdate::removed(kind, snapshot))
    }

    fn fan_out(&self, update: &CacheUpdate) {
        let subscribers: Vec<Arc<dyn CacheSubscriber>> = self.subscribers.read().clone();
        for subscriber in subscribers {
            if let Err(e) = subscriber.on_update(update) {
                warn!(subscriber = subscriber.name(), error = %e, "subscriber failed");
            }
        }
    }
}

/// Where each kind's cache identity lives in the payload.
fn extract_id(kind: ResourceKind, raw: &Value) -> Option<ResourceId> {
    let id = match kind {
        ResourceKind::Member | ResourceKind::Presence => {
            raw.get("user")?.get("id")?.as_str()?
        }
        ResourceKind::VoiceState => raw.get("user_id")?.as_str()?,
        _ => raw.get("id")?.as_str()?,
    };
    Some(ResourceId::new(id))
}

fn collect(update: Option<CacheUpdate>) -> Vec<CacheUpdate> {
    update.into_iter().collect()
}
