//! Cache consistency layer: typed resources decoded from raw gateway
//! payloads, per-kind concurrent stores with delete tombstones, and the
//! event dispatcher that keeps them coherent while fanning updates out
//! to subscribers.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod resource;
pub mod store;
pub mod update;

pub use dispatcher::{CacheSubscriber, EventDispatcher, GatewayEvent};
pub use resource::{
    Channel, ChannelKind, Emoji, Guild, HasPermissionOverwrites, Member, PermissionOverwrite,
    Presence, Resource, ResourceKind, Role, VoiceState,
};
pub use store::{Applied, Cache, CachePolicy, KindFlags};
pub use update::CacheUpdate;
