//! Concurrent resource store.
//!
//! One `DashMap` per resource kind; readers on arbitrary threads get
//! `Arc<Resource>` snapshots. A per-session tombstone set remembers
//! deleted ids so a stale same-session update can never resurrect them.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::debug;

use accord_core::ids::ResourceId;

use crate::resource::{Resource, ResourceKind};

/// Per-kind enable flags.
#[derive(Clone, Copy, Debug)]
#[allow(missing_docs)]
pub struct KindFlags {
    pub guilds: bool,
    pub channels: bool,
    pub threads: bool,
    pub roles: bool,
    pub members: bool,
    pub presences: bool,
    pub voice_states: bool,
    pub emojis: bool,
}

impl KindFlags {
    /// Every kind switched the same way.
    #[must_use]
    pub fn uniform(value: bool) -> Self {
        Self {
            guilds: value,
            channels: value,
            threads: value,
            roles: value,
            members: value,
            presences: value,
            voice_states: value,
            emojis: value,
        }
    }

    fn for_resource(&self, resource: &Resource) -> bool {
        match resource {
            Resource::Guild(_) => self.guilds,
            Resource::Channel(c) if c.kind.is_thread() => self.threads,
            Resource::Channel(_) => self.channels,
            Resource::Role(_) => self.roles,
            Resource::Member(_) => self.members,
            Resource::Presence(_) => self.presences,
            Resource::VoiceState(_) => self.voice_states,
            Resource::Emoji(_) => self.emojis,
        }
    }
}

/// What gets cached and how updates snapshot.
#[derive(Clone, Copy, Debug)]
pub struct CachePolicy {
    /// Which kinds are stored at all.
    pub cache: KindFlags,
    /// Which kinds keep an `old` snapshot across updates.
    pub copy_on_update: KindFlags,
    /// Keep archived threads instead of evicting them.
    pub retain_archived_threads: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            cache: KindFlags::uniform(true),
            copy_on_update: KindFlags {
                presences: false,
                voice_states: false,
                ..KindFlags::uniform(true)
            },
            retain_archived_threads: false,
        }
    }
}

/// Outcome of a store operation.
#[derive(Clone, Debug)]
pub enum Applied {
    /// Stored; `old` present when copy-on-update applied and a prior
    /// snapshot existed.
    Stored {
        old: Option<Arc<Resource>>,
        new: Arc<Resource>,
    },
    /// Kind disabled by policy: decoded but not retained.
    NotCached(Arc<Resource>),
    /// The id was deleted earlier this session; the update is stale.
    Stale,
}

struct CacheEntry {
    resource: Arc<Resource>,
    copy_on_update: bool,
}

/// The resource cache.
pub struct Cache {
    policy: CachePolicy,
    guilds: DashMap<ResourceId, CacheEntry>,
    channels: DashMap<ResourceId, CacheEntry>,
    roles: DashMap<ResourceId, CacheEntry>,
    members: DashMap<ResourceId, CacheEntry>,
    presences: DashMap<ResourceId, CacheEntry>,
    voice_states: DashMap<ResourceId, CacheEntry>,
    emojis: DashMap<ResourceId, CacheEntry>,
    tombstones: DashSet<(ResourceKind, ResourceId)>,
}

impl Cache {
    /// Empty cache governed by `policy`.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            guilds: DashMap::new(),
            channels: DashMap::new(),
            roles: DashMap::new(),
            members: DashMap::new(),
            presences: DashMap::new(),
            voice_states: DashMap::new(),
            emojis: DashMap::new(),
            tombstones: DashSet::new(),
        }
    }

    /// The policy this cache was built with.
    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Forget session-scoped state. Called on every fresh handshake;
    /// tombstones only guard against stale events from the same session.
    pub fn begin_session(&self) {
        self.tombstones.clear();
    }

    /// Snapshot of the resource, if cached.
    #[must_use]
    pub fn get(&self, kind: ResourceKind, id: &ResourceId) -> Option<Arc<Resource>> {
        self.map(kind).get(id).map(|entry| entry.resource.clone())
    }

    /// Number of cached entries of a kind.
    #[must_use]
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.map(kind).len()
    }

    /// Whether nothing of this kind is cached.
    #[must_use]
    pub fn is_empty(&self, kind: ResourceKind) -> bool {
        self.map(kind).is_empty()
    }

    /// Insert or replace. The caller has already merged partial payloads
    /// into `resource`.
    pub fn store(&self, resource: Resource) -> Applied {
        let kind = resource.kind();
        if !self.policy.cache.for_resource(&resource) {
            return Applied::NotCached(Arc::new(resource));
        }
        let id = resource.id().clone();
        if self.tombstones.contains(&(kind, id.clone())) {
            debug!(%kind, %id, "ignoring update for deleted resource");
            return Applied::Stale;
        }

        let copy_on_update = self.policy.copy_on_update.for_resource(&resource);
        let new = Arc::new(resource);
        let entry = CacheEntry {
            resource: new.clone(),
            copy_on_update,
        };
        let old = self
            .map(kind)
            .insert(id, entry)
            .filter(|prev| prev.copy_on_update)
            .map(|prev| prev.resource);
        Applied::Stored { old, new }
    }

    /// Remove the entry and tombstone the id for the rest of the
    /// session. Returns the evicted snapshot.
    pub fn remove(&self, kind: ResourceKind, id: &ResourceId) -> Option<Arc<Resource>> {
        let _ = self.tombstones.insert((kind, id.clone()));
        self.map(kind).remove(id).map(|(_, entry)| entry.resource)
    }

    /// Remove without tombstoning. Used for policy evictions (archived
    /// threads) where the resource may legitimately come back later.
    pub fn evict(&self, kind: ResourceKind, id: &ResourceId) -> Option<Arc<Resource>> {
        self.map(kind).remove(id).map(|(_, entry)| entry.resource)
    }

    fn map(&self, kind: ResourceKind) -> &DashMap<ResourceId, CacheEntry> {
        match kind {
            ResourceKind::Guild => &self.guilds,
            ResourceKind::Channel => &self.channels,
            ResourceKind::Role => &self.roles,
            ResourceKind::Member => &self.members,
            ResourceKind::Presence => &self.presences,
            ResourceKind::VoiceState => &self.voice_states,
            ResourceKind::Emoji => &self.emojis,
        }
    }
}
