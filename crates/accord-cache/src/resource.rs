//! Typed cache resources.
//!
//! Each kind decodes from its raw wire object through the core decode
//! contract, encodes back, and merges partial payloads so that fields
//! absent from an update retain their prior values. An explicit `null`
//! in a partial payload clears the field; absence leaves it alone.

use serde_json::{Map, Value, json};

use accord_core::decode::{DecodeResource, EncodeResource, FieldReader};
use accord_core::errors::DecodeError;
use accord_core::ids::ResourceId;

/// The resource kinds this cache tracks.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[allow(missing_docs)]
pub enum ResourceKind {
    Guild,
    Channel,
    Role,
    Member,
    Presence,
    VoiceState,
    Emoji,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Guild => "guild",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Member => "member",
            Self::Presence => "presence",
            Self::VoiceState => "voice_state",
            Self::Emoji => "emoji",
        };
        f.write_str(s)
    }
}

/// Channel subtype, numeric on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Announcement,
    AnnouncementThread,
    PublicThread,
    PrivateThread,
    Unknown(u64),
}

impl ChannelKind {
    /// Map a wire `type` value; unrecognized values are preserved.
    #[must_use]
    pub fn from_wire(value: u64) -> Self {
        match value {
            0 => Self::Text,
            2 => Self::Voice,
            4 => Self::Category,
            5 => Self::Announcement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            other => Self::Unknown(other),
        }
    }

    /// The numeric wire `type` value.
    #[must_use]
    pub fn to_wire(self) -> u64 {
        match self {
            Self::Text => 0,
            Self::Voice => 2,
            Self::Category => 4,
            Self::Announcement => 5,
            Self::AnnouncementThread => 10,
            Self::PublicThread => 11,
            Self::PrivateThread => 12,
            Self::Unknown(other) => other,
        }
    }

    /// Thread subtypes get their own cache policy flag.
    #[must_use]
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }
}

/// A permission overwrite attached to a channel.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PermissionOverwrite {
    /// Target role or member id.
    pub id: ResourceId,
    /// 0 = role, 1 = member.
    pub kind: u64,
    /// Allowed permission bits, decimal string on the wire.
    pub allow: String,
    /// Denied permission bits, decimal string on the wire.
    pub deny: String,
}

impl PermissionOverwrite {
    fn from_raw(raw: &Value) -> Option<Self> {
        Some(Self {
            id: ResourceId::new(raw.get("id")?.as_str()?),
            kind: raw.get("type")?.as_u64()?,
            allow: raw.get("allow")?.as_str()?.to_owned(),
            deny: raw.get("deny")?.as_str()?.to_owned(),
        })
    }

    fn encode(&self) -> Value {
        json!({
            "id": self.id,
            "type": self.kind,
            "allow": self.allow,
            "deny": self.deny,
        })
    }
}

/// Exposes a channel-like resource's permission overwrites.
pub trait HasPermissionOverwrites {
    /// The overwrites attached to this resource.
    fn permission_overwrites(&self) -> &[PermissionOverwrite];
}

/// A guild (server) the session is in.
#[derive(Clone, Debug, PartialEq)]
pub struct Guild {
    /// Guild id.
    pub id: ResourceId,
    /// Display name.
    pub name: Option<String>,
    /// Id of the owning user.
    pub owner_id: Option<ResourceId>,
    /// Approximate member count, when the platform sends it.
    pub member_count: Option<u64>,
    /// Set during outages; an unavailable guild keeps its entry.
    pub unavailable: Option<bool>,
}

impl DecodeResource for Guild {
    const RESOURCE: &'static str = "guild";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let id = r.required_str("id");
        let name = r.optional_str("name");
        let owner_id = r.optional_str("owner_id");
        let member_count = r.optional_u64("member_count");
        let unavailable = r.optional_bool("unavailable");
        r.finish()?;
        Ok(Self {
            id: id.map(ResourceId::from).unwrap_or_else(|| ResourceId::new("")),
            name,
            owner_id: owner_id.map(ResourceId::from),
            member_count,
            unavailable,
        })
    }
}

impl EncodeResource for Guild {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("id".into(), json!(self.id));
        encode_opt(&mut out, "name", self.name.as_ref());
        encode_opt(&mut out, "owner_id", self.owner_id.as_ref());
        encode_opt(&mut out, "member_count", self.member_count.as_ref());
        encode_opt(&mut out, "unavailable", self.unavailable.as_ref());
        Value::Object(out)
    }
}

impl Guild {
    fn merge(&mut self, raw: &Value) {
        merge_opt_str(&mut self.name, raw, "name");
        merge_opt_id(&mut self.owner_id, raw, "owner_id");
        merge_opt_u64(&mut self.member_count, raw, "member_count");
        merge_opt_bool(&mut self.unavailable, raw, "unavailable");
    }
}

/// A channel or thread within a guild.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Channel id.
    pub id: ResourceId,
    /// Channel subtype.
    pub kind: ChannelKind,
    /// Owning guild, absent for direct messages.
    pub guild_id: Option<ResourceId>,
    /// Display name.
    pub name: Option<String>,
    /// Channel topic.
    pub topic: Option<String>,
    /// Sort position within the guild.
    pub position: Option<i64>,
    /// Parent category, or parent channel for threads.
    pub parent_id: Option<ResourceId>,
    /// Thread metadata; `None` for non-threads.
    pub archived: Option<bool>,
    /// Per-role and per-member permission overwrites.
    pub permission_overwrites: Vec<PermissionOverwrite>,
}

impl DecodeResource for Channel {
    const RESOURCE: &'static str = "channel";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let id = r.required_str("id");
        let kind = r.required_u64("type");
        let guild_id = r.optional_str("guild_id");
        let name = r.optional_str("name");
        let topic = r.optional_str("topic");
        let position = r.optional_i64("position");
        let parent_id = r.optional_str("parent_id");
        let overwrites = r
            .optional_array("permission_overwrites")
            .map(decode_overwrites)
            .unwrap_or_default();
        r.finish()?;
        Ok(Self {
            id: id.map(ResourceId::from).unwrap_or_else(|| ResourceId::new("")),
            kind: ChannelKind::from_wire(kind.unwrap_or(0)),
            guild_id: guild_id.map(ResourceId::from),
            name,
            topic,
            position,
            parent_id: parent_id.map(ResourceId::from),
            archived: thread_archived(raw),
            permission_overwrites: overwrites,
        })
    }
}

impl EncodeResource for Channel {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("id".into(), json!(self.id));
        let _ = out.insert("type".into(), json!(self.kind.to_wire()));
        encode_opt(&mut out, "guild_id", self.guild_id.as_ref());
        encode_opt(&mut out, "name", self.name.as_ref());
        encode_opt(&mut out, "topic", self.topic.as_ref());
        encode_opt(&mut out, "position", self.position.as_ref());
        encode_opt(&mut out, "parent_id", self.parent_id.as_ref());
        if let Some(archived) = self.archived {
            let _ = out.insert("thread_metadata".into(), json!({"archived": archived}));
        }
        if !self.permission_overwrites.is_empty() {
            let overwrites: Vec<Value> = self
                .permission_overwrites
                .iter()
                .map(PermissionOverwrite::encode)
                .collect();
            let _ = out.insert("permission_overwrites".into(), Value::Array(overwrites));
        }
        Value::Object(out)
    }
}

impl Channel {
    fn merge(&mut self, raw: &Value) {
        if let Some(kind) = raw.get("type").and_then(Value::as_u64) {
            self.kind = ChannelKind::from_wire(kind);
        }
        merge_opt_id(&mut self.guild_id, raw, "guild_id");
        merge_opt_str(&mut self.name, raw, "name");
        merge_opt_str(&mut self.topic, raw, "topic");
        merge_opt_i64(&mut self.position, raw, "position");
        merge_opt_id(&mut self.parent_id, raw, "parent_id");
        if let Some(archived) = thread_archived(raw) {
            self.archived = Some(archived);
        }
        if let Some(items) = raw.get("permission_overwrites").and_then(Value::as_array) {
            // Overwrite lists are sent whole, never diffed.
            self.permission_overwrites = decode_overwrites(items);
        }
    }
}

impl HasPermissionOverwrites for Channel {
    fn permission_overwrites(&self) -> &[PermissionOverwrite] {
        &self.permission_overwrites
    }
}

fn decode_overwrites(items: &[Value]) -> Vec<PermissionOverwrite> {
    items
        .iter()
        .filter_map(PermissionOverwrite::from_raw)
        .collect()
}

fn thread_archived(raw: &Value) -> Option<bool> {
    raw.get("thread_metadata")?.get("archived")?.as_bool()
}

/// A guild role.
#[derive(Clone, Debug, PartialEq)]
pub struct Role {
    /// Role id.
    pub id: ResourceId,
    /// Display name.
    pub name: Option<String>,
    /// Sort position in the role list.
    pub position: Option<i64>,
    /// Permission bits, decimal string on the wire.
    pub permissions: Option<String>,
    /// Display color as a packed RGB integer.
    pub color: Option<u64>,
    /// Whether members are shown separately in the sidebar.
    pub hoist: Option<bool>,
    /// Whether the role can be @-mentioned.
    pub mentionable: Option<bool>,
}

impl DecodeResource for Role {
    const RESOURCE: &'static str = "role";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let id = r.required_str("id");
        let name = r.optional_str("name");
        let position = r.optional_i64("position");
        let permissions = r.optional_str("permissions");
        let color = r.optional_u64("color");
        let hoist = r.optional_bool("hoist");
        let mentionable = r.optional_bool("mentionable");
        r.finish()?;
        Ok(Self {
            id: id.map(ResourceId::from).unwrap_or_else(|| ResourceId::new("")),
            name,
            position,
            permissions,
            color,
            hoist,
            mentionable,
        })
    }
}

impl EncodeResource for Role {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("id".into(), json!(self.id));
        encode_opt(&mut out, "name", self.name.as_ref());
        encode_opt(&mut out, "position", self.position.as_ref());
        encode_opt(&mut out, "permissions", self.permissions.as_ref());
        encode_opt(&mut out, "color", self.color.as_ref());
        encode_opt(&mut out, "hoist", self.hoist.as_ref());
        encode_opt(&mut out, "mentionable", self.mentionable.as_ref());
        Value::Object(out)
    }
}

impl Role {
    fn merge(&mut self, raw: &Value) {
        merge_opt_str(&mut self.name, raw, "name");
        merge_opt_i64(&mut self.position, raw, "position");
        merge_opt_str(&mut self.permissions, raw, "permissions");
        merge_opt_u64(&mut self.color, raw, "color");
        merge_opt_bool(&mut self.hoist, raw, "hoist");
        merge_opt_bool(&mut self.mentionable, raw, "mentionable");
    }
}

/// A guild member, keyed by the wrapped user's id.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// Id of the wrapped user.
    pub user_id: ResourceId,
    /// Owning guild.
    pub guild_id: Option<ResourceId>,
    /// Guild-specific nickname.
    pub nick: Option<String>,
    /// Role ids held in the guild.
    pub roles: Vec<ResourceId>,
    /// Join timestamp as sent on the wire.
    pub joined_at: Option<String>,
}

impl DecodeResource for Member {
    const RESOURCE: &'static str = "member";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let user = r.required_object("user");
        let guild_id = r.optional_str("guild_id");
        let nick = r.optional_str("nick");
        let roles = r.optional_array("roles").map(decode_id_list).unwrap_or_default();
        let joined_at = r.optional_str("joined_at");
        let user_id = user.and_then(|u| u.get("id")).and_then(Value::as_str);
        r.finish()?;
        let user_id = user_id.ok_or_else(|| {
            let mut err = DecodeError::new(Self::RESOURCE);
            err.missing.push("user.id".into());
            err
        })?;
        Ok(Self {
            user_id: ResourceId::new(user_id),
            guild_id: guild_id.map(ResourceId::from),
            nick,
            roles,
            joined_at,
        })
    }
}

impl EncodeResource for Member {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("user".into(), json!({"id": self.user_id}));
        encode_opt(&mut out, "guild_id", self.guild_id.as_ref());
        encode_opt(&mut out, "nick", self.nick.as_ref());
        let _ = out.insert("roles".into(), json!(self.roles));
        encode_opt(&mut out, "joined_at", self.joined_at.as_ref());
        Value::Object(out)
    }
}

impl Member {
    fn merge(&mut self, raw: &Value) {
        merge_opt_id(&mut self.guild_id, raw, "guild_id");
        merge_opt_str(&mut self.nick, raw, "nick");
        if let Some(items) = raw.get("roles").and_then(Value::as_array) {
            self.roles = decode_id_list(items);
        }
        merge_opt_str(&mut self.joined_at, raw, "joined_at");
    }
}

fn decode_id_list(items: &[Value]) -> Vec<ResourceId> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(ResourceId::new)
        .collect()
}

/// A user's presence, keyed by the wrapped user's id.
#[derive(Clone, Debug, PartialEq)]
pub struct Presence {
    /// Id of the wrapped user.
    pub user_id: ResourceId,
    /// Owning guild.
    pub guild_id: Option<ResourceId>,
    /// Presence status string, e.g. `online` or `idle`.
    pub status: Option<String>,
}

impl DecodeResource for Presence {
    const RESOURCE: &'static str = "presence";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let user = r.required_object("user");
        let guild_id = r.optional_str("guild_id");
        let status = r.optional_str("status");
        let user_id = user.and_then(|u| u.get("id")).and_then(Value::as_str);
        r.finish()?;
        let user_id = user_id.ok_or_else(|| {
            let mut err = DecodeError::new(Self::RESOURCE);
            err.missing.push("user.id".into());
            err
        })?;
        Ok(Self {
            user_id: ResourceId::new(user_id),
            guild_id: guild_id.map(ResourceId::from),
            status,
        })
    }
}

impl EncodeResource for Presence {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("user".into(), json!({"id": self.user_id}));
        encode_opt(&mut out, "guild_id", self.guild_id.as_ref());
        encode_opt(&mut out, "status", self.status.as_ref());
        Value::Object(out)
    }
}

impl Presence {
    fn merge(&mut self, raw: &Value) {
        merge_opt_id(&mut self.guild_id, raw, "guild_id");
        merge_opt_str(&mut self.status, raw, "status");
    }
}

/// A user's voice connection, keyed by `user_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceState {
    /// Id of the connected user.
    pub user_id: ResourceId,
    /// Owning guild.
    pub guild_id: Option<ResourceId>,
    /// `None` means not connected to any voice channel.
    pub channel_id: Option<ResourceId>,
    /// Voice session id.
    pub session_id: Option<String>,
    /// Server-side deafened.
    pub deaf: Option<bool>,
    /// Server-side muted.
    pub mute: Option<bool>,
}

impl DecodeResource for VoiceState {
    const RESOURCE: &'static str = "voice_state";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let user_id = r.required_str("user_id");
        let guild_id = r.optional_str("guild_id");
        let channel_id = r.optional_str("channel_id");
        let session_id = r.optional_str("session_id");
        let deaf = r.optional_bool("deaf");
        let mute = r.optional_bool("mute");
        r.finish()?;
        Ok(Self {
            user_id: user_id
                .map(ResourceId::from)
                .unwrap_or_else(|| ResourceId::new("")),
            guild_id: guild_id.map(ResourceId::from),
            channel_id: channel_id.map(ResourceId::from),
            session_id,
            deaf,
            mute,
        })
    }
}

impl EncodeResource for VoiceState {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("user_id".into(), json!(self.user_id));
        encode_opt(&mut out, "guild_id", self.guild_id.as_ref());
        encode_opt(&mut out, "channel_id", self.channel_id.as_ref());
        encode_opt(&mut out, "session_id", self.session_id.as_ref());
        encode_opt(&mut out, "deaf", self.deaf.as_ref());
        encode_opt(&mut out, "mute", self.mute.as_ref());
        Value::Object(out)
    }
}

impl VoiceState {
    fn merge(&mut self, raw: &Value) {
        merge_opt_id(&mut self.guild_id, raw, "guild_id");
        merge_opt_id(&mut self.channel_id, raw, "channel_id");
        merge_opt_str(&mut self.session_id, raw, "session_id");
        merge_opt_bool(&mut self.deaf, raw, "deaf");
        merge_opt_bool(&mut self.mute, raw, "mute");
    }
}

/// A custom guild emoji.
#[derive(Clone, Debug, PartialEq)]
pub struct Emoji {
    /// Emoji id.
    pub id: ResourceId,
    /// Display name.
    pub name: Option<String>,
    /// Whether the emoji is animated.
    pub animated: Option<bool>,
    /// Owning guild, injected from the carrying event.
    pub guild_id: Option<ResourceId>,
}

impl DecodeResource for Emoji {
    const RESOURCE: &'static str = "emoji";

    fn decode(raw: &Value) -> Result<Self, DecodeError> {
        let mut r = FieldReader::new(Self::RESOURCE, raw)?;
        let id = r.required_str("id");
        let name = r.optional_str("name");
        let animated = r.optional_bool("animated");
        let guild_id = r.optional_str("guild_id");
        r.finish()?;
        Ok(Self {
            id: id.map(ResourceId::from).unwrap_or_else(|| ResourceId::new("")),
            name,
            animated,
            guild_id: guild_id.map(ResourceId::from),
        })
    }
}

impl EncodeResource for Emoji {
    fn encode(&self) -> Value {
        let mut out = Map::new();
        let _ = out.insert("id".into(), json!(self.id));
        encode_opt(&mut out, "name", self.name.as_ref());
        encode_opt(&mut out, "animated", self.animated.as_ref());
        encode_opt(&mut out, "guild_id", self.guild_id.as_ref());
        Value::Object(out)
    }
}

impl Emoji {
    fn merge(&mut self, raw: &Value) {
        merge_opt_str(&mut self.name, raw, "name");
        merge_opt_bool(&mut self.animated, raw, "animated");
        merge_opt_id(&mut self.guild_id, raw, "guild_id");
    }
}

/// Tagged union over everything the cache stores.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Resource {
    Guild(Guild),
    Channel(Channel),
    Role(Role),
    Member(Member),
    Presence(Presence),
    VoiceState(VoiceState),
    Emoji(Emoji),
}

impl Resource {
    /// The cache kind of this resource.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Guild(_) => ResourceKind::Guild,
            Self::Channel(_) => ResourceKind::Channel,
            Self::Role(_) => ResourceKind::Role,
            Self::Member(_) => ResourceKind::Member,
            Self::Presence(_) => ResourceKind::Presence,
            Self::VoiceState(_) => ResourceKind::VoiceState,
            Self::Emoji(_) => ResourceKind::Emoji,
        }
    }

    /// Cache identity of this resource.
    #[must_use]
    pub fn id(&self) -> &ResourceId {
        match self {
            Self::Guild(g) => &g.id,
            Self::Channel(c) => &c.id,
            Self::Role(r) => &r.id,
            Self::Member(m) => &m.user_id,
            Self::Presence(p) => &p.user_id,
            Self::VoiceState(v) => &v.user_id,
            Self::Emoji(e) => &e.id,
        }
    }

    /// Decode a full wire object as the given kind.
    pub fn decode(kind: ResourceKind, raw: &Value) -> Result<Self, DecodeError> {
        Ok(match kind {
            ResourceKind::Guild => Self::Guild(Guild::decode(raw)?),
            ResourceKind::Channel => Self::Channel(Channel::decode(raw)?),
            ResourceKind::Role => Self::Role(Role::decode(raw)?),
            ResourceKind::Member => Self::Member(Member::decode(raw)?),
            ResourceKind::Presence => Self::Presence(Presence::decode(raw)?),
            ResourceKind::VoiceState => Self::VoiceState(VoiceState::decode(raw)?),
            ResourceKind::Emoji => Self::Emoji(Emoji::decode(raw)?),
        })
    }

    /// Apply a partial payload. Fields absent from `raw` keep their
    /// prior values; explicit nulls clear nullable fields.
    pub fn merge(&mut self, raw: &Value) {
        match self {
            Self::Guild(g) => g.merge(raw),
            Self::Channel(c) => c.merge(raw),
            Self::Role(r) => r.merge(raw),
            Self::Member(m) => m.merge(raw),
            Self::Presence(p) => p.merge(raw),
            Self::VoiceState(v) => v.merge(raw),
            Self::Emoji(e) => e.merge(raw),
        }
    }

    /// Whether this is an archived thread.
    #[must_use]
    pub fn is_archived_thread(&self) -> bool {
        match self {
            Self::Channel(c) => c.kind.is_thread() && c.archived == Some(true),
            _ => false,
        }
    }
}

impl EncodeResource for Resource {
    fn encode(&self) -> Value {
        match self {
            Self::Guild(g) => g.encode(),
            Self::Channel(c) => c.encode(),
            Self::Role(r) => r.encode(),
            Self::Member(m) => m.encode(),
            Self::Presence(p) => p.encode(),
            Self::VoiceState(v) => v.encode(),
            Self::Emoji(e) => e.encode(),
        }
    }
}

fn encode_opt<T: serde::Serialize>(out: &mut Map<String, Value>, field: &str, value: Option<&T>) {
    if let Some(value) = value {
        let _ = out.insert(field.to_owned(), json!(value));
    }
}

fn merge_opt_str(slot: &mut Option<String>, raw: &Value, field: &str) {
    match raw.get(field) {
        None => {}
        Some(Value::Null) => *slot = None,
        Some(Value::String(s)) => *slot = Some(s.clone()),
        Some(_) => {}
    }
}

fn merge_opt_id(slot: &mut Option<ResourceId>, raw: &Value, field: &str) {
    match raw.get(field) {
        None => {}
        Some(Value::Null) => *slot = None,
        Some(Value::String(s)) => *slot = Some(ResourceId::new(s.as_str())),
        Some(_) => {}
    }
}

fn merge_opt_bool(slot: &mut Option<bool>, raw: &Value, field: &str) {
    match raw.get(field) {
        None => {}
        Some(Value::Null) => *slot = None,
        Some(v) => {
            if let Some(b) = v.as_bool() {
                *slot = Some(b);
            }
        }
    }
}

fn merge_opt_u64(slot: &mut Option<u64>, raw: &Value, field: &str) {
    match raw.get(field) {
        None => {}
        Some(Value::Null) => *slot = None,
        Some(v) => {
            if let Some(n) = v.as_u64() {
                *slot = Some(n);
            }
        }
    }
}

fn merge_opt_i64(slot: &mut Option<i64>, raw: &Value, field: &str) {
    match raw.get(field) {
        None => {}
        Some(Value::Null) => *slot = None,
        Some(v) => {
            if let Some(n) = v.as_i64() {
                *slot = Some(n);
            }
        }
    }
}
