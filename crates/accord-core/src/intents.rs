//! Capability intents sent during the gateway handshake.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bitflags declaring which event groups the connection wants to receive.
///
/// The server rejects handshakes that request intents the token is not
/// allowed to use (a fatal close, see `CloseCodePolicy`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Intents(u64);

impl Intents {
    /// No intents.
    pub const NONE: Self = Self(0);
    /// Guild create/update/delete, roles, channels, threads.
    pub const GUILDS: Self = Self(1 << 0);
    /// Member add/update/remove.
    pub const GUILD_MEMBERS: Self = Self(1 << 1);
    /// Custom emoji updates.
    pub const GUILD_EMOJIS: Self = Self(1 << 3);
    /// Voice state updates.
    pub const GUILD_VOICE_STATES: Self = Self(1 << 7);
    /// Presence updates.
    pub const GUILD_PRESENCES: Self = Self(1 << 8);
    /// Messages in guild channels.
    pub const GUILD_MESSAGES: Self = Self(1 << 9);
    /// Direct messages.
    pub const DIRECT_MESSAGES: Self = Self(1 << 12);

    /// The default set for a cache-keeping client: everything except the
    /// privileged presence intent.
    #[must_use]
    pub fn standard() -> Self {
        Self::GUILDS
            | Self::GUILD_MEMBERS
            | Self::GUILD_EMOJIS
            | Self::GUILD_VOICE_STATES
            | Self::GUILD_MESSAGES
            | Self::DIRECT_MESSAGES
    }

    /// Construct from a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every bit in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no intents are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Intents {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
