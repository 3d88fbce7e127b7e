//! Branded resource identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a platform resource (guild, channel, user, role, ...).
///
/// The platform issues these as decimal snowflake strings. They are kept
/// as strings on this side — the client never does arithmetic on them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap a raw id string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for ResourceId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
