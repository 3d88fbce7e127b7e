//! The immutable update pairs handed to subscribers.

use std::sync::Arc;

use crate::resource::{Resource, ResourceKind};

/// One observed cache mutation.
///
/// For creates and updates `new` is the value now cached (`old` only
/// when copy-on-update kept a prior snapshot). For deletes `new` is the
/// removed snapshot and `old` is `None`.
#[derive(Clone, Debug)]
pub struct CacheUpdate {
    /// Kind of the affected resource.
    pub kind: ResourceKind,
    /// Snapshot before the mutation, when policy kept one.
    pub old: Option<Arc<Resource>>,
    /// Snapshot after the mutation (or the removed value).
    pub new: Arc<Resource>,
    /// Whether this update removed the resource.
    pub removed: bool,
}

impl CacheUpdate {
    pub(crate) fn stored(kind: ResourceKind, old: Option<Arc<Resource>>, new: Arc<Resource>) -> Self {
        Self {
            kind,
            old,
            new,
            removed: false,
        }
    }

    pub(crate) fn removed(kind: ResourceKind, snapshot: Arc<Resource>) -> Self {
        Self {
            kind,
            old: None,
            new: snapshot,
            removed: true,
        }
    }
}
