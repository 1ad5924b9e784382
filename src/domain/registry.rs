//! Concurrent membership sets for producers and consumers.
//!
//! [`Registry`] keeps one `HashMap` per [`Role`], each behind its own
//! [`tokio::sync::RwLock`]. Writes (register/unregister) hold the lock only
//! for a single insert or remove. Broadcasts never iterate under the lock:
//! they take a [`Registry::snapshot`] and send from the copy, so a slow or
//! disconnecting recipient cannot stall other sessions.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;

use super::{ConnectionId, PeerHandle, Role};

type MemberSet = RwLock<HashMap<ConnectionId, PeerHandle>>;

/// Live membership per role.
///
/// # Invariants
///
/// - A connection appears in at most one set.
/// - A connection is present only between a successful handshake and the
///   end of its session.
#[derive(Debug, Default)]
pub struct Registry {
    producers: MemberSet,
    consumers: MemberSet,
}

/// Member count per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryCounts {
    /// Connected producers.
    pub producers: usize,
    /// Connected consumers.
    pub consumers: usize,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn members(&self, role: Role) -> &MemberSet {
        match role {
            Role::Producer => &self.producers,
            Role::Consumer => &self.consumers,
        }
    }

    /// Adds a handle to the role's set.
    ///
    /// Registering the same connection twice is a bug in the caller; it is
    /// logged, the newer handle wins, and debug builds assert.
    pub async fn register(&self, role: Role, peer: PeerHandle) {
        let id = peer.id();
        let previous = self.members(role).write().await.insert(id, peer);
        if previous.is_some() {
            tracing::error!(connection_id = %id, %role, "connection registered twice");
        }
        debug_assert!(previous.is_none(), "connection {id} registered twice");
    }

    /// Removes a connection from the role's set.
    ///
    /// Returns `true` if it was present. Removing an absent connection is a
    /// no-op so cleanup may run from more than one exit path.
    pub async fn unregister(&self, role: Role, id: ConnectionId) -> bool {
        self.members(role).write().await.remove(&id).is_some()
    }

    /// Point-in-time copy of the role's members.
    pub async fn snapshot(&self, role: Role) -> Vec<PeerHandle> {
        self.members(role).read().await.values().cloned().collect()
    }

    /// Returns `true` if no connection currently holds the role.
    pub async fn is_empty(&self, role: Role) -> bool {
        self.members(role).read().await.is_empty()
    }

    /// Number of connections currently holding the role.
    pub async fn len(&self, role: Role) -> usize {
        self.members(role).read().await.len()
    }

    /// Member counts for both roles.
    pub async fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            producers: self.len(Role::Producer).await,
            consumers: self.len(Role::Consumer).await,
        }
    }
}
