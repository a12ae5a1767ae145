//! Presence registry — the single source of truth for "is user X reachable".
//!
//! A presence entry exists for a user identity if and only if at least one
//! live connection is bound to it. Removing the last connection removes the
//! entry entirely. Mutations for the same user are linearized by the map's
//! per-shard locking; different users do not block each other.

use std::collections::HashSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use shrimple_core::types::id::{ConnectionId, UserId};

/// Result of a [`PresenceRegistry::bind`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// This was the user's first active connection; they just came online.
    CameOnline,
    /// The user was already online; another connection was added.
    AlreadyOnline,
    /// The exact pair was already bound; nothing changed.
    Duplicate,
}

/// Result of a [`PresenceRegistry::unbind`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbindOutcome {
    /// The user's last connection was removed; they just went offline.
    WentOffline,
    /// Other connections remain; the user is still online.
    StillOnline,
    /// The pair was never bound; nothing changed.
    NotBound,
}

/// Process-wide mapping from user identity to active connection identifiers.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: DashMap<UserId, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Registers a connection under a user identity. Idempotent: binding the
    /// same pair twice is a no-op reported as [`BindOutcome::Duplicate`].
    pub fn bind(&self, user_id: UserId, conn_id: ConnectionId) -> BindOutcome {
        match self.entries.entry(user_id) {
            Entry::Vacant(vacant) => {
                let mut connections = HashSet::new();
                connections.insert(conn_id);
                vacant.insert(connections);
                BindOutcome::CameOnline
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get_mut().insert(conn_id) {
                    BindOutcome::AlreadyOnline
                } else {
                    BindOutcome::Duplicate
                }
            }
        }
    }

    /// Removes one connection. If no connections remain for the user, the
    /// presence entry itself is removed. Unbinding a pair that was never
    /// bound is a silent no-op: disconnect races must not fail.
    pub fn unbind(&self, user_id: UserId, conn_id: ConnectionId) -> UnbindOutcome {
        match self.entries.entry(user_id) {
            Entry::Vacant(_) => UnbindOutcome::NotBound,
            Entry::Occupied(mut occupied) => {
                if !occupied.get_mut().remove(&conn_id) {
                    return UnbindOutcome::NotBound;
                }
                if occupied.get().is_empty() {
                    occupied.remove();
                    UnbindOutcome::WentOffline
                } else {
                    UnbindOutcome::StillOnline
                }
            }
        }
    }

    /// Checks whether a user has at least one live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.entries.contains_key(&user_id)
    }

    /// Snapshot of all online user identities, used for the presence sync
    /// broadcast to connected clients.
    pub fn list_online(&self) -> Vec<UserId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Snapshot of the connection identifiers bound to a user. Empty if the
    /// user is offline.
    pub fn connections_for(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.entries
            .get(&user_id)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of online users.
    pub fn online_count(&self) -> usize {
        self.entries.len()
    }
}
