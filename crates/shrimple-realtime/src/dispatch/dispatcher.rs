//! Event dispatcher — resolves delivery targets through the presence
//! registry and pushes events to the matching connections.
//!
//! Delivery is best-effort and at-most-once per currently-bound connection:
//! no retries, no queuing. A recipient being offline is a normal outcome
//! reported through the reached count, never an error. Backfill for users
//! who reconnect later is the persistence layer's job.

use std::sync::Arc;

use shrimple_core::types::id::UserId;

use crate::connection::pool::ConnectionPool;
use crate::event::types::ServerEvent;
use crate::presence::registry::PresenceRegistry;

/// Fans events out to the connections currently bound to recipients.
#[derive(Debug)]
pub struct EventDispatcher {
    pool: Arc<ConnectionPool>,
    presence: Arc<PresenceRegistry>,
}

impl EventDispatcher {
    /// Creates a new dispatcher over the given pool and registry.
    pub fn new(pool: Arc<ConnectionPool>, presence: Arc<PresenceRegistry>) -> Self {
        Self { pool, presence }
    }

    /// Delivers an event to every connection bound to a user.
    ///
    /// Returns the number of connections reached; 0 means the user is
    /// offline. Callers may use the count to warn a sender but must never
    /// block or retry on it.
    pub fn deliver_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let mut reached = 0;
        for conn_id in self.presence.connections_for(user_id) {
            if let Some(handle) = self.pool.get(&conn_id) {
                if handle.send(event.clone()) {
                    reached += 1;
                }
            }
        }
        reached
    }

    /// Delivers an event to a set of users, optionally skipping one identity
    /// (used for group fan-out, to avoid echoing to the sender).
    pub fn deliver_to_users(
        &self,
        user_ids: &[UserId],
        exclude: Option<UserId>,
        event: &ServerEvent,
    ) -> usize {
        user_ids
            .iter()
            .filter(|uid| Some(**uid) != exclude)
            .map(|uid| self.deliver_to_user(*uid, event))
            .sum()
    }

    /// Delivers an event to every live connection, anonymous ones included.
    /// Used for the global presence snapshot broadcast.
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let mut reached = 0;
        for handle in self.pool.all_connections() {
            if handle.send(event.clone()) {
                reached += 1;
            }
        }
        reached
    }
}
