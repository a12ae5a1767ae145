//! Connection pool — tracks all live connection handles by identifier.
//!
//! The pool deliberately carries no user index; the presence registry is
//! the single source of truth for identity-to-connection resolution. The
//! pool only answers "give me the handle for this connection ID" and "give
//! me every handle" (for broadcasts, which also reach anonymous
//! connections).

use std::sync::Arc;

use dashmap::DashMap;

use shrimple_core::types::id::ConnectionId;

use super::handle::ConnectionHandle;

/// Thread-safe pool of all live connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection from the pool, returning its handle.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Gets a connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns all live connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Total number of live connections, anonymous ones included.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }
}
