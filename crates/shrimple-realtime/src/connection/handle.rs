//! Individual transport connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, mpsc};

use shrimple_core::types::id::{ConnectionId, UserId};

use crate::event::types::ServerEvent;

/// A handle to a single live connection.
///
/// Holds the sender half of the connection's outbound event channel plus
/// the identity bound at handshake time. `user_id` is `None` for anonymous
/// connections that supplied no valid identity; those never enter the
/// presence registry and are rejected for all relay operations.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Identity bound at handshake, if any.
    pub user_id: Option<UserId>,
    /// Sender for outbound events.
    sender: mpsc::Sender<ServerEvent>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
    /// Notified when the connection is marked closed server-side.
    closed: Notify,
}

impl ConnectionHandle {
    /// Creates a new connection handle.
    pub fn new(user_id: Option<UserId>, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
            closed: Notify::new(),
        }
    }

    /// Pushes an event to this connection.
    ///
    /// Fire-and-forget: a full buffer drops the event, a closed channel
    /// marks the connection dead. Returns whether the event was handed off
    /// to the transport.
    pub fn send(&self, event: ServerEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Checks whether the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the connection as closed and wakes any [`ConnectionHandle::closed`]
    /// waiters. Called on disconnect, eviction, and shutdown.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed.notify_waiters();
    }

    /// Resolves once the connection has been marked closed server-side.
    ///
    /// The transport task awaits this alongside its socket reads so an
    /// evicted or shut-down connection observes the close instead of idling
    /// until the client hangs up.
    pub async fn closed(&self) {
        let notified = self.closed.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag so a concurrent mark_closed
        // cannot slip between the check and the await.
        notified.as_mut().enable();
        if !self.is_alive() {
            return;
        }
        notified.await;
    }
}
