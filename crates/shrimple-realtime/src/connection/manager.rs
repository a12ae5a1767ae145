//! Connection manager — binds identities into the presence registry on
//! connect, unbinds and cascades call teardown on disconnect, and routes
//! inbound events to the call relay.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use shrimple_core::config::realtime::RealtimeConfig;
use shrimple_core::types::id::{ConnectionId, UserId};

use crate::call::error::CallError;
use crate::call::relay::CallRelay;
use crate::call::session::CallKind;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::event::types::{ClientEvent, ServerEvent};
use crate::presence::registry::{PresenceRegistry, UnbindOutcome};

use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// Manages the lifecycle of all live connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Presence registry.
    presence: Arc<PresenceRegistry>,
    /// Event dispatcher.
    dispatcher: Arc<EventDispatcher>,
    /// Call signaling relay, notified of disconnects.
    calls: Arc<CallRelay>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        presence: Arc<PresenceRegistry>,
        dispatcher: Arc<EventDispatcher>,
        calls: Arc<CallRelay>,
    ) -> Self {
        Self {
            pool,
            presence,
            dispatcher,
            calls,
            config,
        }
    }

    /// Registers a new connection.
    ///
    /// A `Some` identity is bound into the presence registry; `None` yields
    /// an anonymous connection that receives broadcasts but is rejected for
    /// all relay operations. Either way the presence snapshot is broadcast
    /// to every live connection. Returns the handle and the receiver for
    /// the connection's outbound events.
    pub fn register(
        &self,
        user_id: Option<UserId>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, tx));

        if let Some(uid) = user_id {
            self.evict_if_at_cap(uid);
        }

        self.pool.add(handle.clone());
        if let Some(uid) = user_id {
            let outcome = self.presence.bind(uid, handle.id);
            debug!(conn_id = %handle.id, user_id = %uid, outcome = ?outcome, "identity bound");
        }

        self.broadcast_presence_snapshot();

        info!(
            conn_id = %handle.id,
            user_id = ?user_id.map(|u| u.to_string()),
            "connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection.
    ///
    /// Always succeeds, even if the connection was never registered or its
    /// bind never completed. Unbinds the identity if one was bound; if that
    /// was the user's last connection, any call they were party to is
    /// force-ended. Finishes with a presence snapshot broadcast.
    pub fn unregister(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.mark_closed();

        if let Some(uid) = handle.user_id {
            let outcome = self.presence.unbind(uid, *conn_id);
            if outcome == UnbindOutcome::WentOffline {
                self.calls.handle_disconnect(uid);
            }
        }

        self.broadcast_presence_snapshot();

        info!(conn_id = %conn_id, user_id = ?handle.user_id.map(|u| u.to_string()), "connection unregistered");
    }

    /// Processes an inbound event from a client.
    ///
    /// Any failure is terminal for this event only: logged, optionally
    /// answered with an `error` event, and the connection left intact.
    pub fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "event from unknown connection");
            return;
        };

        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                handle.send(ServerEvent::Error {
                    code: "INVALID_EVENT".to_string(),
                    message: format!("Failed to parse event: {e}"),
                });
                return;
            }
        };

        let Some(acting) = handle.user_id else {
            handle.send(ServerEvent::Error {
                code: "UNAUTHENTICATED".to_string(),
                message: "anonymous connections cannot signal".to_string(),
            });
            return;
        };

        let result = match event {
            ClientEvent::CallUser {
                user_to_call,
                signal_data,
                from,
                name,
                is_video,
            } => {
                if from != acting {
                    debug!(conn_id = %conn_id, claimed = %from, bound = %acting, "ignoring claimed caller identity");
                }
                let kind = if is_video {
                    CallKind::Video
                } else {
                    CallKind::Audio
                };
                self.calls
                    .initiate(acting, user_to_call, kind, &name, signal_data)
                    .map(|_| ())
            }
            ClientEvent::AnswerCall { signal, to } => self.calls.accept_from(acting, to, signal),
            ClientEvent::IceCandidate { candidate, to } => {
                self.calls.candidate_from(acting, to, candidate)
            }
            ClientEvent::EndCall { to } => self.calls.end_from(acting, to),
        };

        match result {
            Ok(()) => {}
            Err(CallError::InvalidCallReference) => {
                warn!(conn_id = %conn_id, user_id = %acting, "dropped signal with invalid call reference");
                handle.send(ServerEvent::Error {
                    code: "INVALID_CALL_REFERENCE".to_string(),
                    message: CallError::InvalidCallReference.to_string(),
                });
            }
            Err(CallError::RecipientUnavailable) => {
                // The relay already force-ended the session and notified
                // the remaining party.
                warn!(conn_id = %conn_id, user_id = %acting, "call force-ended, recipient unavailable");
            }
            Err(CallError::Busy) => {
                handle.send(ServerEvent::Error {
                    code: "CALL_BUSY".to_string(),
                    message: CallError::Busy.to_string(),
                });
            }
        }
    }

    /// Closes every connection and clears the registry. Used on shutdown.
    pub fn close_all(&self) {
        let all = self.pool.all_connections();
        for handle in &all {
            handle.mark_closed();
            self.pool.remove(&handle.id);
            if let Some(uid) = handle.user_id {
                self.presence.unbind(uid, handle.id);
            }
        }
        info!(count = all.len(), "all connections closed");
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Number of unique online users.
    pub fn user_count(&self) -> usize {
        self.presence.online_count()
    }

    /// Pushes the current online-user list to every live connection.
    fn broadcast_presence_snapshot(&self) {
        let snapshot = ServerEvent::OnlineUsers(self.presence.list_online());
        self.dispatcher.broadcast_all(&snapshot);
    }

    /// Evicts the user's oldest connection when they are at the per-user
    /// cap. The user stays online throughout, so no snapshot is broadcast.
    fn evict_if_at_cap(&self, user_id: UserId) {
        let conn_ids = self.presence.connections_for(user_id);
        if conn_ids.len() < self.config.max_connections_per_user {
            return;
        }

        let oldest = conn_ids
            .iter()
            .filter_map(|id| self.pool.get(id))
            .min_by_key(|handle| handle.connected_at);
        if let Some(handle) = oldest {
            warn!(
                user_id = %user_id,
                conn_id = %handle.id,
                max = self.config.max_connections_per_user,
                "user at max connections, evicting oldest"
            );
            handle.mark_closed();
            self.pool.remove(&handle.id);
            self.presence.unbind(user_id, handle.id);
        }
    }
}
