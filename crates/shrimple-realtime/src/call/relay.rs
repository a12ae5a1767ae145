//! Call signaling relay.
//!
//! Keeps one [`CallSession`] state machine per call attempt and relays
//! opaque offer/answer/ICE payloads between exactly two identities. The
//! wire protocol addresses signals by peer user id, so the relay also owns
//! the `(acting user, peer) → call` resolution; a signal referencing a
//! session the sender is not party to is rejected, never applied.
//!
//! At most one non-terminal session may exist per identity. A ringing call
//! that is not answered within the configured timeout is expired by the
//! engine's sweeper via [`CallRelay::expire_ringing`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tracing::{debug, info, warn};

use shrimple_core::config::realtime::RealtimeConfig;
use shrimple_core::types::id::{CallId, UserId};

use crate::dispatch::dispatcher::EventDispatcher;
use crate::event::types::ServerEvent;
use crate::presence::registry::PresenceRegistry;

use super::error::CallError;
use super::session::{CallKind, CallSession, CallState};

/// Relays call signaling between two identities and tracks session state.
#[derive(Debug)]
pub struct CallRelay {
    /// Call ID → session state machine.
    sessions: DashMap<CallId, CallSession>,
    /// User ID → the one call they are currently party to.
    by_party: DashMap<UserId, CallId>,
    /// Dispatcher for pushing relayed events.
    dispatcher: Arc<EventDispatcher>,
    /// Presence registry for reachability checks.
    presence: Arc<PresenceRegistry>,
    /// How long a call may stay ringing before it times out.
    ringing_timeout: Duration,
}

impl CallRelay {
    /// Creates a new relay.
    pub fn new(
        config: &RealtimeConfig,
        dispatcher: Arc<EventDispatcher>,
        presence: Arc<PresenceRegistry>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            by_party: DashMap::new(),
            dispatcher,
            presence,
            ringing_timeout: Duration::from_secs(config.ringing_timeout_seconds),
        }
    }

    /// Initiates a call from `caller` to `callee`, relaying the opaque offer.
    ///
    /// If the callee is unreachable (offline, or already in a call) the
    /// caller is notified with `callUserOffline` and the returned session is
    /// terminal `CalleeOffline` — it is never stored and cannot be queried
    /// afterwards. Otherwise the offer is relayed, the session transitions
    /// to `Ringing`, and its snapshot is returned.
    pub fn initiate(
        &self,
        caller: UserId,
        callee: UserId,
        kind: CallKind,
        caller_name: &str,
        offer: Value,
    ) -> Result<CallSession, CallError> {
        let mut session = CallSession::new(caller, callee, kind);

        // Reserve the caller's party slot up front: two interleaved
        // initiates from the same caller must not both pass the busy check.
        match self.by_party.entry(caller) {
            Entry::Occupied(_) => return Err(CallError::Busy),
            Entry::Vacant(vacant) => {
                vacant.insert(session.id);
            }
        }

        // A busy callee and an offline callee are the same outcome from the
        // caller's point of view: the wire protocol only knows
        // `callUserOffline`.
        if !self.presence.is_online(callee) || self.by_party.contains_key(&callee) {
            self.release(caller, session.id);
            session.state = CallState::CalleeOffline;
            self.dispatcher
                .deliver_to_user(caller, &ServerEvent::CallUserOffline { user_id: callee });
            debug!(caller = %caller, callee = %callee, "call to unreachable callee");
            return Ok(session);
        }

        let reached = self.dispatcher.deliver_to_user(
            callee,
            &ServerEvent::IncomingCall {
                signal: offer,
                from: caller,
                name: caller_name.to_string(),
                is_video: matches!(kind, CallKind::Video),
            },
        );
        if reached == 0 {
            // Callee disconnected between the presence check and the push.
            self.release(caller, session.id);
            session.state = CallState::CalleeOffline;
            self.dispatcher
                .deliver_to_user(caller, &ServerEvent::CallUserOffline { user_id: callee });
            return Ok(session);
        }

        session.state = CallState::Ringing;
        session.touch();
        self.sessions.insert(session.id, session.clone());
        self.by_party.insert(callee, session.id);

        info!(call_id = %session.id, caller = %caller, callee = %callee, "call ringing");
        Ok(session)
    }

    /// Accepts a ringing call, relaying the opaque answer to the caller.
    ///
    /// Valid only for the callee of a `Ringing` session. On success the
    /// session is `Active` (the protocol tracks no separate caller
    /// acknowledgement). If the caller went offline in the meantime, the
    /// session is force-ended and `RecipientUnavailable` is returned.
    pub fn accept(
        &self,
        call_id: CallId,
        acting: UserId,
        answer: Value,
    ) -> Result<(), CallError> {
        let session = self.snapshot(call_id)?;
        if acting != session.callee || session.state != CallState::Ringing {
            return Err(CallError::InvalidCallReference);
        }

        let reached = self
            .dispatcher
            .deliver_to_user(session.caller, &ServerEvent::CallAccepted(answer));
        if reached == 0 {
            self.terminate(call_id, CallState::Ended, &[acting]);
            return Err(CallError::RecipientUnavailable);
        }

        if let Some(mut entry) = self.sessions.get_mut(&call_id) {
            entry.state = CallState::Active;
            entry.touch();
        }
        info!(call_id = %call_id, "call accepted");
        Ok(())
    }

    /// Rejects a ringing call. Valid only for the callee; the caller is
    /// notified with `endCall` and the session is destroyed.
    pub fn reject(&self, call_id: CallId, acting: UserId) -> Result<(), CallError> {
        let session = self.snapshot(call_id)?;
        if acting != session.callee || session.state != CallState::Ringing {
            return Err(CallError::InvalidCallReference);
        }
        self.terminate(call_id, CallState::Rejected, &[session.caller]);
        Ok(())
    }

    /// Forwards an opaque ICE candidate to the other party. Valid while the
    /// session is `Ringing` or `Active`; no state transition.
    pub fn relay_ice_candidate(
        &self,
        call_id: CallId,
        from: UserId,
        candidate: Value,
    ) -> Result<(), CallError> {
        let session = self.snapshot(call_id)?;
        let Some(other) = session.other_party(from) else {
            return Err(CallError::InvalidCallReference);
        };
        if !matches!(session.state, CallState::Ringing | CallState::Active) {
            return Err(CallError::InvalidCallReference);
        }

        let reached = self
            .dispatcher
            .deliver_to_user(other, &ServerEvent::IceCandidate(candidate));
        if reached == 0 {
            self.terminate(call_id, CallState::Ended, &[from]);
            return Err(CallError::RecipientUnavailable);
        }

        if let Some(mut entry) = self.sessions.get_mut(&call_id) {
            entry.touch();
        }
        Ok(())
    }

    /// Ends a call from any non-terminal state. The other party is notified
    /// with `endCall` (best effort) and the session is destroyed.
    pub fn end(&self, call_id: CallId, by: UserId) -> Result<(), CallError> {
        let session = self.snapshot(call_id)?;
        let Some(other) = session.other_party(by) else {
            return Err(CallError::InvalidCallReference);
        };
        self.terminate(call_id, CallState::Ended, &[other]);
        Ok(())
    }

    // ── Wire-level entry points ──────────────────────────────────
    //
    // The client protocol addresses signals by peer user id, not call id.
    // These resolve `(acting, peer)` to the acting user's current session
    // and then apply the call-id-keyed operation.

    /// Accepts the ringing call between `acting` (callee) and `to` (caller).
    pub fn accept_from(&self, acting: UserId, to: UserId, answer: Value) -> Result<(), CallError> {
        let call_id = self.resolve(acting, to)?;
        self.accept(call_id, acting, answer)
    }

    /// Forwards an ICE candidate from `acting` to `to`.
    pub fn candidate_from(
        &self,
        acting: UserId,
        to: UserId,
        candidate: Value,
    ) -> Result<(), CallError> {
        let call_id = self.resolve(acting, to)?;
        self.relay_ice_candidate(call_id, acting, candidate)
    }

    /// Ends or rejects the call between `acting` and `to`. An `endCall`
    /// from the callee while the session is still ringing is a rejection.
    pub fn end_from(&self, acting: UserId, to: UserId) -> Result<(), CallError> {
        let call_id = self.resolve(acting, to)?;
        let session = self.snapshot(call_id)?;
        if session.state == CallState::Ringing && acting == session.callee {
            self.reject(call_id, acting)
        } else {
            self.end(call_id, acting)
        }
    }

    // ── Lifecycle hooks ──────────────────────────────────────────

    /// Tears down the call a user is party to, if any. Invoked by the
    /// connection lifecycle manager when a user's last connection drops;
    /// the remaining party is notified with `endCall` exactly once.
    pub fn handle_disconnect(&self, user_id: UserId) {
        let Some((_, call_id)) = self.by_party.remove(&user_id) else {
            return;
        };
        let Some((_, session)) = self.sessions.remove(&call_id) else {
            return;
        };
        let notify: Vec<UserId> = session.other_party(user_id).into_iter().collect();
        self.destroy(call_id, session, CallState::Ended, &notify);
        warn!(call_id = %call_id, user_id = %user_id, "call ended, party disconnected");
    }

    /// Expires ringing sessions older than the configured timeout, notifying
    /// both parties. Returns the number of sessions expired.
    pub fn expire_ringing(&self) -> usize {
        let now = Utc::now();
        let stale: Vec<CallId> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry.value().state == CallState::Ringing
                    && (now - entry.value().created_at).to_std().unwrap_or_default()
                        >= self.ringing_timeout
            })
            .map(|entry| *entry.key())
            .collect();

        let mut expired = 0;
        for call_id in stale {
            let removed = self
                .sessions
                .remove_if(&call_id, |_, session| session.state == CallState::Ringing);
            if let Some((_, session)) = removed {
                let parties = [session.caller, session.callee];
                self.destroy(call_id, session, CallState::TimedOut, &parties);
                info!(call_id = %call_id, "ringing call timed out");
                expired += 1;
            }
        }
        expired
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Snapshot of a session, if it is still live.
    pub fn session(&self, call_id: CallId) -> Option<CallSession> {
        self.sessions.get(&call_id).map(|entry| entry.value().clone())
    }

    /// The call a user is currently party to, if any.
    pub fn call_for(&self, user_id: UserId) -> Option<CallId> {
        self.by_party.get(&user_id).map(|entry| *entry.value())
    }

    /// Number of live call sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Resolves the acting user's current session, verifying that `peer` is
    /// the opposite party.
    fn resolve(&self, acting: UserId, peer: UserId) -> Result<CallId, CallError> {
        let call_id = self
            .by_party
            .get(&acting)
            .map(|entry| *entry.value())
            .ok_or(CallError::InvalidCallReference)?;
        let session = self.snapshot(call_id)?;
        if session.other_party(acting) != Some(peer) {
            return Err(CallError::InvalidCallReference);
        }
        Ok(call_id)
    }

    fn snapshot(&self, call_id: CallId) -> Result<CallSession, CallError> {
        self.sessions
            .get(&call_id)
            .map(|entry| entry.value().clone())
            .ok_or(CallError::InvalidCallReference)
    }

    /// Removes a session, clears both party indexes, and notifies the given
    /// identities with `endCall`.
    fn terminate(&self, call_id: CallId, final_state: CallState, notify: &[UserId]) {
        let Some((_, session)) = self.sessions.remove(&call_id) else {
            return;
        };
        self.destroy(call_id, session, final_state, notify);
    }

    /// Final transition for an already-removed session: records the terminal
    /// state, clears both party indexes, and notifies the given identities
    /// with `endCall`.
    fn destroy(
        &self,
        call_id: CallId,
        mut session: CallSession,
        final_state: CallState,
        notify: &[UserId],
    ) {
        debug_assert!(final_state.is_terminal());
        session.state = final_state;
        self.release(session.caller, call_id);
        self.release(session.callee, call_id);
        for user_id in notify {
            self.dispatcher.deliver_to_user(*user_id, &ServerEvent::EndCall);
        }
        debug!(call_id = %call_id, state = ?session.state, "call session destroyed");
    }

    /// Drops a user's party index entry if it still points at this call.
    fn release(&self, user_id: UserId, call_id: CallId) {
        self.by_party.remove_if(&user_id, |_, cid| *cid == call_id);
    }
}
