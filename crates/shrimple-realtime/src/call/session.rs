//! Call session record and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shrimple_core::types::id::{CallId, UserId};

/// Whether a call carries video or audio only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// Audio-only call.
    Audio,
    /// Video call.
    Video,
}

/// Lifecycle state of a call session.
///
/// `Initiated → Ringing → Active`, with the terminal states `Ended`,
/// `Rejected`, and `TimedOut`. `CalleeOffline` is terminal and reached
/// directly from `Initiated` when the callee has no live connection; a
/// session in that state is reported to the caller but never stored.
/// `accept` moves `Ringing` straight to `Active`: the protocol does not
/// track a separate caller acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// Session created; offer not yet relayed.
    Initiated,
    /// Offer relayed to the callee; waiting for answer or rejection.
    Ringing,
    /// Answer relayed back; both parties are negotiating/connected.
    Active,
    /// Hung up by a party, or force-ended by a disconnect.
    Ended,
    /// Rejected by the callee while ringing.
    Rejected,
    /// Rang past the configured timeout without an answer.
    TimedOut,
    /// The callee was unreachable at initiation time.
    CalleeOffline,
}

impl CallState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ended | Self::Rejected | Self::TimedOut | Self::CalleeOffline
        )
    }
}

/// The server-side record of one in-progress call negotiation.
///
/// Ephemeral: lives only in the relay's in-memory registry and is dropped
/// on any terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    /// Unique call identifier.
    pub id: CallId,
    /// The initiating party.
    pub caller: UserId,
    /// The receiving party.
    pub callee: UserId,
    /// Audio or video.
    pub kind: CallKind,
    /// Current lifecycle state.
    pub state: CallState,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last signaling activity, used for stale-session cleanup.
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    /// Creates a new session in the `Initiated` state.
    pub fn new(caller: UserId, callee: UserId, kind: CallKind) -> Self {
        let now = Utc::now();
        Self {
            id: CallId::new(),
            caller,
            callee,
            kind,
            state: CallState::Initiated,
            created_at: now,
            last_activity: now,
        }
    }

    /// The opposite party, if the given user is a party at all.
    pub fn other_party(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.caller {
            Some(self.callee)
        } else if user_id == self.callee {
            Some(self.caller)
        } else {
            None
        }
    }

    /// Records signaling activity.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CallState::Ended.is_terminal());
        assert!(CallState::Rejected.is_terminal());
        assert!(CallState::TimedOut.is_terminal());
        assert!(CallState::CalleeOffline.is_terminal());
        assert!(!CallState::Ringing.is_terminal());
        assert!(!CallState::Active.is_terminal());
    }

    #[test]
    fn test_other_party() {
        let caller = UserId::new();
        let callee = UserId::new();
        let session = CallSession::new(caller, callee, CallKind::Audio);
        assert_eq!(session.other_party(caller), Some(callee));
        assert_eq!(session.other_party(callee), Some(caller));
        assert_eq!(session.other_party(UserId::new()), None);
    }
}
