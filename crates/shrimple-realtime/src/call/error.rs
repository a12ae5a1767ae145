//! Call relay error taxonomy.
//!
//! These errors are terminal for one call session at most. They are logged
//! and dropped at the per-event boundary, never propagated to the
//! connection-handling task.

use thiserror::Error;

/// Errors surfaced by the call signaling relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CallError {
    /// No call session matches the reference, or the acting user is not a
    /// party to the session it resolves to.
    #[error("no call session matches the reference")]
    InvalidCallReference,
    /// The other party went offline after the call was initiated. Forces
    /// the session to `Ended` and notifies the remaining party.
    #[error("the other party is no longer reachable")]
    RecipientUnavailable,
    /// The user is already party to an active call session.
    #[error("already party to an active call")]
    Busy,
}
