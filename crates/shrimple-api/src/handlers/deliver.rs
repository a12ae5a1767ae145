//! Internal delivery endpoint for the persistence layer.
//!
//! The CRUD collaborator calls this after a message, comment, or reaction
//! is durably stored. Delivery is best-effort: the reached count tells the
//! caller how many connections got the push, and 0 simply means every
//! recipient is offline (clients backfill from the store on reconnect).

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use shrimple_core::types::id::UserId;
use shrimple_realtime::event::types::ServerEvent;

use crate::state::AppState;

/// Request body for POST /internal/deliver.
///
/// The event is the full tagged wire event; deserializing into the closed
/// [`ServerEvent`] enum rejects unknown event names up front.
#[derive(Debug, Deserialize)]
pub struct DeliverRequest {
    /// Recipient identities.
    pub recipients: Vec<UserId>,
    /// Identity to skip (the sender, for group fan-out).
    #[serde(default)]
    pub exclude: Option<UserId>,
    /// The event to push.
    pub event: ServerEvent,
}

/// Response body for POST /internal/deliver.
#[derive(Debug, Serialize)]
pub struct DeliverResponse {
    /// Total connections reached across all recipients.
    pub reached: usize,
}

/// POST /internal/deliver — fan an event out to online recipients.
pub async fn deliver_events(
    State(state): State<AppState>,
    Json(request): Json<DeliverRequest>,
) -> Json<DeliverResponse> {
    let reached = state.realtime.dispatcher.deliver_to_users(
        &request.recipients,
        request.exclude,
        &request.event,
    );
    Json(DeliverResponse { reached })
}
