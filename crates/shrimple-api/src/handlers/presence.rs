//! Presence snapshot handler.

use axum::Json;
use axum::extract::State;

use shrimple_core::types::id::UserId;

use crate::state::AppState;

/// GET /api/presence/online — online user identities, for clients that
/// need the snapshot before their socket is up.
pub async fn online_users(State(state): State<AppState>) -> Json<Vec<UserId>> {
    Json(state.realtime.presence.list_online())
}
