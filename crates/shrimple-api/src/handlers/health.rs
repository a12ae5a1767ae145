//! Health check handlers.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Basic health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the server is responding.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Detailed health response with realtime counters.
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    /// Always "ok" when the server is responding.
    pub status: String,
    /// Live WebSocket connections, anonymous ones included.
    pub ws_connections: usize,
    /// Unique online users.
    pub online_users: usize,
    /// Live call sessions.
    pub active_calls: usize,
}

/// GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/health/detailed
pub async fn detailed_health(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    Json(DetailedHealthResponse {
        status: "ok".to_string(),
        ws_connections: state.realtime.connections.connection_count(),
        online_users: state.realtime.connections.user_count(),
        active_calls: state.realtime.calls.active_count(),
    })
}
