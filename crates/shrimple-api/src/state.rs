//! Application state shared across all handlers.

use std::sync::Arc;

use shrimple_core::config::AppConfig;
use shrimple_realtime::server::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Realtime engine.
    pub realtime: Arc<RealtimeEngine>,
}

impl AppState {
    /// Creates the application state.
    pub fn new(config: Arc<AppConfig>, realtime: Arc<RealtimeEngine>) -> Self {
        Self { config, realtime }
    }
}
