//! Shared helpers for realtime integration tests.

use tokio::sync::mpsc;

use shrimple_core::config::realtime::RealtimeConfig;
use shrimple_realtime::event::types::ServerEvent;
use shrimple_realtime::server::RealtimeEngine;

/// Engine with default configuration.
pub fn engine() -> RealtimeEngine {
    RealtimeEngine::new(RealtimeConfig::default())
}

/// Engine with a custom configuration.
pub fn engine_with(config: RealtimeConfig) -> RealtimeEngine {
    RealtimeEngine::new(config)
}

/// Drains every event currently queued for a connection.
///
/// All pushes are synchronous hand-offs, so anything delivered before this
/// call is guaranteed to be in the channel already.
pub fn drain(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
