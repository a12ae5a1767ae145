//! Top-level realtime engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use shrimple_core::config::realtime::RealtimeConfig;

use crate::call::relay::CallRelay;
use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::presence::registry::PresenceRegistry;

/// Central realtime engine coordinating presence, dispatch, connection
/// lifecycle, and call signaling.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection lifecycle manager.
    pub connections: Arc<ConnectionManager>,
    /// Event dispatcher, also the entry point for the persistence layer's
    /// post-write fan-out.
    pub dispatcher: Arc<EventDispatcher>,
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Call signaling relay.
    pub calls: Arc<CallRelay>,
    /// Sweep interval for timed-out ringing calls.
    sweep_interval: Duration,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new realtime engine with all subsystems.
    pub fn new(config: RealtimeConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let pool = Arc::new(ConnectionPool::new());
        let presence = Arc::new(PresenceRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(pool.clone(), presence.clone()));
        let calls = Arc::new(CallRelay::new(
            &config,
            dispatcher.clone(),
            presence.clone(),
        ));
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            pool,
            presence.clone(),
            dispatcher.clone(),
            calls.clone(),
        ));

        info!("realtime engine initialized");

        Self {
            connections,
            dispatcher,
            presence,
            calls,
            sweep_interval: Duration::from_secs(config.sweep_interval_seconds),
            shutdown_tx,
        }
    }

    /// Spawns the background task that expires timed-out ringing calls.
    /// The task stops when [`RealtimeEngine::shutdown`] is called.
    pub fn spawn_ring_sweeper(&self) -> JoinHandle<()> {
        let calls = self.calls.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut interval = tokio::time::interval(self.sweep_interval);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let expired = calls.expire_ringing();
                        if expired > 0 {
                            debug!(expired, "expired ringing calls");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            debug!("ring sweeper stopped");
        })
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown: stops background tasks and closes
    /// every connection.
    pub fn shutdown(&self) {
        info!("shutting down realtime engine");
        let _ = self.shutdown_tx.send(());
        self.connections.close_all();
        info!("realtime engine shut down");
    }
}
