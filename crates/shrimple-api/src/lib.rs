//! # shrimple-api
//!
//! HTTP surface for the Shrimple realtime server built on Axum.
//!
//! Provides the WebSocket upgrade with the identity handshake, health
//! endpoints, the presence snapshot endpoint, and the internal delivery
//! endpoint invoked by the persistence layer after durable writes.

pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
