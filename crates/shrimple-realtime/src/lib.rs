//! # shrimple-realtime
//!
//! Real-time core for the Shrimple chat server. Provides:
//!
//! - Presence registry mapping user identities to live connections
//! - Best-effort event fan-out to online recipients
//! - Connection lifecycle management with presence broadcast
//! - WebRTC call signaling relay with an explicit per-call state machine
//!
//! Message persistence and authentication live outside this crate: the
//! registry trusts the identity handed to it and delivery is at-most-once
//! per currently-connected recipient. Clients that reconnect re-sync from
//! the external store.

pub mod call;
pub mod connection;
pub mod dispatch;
pub mod event;
pub mod presence;
pub mod server;

pub use call::relay::CallRelay;
pub use connection::manager::ConnectionManager;
pub use dispatch::dispatcher::EventDispatcher;
pub use event::types::{ClientEvent, ServerEvent};
pub use presence::registry::PresenceRegistry;
pub use server::RealtimeEngine;
