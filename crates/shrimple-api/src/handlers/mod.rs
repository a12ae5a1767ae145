//! HTTP and WebSocket request handlers.

pub mod deliver;
pub mod health;
pub mod presence;
pub mod ws;
