//! Call signaling relay: per-call state machines and opaque payload relay
//! between exactly two identities.

pub mod error;
pub mod relay;
pub mod session;

pub use error::CallError;
pub use relay::CallRelay;
pub use session::{CallKind, CallSession, CallState};
