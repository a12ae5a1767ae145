//! User presence tracking.

pub mod registry;

pub use registry::{BindOutcome, PresenceRegistry, UnbindOutcome};
