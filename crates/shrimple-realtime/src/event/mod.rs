//! Wire protocol event definitions.

pub mod types;

pub use types::{ClientEvent, ServerEvent};
