//! Best-effort event fan-out to online recipients.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;
