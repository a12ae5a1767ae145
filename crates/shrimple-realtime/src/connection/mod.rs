//! Connection lifecycle: handles, the live pool, and the manager that binds
//! identities into the presence registry.

pub mod handle;
pub mod manager;
pub mod pool;

pub use handle::ConnectionHandle;
pub use manager::ConnectionManager;
pub use pool::ConnectionPool;
