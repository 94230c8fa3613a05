//! Shared utilities: logging setup and the bounded task pool.

mod logging;
mod pool;

pub use logging::init_logging;
pub use pool::{BoundedTaskPool, PoolError};
