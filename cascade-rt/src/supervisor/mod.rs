//! The process supervisor.
//!
//! Launches services and model workers as subprocesses, wires discovery
//! addresses together and joins the non-daemon children on exit. Every
//! subprocess re-executes the embedding binary with serialized startup
//! state; nothing is inherited from the parent's memory.

mod error;
mod plugins;
mod runner;
mod simulation;

pub use error::StartupError;
pub use plugins::{ModelFactory, ModelTypeInfo, ServiceFactory, ServiceTypeInfo};
pub use runner::{ModelRunner, ServiceRunner, SERVICE_STARTUP_TIMEOUT};
pub use simulation::Simulation;
