//! The orchestration subsystem.
//!
//! Tracks every connected model in its own finite state machine, owns the
//! global timeline, derives the publish/subscribe dependency graph from the
//! registered data masks, and drives the run phases: registration → run loop
//! (new-time → update cascade) → finalize.

mod collection;
mod connected_model;
mod context;
mod fsm;
mod interconnectivity;
mod service;
mod stopwatch;

pub use collection::ModelCollection;
pub use connected_model::{ConnectedModel, ModelCommand, ModelEffect, ModelEvent, ModelResponse, ModelState};
pub use context::Context;
pub use fsm::{OrchestratorCore, Phase};
pub use interconnectivity::format_matrix;
pub use service::Orchestrator;
pub use stopwatch::Stopwatch;
