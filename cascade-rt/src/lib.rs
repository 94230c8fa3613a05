//! # cascade-rt - Simulation Orchestration Runtime
//!
//! A runtime that coordinates a fixed set of cooperating simulation models
//! exchanging versioned dataset updates across a shared, monotonically
//! advancing timeline. Each model runs in its own process; the runtime
//! brokers registration, schedules wake-ups, routes update deliveries
//! between publishers and subscribers, enforces causal ordering within a
//! tick, detects failures and shuts the system down cleanly.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cascade_rt::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut simulation = Simulation::new()?;
//!     simulation.register_model_type("traffic", traffic_model_factory);
//!     simulation.configure(&scenario_json)?;
//!     let code = simulation.run().await?;
//!     std::process::exit(code);
//! }
//! ```
//!
//! # Architecture
//!
//! Control traffic is framed multipart messages over TCP loopback
//! (router/dealer roles). Three services cooperate:
//!
//! - the **orchestrator** owns the timeline and a finite state machine per
//!   connected model; it derives the publish/subscribe graph from the data
//!   masks declared at registration and gates every update delivery on the
//!   cascade invariant (a model sees the updates of a tick only after all
//!   of its publishers finished that tick);
//! - the **update-data broker** holds intermediate update payloads keyed by
//!   sender, filtered on fetch by the subscriber's data mask;
//! - the **init-data server** resolves dataset names to files in the data
//!   directory.
//!
//! The **process supervisor** ([`supervisor::Simulation`]) launches these
//! services and the model workers as subprocesses, collects their bound
//! addresses and joins them on exit. Inside each model process, the
//! **model-side adapter** ([`model::ModelConnector`]) translates the
//! command stream into [`model::SimulationModel`] lifecycle calls.
//!
//! # Module Organization
//!
//! - [`message`] - Typed control messages and the multipart codec
//! - [`transport`] - TCP router/dealer sockets and the request client
//! - [`mask`] - Data masks: overlap tests and payload filtering
//! - [`timeline`] - Tick arithmetic and the global time controller
//! - [`orchestrator`] - Per-model FSMs, the model collection, the run phases
//! - [`services`] - The update-data broker and the init-data server
//! - [`model`] - The model-side adapter and data-service clients
//! - [`supervisor`] - Process supervision and the plugin registry
//! - [`settings`] - Runtime settings, scenario config, env overrides
//! - [`util`] - Logging setup and the bounded task pool

pub mod mask;
pub mod message;
pub mod model;
pub mod orchestrator;
pub mod prelude;
pub mod services;
pub mod settings;
pub mod supervisor;
pub mod timeline;
pub mod transport;
pub mod util;
