//! Convenience re-exports for embedding applications.

pub use crate::mask::{DataMask, MaskTree};
pub use crate::message::{Message, UpdateMessage};
pub use crate::model::{
    InitDataHandler, InitializeResult, ModelConnector, ModelError, ModelSetup, SimulationModel,
};
pub use crate::orchestrator::{Orchestrator, OrchestratorCore};
pub use crate::services::{InitDataService, Service, UpdateDataService};
pub use crate::settings::{ScenarioConfig, Settings};
pub use crate::supervisor::{Simulation, StartupError};
pub use crate::timeline::{Moment, TimelineController, TimelineInfo, Timestamp};
