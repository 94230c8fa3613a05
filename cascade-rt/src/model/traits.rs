//! The model lifecycle contract.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::error::ModelError;
use super::init_data::InitDataHandler;
use crate::mask::DataMask;
use crate::settings::Settings;
use crate::timeline::{Moment, Timestamp};

/// Outcome of an initialization attempt.
///
/// `NotReady` means the model's required inputs are not filled yet; the
/// adapter retries on every subsequent update until initialization
/// succeeds, or fails the model once the simulation progresses past its
/// start without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeResult {
    Initialized,
    NotReady,
}

/// Everything a model may consult while declaring itself.
pub struct ModelSetup<'a> {
    pub settings: &'a Settings,
    pub init_data: &'a mut dyn InitDataHandler,
}

/// The lifecycle callbacks a simulation model implements.
///
/// The adapter drives these from the orchestrator's command stream; a model
/// never touches the wire. All data passed in and out is opaque payload
/// bytes (the runtime does not interpret schemas).
#[async_trait]
pub trait SimulationModel: Send {
    /// Declare the model's publish/subscribe masks and fetch any startup
    /// datasets through the init-data handler. Called once, before
    /// registration.
    async fn setup(&mut self, setup: &mut ModelSetup<'_>) -> Result<DataMask, ModelError>;

    /// Attempt initialization. Invoked after `setup` and again on every
    /// update until it reports `Initialized`.
    fn try_initialize(&mut self) -> Result<InitializeResult, ModelError> {
        Ok(InitializeResult::Initialized)
    }

    /// Whether all required subscriptions have received at least one value.
    fn is_ready_for_update(&self) -> bool {
        true
    }

    /// Merge one fetched update payload into local state. Returns whether
    /// the payload contained anything relevant for this model.
    fn process_input(&mut self, data: &[u8]) -> Result<bool, ModelError>;

    /// Compute at `moment`; optionally produce a publish payload and
    /// request a future wake-up.
    fn update(
        &mut self,
        moment: Moment,
    ) -> Result<(Option<Vec<u8>>, Option<Timestamp>), ModelError>;

    /// The simulation clock advanced.
    fn new_time(&mut self, _moment: Moment) -> Result<(), ModelError> {
        Ok(())
    }

    /// The simulation is over; release resources.
    fn shutdown(&mut self) -> Result<(), ModelError> {
        Ok(())
    }
}
