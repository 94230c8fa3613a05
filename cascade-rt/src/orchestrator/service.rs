//! The orchestrator service: wires the router socket to the core FSM.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tracing::{debug, error};

// Layer 3: Internal module imports
use super::fsm::OrchestratorCore;
use crate::services::{Service, ServiceError};
use crate::settings::Settings;
use crate::timeline::TimelineController;
use crate::transport::MessageRouter;

/// Manages the timeline and acts as a broker between models.
#[derive(Default)]
pub struct Orchestrator {
    core: Option<OrchestratorCore>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the orchestrator directly from its parts (used by tests and
    /// embedders that drive the FSM without a supervisor).
    pub fn with_core(core: OrchestratorCore) -> Self {
        Self { core: Some(core) }
    }
}

#[async_trait]
impl Service for Orchestrator {
    fn setup(&mut self, settings: &Settings) -> Result<(), ServiceError> {
        let info = settings
            .timeline_info
            .as_ref()
            .ok_or(ServiceError::MissingConfig("timeline_info"))?;
        let timeline = TimelineController::from_info(info);
        self.core = Some(OrchestratorCore::new(
            settings.model_names.iter().cloned(),
            timeline,
        ));
        Ok(())
    }

    async fn run(&mut self, router: &mut MessageRouter) -> Result<i32, ServiceError> {
        let core = self
            .core
            .as_mut()
            .ok_or(ServiceError::MissingConfig("orchestrator core"))?;

        for (identity, message) in core.start() {
            router.send(&identity, &message).await?;
        }
        while !core.is_done() {
            let Some((identity, message)) = router.recv().await else {
                error!("Router closed before the simulation completed");
                return Ok(1);
            };
            debug!("Received {} from '{identity}'", message.tag());
            for (identity, message) in core.handle_message(&identity, message) {
                router.send(&identity, &message).await?;
            }
        }
        Ok(core.exit_code())
    }
}
