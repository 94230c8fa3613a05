//! Shared state of the orchestrator FSM: the model collection, the
//! timeline, the wall-clock timers and the outgoing message buffer.

// Layer 1: Standard library imports
use std::mem;

// Layer 2: Third-party crate imports
use tracing::{error, info};

// Layer 3: Internal module imports
use super::collection::ModelCollection;
use super::stopwatch::Stopwatch;
use crate::message::ModelMessage;
use crate::timeline::TimelineController;

/// Everything the orchestrator phases operate on.
#[derive(Debug)]
pub struct Context {
    pub models: ModelCollection,
    pub timeline: TimelineController,
    pub global_timer: Stopwatch,
    pub phase_timer: Stopwatch,
    outbox: Vec<ModelMessage>,
}

impl Context {
    pub fn new(models: ModelCollection, timeline: TimelineController) -> Self {
        Self {
            models,
            timeline,
            global_timer: Stopwatch::new(),
            phase_timer: Stopwatch::new(),
            outbox: Vec::new(),
        }
    }

    /// Names of failed models, in registration order.
    pub fn failed(&self) -> Vec<String> {
        self.models.failed()
    }

    /// Route a wire message from a peer into that model's FSM; outgoing
    /// commands land in the outbox.
    pub fn route_message(&mut self, identity: &str, message: crate::message::Message) {
        let Self {
            models,
            timeline,
            outbox,
            ..
        } = self;
        models.route_message(identity, message, timeline, outbox);
    }

    /// Select the next simulation instant and queue its work.
    pub fn queue_for_next_time(&mut self) {
        let Self {
            models,
            timeline,
            outbox,
            ..
        } = self;
        models.queue_for_next_time(timeline, outbox);
    }

    /// Deliver a command to every model.
    pub fn queue_all(&mut self, command: crate::orchestrator::ModelCommand) {
        let Self {
            models,
            timeline,
            outbox,
            ..
        } = self;
        models.queue_all(command, timeline, outbox);
    }

    /// Drain the messages produced since the last call, in send order.
    pub fn take_outbox(&mut self) -> Vec<ModelMessage> {
        mem::take(&mut self.outbox)
    }

    pub(crate) fn outbox_mut(&mut self) -> &mut Vec<ModelMessage> {
        &mut self.outbox
    }

    /// Close a phase: reset the phase timer and log its duration.
    pub fn finish_phase(&mut self) {
        let elapsed = self.phase_timer.restart();
        info!("Previous phase finished in {elapsed:.1} seconds");
    }

    /// End-of-run bookkeeping: stop and report all timers, then log the
    /// outcome of the simulation.
    pub fn finalize(&mut self) {
        let phase = self.phase_timer.reset();
        info!("Previous phase finished in {phase:.1} seconds");
        let total = self.global_timer.reset();
        info!("Total elapsed time: {total:.1} seconds");
        self.models.reset_model_timers();
        self.log_finalize_message();
    }

    fn log_finalize_message(&self) {
        let failed = self.failed();
        match failed.as_slice() {
            [] => info!("Simulation successfully finished"),
            [name] => error!("Simulation unexpectedly ended due to a failure of model '{name}'"),
            names => {
                let listing = names
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                error!("Simulation unexpectedly ended due to a failure of models {listing}");
            }
        }
    }
}
