//! The global orchestrator finite state machine.
//!
//! A pull-model FSM: transient phases run to completion as soon as they are
//! entered; waiting phases consume one `(identity, message)` event at a
//! time. The caller pumps events in with [`OrchestratorCore::handle_message`]
//! and transmits whatever lands in the outbox.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::info;

// Layer 3: Internal module imports
use super::collection::ModelCollection;
use super::connected_model::ModelCommand;
use super::context::Context;
use super::interconnectivity::format_matrix;
use crate::message::{Message, ModelMessage};
use crate::timeline::TimelineController;

/// Phases of the orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Start the wall-clock timers.
    StartInitializing,
    /// Collect `READY` registrations from every model.
    ModelsRegistration,
    /// Compute the publish/subscribe graph.
    StartRunning,
    /// Select the next simulation instant and queue its work.
    NewTime,
    /// Collect `RESULT`/`ACK` responses and drive the update cascade.
    WaitForResults,
    /// Tear down: queue `END` for every model.
    StartFinalizing,
    /// Collect the final acknowledgements.
    FinalizingWait,
    /// Stop timers, log the outcome, signal completion.
    EndFinalizing,
}

impl Phase {
    /// Whether this phase blocks on an inbound event.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            Phase::ModelsRegistration | Phase::WaitForResults | Phase::FinalizingWait
        )
    }
}

/// The orchestrator FSM, independent of any transport.
#[derive(Debug)]
pub struct OrchestratorCore {
    phase: Phase,
    context: Context,
    done: bool,
}

impl OrchestratorCore {
    pub fn new<I, S>(model_names: I, timeline: TimelineController) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phase: Phase::StartInitializing,
            context: Context::new(ModelCollection::new(model_names), timeline),
            done: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Whether the FSM has reached its end.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 0 when no model failed, 1 otherwise. Meaningful once done.
    pub fn exit_code(&self) -> i32 {
        if self.context.failed().is_empty() {
            0
        } else {
            1
        }
    }

    /// Enter the FSM; returns the initial outgoing messages (none until the
    /// models start talking).
    pub fn start(&mut self) -> Vec<ModelMessage> {
        self.advance();
        self.context.take_outbox()
    }

    /// Feed one inbound wire message into the FSM and collect the messages
    /// to transmit in response.
    pub fn handle_message(&mut self, identity: &str, message: Message) -> Vec<ModelMessage> {
        if self.done {
            return Vec::new();
        }
        self.context.route_message(identity, message);
        self.advance();
        self.context.take_outbox()
    }

    /// Run transient phases and phase transitions until the FSM either
    /// blocks on the next event or completes.
    fn advance(&mut self) {
        loop {
            match self.phase {
                Phase::StartInitializing => {
                    self.context.global_timer.start();
                    self.context.phase_timer.start();
                    self.phase = Phase::ModelsRegistration;
                }
                Phase::ModelsRegistration => {
                    if self.context.models.any_failed() {
                        self.phase = Phase::StartFinalizing;
                    } else if self.context.models.all_ready() {
                        self.phase = Phase::StartRunning;
                    } else {
                        break;
                    }
                }
                Phase::StartRunning => {
                    self.context.models.determine_interdependency();
                    info!(
                        "Model interconnectivity matrix:\n{}",
                        format_matrix(&self.context.models)
                    );
                    self.context.finish_phase();
                    self.phase = Phase::NewTime;
                }
                Phase::NewTime => {
                    self.context.queue_for_next_time();
                    self.phase = Phase::WaitForResults;
                }
                Phase::WaitForResults => {
                    let models = &self.context.models;
                    if models.any_failed() {
                        self.phase = Phase::StartFinalizing;
                    } else if models.all_ready() && models.next_time().is_none() {
                        self.phase = Phase::StartFinalizing;
                    } else if models.all_ready() {
                        self.phase = Phase::NewTime;
                    } else {
                        break;
                    }
                }
                Phase::StartFinalizing => {
                    self.context.finish_phase();
                    self.context.models.clear_pending();
                    self.context.queue_all(ModelCommand::Quit);
                    self.phase = Phase::FinalizingWait;
                }
                Phase::FinalizingWait => {
                    if self.context.models.all_ready() {
                        self.phase = Phase::EndFinalizing;
                    } else {
                        break;
                    }
                }
                Phase::EndFinalizing => {
                    self.context.finalize();
                    self.done = true;
                    break;
                }
            }
        }
    }
}
