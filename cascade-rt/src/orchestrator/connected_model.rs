//! Connection state and the per-model finite state machine.
//!
//! Each registered model is tracked by a [`ConnectedModel`] owning an
//! independent FSM. The orchestrator sends *commands* (`NEW_TIME`,
//! `UPDATE`, `UPDATE_SERIES`, `END`); the model answers with *responses*
//! (`READY`, `ACK`, `RESULT`, `ERROR`). Each busy state accepts a fixed set
//! of responses; anything else is a protocol violation and routes the model
//! onto the failure path.
//!
//! State transitions are pure: a step takes an event and returns the side
//! effects ([`ModelEffect`]) for the dispatcher to apply. Relationships to
//! other models are stored as indices into the owning collection, so the
//! cascade graph has no shared-ownership cycles.

// Layer 1: Standard library imports
use std::mem;

// Layer 2: Third-party crate imports
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::stopwatch::Stopwatch;
use crate::mask::MaskTree;
use crate::message::{
    ErrorMessage, Message, NewTimeMessage, QuitMessage, RegistrationMessage, ResultMessage,
    UpdateMessage, UpdateSeriesMessage,
};
use crate::timeline::{TimelineController, Timestamp};

/// Commands the orchestrator can feed a model's FSM.
///
/// `NoUpdate` never reaches the wire: it tells a subscribed model that a
/// dependency finished its calculation without producing data, so a parked
/// model can re-evaluate whether its pending updates may go out.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelCommand {
    NewTime(NewTimeMessage),
    Update(UpdateMessage),
    NoUpdate,
    Quit,
}

/// Responses received from the model process.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Registration(RegistrationMessage),
    Acknowledge,
    Result(ResultMessage),
    Error(ErrorMessage),
    /// A wire message kind that is never a valid model response.
    Unexpected(&'static str),
}

/// An event offered to a model's FSM.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    Command(ModelCommand),
    Response(ModelResponse),
}

/// Side effects produced by an FSM step, applied by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEffect {
    /// Transmit a command to this model's socket.
    Send(Message),
    /// Notify every model this one publishes to: `Some` carries a data
    /// update to enqueue, `None` signals "finished without data".
    Cascade(Option<UpdateMessage>),
}

/// States of the per-model FSM.
///
/// ```text
///          Registration ──READY──▶ Idle
///                    └──ERROR────▶ Done (failed)
///
///   Idle ──NEW_TIME──▶ NewTime ──ACK──▶ Idle
///        ──UPDATE────▶ ProcessPendingUpdates
///        ──END───────▶ ProcessPendingQuit
///
///   ProcessPendingUpdates: dependency busy → PendingMoreUpdates
///                          else send batch → Updating
///   Updating ──RESULT──▶ Idle (or queued work) / ──ERROR──▶ Done
///   ProcessPendingQuit ──send END──▶ Finalizing ──ACK──▶ Done
/// ```
///
/// `ProcessPendingUpdates` and `ProcessPendingQuit` are transient: the
/// dispatcher resolves them immediately after the step that entered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Waiting for the model's `READY` registration.
    Registration,
    /// No command in flight, awaiting further instructions.
    Idle,
    /// A `NEW_TIME` has been sent, waiting for the `ACK`.
    NewTime,
    /// An `UPDATE`/`UPDATE_SERIES` has been sent, waiting for the `RESULT`.
    Updating,
    /// Updates are pending but a subscribed-to model is still calculating.
    PendingMoreUpdates,
    /// Transient: pending updates must be dispatched or parked.
    ProcessPendingUpdates,
    /// Transient: a queued `END` must be dispatched.
    ProcessPendingQuit,
    /// An `END` has been sent, waiting for the final `ACK`.
    Finalizing,
    /// Terminal: finished or failed, no further messages.
    Done,
}

/// Holds connection state and other data concerning a connected model.
#[derive(Debug)]
pub struct ConnectedModel {
    pub name: String,
    pub pub_mask: Option<MaskTree>,
    pub sub_mask: Option<MaskTree>,
    /// Indices of models that consume this model's published data.
    pub publishes_to: Vec<usize>,
    /// Indices of models whose published data this model consumes.
    pub subscribed_to: Vec<usize>,
    /// The earliest future instant this model wants to be woken, if any.
    pub next_time: Option<Timestamp>,
    /// A command has been sent and no response received yet.
    pub busy: bool,
    /// Terminal error: the record accepts no further outgoing commands.
    pub failed: bool,
    /// An `END` has been queued (and possibly sent) for this model.
    quit_pending: bool,
    /// Updates accumulated while the model was busy, drained as one batch.
    pending_updates: Vec<UpdateMessage>,
    state: ModelState,
    /// Monotonic stopwatch measuring time spent inside the model.
    pub timer: Stopwatch,
}

impl ConnectedModel {
    /// A freshly connected model starts in `Registration`, busy until its
    /// `READY` arrives.
    pub fn new(name: impl Into<String>) -> Self {
        let mut timer = Stopwatch::new();
        timer.start();
        Self {
            name: name.into(),
            pub_mask: None,
            sub_mask: None,
            publishes_to: Vec::new(),
            subscribed_to: Vec::new(),
            next_time: None,
            busy: true,
            failed: false,
            quit_pending: false,
            pending_updates: Vec::new(),
            state: ModelState::Registration,
            timer,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ModelState::Done
    }

    pub fn has_pending_updates(&self) -> bool {
        !self.pending_updates.is_empty()
    }

    pub fn quit_pending(&self) -> bool {
        self.quit_pending
    }

    /// Whether the FSM sits in a transient state the dispatcher must
    /// resolve before offering further events.
    pub fn needs_poll(&self) -> bool {
        matches!(
            self.state,
            ModelState::ProcessPendingUpdates | ModelState::ProcessPendingQuit
        )
    }

    /// Offer a command to the FSM.
    pub fn handle_command(&mut self, command: ModelCommand) -> Vec<ModelEffect> {
        let mut effects = Vec::new();
        match self.state {
            ModelState::Idle => match command {
                ModelCommand::NewTime(msg) => {
                    self.send_command(Message::NewTime(msg), &mut effects);
                    self.state = ModelState::NewTime;
                }
                ModelCommand::Update(msg) => {
                    self.pending_updates.push(msg);
                    self.state = ModelState::ProcessPendingUpdates;
                }
                ModelCommand::NoUpdate => {}
                ModelCommand::Quit => {
                    self.quit_pending = true;
                    self.state = ModelState::ProcessPendingQuit;
                }
            },
            ModelState::PendingMoreUpdates => match command {
                ModelCommand::Update(msg) => {
                    self.pending_updates.push(msg);
                    self.state = ModelState::ProcessPendingUpdates;
                }
                ModelCommand::NoUpdate => {
                    self.state = ModelState::ProcessPendingUpdates;
                }
                ModelCommand::Quit => {
                    self.quit_pending = true;
                    self.state = ModelState::ProcessPendingQuit;
                }
                ModelCommand::NewTime(_) => self.handle_invalid("NEW_TIME command"),
            },
            ModelState::Registration => match command {
                ModelCommand::Quit => self.quit_pending = true,
                other => self.handle_invalid(command_name(&other)),
            },
            ModelState::NewTime | ModelState::Updating => match command {
                ModelCommand::Update(msg) => self.pending_updates.push(msg),
                ModelCommand::NoUpdate => {}
                ModelCommand::Quit => self.quit_pending = true,
                ModelCommand::NewTime(_) => self.handle_invalid("NEW_TIME command"),
            },
            // A finalizing model ignores all further commands; a done model
            // receives no further messages at all.
            ModelState::Finalizing | ModelState::Done => {}
            ModelState::ProcessPendingUpdates | ModelState::ProcessPendingQuit => {
                // The dispatcher resolves transient states before delivering
                // further events; enqueue defensively.
                match command {
                    ModelCommand::Update(msg) => self.pending_updates.push(msg),
                    ModelCommand::Quit => self.quit_pending = true,
                    _ => {}
                }
            }
        }
        effects
    }

    /// Offer a response to the FSM.
    pub fn handle_response(
        &mut self,
        response: ModelResponse,
        timeline: &TimelineController,
    ) -> Vec<ModelEffect> {
        if self.state == ModelState::Done {
            return Vec::new();
        }
        if self.timer.running() {
            let elapsed = self.timer.stop();
            info!("Model '{}' returned in {:.1} seconds", self.name, elapsed);
        }
        self.busy = false;

        let mut effects = Vec::new();
        match (self.state, response) {
            (ModelState::Registration, ModelResponse::Registration(msg)) => {
                self.next_time = Some(timeline.start_time());
                self.pub_mask = msg.pub_mask;
                self.sub_mask = msg.sub_mask;
                self.transition_after_response();
            }
            (ModelState::NewTime, ModelResponse::Acknowledge)
            | (ModelState::Finalizing, ModelResponse::Acknowledge) => {
                self.transition_after_response();
            }
            (ModelState::Updating, ModelResponse::Result(msg)) => {
                self.next_time = timeline.validated_next_time(msg.next_time);
                let cascade = if msg.has_data() {
                    // key/address validity is enforced at the codec; current
                    // time is always set once updates are in flight.
                    Some(UpdateMessage {
                        timestamp: timeline.current_time().unwrap_or_else(|| timeline.start_time()),
                        key: msg.key,
                        address: msg.address,
                        origin: msg.origin,
                    })
                } else {
                    None
                };
                effects.push(ModelEffect::Cascade(cascade));
                self.transition_after_response();
            }
            (
                ModelState::Registration
                | ModelState::NewTime
                | ModelState::Updating
                | ModelState::Finalizing,
                ModelResponse::Error(msg),
            ) => {
                warn!(
                    "Model '{}' reported an error: {}",
                    self.name,
                    msg.error.as_deref().unwrap_or("<no detail>")
                );
                self.fail_terminal();
                self.transition_after_response();
            }
            // responses are never valid while no command is in flight
            (_, response) => self.handle_invalid(response_name(&response)),
        }
        effects
    }

    /// Resolve a transient state. `deps_busy` tells whether any model in
    /// `subscribed_to` currently has a command in flight.
    pub fn poll(&mut self, deps_busy: bool) -> Vec<ModelEffect> {
        let mut effects = Vec::new();
        match self.state {
            ModelState::ProcessPendingUpdates => {
                debug_assert!(
                    !self.pending_updates.is_empty(),
                    "ProcessPendingUpdates entered without pending updates"
                );
                if self.pending_updates.is_empty() {
                    self.state = ModelState::Idle;
                } else if deps_busy {
                    self.state = ModelState::PendingMoreUpdates;
                } else {
                    let mut updates = mem::take(&mut self.pending_updates);
                    let message = if updates.len() == 1 {
                        // drained above, single element present
                        match updates.pop() {
                            Some(update) => Message::Update(update),
                            None => return effects,
                        }
                    } else {
                        Message::UpdateSeries(UpdateSeriesMessage::new(updates))
                    };
                    self.send_command(message, &mut effects);
                    self.state = ModelState::Updating;
                }
            }
            ModelState::ProcessPendingQuit => {
                debug_assert!(self.quit_pending, "ProcessPendingQuit entered without a quit");
                self.send_command(Message::Quit(QuitMessage {}), &mut effects);
                self.state = ModelState::Finalizing;
            }
            _ => {}
        }
        effects
    }

    fn send_command(&mut self, message: Message, effects: &mut Vec<ModelEffect>) {
        debug!("Sending {} to model '{}'", message.tag(), self.name);
        self.busy = true;
        self.timer.start();
        effects.push(ModelEffect::Send(message));
    }

    /// Post-response state selection, mirroring the busy-state transition
    /// table: failure wins, then a queued quit, then queued updates.
    fn transition_after_response(&mut self) {
        if self.failed {
            self.state = ModelState::Done;
        } else if self.state == ModelState::Finalizing {
            self.state = ModelState::Done;
        } else if self.quit_pending {
            self.state = ModelState::ProcessPendingQuit;
        } else if !self.pending_updates.is_empty() {
            self.state = ModelState::ProcessPendingUpdates;
        } else {
            self.state = ModelState::Idle;
        }
    }

    /// The protocol-violation path: mark failed and, unless an `END` is
    /// already underway, queue one so the model is shut down cleanly. With
    /// an `END` already out there is nothing left to send.
    fn handle_invalid(&mut self, what: &str) {
        warn!(
            "Model '{}' violated the protocol in state {:?}: unexpected {}",
            self.name, self.state, what
        );
        self.failed = true;
        if !self.quit_pending {
            self.quit_pending = true;
            self.pending_updates.clear();
            self.state = ModelState::ProcessPendingQuit;
        } else if !self.busy {
            self.state = ModelState::Done;
        }
    }

    /// The terminal error path: no further outgoing commands.
    fn fail_terminal(&mut self) {
        self.failed = true;
        self.quit_pending = false;
        self.pending_updates.clear();
    }

    /// Drop any queued work (used when the run is torn down).
    pub fn clear_pending(&mut self) {
        self.pending_updates.clear();
    }
}

/// Classify an inbound wire message as a model response; message kinds a
/// model must never send surface as `Unexpected` and trip the failure path.
pub(crate) fn response_from_message(message: Message) -> ModelResponse {
    match message {
        Message::Registration(msg) => ModelResponse::Registration(msg),
        Message::Acknowledge(_) => ModelResponse::Acknowledge,
        Message::Result(msg) => ModelResponse::Result(msg),
        Message::Error(msg) => ModelResponse::Error(msg),
        other => ModelResponse::Unexpected(other.tag()),
    }
}

fn command_name(command: &ModelCommand) -> &'static str {
    match command {
        ModelCommand::NewTime(_) => "NEW_TIME command",
        ModelCommand::Update(_) => "UPDATE command",
        ModelCommand::NoUpdate => "no-update notification",
        ModelCommand::Quit => "END command",
    }
}

fn response_name(response: &ModelResponse) -> &'static str {
    match response {
        ModelResponse::Registration(_) => "READY response",
        ModelResponse::Acknowledge => "ACK response",
        ModelResponse::Result(_) => "RESULT response",
        ModelResponse::Error(_) => "ERROR response",
        ModelResponse::Unexpected(_) => "non-response message",
    }
}
