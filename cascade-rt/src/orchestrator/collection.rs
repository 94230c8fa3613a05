//! The indexed collection of connected models and its event dispatcher.
//!
//! Models are stored in a vector; the publish/subscribe relationships are
//! edges over indices. The dispatcher applies FSM side effects: outgoing
//! commands are appended to the caller's outbox, cascade notifications are
//! queued as events for the subscribing models, and transient FSM states
//! are resolved with the dependency-busy gate evaluated against the live
//! collection.

// Layer 1: Standard library imports
use std::collections::{HashMap, VecDeque};

// Layer 2: Third-party crate imports
use tracing::info;

// Layer 3: Internal module imports
use super::connected_model::{ConnectedModel, ModelCommand, ModelEffect, ModelEvent};
use crate::mask::masks_overlap;
use crate::message::{Message, ModelMessage, NewTimeMessage, UpdateMessage};
use crate::timeline::{TimelineController, Timestamp};

/// All models registered for a simulation, indexed by position and name.
#[derive(Debug, Default)]
pub struct ModelCollection {
    models: Vec<ConnectedModel>,
    by_name: HashMap<String, usize>,
}

impl ModelCollection {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collection = Self::default();
        for name in names {
            let name = name.into();
            let index = collection.models.len();
            collection.by_name.insert(name.clone(), index);
            collection.models.push(ConnectedModel::new(name));
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectedModel> {
        self.models.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn model(&self, index: usize) -> &ConnectedModel {
        &self.models[index]
    }

    #[cfg(test)]
    pub(crate) fn model_mut(&mut self, index: usize) -> &mut ConnectedModel {
        &mut self.models[index]
    }

    /// Whether any model has a command in flight.
    pub fn any_busy(&self) -> bool {
        self.models.iter().any(|model| model.busy)
    }

    /// Whether every model is quiescent: nothing in flight and no queued
    /// updates waiting to be dispatched.
    pub fn all_ready(&self) -> bool {
        self.models
            .iter()
            .all(|model| !model.busy && !model.has_pending_updates())
    }

    /// The earliest requested wake-up over all models, if any.
    pub fn next_time(&self) -> Option<Timestamp> {
        self.models.iter().filter_map(|model| model.next_time).min()
    }

    /// Names of the models that failed, in registration order.
    pub fn failed(&self) -> Vec<String> {
        self.models
            .iter()
            .filter(|model| model.failed)
            .map(|model| model.name.clone())
            .collect()
    }

    pub fn any_failed(&self) -> bool {
        self.models.iter().any(|model| model.failed)
    }

    /// Compute the publish/subscribe graph from the registered masks: for
    /// every ordered pair `(publisher, subscriber)` of distinct models whose
    /// masks overlap, add the edge in both directions.
    pub fn determine_interdependency(&mut self) {
        for publisher in 0..self.models.len() {
            for subscriber in 0..self.models.len() {
                if publisher == subscriber {
                    continue;
                }
                let overlap = masks_overlap(
                    self.models[publisher].pub_mask.as_ref(),
                    self.models[subscriber].sub_mask.as_ref(),
                );
                if overlap {
                    self.models[publisher].publishes_to.push(subscriber);
                    self.models[subscriber].subscribed_to.push(publisher);
                }
            }
        }
    }

    /// Deliver one event to one model and run the resulting cascade to
    /// completion. Outgoing commands land in `outbox` in send order.
    pub fn deliver(
        &mut self,
        target: usize,
        event: ModelEvent,
        timeline: &TimelineController,
        outbox: &mut Vec<ModelMessage>,
    ) {
        let mut queue = VecDeque::new();
        queue.push_back((target, event));
        while let Some((index, event)) = queue.pop_front() {
            let effects = match event {
                ModelEvent::Command(command) => self.models[index].handle_command(command),
                ModelEvent::Response(response) => {
                    self.models[index].handle_response(response, timeline)
                }
            };
            self.apply_effects(index, effects, &mut queue, outbox);
            self.resolve_transient(index, &mut queue, outbox);
        }
    }

    fn apply_effects(
        &mut self,
        index: usize,
        effects: Vec<ModelEffect>,
        queue: &mut VecDeque<(usize, ModelEvent)>,
        outbox: &mut Vec<ModelMessage>,
    ) {
        for effect in effects {
            match effect {
                ModelEffect::Send(message) => {
                    outbox.push((self.models[index].name.clone(), message));
                }
                ModelEffect::Cascade(update) => {
                    for &subscriber in &self.models[index].publishes_to {
                        let command = match &update {
                            Some(update) => ModelCommand::Update(update.clone()),
                            None => ModelCommand::NoUpdate,
                        };
                        queue.push_back((subscriber, ModelEvent::Command(command)));
                    }
                }
            }
        }
    }

    fn resolve_transient(
        &mut self,
        index: usize,
        queue: &mut VecDeque<(usize, ModelEvent)>,
        outbox: &mut Vec<ModelMessage>,
    ) {
        while self.models[index].needs_poll() {
            let deps_busy = self.models[index]
                .subscribed_to
                .iter()
                .any(|&dependency| self.models[dependency].busy);
            let effects = self.models[index].poll(deps_busy);
            if effects.is_empty() && self.models[index].needs_poll() {
                break;
            }
            self.apply_effects(index, effects, queue, outbox);
        }
    }

    /// Deliver the same command to every model.
    pub fn queue_all(
        &mut self,
        command: ModelCommand,
        timeline: &TimelineController,
        outbox: &mut Vec<ModelMessage>,
    ) {
        for index in 0..self.models.len() {
            self.deliver(
                index,
                ModelEvent::Command(command.clone()),
                timeline,
                outbox,
            );
        }
    }

    /// Select the next simulation instant and queue the work for it: when
    /// the instant changes, broadcast `NEW_TIME`; then wake every model due
    /// at that instant with a bare `UPDATE`. No-op when no model requests a
    /// future wake-up.
    pub fn queue_for_next_time(
        &mut self,
        timeline: &mut TimelineController,
        outbox: &mut Vec<ModelMessage>,
    ) {
        let Some(next_time) = self.next_time() else {
            return;
        };
        if timeline.advance_to(next_time) {
            info!("New time: {next_time}");
            self.queue_all(
                ModelCommand::NewTime(NewTimeMessage {
                    timestamp: next_time,
                }),
                timeline,
                outbox,
            );
        }
        for index in 0..self.models.len() {
            if self.models[index].next_time == Some(next_time) {
                self.deliver(
                    index,
                    ModelEvent::Command(ModelCommand::Update(UpdateMessage::wake(next_time))),
                    timeline,
                    outbox,
                );
            }
        }
    }

    /// Drop queued updates on every model (run teardown).
    pub fn clear_pending(&mut self) {
        for model in &mut self.models {
            model.clear_pending();
        }
    }

    /// Reset all per-model stopwatches, logging the totals.
    pub fn reset_model_timers(&mut self) {
        for model in &mut self.models {
            let total = model.timer.reset();
            info!(
                "Total time spent in model '{}': {:.1} seconds",
                model.name, total
            );
        }
    }

    /// Route a wire message from `identity` into that model's FSM; unknown
    /// identities are ignored.
    pub fn route_message(
        &mut self,
        identity: &str,
        message: Message,
        timeline: &TimelineController,
        outbox: &mut Vec<ModelMessage>,
    ) {
        let Some(index) = self.index_of(identity) else {
            info!("Ignoring message from unknown peer '{identity}'");
            return;
        };
        let response = super::connected_model::response_from_message(message);
        self.deliver(index, ModelEvent::Response(response), timeline, outbox);
    }
}
