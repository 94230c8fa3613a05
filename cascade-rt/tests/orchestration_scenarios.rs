//! Scenario suites driving the orchestrator FSM with scripted model
//! responses and asserting the complete outbound message traces.

#![allow(clippy::unwrap_used, clippy::panic)]

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use cascade_rt::message::{
    AcknowledgeMessage, ErrorMessage, Message, ModelMessage, NewTimeMessage, RegistrationMessage,
    ResultMessage, UpdateMessage, UpdateSeriesMessage,
};
use cascade_rt::orchestrator::OrchestratorCore;
use cascade_rt::timeline::TimelineController;

fn registration(pub_mask: &str, sub_mask: &str) -> Message {
    Message::Registration(RegistrationMessage {
        pub_mask: serde_json::from_str(pub_mask).unwrap(),
        sub_mask: serde_json::from_str(sub_mask).unwrap(),
    })
}

fn ack() -> Message {
    Message::Acknowledge(AcknowledgeMessage {})
}

fn result() -> Message {
    Message::Result(ResultMessage::default())
}

fn result_with_data(key: &str, address: &str, next_time: Option<i64>) -> Message {
    Message::Result(ResultMessage {
        key: Some(key.to_owned()),
        address: Some(address.to_owned()),
        next_time,
        origin: None,
    })
}

fn result_with_next_time(next_time: i64) -> Message {
    Message::Result(ResultMessage {
        next_time: Some(next_time),
        ..ResultMessage::default()
    })
}

fn new_time(model: &str, timestamp: i64) -> ModelMessage {
    (
        model.to_owned(),
        Message::NewTime(NewTimeMessage { timestamp }),
    )
}

fn wake(model: &str, timestamp: i64) -> ModelMessage {
    (model.to_owned(), Message::Update(UpdateMessage::wake(timestamp)))
}

fn data_update(model: &str, timestamp: i64, key: &str, address: &str) -> ModelMessage {
    (
        model.to_owned(),
        Message::Update(UpdateMessage::with_data(timestamp, key, address, None)),
    )
}

fn quit(model: &str) -> ModelMessage {
    (model.to_owned(), Message::Quit(cascade_rt::message::QuitMessage {}))
}

/// Run a scripted conversation: feed each `(model, response)` in order and
/// collect every message the orchestrator sends.
fn run_script(
    models: &[&str],
    script: Vec<(&str, Message)>,
) -> (OrchestratorCore, Vec<ModelMessage>) {
    let mut core = OrchestratorCore::new(
        models.iter().copied().map(str::to_owned),
        TimelineController::new(0, 20),
    );
    let mut sent = core.start();
    for (model, response) in script {
        sent.extend(core.handle_message(model, response));
    }
    (core, sent)
}

/// Linear chain: model_a publishes at t=0, the cascade reaches model_b and
/// then model_c; at t=1 only model_a is woken and produces nothing. A
/// subscriber whose publisher is still calculating holds its wake-up and
/// receives it merged with the publisher's data as one series.
#[test]
fn test_linear_chain_cascade() {
    let (core, sent) = run_script(
        &["model_a", "model_b", "model_c"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            ("model_b", registration(r#"{"b": null}"#, r#"{"a": null}"#)),
            ("model_c", registration(r#"{"c": null}"#, r#"{"b": null}"#)),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_c", ack()),
            ("model_a", result_with_data("a", "address_a", Some(1))),
            ("model_c", result()),
            ("model_b", result_with_data("b", "address_b", None)),
            ("model_c", result_with_data("c", "address_c", None)),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_c", ack()),
            ("model_a", result()),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_c", ack()),
        ],
    );

    assert_eq!(
        sent,
        vec![
            // registration complete: t=0 everywhere
            new_time("model_a", 0),
            new_time("model_b", 0),
            new_time("model_c", 0),
            // model_a has no dependencies: its wake goes out on its ack
            wake("model_a", 0),
            // model_b is gated on busy model_a; model_c's dependency
            // (model_b) is parked and not busy, so model_c proceeds
            wake("model_c", 0),
            // model_a's data unparks model_b: wake and data as one series
            (
                "model_b".to_owned(),
                Message::UpdateSeries(UpdateSeriesMessage::new(vec![
                    UpdateMessage::wake(0),
                    UpdateMessage::with_data(0, "a", "address_a", None),
                ]))
            ),
            // model_b's data cascades to model_c
            data_update("model_c", 0, "b", "address_b"),
            // everyone returned, model_a asked for t=1
            new_time("model_a", 1),
            new_time("model_b", 1),
            new_time("model_c", 1),
            wake("model_a", 1),
            // no data and no future work: finalize
            quit("model_a"),
            quit("model_b"),
            quit("model_c"),
        ]
    );
    assert!(core.is_done());
    assert_eq!(core.exit_code(), 0);
}

/// Fan-in: two publishers produce data for the same subscriber within one
/// tick; the subscriber receives a single series carrying its wake-up and
/// both payloads, in arrival order.
#[test]
fn test_fan_in_merges_into_series() {
    let (core, sent) = run_script(
        &["model_a1", "model_a2", "model_b"],
        vec![
            ("model_a1", registration(r#"{"a": null}"#, "{}")),
            ("model_a2", registration(r#"{"a": null}"#, "{}")),
            ("model_b", registration(r#"{"b": null}"#, r#"{"a": null}"#)),
            ("model_a1", ack()),
            ("model_a2", ack()),
            ("model_b", ack()),
            ("model_a1", result_with_data("a1", "address_a1", None)),
            ("model_a2", result_with_data("a2", "address_a2", None)),
            ("model_b", result()),
            ("model_a1", ack()),
            ("model_a2", ack()),
            ("model_b", ack()),
        ],
    );

    assert_eq!(
        sent,
        vec![
            new_time("model_a1", 0),
            new_time("model_a2", 0),
            new_time("model_b", 0),
            wake("model_a1", 0),
            wake("model_a2", 0),
            (
                "model_b".to_owned(),
                Message::UpdateSeries(UpdateSeriesMessage::new(vec![
                    UpdateMessage::wake(0),
                    UpdateMessage::with_data(0, "a1", "address_a1", None),
                    UpdateMessage::with_data(0, "a2", "address_a2", None),
                ]))
            ),
            quit("model_a1"),
            quit("model_a2"),
            quit("model_b"),
        ]
    );
    assert_eq!(core.exit_code(), 0);
}

/// A model may request `next_time == current_time` and is re-invoked within
/// the same tick; the clock does not move and no `NEW_TIME` is broadcast.
#[test]
fn test_re_request_current_tick() {
    let (core, sent) = run_script(
        &["model_a"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            ("model_a", ack()),
            ("model_a", result_with_next_time(0)),
            ("model_a", result_with_next_time(1)),
            ("model_a", ack()),
            ("model_a", result()),
            ("model_a", ack()),
        ],
    );

    assert_eq!(
        sent,
        vec![
            new_time("model_a", 0),
            wake("model_a", 0),
            wake("model_a", 0),
            new_time("model_a", 1),
            wake("model_a", 1),
            quit("model_a"),
        ]
    );
    assert!(core.is_done());
    assert_eq!(core.exit_code(), 0);
}

/// An `ACK` where a `RESULT` is expected is a protocol violation: the
/// offending model is failed and told to quit, the others are shut down
/// cleanly, and the run exits with status 1.
#[test]
fn test_invalid_response_fails_model() {
    let (core, sent) = run_script(
        &["model_a", "model_b"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            ("model_b", registration(r#"{"b": null}"#, "{}")),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_a", result()),
            // RESULT expected from model_b
            ("model_b", ack()),
            ("model_a", ack()),
            ("model_b", ack()),
        ],
    );

    assert_eq!(
        sent,
        vec![
            new_time("model_a", 0),
            new_time("model_b", 0),
            wake("model_a", 0),
            wake("model_b", 0),
            // the violation triggers model_b's END, then teardown of the rest
            quit("model_b"),
            quit("model_a"),
        ]
    );
    assert!(core.is_done());
    assert_eq!(core.exit_code(), 1);
    assert_eq!(core.context().failed(), vec!["model_b".to_owned()]);
}

/// A failure in one model does not abort an unrelated model mid-command:
/// the survivor finishes its tick, receives a clean `END`, and the run
/// exits with status 1.
#[test]
fn test_subscriber_independence_on_failure() {
    let (core, sent) = run_script(
        &["model_a", "model_b"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            ("model_b", registration(r#"{"b": null}"#, "{}")),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_a", result_with_next_time(2)),
            ("model_b", result_with_next_time(1)),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_b", result_with_next_time(2)),
            ("model_a", ack()),
            ("model_b", ack()),
            // both are computing t=2; model_a dies, model_b finishes
            ("model_a", Message::Error(ErrorMessage::new("boom"))),
            ("model_b", result_with_next_time(3)),
            ("model_b", ack()),
        ],
    );

    assert_eq!(
        sent,
        vec![
            new_time("model_a", 0),
            new_time("model_b", 0),
            wake("model_a", 0),
            wake("model_b", 0),
            new_time("model_a", 1),
            new_time("model_b", 1),
            wake("model_b", 1),
            new_time("model_a", 2),
            new_time("model_b", 2),
            wake("model_a", 2),
            wake("model_b", 2),
            // model_a is already done for; model_b gets its END as soon as
            // it returns from the current command
            quit("model_b"),
        ]
    );
    assert!(core.is_done());
    assert_eq!(core.exit_code(), 1);
    assert_eq!(core.context().failed(), vec!["model_a".to_owned()]);
}

/// No `UPDATE` for a tick is sent to a model before that model acknowledged
/// the tick's `NEW_TIME`.
#[test]
fn test_new_time_precedes_updates_per_model() {
    let (_core, sent) = run_script(
        &["model_a", "model_b"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            ("model_b", registration(r#"{"b": null}"#, r#"{"a": null}"#)),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_a", result_with_data("a", "address_a", None)),
            ("model_b", result()),
            ("model_a", ack()),
            ("model_b", ack()),
        ],
    );

    for model in ["model_a", "model_b"] {
        let mut seen_new_time = false;
        for (target, message) in &sent {
            if target != model {
                continue;
            }
            match message {
                Message::NewTime(_) => seen_new_time = true,
                Message::Update(_) | Message::UpdateSeries(_) => {
                    assert!(seen_new_time, "update before NEW_TIME for {model}");
                }
                _ => {}
            }
        }
    }
}

/// Models without mask overlap never receive an update caused by an
/// unrelated publisher.
#[test]
fn test_no_update_without_mask_overlap() {
    let (_core, sent) = run_script(
        &["model_a", "model_b"],
        vec![
            ("model_a", registration(r#"{"a": null}"#, "{}")),
            // model_b subscribes to something model_a does not publish
            ("model_b", registration("{}", r#"{"other": null}"#)),
            ("model_a", ack()),
            ("model_b", ack()),
            ("model_a", result_with_data("a", "address_a", None)),
            ("model_b", result()),
            ("model_a", ack()),
            ("model_b", ack()),
        ],
    );

    let data_updates_to_b: Vec<_> = sent
        .iter()
        .filter(|(target, message)| {
            target == "model_b"
                && match message {
                    Message::Update(update) => update.has_data(),
                    Message::UpdateSeries(series) => {
                        series.updates.iter().any(UpdateMessage::has_data)
                    }
                    _ => false,
                }
        })
        .collect();
    assert!(data_updates_to_b.is_empty());
}

/// Each model receives at most one update call per cascade wave: queued
/// updates are always drained into a single message.
#[test]
fn test_pending_updates_drain_as_one_batch() {
    let (_core, sent) = run_script(
        &["pub_a", "pub_b", "sub"],
        vec![
            ("pub_a", registration(r#"{"a": null}"#, "{}")),
            ("pub_b", registration(r#"{"b": null}"#, "{}")),
            (
                "sub",
                registration("{}", r#"{"a": null, "b": null}"#),
            ),
            ("pub_a", ack()),
            ("pub_b", ack()),
            ("sub", ack()),
            ("pub_a", result_with_data("a", "addr", None)),
            ("pub_b", result_with_data("b", "addr", None)),
            ("sub", result()),
            ("pub_a", ack()),
            ("pub_b", ack()),
            ("sub", ack()),
        ],
    );

    // the subscriber sees exactly one update call carrying everything
    let calls: Vec<_> = sent
        .iter()
        .filter(|(target, message)| {
            target == "sub"
                && matches!(message, Message::Update(_) | Message::UpdateSeries(_))
        })
        .collect();
    assert_eq!(calls.len(), 1);
    match &calls[0].1 {
        Message::UpdateSeries(series) => assert_eq!(series.updates.len(), 3),
        other => panic!("expected a series, got {other:?}"),
    }
}
