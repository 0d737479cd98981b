#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `AbortController`/`AbortSignal` behavior: monotonic abort state,
//! `AbortSignal.any` composition, and at-most-once `"abort"` dispatch.

use std::cell::Cell;
use std::rc::Rc;

use script_host::abort::{self, AbortController};
use script_host::value::CallArgs;
use script_host::Value;

#[test]
fn abort_sets_aborted_and_reason() {
    let controller = AbortController::new();
    let signal = controller.signal();
    assert!(!signal.aborted());

    controller.abort(Some(Value::string("stop")));

    assert!(signal.aborted());
    assert_eq!(signal.reason().as_str(), Some("stop"));
}

#[test]
fn abort_without_reason_uses_default_abort_error() {
    let controller = AbortController::new();
    let signal = controller.signal();
    controller.abort(None);
    assert!(signal.aborted());
    assert!(signal.reason().as_object().is_some());
}

#[test]
fn second_abort_call_is_a_no_op() {
    let controller = AbortController::new();
    let signal = controller.signal();
    controller.abort(Some(Value::string("first")));
    controller.abort(Some(Value::string("second")));
    assert_eq!(signal.reason().as_str(), Some("first"));
}

#[test]
fn any_of_an_already_aborted_signal_is_already_aborted() {
    let controller = AbortController::new();
    controller.abort(Some(Value::string("already gone")));
    let combined = abort::any(&[controller.signal()]);
    assert!(combined.aborted());
    assert_eq!(combined.reason().as_str(), Some("already gone"));
}

#[test]
fn any_aborts_when_one_of_several_inputs_aborts() {
    let a = AbortController::new();
    let b = AbortController::new();
    let combined = abort::any(&[a.signal(), b.signal()]);
    assert!(!combined.aborted());

    b.abort(Some(Value::string("b went first")));

    assert!(combined.aborted());
    assert_eq!(combined.reason().as_str(), Some("b went first"));
}

#[test]
fn abort_event_fires_at_most_once() {
    let controller = AbortController::new();
    let signal = controller.signal();
    let fire_count = Rc::new(Cell::new(0));
    let fire_count_clone = Rc::clone(&fire_count);
    signal.add_event_listener(
        "abort",
        Rc::new(move |_: CallArgs| {
            fire_count_clone.set(fire_count_clone.get() + 1);
            Ok(Value::Undefined)
        }),
        false,
    );

    controller.abort(Some(Value::string("once")));
    controller.abort(Some(Value::string("twice?")));

    assert_eq!(fire_count.get(), 1);
}

#[test]
fn once_listener_is_removed_after_firing() {
    let controller = AbortController::new();
    let signal = controller.signal();
    let fire_count = Rc::new(Cell::new(0));
    let fire_count_clone = Rc::clone(&fire_count);
    signal.add_event_listener(
        "abort",
        Rc::new(move |_: CallArgs| {
            fire_count_clone.set(fire_count_clone.get() + 1);
            Ok(Value::Undefined)
        }),
        true,
    );

    controller.abort(Some(Value::string("reason")));
    assert_eq!(fire_count.get(), 1);
}
