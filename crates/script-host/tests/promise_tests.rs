#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Promise core behavior (spec 8, properties 1-4), driven directly through
//! `script_host::promise` rather than through a fake engine — the same
//! style the teacher uses for its bindings tests (direct closure calls, no
//! engine needed).

use std::rc::Rc;

use script_host::event_loop::{CooperativeEventLoop, EventLoop};
use script_host::promise::{self, ChainedPromise, PromiseState};
use script_host::value::{CallArgs, Value};

fn new_loop() -> (Rc<CooperativeEventLoop>, Rc<dyn EventLoop>) {
    let concrete = Rc::new(CooperativeEventLoop::new());
    let as_trait: Rc<dyn EventLoop> = concrete.clone();
    (concrete, as_trait)
}

fn settled_value(promise: &Rc<std::cell::RefCell<ChainedPromise>>) -> Option<Result<Value, Value>> {
    match &promise.borrow().state() {
        PromiseState::Pending => None,
        PromiseState::Fulfilled(v) => Some(Ok(v.clone())),
        PromiseState::Rejected(v) => Some(Err(v.clone())),
    }
}

fn as_number(value: &Value) -> f64 {
    value.as_number().unwrap_or(f64::NAN)
}

#[test]
fn resolve_with_plain_value_fulfills_immediately_after_drain() {
    let (concrete, event_loop) = new_loop();
    let promise = promise::static_resolve(event_loop, Value::Number(42.0));
    concrete.run_microtasks();
    match settled_value(&promise) {
        Some(Ok(v)) => assert_eq!(as_number(&v), 42.0),
        other => panic!("expected fulfilled(42), got is_some={}", other.is_some()),
    }
}

#[test]
fn then_chain_composes_left_to_right() {
    let (concrete, event_loop) = new_loop();
    let root = promise::static_resolve(event_loop, Value::Number(1.0));
    let doubled = promise::then(
        &root,
        Some(Rc::new(|args: CallArgs| Ok(Value::Number(as_number(&args.arg(0)) * 2.0)))),
        None,
    );
    let plus_one = promise::then(
        &doubled,
        Some(Rc::new(|args: CallArgs| Ok(Value::Number(as_number(&args.arg(0)) + 1.0)))),
        None,
    );
    concrete.tick();
    match settled_value(&plus_one) {
        Some(Ok(v)) => assert_eq!(as_number(&v), 3.0),
        other => panic!("unexpected settlement, is_some={}", other.is_some()),
    }
}

#[test]
fn finally_preserves_fulfillment_value() {
    let (concrete, event_loop) = new_loop();
    let root = promise::static_resolve(event_loop, Value::string("payload"));
    let ran = Rc::new(std::cell::Cell::new(false));
    let ran_clone = Rc::clone(&ran);
    let derived = promise::finally(
        &root,
        Rc::new(move |_| {
            ran_clone.set(true);
            Ok(Value::Number(999.0))
        }),
    );
    concrete.tick();
    assert!(ran.get());
    match settled_value(&derived) {
        Some(Ok(Value::String(s))) => assert_eq!(&*s, "payload"),
        _ => panic!("finally must preserve the original value"),
    }
}

#[test]
fn promise_all_of_empty_iterable_fulfills_with_empty_array() {
    let (concrete, event_loop) = new_loop();
    let result = promise::static_all(event_loop, &Value::array(vec![])).expect("drains fine");
    concrete.tick();
    match settled_value(&result) {
        Some(Ok(Value::Object(handle))) => match &*handle.0.borrow() {
            script_host::value::ObjectData::Array(items) => assert!(items.is_empty()),
            _ => panic!("expected array"),
        },
        _ => panic!("Promise.all([]) must fulfill"),
    }
}

#[test]
fn promise_race_of_empty_iterable_never_settles() {
    let (concrete, event_loop) = new_loop();
    let result = promise::static_race(event_loop, &Value::array(vec![])).expect("drains fine");
    concrete.tick();
    assert!(settled_value(&result).is_none());
}

#[test]
fn promise_any_of_empty_iterable_rejects_with_empty_aggregate_error() {
    let (concrete, event_loop) = new_loop();
    let result = promise::static_any(event_loop, &Value::array(vec![])).expect("drains fine");
    concrete.tick();
    match settled_value(&result) {
        Some(Err(Value::Object(handle))) => match &*handle.0.borrow() {
            script_host::value::ObjectData::Plain(entries) => {
                let errors = entries.iter().find(|(k, _)| k == "errors").map(|(_, v)| v.clone());
                match errors {
                    Some(Value::Object(h)) => match &*h.0.borrow() {
                        script_host::value::ObjectData::Array(items) => assert!(items.is_empty()),
                        _ => panic!("expected errors array"),
                    },
                    _ => panic!("expected errors array"),
                }
            }
            _ => panic!("expected AggregateError-shaped object"),
        },
        _ => panic!("Promise.any([]) must reject"),
    }
}

#[test]
fn promise_any_rejects_only_when_all_inputs_reject() {
    let (concrete, event_loop) = new_loop();
    let a = promise::static_reject(event_loop.clone(), Value::string("a"));
    let b = promise::static_reject(event_loop.clone(), Value::string("b"));
    let iterable = Value::array(vec![Value::promise(a), Value::promise(b)]);
    let result = promise::static_any(event_loop, &iterable).expect("drains fine");
    concrete.tick();
    assert!(settled_value(&result).is_some_and(|outcome| outcome.is_err()));
}
