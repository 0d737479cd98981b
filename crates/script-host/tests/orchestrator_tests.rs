#![allow(clippy::unwrap_used, clippy::expect_used)]
//! `Adapter` assembly: construction options (clock origin, initial console
//! state) and the unhandled-rejection reporting hook spec section 7 invites
//! without mandating.

use std::cell::RefCell;
use std::rc::Rc;

use script_host::value::CallArgs;
use script_host::{Adapter, AdapterOptions, CooperativeEventLoop, EventLoop, Value};

fn event_loop() -> Rc<dyn EventLoop> {
    Rc::new(CooperativeEventLoop::new()) as Rc<dyn EventLoop>
}

#[test]
fn with_options_applies_clock_origin_and_console_state() {
    let adapter = Rc::new(Adapter::with_options(
        event_loop(),
        AdapterOptions { clock_origin_ms: 1_000.0, console_enabled: false },
    ));
    assert!(!adapter.console_enabled());
    let globals = adapter.bind(None, None);
    let performance = globals.iter().find(|(name, _)| name == "performance").expect("performance installed");
    let time_origin = match &performance.1 {
        Value::Object(handle) => match &*handle.0.borrow() {
            script_host::ObjectData::Plain(entries) => entries
                .iter()
                .find(|(k, _)| k == "timeOrigin")
                .and_then(|(_, v)| v.as_number())
                .expect("timeOrigin present"),
            _ => panic!("performance must be a plain object"),
        },
        _ => panic!("performance must be an object"),
    };
    assert_eq!(time_origin, 1_000.0);
}

#[test]
fn default_adapter_has_console_enabled_and_zero_origin() {
    let adapter = Adapter::new(event_loop());
    assert!(adapter.console_enabled());
}

#[test]
fn unhandled_rejection_hook_receives_the_rejection_reason() {
    let adapter = Adapter::new(event_loop());
    let seen = Rc::new(RefCell::new(None));
    let seen_clone = Rc::clone(&seen);
    adapter.on_unhandled_rejection(Some(Rc::new(move |args: CallArgs| {
        *seen_clone.borrow_mut() = Some(args.arg(0));
        Ok(Value::Undefined)
    })));

    adapter.report_unhandled_rejection(&Value::string("boom"));

    assert_eq!(seen.borrow().as_ref().and_then(Value::as_str), Some("boom"));
}

#[test]
fn clearing_the_hook_stops_further_reports() {
    let adapter = Adapter::new(event_loop());
    let calls = Rc::new(RefCell::new(0));
    let calls_clone = Rc::clone(&calls);
    adapter.on_unhandled_rejection(Some(Rc::new(move |_| {
        *calls_clone.borrow_mut() += 1;
        Ok(Value::Undefined)
    })));
    adapter.on_unhandled_rejection(None);

    adapter.report_unhandled_rejection(&Value::string("ignored"));

    assert_eq!(*calls.borrow(), 0);
}
