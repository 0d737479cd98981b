#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Timer ordering guarantees (equal-due-time FIFO, microtask drain between
//! macrotasks) and the `setTimeout`/`clearTimeout` script-facing bridge.

use std::cell::RefCell;
use std::rc::Rc;

use script_host::event_loop::{CooperativeEventLoop, EventLoop, LoopCallback, LoopState, TimerHandle};
use script_host::timers;
use script_host::value::CallArgs;
use script_host::Value;

/// Records the raw `delay_ms` it was asked to schedule with, rather than
/// actually running anything — lets a test see past `CooperativeEventLoop`'s
/// own NaN/negative clamping to the coercion step upstream of it.
#[derive(Default)]
struct RecordingEventLoop {
    last_delay_ms: RefCell<Option<f64>>,
}

impl EventLoop for RecordingEventLoop {
    fn state(&self) -> LoopState {
        LoopState::Awake
    }

    fn schedule_timeout(&self, delay_ms: f64, _callback: LoopCallback) -> Option<TimerHandle> {
        *self.last_delay_ms.borrow_mut() = Some(delay_ms);
        Some(TimerHandle(1))
    }

    fn schedule_interval(&self, delay_ms: f64, _callback: LoopCallback) -> Option<TimerHandle> {
        *self.last_delay_ms.borrow_mut() = Some(delay_ms);
        Some(TimerHandle(1))
    }

    fn schedule_immediate(&self, _callback: LoopCallback) -> Option<TimerHandle> {
        Some(TimerHandle(1))
    }

    fn clear_timer(&self, _handle: TimerHandle) {}

    fn queue_microtask(&self, _callback: Box<dyn FnOnce()>) {}
}

#[test]
fn timers_due_at_the_same_time_fire_in_scheduling_order() {
    let event_loop = CooperativeEventLoop::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    for id in 0..3 {
        let order = Rc::clone(&order);
        event_loop.schedule_timeout(0.0, Box::new(move || order.borrow_mut().push(id)));
    }

    event_loop.run_due_timers();
    assert_eq!(*order.borrow(), vec![0, 1, 2]);
}

#[test]
fn queue_microtask_runs_before_next_timer() {
    let event_loop = Rc::new(CooperativeEventLoop::new());
    let order = Rc::new(RefCell::new(Vec::new()));
    let as_trait: Rc<dyn EventLoop> = Rc::clone(&event_loop) as Rc<dyn EventLoop>;

    let order1 = Rc::clone(&order);
    let as_trait1 = Rc::clone(&as_trait);
    event_loop.schedule_timeout(
        0.0,
        Box::new(move || {
            order1.borrow_mut().push("timer-a");
            let order1b = Rc::clone(&order1);
            as_trait1.queue_microtask(Box::new(move || order1b.borrow_mut().push("microtask")));
        }),
    );
    let order2 = Rc::clone(&order);
    event_loop.schedule_timeout(0.0, Box::new(move || order2.borrow_mut().push("timer-b")));

    event_loop.run_due_timers();
    assert_eq!(*order.borrow(), vec!["timer-a", "microtask", "timer-b"]);
}

#[test]
fn set_timeout_coerces_a_numeric_string_delay_instead_of_defaulting_to_zero() {
    let event_loop = Rc::new(RecordingEventLoop::default());
    let as_trait: Rc<dyn EventLoop> = Rc::clone(&event_loop) as Rc<dyn EventLoop>;
    let set_timeout_fn = timers::set_timeout(as_trait);
    let callback = Value::function(|_: CallArgs| Ok(Value::Undefined));

    if let script_host::value::ObjectData::Function(f) = &*set_timeout_fn.as_object().unwrap().0.borrow() {
        f(CallArgs::new(vec![callback, Value::string("10")])).expect("setTimeout never throws on a valid delay");
    }

    assert_eq!(*event_loop.last_delay_ms.borrow(), Some(10.0));
}

#[test]
fn clear_timeout_prevents_a_pending_callback_from_firing() {
    let event_loop = Rc::new(CooperativeEventLoop::new());
    let as_trait: Rc<dyn EventLoop> = Rc::clone(&event_loop) as Rc<dyn EventLoop>;
    let fired = Rc::new(RefCell::new(false));

    let set_timeout_fn = timers::set_timeout(Rc::clone(&as_trait));
    let clear_timeout_fn = timers::clear_timeout(as_trait);

    let fired_clone = Rc::clone(&fired);
    let callback = Value::function(move |_: CallArgs| {
        *fired_clone.borrow_mut() = true;
        Ok(Value::Undefined)
    });

    let handle = set_timeout_fn
        .as_object()
        .and_then(|h| match &*h.0.borrow() {
            script_host::value::ObjectData::Function(f) => {
                f(CallArgs::new(vec![callback, Value::Number(10.0)])).ok()
            }
            _ => None,
        })
        .expect("setTimeout returns a handle");

    if let script_host::value::ObjectData::Function(f) = &*clear_timeout_fn.as_object().unwrap().0.borrow() {
        f(CallArgs::new(vec![handle])).expect("clearTimeout never throws");
    }

    event_loop.run_due_timers();
    assert!(!*fired.borrow(), "a cleared timeout must not fire");
}
