//! Timer Bridge (spec 4.C): `setTimeout`/`setInterval`/`setImmediate`,
//! their `clear*` counterparts, `queueMicrotask`, and `process.nextTick`
//! (aliased onto the same microtask queue — see `SPEC_FULL.md`'s recorded
//! Open Question decision and the design notes' "two-class scheduling"
//! remark). Every function here is a thin `Value::function` wrapper around
//! `EventLoop`, so scheduling decisions live in exactly one place
//! (`event_loop.rs`).

use std::rc::Rc;

use crate::error::{DomExceptionName, ScriptError};
use crate::event_loop::{EventLoop, LoopState, TimerHandle};
use crate::value::{CallArgs, Value};

fn loop_terminated() -> Value {
    ScriptError::dom_exception(DomExceptionName::InvalidStateError, "event loop has terminated").into_value()
}

/// Extract `(callback, delay_ms, extra_args)` from a `setTimeout`-shaped
/// call. Extra arguments past the delay are forwarded to the callback when
/// it fires, matching the WHATWG timer spec.
fn split_args(args: &CallArgs) -> Result<(Rc<crate::value::HostCallable>, f64, Vec<Value>), Value> {
    let callback = args
        .arg(0)
        .as_object()
        .and_then(|handle| match &*handle.0.borrow() {
            crate::value::ObjectData::Function(f) => Some(Rc::clone(f)),
            _ => None,
        })
        .ok_or_else(|| ScriptError::type_error("callback is not a function").into_value())?;
    // Coercion to number happens here (spec 4.C: "non-numeric delays coerce
    // to number"); the separate NaN/negative-clamps-to-0 rule is
    // `event_loop::clamp_delay`'s job, keeping that decision in the one
    // place scheduling logic lives.
    let delay_ms = args.arg(1).to_number();
    let extra = if args.args.len() > 2 { args.args[2..].to_vec() } else { Vec::new() };
    Ok((callback, delay_ms, extra))
}

fn handle_to_value(handle: Option<TimerHandle>) -> Result<Value, Value> {
    match handle {
        Some(h) => Ok(Value::Number(h.0 as f64)),
        None => Err(loop_terminated()),
    }
}

/// `setTimeout(callback, delay, ...args)`.
#[must_use]
pub fn set_timeout(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        let (callback, delay_ms, extra) = split_args(&args)?;
        let handle = event_loop.schedule_timeout(
            delay_ms,
            Box::new(move || {
                let _ = callback(CallArgs::new(extra.clone()));
            }),
        );
        handle_to_value(handle)
    })
}

/// `setInterval(callback, delay, ...args)`.
#[must_use]
pub fn set_interval(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        let (callback, delay_ms, extra) = split_args(&args)?;
        let handle = event_loop.schedule_interval(
            delay_ms,
            Box::new(move || {
                let _ = callback(CallArgs::new(extra.clone()));
            }),
        );
        handle_to_value(handle)
    })
}

/// `setImmediate(callback, ...args)`.
#[must_use]
pub fn set_immediate(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        let callback = args
            .arg(0)
            .as_object()
            .and_then(|handle| match &*handle.0.borrow() {
                crate::value::ObjectData::Function(f) => Some(Rc::clone(f)),
                _ => None,
            })
            .ok_or_else(|| ScriptError::type_error("callback is not a function").into_value())?;
        let extra = if args.args.len() > 1 { args.args[1..].to_vec() } else { Vec::new() };
        let handle = event_loop.schedule_immediate(Box::new(move || {
            let _ = callback(CallArgs::new(extra.clone()));
        }));
        handle_to_value(handle)
    })
}

fn clear_fn(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        if let Some(id) = args.arg(0).as_number() {
            event_loop.clear_timer(TimerHandle(id as u64));
        }
        Ok(Value::Undefined)
    })
}

#[must_use]
pub fn clear_timeout(event_loop: Rc<dyn EventLoop>) -> Value {
    clear_fn(event_loop)
}

#[must_use]
pub fn clear_interval(event_loop: Rc<dyn EventLoop>) -> Value {
    clear_fn(event_loop)
}

#[must_use]
pub fn clear_immediate(event_loop: Rc<dyn EventLoop>) -> Value {
    clear_fn(event_loop)
}

/// `queueMicrotask(callback)` and `process.nextTick(callback, ...args)`
/// share this implementation (spec's explicit simplification collapsing
/// both onto one queue).
#[must_use]
pub fn queue_microtask(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        if event_loop.state() == LoopState::Terminated {
            return Err(loop_terminated());
        }
        let callback = args
            .arg(0)
            .as_object()
            .and_then(|handle| match &*handle.0.borrow() {
                crate::value::ObjectData::Function(f) => Some(Rc::clone(f)),
                _ => None,
            })
            .ok_or_else(|| ScriptError::type_error("callback is not a function").into_value())?;
        let extra = if args.args.len() > 1 { args.args[1..].to_vec() } else { Vec::new() };
        event_loop.queue_microtask(Box::new(move || {
            let _ = callback(CallArgs::new(extra.clone()));
        }));
        Ok(Value::Undefined)
    })
}

/// `delay(ms)`: a host convenience returning a promise that resolves after
/// `ms` (spec section 6 lists it among stable script-visible globals).
#[must_use]
pub fn delay(event_loop: Rc<dyn EventLoop>) -> Value {
    Value::function(move |args: CallArgs| {
        let ms = args.arg(0).to_number();
        let promise = crate::promise::ChainedPromise::pending(Rc::clone(&event_loop));
        let target = Rc::clone(&promise);
        let scheduled = event_loop.schedule_timeout(
            ms,
            Box::new(move || {
                crate::promise::resolve_value(&target, Value::Undefined);
            }),
        );
        if scheduled.is_none() {
            return Err(loop_terminated());
        }
        Ok(Value::promise(promise))
    })
}
