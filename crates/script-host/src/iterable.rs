//! Iterable draining and thenable detection (spec 4.B).
//!
//! The real engine owns the iterator protocol (`Symbol.iterator`, generator
//! machinery, ...); this crate only needs a way to turn "whatever the script
//! handed us" into a host-side `Vec<Value>` or detect a thenable. Since
//! `Value` doesn't model symbol-keyed properties, the well-known iterator
//! method is reached for under the literal property name `"@@iterator"` —
//! an engine adapter is expected to install that alias when bridging a real
//! `Symbol.iterator` lookup into a `Value::Object` (see `script-host-v8`'s
//! conversions).

use crate::error::ScriptError;
use crate::event_loop::EventLoop;
use crate::promise::{reject_value, resolve_value, ChainedPromise};
use crate::value::{CallArgs, ObjectData, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn get_property_fn(value: &Value, name: &str) -> Option<Rc<crate::value::HostCallable>> {
    let handle = value.as_object()?;
    let entries = match &*handle.0.borrow() {
        ObjectData::Plain(entries) => entries.clone(),
        _ => return None,
    };
    entries.into_iter().find(|(key, _)| key == name).and_then(|(_, v)| match v {
        Value::Object(inner) => match &*inner.0.borrow() {
            ObjectData::Function(f) => Some(Rc::clone(f)),
            _ => None,
        },
        _ => None,
    })
}

fn plain_entry(value: &Value, name: &str) -> Option<Value> {
    let handle = value.as_object()?;
    match &*handle.0.borrow() {
        ObjectData::Plain(entries) => entries.iter().find(|(key, _)| key == name).map(|(_, v)| v.clone()),
        _ => None,
    }
}

/// Drain an iterable `Value` into a host-side `Vec`.
///
/// # Errors
/// Returns `ScriptError::TypeError` when there is no iterator protocol, the
/// iterator's `next` is not callable, `next` throws, or a yielded result is
/// not a `{value, done}` object (spec 4.B). The iterator is never closed
/// early — callers are expected to drain to completion, matching the spec's
/// stated non-goal of early-return cleanup.
pub fn drain_iterable(value: &Value) -> Result<Vec<Value>, ScriptError> {
    if let Value::Object(handle) = value {
        if let ObjectData::Array(items) = &*handle.0.borrow() {
            return Ok(items.clone());
        }
    }

    let iterator_fn = get_property_fn(value, "@@iterator")
        .ok_or_else(|| ScriptError::type_error("value is not iterable"))?;
    let iterator = iterator_fn(CallArgs::new(vec![]))
        .map_err(|_| ScriptError::type_error("value is not iterable"))?;
    let next_fn =
        get_property_fn(&iterator, "next").ok_or_else(|| ScriptError::type_error("iterator.next is not a function"))?;

    let mut out = Vec::new();
    loop {
        let result = next_fn(CallArgs { this: iterator.clone(), args: vec![] })
            .map_err(|_| ScriptError::type_error("iterator threw while draining"))?;
        if !matches!(result, Value::Object(_)) {
            return Err(ScriptError::type_error("iterator result is not an object"));
        }
        let done = matches!(plain_entry(&result, "done"), Some(Value::Boolean(true)));
        if done {
            break;
        }
        out.push(plain_entry(&result, "value").unwrap_or(Value::Undefined));
    }
    Ok(out)
}

/// If `value` is a thenable (or an existing `ChainedPromise`), return a
/// `ChainedPromise` tracking its eventual settlement. Returns `None` for
/// anything else, signaling "use the value as-is" (spec 4.B).
pub fn await_thenable(
    event_loop: &Rc<dyn EventLoop>,
    value: &Value,
) -> Option<Rc<RefCell<ChainedPromise>>> {
    if let Some(existing) = value.as_promise() {
        return Some(existing);
    }
    let then_fn = value.then_callable()?;

    let promise = ChainedPromise::pending(Rc::clone(event_loop));
    let target_ok = Rc::clone(&promise);
    let target_err = Rc::clone(&promise);
    let resolve_fn = Value::function(move |args: CallArgs| {
        resolve_value(&target_ok, args.arg(0));
        Ok(Value::Undefined)
    });
    let reject_fn = Value::function(move |args: CallArgs| {
        reject_value(&target_err, args.arg(0));
        Ok(Value::Undefined)
    });
    let call = CallArgs { this: value.clone(), args: vec![resolve_fn, reject_fn] };
    if let Err(thrown) = (then_fn)(call) {
        reject_value(&promise, thrown);
    }
    Some(promise)
}
