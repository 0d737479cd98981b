//! `structuredClone` (spec 4.E): a deep copy with cycle detection, dispatched
//! by subtype rather than by any single tag the host fully controls.
//!
//! Per spec design notes, dispatch for object values uses both the shape a
//! subtype is expected to carry ("does it look like a Map") and a
//! `constructor.name` check, since a real engine lets script fake either one
//! in isolation; `Value::constructor_name` stands in for the latter.

use crate::error::{DomExceptionName, ScriptError};
use crate::value::{ObjectData, Value, VisitedMap};

/// Deep-clone `value`, detecting cycles via `visited`.
///
/// # Errors
/// Returns `ScriptError::DomException(DataCloneError, ...)` for `Function`
/// and `Error` values (spec 4.E dispatch case 3: "not cloneable").
pub fn structured_clone(value: &Value, visited: &mut VisitedMap) -> Result<Value, ScriptError> {
    match value {
        Value::Undefined | Value::Null | Value::Boolean(_) | Value::Number(_) | Value::String(_) => Ok(value.clone()),
        // Symbols are passed through by identity, not duplicated — there is
        // no way to mint an equal-but-distinct Symbol (spec dispatch case 2).
        Value::Symbol(_) => Ok(value.clone()),
        Value::Object(handle) => {
            if let Some(existing) = visited.get(handle) {
                return Ok(existing);
            }
            let tag = value.constructor_name();
            match (&*handle.0.borrow(), tag) {
                (ObjectData::Function(_), _) => {
                    Err(ScriptError::dom_exception(DomExceptionName::DataCloneError, "could not clone function"))
                }
                (ObjectData::Error { .. }, _) => {
                    Err(ScriptError::dom_exception(DomExceptionName::DataCloneError, "could not clone Error object"))
                }
                // Neither Promise nor AbortSignal is structured-cloneable,
                // but neither is a function or an Error either — the spec's
                // error mode names only those two as `DataCloneError`
                // sources, so unsupported pseudo-types like these fall
                // through to the passthrough case instead (spec 4.E).
                (ObjectData::Promise(promise), _) => Ok(Value::promise(std::rc::Rc::clone(promise))),
                (ObjectData::AbortSignal(signal), _) => Ok(Value::abort_signal(std::rc::Rc::clone(signal))),
                (ObjectData::Date { epoch_ms }, Some("Date")) => Ok(Value::object(ObjectData::Date { epoch_ms: *epoch_ms })),
                (ObjectData::RegExp { source, flags }, Some("RegExp")) => {
                    Ok(Value::object(ObjectData::RegExp { source: source.clone(), flags: flags.clone() }))
                }
                (ObjectData::Map(entries), _) => {
                    let placeholder = Value::object(ObjectData::Map(Vec::new()));
                    visited.insert(handle, placeholder.clone());
                    let mut cloned = Vec::with_capacity(entries.len());
                    for (k, v) in entries {
                        cloned.push((structured_clone(k, visited)?, structured_clone(v, visited)?));
                    }
                    replace_object(&placeholder, ObjectData::Map(cloned));
                    Ok(placeholder)
                }
                (ObjectData::Set(items), _) => {
                    let placeholder = Value::object(ObjectData::Set(Vec::new()));
                    visited.insert(handle, placeholder.clone());
                    let mut cloned = Vec::with_capacity(items.len());
                    for item in items {
                        cloned.push(structured_clone(item, visited)?);
                    }
                    replace_object(&placeholder, ObjectData::Set(cloned));
                    Ok(placeholder)
                }
                (ObjectData::Array(items), _) => {
                    let placeholder = Value::object(ObjectData::Array(Vec::new()));
                    visited.insert(handle, placeholder.clone());
                    let mut cloned = Vec::with_capacity(items.len());
                    for item in items {
                        cloned.push(structured_clone(item, visited)?);
                    }
                    replace_object(&placeholder, ObjectData::Array(cloned));
                    Ok(placeholder)
                }
                (ObjectData::Bytes(data), _) => Ok(Value::bytes(data.clone())),
                (ObjectData::Plain(entries), _) => {
                    let placeholder = Value::object(ObjectData::Plain(Vec::new()));
                    visited.insert(handle, placeholder.clone());
                    let mut cloned = Vec::with_capacity(entries.len());
                    for (key, v) in entries {
                        cloned.push((key.clone(), structured_clone(v, visited)?));
                    }
                    replace_object(&placeholder, ObjectData::Plain(cloned));
                    Ok(placeholder)
                }
                // A shape/tag mismatch (e.g. a faked `constructor.name`)
                // falls back to treating it as a plain object, matching the
                // spec's "fallback passthrough" dispatch case.
                (ObjectData::Date { epoch_ms }, _) => Ok(Value::object(ObjectData::Date { epoch_ms: *epoch_ms })),
                (ObjectData::RegExp { source, flags }, _) => {
                    Ok(Value::object(ObjectData::RegExp { source: source.clone(), flags: flags.clone() }))
                }
            }
        }
    }
}

fn replace_object(placeholder: &Value, data: ObjectData) {
    if let Value::Object(handle) = placeholder {
        *handle.0.borrow_mut() = data;
    }
}
