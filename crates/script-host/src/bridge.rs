//! Value Bridge (spec 4.A): converts host-native Rust data into script
//! `Value`s. This is the seam a host uses to hand a plain Rust result (say,
//! the outcome of some external Go/Rust computation) to script without
//! writing bespoke `Value` construction at every call site.

use crate::value::{ObjectData, Value};

/// The key an error-shaped host value carries its original engine-side
/// payload under, so errors raised from a host continuation round-trip
/// back to script unchanged instead of being re-wrapped (spec 4.A).
pub const ORIGINAL_ERROR_KEY: &str = "_originalError";

/// A host-native value headed for script. `Map`/`Slice` recurse shallowly —
/// each element converts independently, with no attempt to detect shared
/// references or cycles (those only matter for `Value`s already living in
/// the engine, which `structuredClone` handles separately).
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Slice(Vec<HostValue>),
    Map(Vec<(String, HostValue)>),
    /// A host value already carrying an engine-side `Value` under
    /// `_originalError` — unwrapped as-is rather than re-converted (spec
    /// 4.A's round-trip special case).
    OriginalError(Value),
}

/// Convert a `HostValue` into a script-visible `Value`.
#[must_use]
pub fn to_engine_value(value: HostValue) -> Value {
    match value {
        HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Boolean(b),
        HostValue::Int(i) => Value::Number(i as f64),
        HostValue::Float(f) => Value::Number(f),
        HostValue::Str(s) => Value::string(s),
        HostValue::Slice(items) => Value::array(items.into_iter().map(to_engine_value).collect()),
        HostValue::Map(entries) => Value::plain(entries.into_iter().map(|(k, v)| (k, to_engine_value(v))).collect()),
        HostValue::OriginalError(original) => original,
    }
}

/// If `value` is a plain object carrying `_originalError`, unwrap and return
/// that payload; otherwise `None`. The inverse of `HostValue::OriginalError`
/// round-tripping, used when a host continuation needs to recover an error
/// it previously handed to script.
#[must_use]
pub fn unwrap_original_error(value: &Value) -> Option<Value> {
    let handle = value.as_object()?;
    match &*handle.0.borrow() {
        ObjectData::Plain(entries) => entries.iter().find(|(k, _)| k == ORIGINAL_ERROR_KEY).map(|(_, v)| v.clone()),
        _ => None,
    }
}

/// Export a `Value` back to a host-native `HashMap`-ish shape, "by copy"
/// per spec 4.A's inverse-direction note: identity is not preserved, and
/// functions/promises/symbols have no host-native representation so they
/// export as `Null`.
#[must_use]
pub fn export_for_storage(value: &Value) -> HostValue {
    match value {
        Value::Undefined | Value::Null => HostValue::Null,
        Value::Boolean(b) => HostValue::Bool(*b),
        Value::Number(n) => HostValue::Float(*n),
        Value::String(s) => HostValue::Str(s.to_string()),
        Value::Symbol(_) => HostValue::Null,
        Value::Object(handle) => match &*handle.0.borrow() {
            ObjectData::Array(items) => HostValue::Slice(items.iter().map(export_for_storage).collect()),
            ObjectData::Plain(entries) => {
                HostValue::Map(entries.iter().map(|(k, v)| (k.clone(), export_for_storage(v))).collect())
            }
            ObjectData::Map(entries) => HostValue::Map(
                entries
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|key| (key.to_owned(), export_for_storage(v))))
                    .collect(),
            ),
            ObjectData::Set(items) => HostValue::Slice(items.iter().map(export_for_storage).collect()),
            ObjectData::Date { epoch_ms } => HostValue::Float(*epoch_ms),
            ObjectData::Bytes(bytes) => {
                HostValue::Slice(bytes.iter().map(|b| HostValue::Int(i64::from(*b))).collect())
            }
            ObjectData::RegExp { source, .. } => HostValue::Str(source.clone()),
            ObjectData::Error { name, message } => {
                HostValue::Map(vec![("name".to_owned(), HostValue::Str(name.clone())), ("message".to_owned(), HostValue::Str(message.clone()))])
            }
            ObjectData::Function(_) | ObjectData::Promise(_) | ObjectData::AbortSignal(_) => HostValue::Null,
        },
    }
}

