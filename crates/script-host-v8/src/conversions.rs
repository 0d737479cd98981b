//! Bidirectional conversion between `script_host::Value` and V8's
//! `Local<Value>` handles, generalizing the teacher's `jsvalue_to_local` /
//! `collect_js_args` (`crates/js/js_engine_v8/src/conversions.rs`) from four
//! primitive cases to the full `ObjectData` surface this crate's value model
//! carries.
//!
//! A function value crossing from script into the host (e.g. the callback
//! argument to `setTimeout`) needs to be callable later, off any V8 scope —
//! from a timer firing during `EventLoop::tick`. `ScriptCallback` captures a
//! raw isolate pointer for that re-entry, using the same
//! `enter()`/`exit()` idiom `V8HostEngine` itself uses for every script
//! evaluation (`engine.rs`); the caller must keep the owning engine alive
//! for as long as any such callback might still fire.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use script_host::promise::ChainedPromise;
use script_host::value::{CallArgs, HostCallable, ObjectData, Value};
use script_host::AbortSignal;
use v8::{
    Array, Boolean, Context, External, Function, FunctionCallbackArguments, Global, Isolate,
    Local, Map as V8Map, Number, Object, PinScope, ReturnValue, Set as V8Set, String as V8String,
    Value as V8Value,
};

/// Conversion-time context threaded through every `value_to_local` /
/// `local_to_value` call: the isolate/context a bridged function needs to
/// call back into, and the registry backing `AbortSignal` identity
/// round-trips (spec 4.F's `AbortSignal.any` needs the real `Rc<AbortSignal>`
/// back, not a lossy snapshot, once a signal has crossed into script and
/// back).
pub(crate) struct ConversionState {
    isolate: *mut Isolate,
    context: Global<Context>,
    signals: RefCell<HashMap<u64, Rc<AbortSignal>>>,
    next_signal_id: RefCell<u64>,
    /// Backs the same round-trip for `Promise`'s `__promiseId` as `signals`
    /// does for `AbortSignal`'s `__signalId`: `promise_to_local` registers its
    /// `ChainedPromise` here so `plain_object_to_value` can recover the exact
    /// `Rc` identity when the wrapper object crosses back as a `this` receiver
    /// (spec 4.D's method-theft guard needs that identity, not a fresh clone).
    promises: RefCell<HashMap<u64, Rc<RefCell<ChainedPromise>>>>,
    next_promise_id: RefCell<u64>,
}

impl ConversionState {
    pub(crate) fn new(isolate: *mut Isolate, context: Global<Context>) -> Self {
        Self {
            isolate,
            context,
            signals: RefCell::new(HashMap::new()),
            next_signal_id: RefCell::new(1),
            promises: RefCell::new(HashMap::new()),
            next_promise_id: RefCell::new(1),
        }
    }

    fn register_signal(&self, signal: &Rc<AbortSignal>) -> u64 {
        let mut signals = self.signals.borrow_mut();
        if let Some((&id, _)) = signals.iter().find(|(_, s)| Rc::ptr_eq(s, signal)) {
            return id;
        }
        let mut next = self.next_signal_id.borrow_mut();
        let id = *next;
        *next += 1;
        signals.insert(id, Rc::clone(signal));
        id
    }

    fn lookup_signal(&self, id: u64) -> Option<Rc<AbortSignal>> {
        self.signals.borrow().get(&id).cloned()
    }

    pub(crate) fn register_promise(&self, promise: &Rc<RefCell<ChainedPromise>>) -> u64 {
        let mut promises = self.promises.borrow_mut();
        if let Some((&id, _)) = promises.iter().find(|(_, p)| Rc::ptr_eq(p, promise)) {
            return id;
        }
        let mut next = self.next_promise_id.borrow_mut();
        let id = *next;
        *next += 1;
        promises.insert(id, Rc::clone(promise));
        id
    }

    fn lookup_promise(&self, id: u64) -> Option<Rc<RefCell<ChainedPromise>>> {
        self.promises.borrow().get(&id).cloned()
    }
}

fn string_key<'s>(scope: &mut PinScope<'s, '_>, key: &str) -> Option<Local<'s, V8String>> {
    V8String::new(scope, key)
}

/// Convert a host `Value` into a V8 handle.
pub(crate) fn value_to_local<'s>(
    scope: &mut PinScope<'s, '_>,
    state: &Rc<ConversionState>,
    value: &Value,
) -> Local<'s, V8Value> {
    match value {
        Value::Undefined => v8::undefined(scope).into(),
        Value::Null => v8::null(scope).into(),
        Value::Boolean(b) => Boolean::new(scope, *b).into(),
        Value::Number(n) => Number::new(scope, *n).into(),
        Value::String(s) => V8String::new(scope, s).map_or_else(|| v8::undefined(scope).into(), Into::into),
        // Symbols have no stable cross-boundary identity in this adapter;
        // scripts never observe one directly (spec 4.E dispatch case 2 only
        // matters for structuredClone, which stays host-side).
        Value::Symbol(_) => v8::undefined(scope).into(),
        Value::Object(handle) => match &*handle.0.borrow() {
            ObjectData::Plain(entries) => {
                let obj = Object::new(scope);
                for (key, val) in entries {
                    if key == "__signal" {
                        if let Some(signal) = val.as_abort_signal() {
                            let id = state.register_signal(&signal);
                            if let Some(key) = string_key(scope, "__signalId") {
                                let id_value = Number::new(scope, id as f64);
                                let _: Option<bool> = obj.set(scope, key.into(), id_value.into());
                            }
                        }
                        continue;
                    }
                    let Some(js_key) = string_key(scope, key) else { continue };
                    let converted = value_to_local(scope, state, val);
                    let _: Option<bool> = obj.set(scope, js_key.into(), converted);
                }
                obj.into()
            }
            ObjectData::Array(items) => {
                let len = i32::try_from(items.len()).unwrap_or(i32::MAX);
                let arr = Array::new(scope, len);
                for (index, item) in items.iter().enumerate() {
                    let converted = value_to_local(scope, state, item);
                    let _ = arr.set_index(scope, index as u32, converted);
                }
                arr.into()
            }
            ObjectData::Map(entries) => {
                let map = V8Map::new(scope);
                for (key, val) in entries {
                    let js_key = value_to_local(scope, state, key);
                    let js_val = value_to_local(scope, state, val);
                    let _ = map.set(scope, js_key, js_val);
                }
                map.into()
            }
            ObjectData::Set(items) => {
                let set = V8Set::new(scope);
                for item in items {
                    let converted = value_to_local(scope, state, item);
                    let _ = set.add(scope, converted);
                }
                set.into()
            }
            ObjectData::Function(f) => crate::bindings::make_function(scope, Rc::clone(f)),
            ObjectData::Bytes(bytes) => bytes_to_typed_array(scope, bytes),
            ObjectData::Date { epoch_ms } => {
                v8::Date::new(scope, *epoch_ms).map_or_else(|| v8::undefined(scope).into(), Into::into)
            }
            ObjectData::RegExp { source, flags } => regexp_to_local(scope, source, flags),
            ObjectData::Error { name, message } => error_to_local(scope, name, message),
            ObjectData::Promise(promise) => crate::bindings::promise_to_local(scope, state, Rc::clone(promise)),
            // Only ever reached if script holds a raw `AbortSignal` value
            // without the orchestrator's plain-object wrapper; the wrapper
            // (built in `script_host::orchestrator`) is what scripts actually
            // see, via the `__signal`/`__signalId` bridge above.
            ObjectData::AbortSignal(_) => v8::undefined(scope).into(),
        },
    }
}

fn bytes_to_typed_array<'s>(scope: &mut PinScope<'s, '_>, bytes: &[u8]) -> Local<'s, V8Value> {
    let store = v8::ArrayBuffer::new_backing_store_from_vec(bytes.to_vec()).make_shared();
    let buffer = v8::ArrayBuffer::with_backing_store(scope, &store);
    v8::Uint8Array::new(scope, buffer, 0, bytes.len()).map_or_else(|| v8::undefined(scope).into(), Into::into)
}

fn regexp_to_local<'s>(scope: &mut PinScope<'s, '_>, source: &str, flags: &str) -> Local<'s, V8Value> {
    let Some(pattern) = V8String::new(scope, source) else { return v8::undefined(scope).into() };
    let mut bits = v8::RegExpCreationFlags::EMPTY;
    for flag in flags.chars() {
        bits |= match flag {
            'g' => v8::RegExpCreationFlags::GLOBAL,
            'i' => v8::RegExpCreationFlags::IGNORE_CASE,
            'm' => v8::RegExpCreationFlags::MULTILINE,
            's' => v8::RegExpCreationFlags::DOT_ALL,
            'u' => v8::RegExpCreationFlags::UNICODE,
            'y' => v8::RegExpCreationFlags::STICKY,
            _ => v8::RegExpCreationFlags::EMPTY,
        };
    }
    v8::RegExp::new(scope, pattern, bits).map_or_else(|| v8::undefined(scope).into(), Into::into)
}

fn error_to_local<'s>(scope: &mut PinScope<'s, '_>, name: &str, message: &str) -> Local<'s, V8Value> {
    let Some(js_message) = V8String::new(scope, message) else { return v8::undefined(scope).into() };
    let exception = match name {
        "TypeError" => v8::Exception::type_error(scope, js_message),
        "RangeError" => v8::Exception::range_error(scope, js_message),
        "SyntaxError" => v8::Exception::syntax_error(scope, js_message),
        _ => v8::Exception::error(scope, js_message),
    };
    exception
}

/// Convert a V8 handle into a host `Value`.
pub(crate) fn local_to_value(scope: &mut PinScope<'_, '_>, state: &Rc<ConversionState>, local: Local<'_, V8Value>) -> Value {
    if local.is_undefined() {
        return Value::Undefined;
    }
    if local.is_null() {
        return Value::Null;
    }
    if local.is_boolean() {
        return Value::Boolean(local.boolean_value(scope));
    }
    if local.is_number() {
        return Value::Number(local.number_value(scope).unwrap_or(f64::NAN));
    }
    if local.is_string() {
        return local
            .to_string(scope)
            .map_or(Value::Undefined, |s| Value::string(s.to_rust_string_lossy(scope)));
    }
    if local.is_array() {
        if let Ok(array) = Local::<Array>::try_from(local) {
            let mut items = Vec::with_capacity(array.length() as usize);
            for index in 0..array.length() {
                if let Some(item) = array.get_index(scope, index) {
                    items.push(local_to_value(scope, state, item));
                }
            }
            return Value::array(items);
        }
    }
    if local.is_map() {
        if let Ok(map) = Local::<V8Map>::try_from(local) {
            let as_array = map.as_array(scope);
            let mut entries = Vec::with_capacity((as_array.length() / 2) as usize);
            let mut index = 0;
            while index + 1 < as_array.length() {
                if let (Some(key), Some(val)) = (as_array.get_index(scope, index), as_array.get_index(scope, index + 1)) {
                    entries.push((local_to_value(scope, state, key), local_to_value(scope, state, val)));
                }
                index += 2;
            }
            return Value::object(ObjectData::Map(entries));
        }
    }
    if local.is_set() {
        if let Ok(set) = Local::<V8Set>::try_from(local) {
            let as_array = set.as_array(scope);
            let mut items = Vec::with_capacity(as_array.length() as usize);
            for index in 0..as_array.length() {
                if let Some(item) = as_array.get_index(scope, index) {
                    items.push(local_to_value(scope, state, item));
                }
            }
            return Value::object(ObjectData::Set(items));
        }
    }
    if local.is_function() {
        if let Ok(function) = Local::<Function>::try_from(local) {
            let global_fn = Global::new(scope, function);
            let context_local = state_context(state, scope);
            let global_context = Global::new(scope, context_local);
            let callback = crate::bindings::ScriptCallback::new(state.isolate, global_context, global_fn);
            return Value::function(move |args: CallArgs| callback.call(args));
        }
    }
    if local.is_uint8_array() {
        if let Ok(view) = Local::<v8::Uint8Array>::try_from(local) {
            let len = view.byte_length();
            let mut bytes = vec![0u8; len];
            let _ = view.copy_contents(&mut bytes);
            return Value::bytes(bytes);
        }
    }
    if local.is_date() {
        // `Date` is a `Value` whose numeric conversion is its epoch-millisecond
        // `[[NumberValue]]` (`valueOf()`), the same coercion `is_number()`
        // above already relies on `number_value` for.
        if let Some(epoch_ms) = local.number_value(scope) {
            return Value::object(ObjectData::Date { epoch_ms });
        }
    }
    if local.is_reg_exp() {
        // `source`/`flags` are ordinary own properties on every `RegExp`
        // instance (spec-guaranteed getters), read the same way any other
        // object property is read rather than via engine-internal accessors.
        if let Ok(object) = Local::<Object>::try_from(local) {
            let source = get_string_property(scope, object, "source").unwrap_or_default();
            let flags = get_string_property(scope, object, "flags").unwrap_or_default();
            return Value::object(ObjectData::RegExp { source, flags });
        }
    }
    if local.is_object() {
        if let Ok(object) = Local::<Object>::try_from(local) {
            return plain_object_to_value(scope, state, object);
        }
    }
    Value::Undefined
}

fn state_context<'s>(state: &Rc<ConversionState>, scope: &mut PinScope<'s, '_>) -> Local<'s, Context> {
    Local::new(scope, &state.context)
}

fn get_string_property(scope: &mut PinScope<'_, '_>, object: Local<Object>, name: &str) -> Option<String> {
    let key = V8String::new(scope, name)?;
    let value = object.get(scope, key.into())?;
    value.to_string(scope).map(|s| s.to_rust_string_lossy(scope))
}

fn plain_object_to_value(scope: &mut PinScope<'_, '_>, state: &Rc<ConversionState>, object: Local<'_, Object>) -> Value {
    let Some(keys) = object.get_own_property_names(scope, v8::GetPropertyNamesArgs::default()) else {
        return Value::plain(Vec::new());
    };
    let mut entries = Vec::with_capacity(keys.length() as usize);
    let mut signal_id = None;
    let mut promise_id = None;
    for index in 0..keys.length() {
        let Some(key) = keys.get_index(scope, index) else { continue };
        let Some(key_str) = key.to_string(scope) else { continue };
        let name = key_str.to_rust_string_lossy(scope);
        let Some(raw_value) = object.get(scope, key) else { continue };
        if name == "__signalId" {
            signal_id = raw_value.number_value(scope);
            continue;
        }
        if name == "__promiseId" {
            promise_id = raw_value.number_value(scope);
            continue;
        }
        entries.push((name, local_to_value(scope, state, raw_value)));
    }
    if let Some(id) = signal_id {
        if let Some(signal) = state.lookup_signal(id as u64) {
            entries.push(("__signal".to_owned(), Value::abort_signal(signal)));
        }
    }
    if let Some(id) = promise_id {
        if let Some(promise) = state.lookup_promise(id as u64) {
            entries.push(("__promise".to_owned(), Value::promise(promise)));
        }
    }
    Value::plain(entries)
}

/// Shared V8 `Function` dispatch trampoline: reads the `Rc<HostCallable>`
/// leaked behind the call's `External` data, converts arguments, invokes it,
/// and converts the result back (or throws).
pub(crate) fn host_fn_dispatch(
    scope: &mut PinScope<'_, '_>,
    state: &Rc<ConversionState>,
    args: &FunctionCallbackArguments,
    mut ret_val: ReturnValue,
) {
    let Ok(external) = Local::<External>::try_from(args.data()) else {
        ret_val.set(v8::undefined(scope).into());
        return;
    };
    let ptr = external.value();
    if ptr.is_null() {
        ret_val.set(v8::undefined(scope).into());
        return;
    }
    // SAFETY: `ptr` was produced by `Box::into_raw` over an `Rc<HostCallable>`
    // in `bindings::make_function` and is never freed while the function
    // object it is attached to is reachable.
    let callback: &Rc<HostCallable> = unsafe { &*ptr.cast::<Rc<HostCallable>>() };

    let this = local_to_value(scope, state, args.this().into());
    let mut collected = Vec::with_capacity(args.length() as usize);
    for index in 0..args.length() {
        collected.push(local_to_value(scope, state, args.get(index)));
    }

    match callback(CallArgs { this, args: collected }) {
        Ok(result) => ret_val.set(value_to_local(scope, state, &result)),
        Err(thrown) => {
            let exception = value_to_local(scope, state, &thrown);
            scope.throw_exception(exception);
        }
    }
}
