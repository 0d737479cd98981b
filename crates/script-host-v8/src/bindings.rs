//! Host function dispatch and global installation, generalizing the
//! teacher's `host_fn_dispatch` / `make_v8_callback` / `install_bindings_impl`
//! (`crates/js/js_engine_v8/src/bindings.rs`) from its fixed `(HostContext,
//! HostFnKind)` payload to this crate's `Rc<HostCallable>` and from its
//! `HostBindings` namespace tree to the flat `Vec<(String, Value)>` an
//! `Adapter::bind()` call produces.

use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use script_host::error::ScriptError;
use script_host::promise::{self, ChainedPromise, PromiseState};
use script_host::value::{CallArgs, HostCallable, Value};
use v8::{
    Context, ContextScope, External, Function, FunctionCallbackArguments, Global, Isolate, Local,
    Number, Object, PinScope, ReturnValue, String as V8String, Value as V8Value,
};

use crate::conversions::{self, ConversionState};

/// Leaked once per installed function; recovered and dropped only if the
/// enclosing isolate itself is torn down, which never happens for the
/// lifetime of a `V8HostEngine`.
fn leak_callable(callable: Rc<HostCallable>) -> *mut c_void {
    Box::into_raw(Box::new(callable)).cast::<c_void>()
}

/// V8 `Function` dispatch trampoline registered as every host function's
/// native callback.
pub(crate) fn dispatch(scope: &mut PinScope<'_, '_>, args: FunctionCallbackArguments, ret_val: ReturnValue) {
    let Some(state) = conversion_state(scope) else { return };
    conversions::host_fn_dispatch(scope, &state, &args, ret_val);
}

thread_local! {
    /// The `ConversionState` for the isolate currently executing. Set by
    /// `V8HostEngine` for the duration of every entry into the isolate; V8's
    /// callback signature gives us no other channel to smuggle state into a
    /// bare `fn` pointer without paying for a second `External` lookup on
    /// every call.
    pub(crate) static ACTIVE_STATE: RefCell<Option<Rc<ConversionState>>> = const { RefCell::new(None) };
}

fn conversion_state(_scope: &mut PinScope<'_, '_>) -> Option<Rc<ConversionState>> {
    ACTIVE_STATE.with(|cell| cell.borrow().clone())
}

/// Wrap a host callable as a V8 `Function`.
pub(crate) fn make_function<'s>(scope: &mut PinScope<'s, '_>, callable: Rc<HostCallable>) -> Local<'s, V8Value> {
    let ptr = leak_callable(callable);
    let external = External::new(scope, ptr);
    Function::builder(dispatch).data(external.into()).build(scope).map_or_else(
        || v8::undefined(scope).into(),
        Into::into,
    )
}

/// Wrap a `ChainedPromise` as a plain V8 object exposing `then`/`catch`/
/// `finally`, each backed directly by the matching `script_host::promise`
/// function. Avoiding a native `v8::Promise`/`PromiseResolver` sidesteps
/// reconciling V8's own job queue with the cooperative event loop driving
/// every reaction here; `AbortSignal` gets the same plain-object treatment in
/// `script_host::orchestrator`.
pub(crate) fn promise_to_local<'s>(
    scope: &mut PinScope<'s, '_>,
    state: &Rc<ConversionState>,
    promise: Rc<RefCell<ChainedPromise>>,
) -> Local<'s, V8Value> {
    let obj = Object::new(scope);

    let then_promise = Rc::clone(&promise);
    let then_receiver = Rc::clone(&promise);
    let then_fn: Rc<HostCallable> = Rc::new(move |args: CallArgs| {
        check_receiver(&args, &then_receiver)?;
        let on_fulfilled = as_host_callable(args.arg(0));
        let on_rejected = as_host_callable(args.arg(1));
        let derived = promise::then(&then_promise, on_fulfilled, on_rejected);
        Ok(Value::promise(derived))
    });
    install_method(scope, obj, "then", then_fn);

    let catch_promise = Rc::clone(&promise);
    let catch_receiver = Rc::clone(&promise);
    let catch_fn: Rc<HostCallable> = Rc::new(move |args: CallArgs| {
        check_receiver(&args, &catch_receiver)?;
        let on_rejected = as_host_callable(args.arg(0)).unwrap_or_else(identity_callable);
        let derived = promise::catch(&catch_promise, on_rejected);
        Ok(Value::promise(derived))
    });
    install_method(scope, obj, "catch", catch_fn);

    let finally_promise = Rc::clone(&promise);
    let finally_receiver = Rc::clone(&promise);
    let finally_fn: Rc<HostCallable> = Rc::new(move |args: CallArgs| {
        check_receiver(&args, &finally_receiver)?;
        let on_finally = as_host_callable(args.arg(0)).unwrap_or_else(identity_callable);
        let derived = promise::finally(&finally_promise, on_finally);
        Ok(Value::promise(derived))
    });
    install_method(scope, obj, "finally", finally_fn);

    if let Some(key) = V8String::new(scope, "__settledState") {
        let tag = match promise.borrow().state() {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        };
        if let Some(tag_value) = V8String::new(scope, tag) {
            let _: Option<bool> = obj.set(scope, key.into(), tag_value.into());
        }
    }

    let promise_id = state.register_promise(&promise);
    if let Some(key) = V8String::new(scope, "__promiseId") {
        let id_value = Number::new(scope, promise_id as f64);
        let _: Option<bool> = obj.set(scope, key.into(), id_value.into());
    }

    obj.into()
}

/// Recover the `ChainedPromise` a value carries, whether it crossed the
/// boundary as a native promise or as the plain-object `__promiseId`
/// round-trip `conversions::plain_object_to_value` resolves back into a
/// `__promise` entry.
fn resolve_promise(value: &Value) -> Option<Rc<RefCell<ChainedPromise>>> {
    if let Some(promise) = value.as_promise() {
        return Some(promise);
    }
    let handle = value.as_object()?;
    match &*handle.0.borrow() {
        script_host::value::ObjectData::Plain(entries) => {
            entries.iter().find(|(k, _)| k == "__promise").and_then(|(_, v)| v.as_promise())
        }
        _ => None,
    }
}

/// Method-theft guard (spec 4.D): `then`/`catch`/`finally` must throw a
/// `TypeError` if called with a receiver that isn't the promise they were
/// bound to, rather than silently operating on `expected` regardless of
/// `args.this`.
fn check_receiver(args: &CallArgs, expected: &Rc<RefCell<ChainedPromise>>) -> Result<(), Value> {
    match resolve_promise(&args.this) {
        Some(actual) if Rc::ptr_eq(&actual, expected) => Ok(()),
        _ => Err(ScriptError::type_error("method called on an incompatible receiver").into_value()),
    }
}

fn identity_callable() -> Rc<HostCallable> {
    Rc::new(|args: CallArgs| Ok(args.arg(0)))
}

fn as_host_callable(value: Value) -> Option<Rc<HostCallable>> {
    match value {
        Value::Object(handle) => match &*handle.0.borrow() {
            script_host::value::ObjectData::Function(f) => Some(Rc::clone(f)),
            _ => None,
        },
        _ => None,
    }
}

fn install_method(scope: &mut PinScope<'_, '_>, target: Local<Object>, name: &str, callable: Rc<HostCallable>) {
    let Some(key) = V8String::new(scope, name) else { return };
    let function = make_function(scope, callable);
    let _: Option<bool> = target.set(scope, key.into(), function);
}

/// A JS function value that crossed into host code (e.g. the callback
/// argument to `setTimeout`), wrapped so the host can call it back later from
/// outside any V8 scope — from a timer firing during `EventLoop::tick`.
pub(crate) struct ScriptCallback {
    isolate: *mut Isolate,
    context: Global<Context>,
    function: Global<Function>,
}

impl ScriptCallback {
    pub(crate) fn new(isolate: *mut Isolate, context: Global<Context>, function: Global<Function>) -> Rc<Self> {
        Rc::new(Self { isolate, context, function })
    }

    /// Synchronously invoke the wrapped JS function.
    ///
    /// # Safety invariant
    /// The `V8HostEngine` that produced `isolate` must still be alive; this
    /// crate only ever constructs a `ScriptCallback` from a `Value` that is
    /// itself reachable only while the owning engine is alive (spec's host
    /// callables are never persisted past the engine that created them).
    pub(crate) fn call(&self, args: CallArgs) -> Result<Value, Value> {
        // SAFETY: mirrors `V8HostEngine`'s own isolate re-entry pattern
        // (`engine.rs`): every public entry point enters the isolate before
        // touching it and exits before returning, and no two entries nest.
        let isolate_mut = unsafe { &mut *self.isolate };
        unsafe { isolate_mut.enter() };
        let result = self.call_impl(isolate_mut, args);
        unsafe { isolate_mut.exit() };
        result
    }

    fn call_impl(&self, isolate_mut: &mut Isolate, args: CallArgs) -> Result<Value, Value> {
        let state = ACTIVE_STATE.with(|cell| cell.borrow().clone());
        let Some(state) = state else {
            return Err(Value::string("script callback invoked outside an active engine"));
        };
        v8::scope!(let scope, isolate_mut);
        let local_context: Local<Context> = Local::new(scope, &self.context);
        let scope = &mut ContextScope::new(scope, local_context);

        let function = Local::new(scope, &self.function);
        let receiver = conversions::value_to_local(scope, &state, &args.this);
        let Ok(receiver_obj) = Local::<Object>::try_from(receiver) else {
            return self.invoke(scope, &state, function, local_context, &args.args);
        };
        let js_args: Vec<Local<V8Value>> =
            args.args.iter().map(|value| conversions::value_to_local(scope, &state, value)).collect();
        v8::tc_scope!(let tc, scope);
        let Some(result) = function.call(tc, receiver_obj.into(), &js_args) else {
            let thrown = tc.exception().map_or_else(
                || Value::string("script callback threw"),
                |exc| conversions::local_to_value(tc, &state, exc),
            );
            return Err(thrown);
        };
        Ok(conversions::local_to_value(tc, &state, result))
    }

    fn invoke(
        &self,
        scope: &mut PinScope<'_, '_>,
        state: &Rc<ConversionState>,
        function: Local<Function>,
        context: Local<Context>,
        raw_args: &[Value],
    ) -> Result<Value, Value> {
        let receiver = context.global(scope);
        let js_args: Vec<Local<V8Value>> =
            raw_args.iter().map(|value| conversions::value_to_local(scope, state, value)).collect();
        v8::tc_scope!(let tc, scope);
        let Some(result) = function.call(tc, receiver.into(), &js_args) else {
            let thrown = tc
                .exception()
                .map_or_else(|| Value::string("script callback threw"), |exc| conversions::local_to_value(tc, state, exc));
            return Err(thrown);
        };
        Ok(conversions::local_to_value(tc, state, result))
    }
}

/// Install every `(name, Value)` entry `Adapter::bind()` produced onto the
/// context's global object, merging into an existing namespace object (e.g.
/// `console`, `process`) rather than replacing it, matching
/// `install_bindings_impl`'s merge-vs-create split.
pub(crate) fn install_entries(
    isolate_mut: &mut Isolate,
    context: &Global<Context>,
    state: &Rc<ConversionState>,
    entries: Vec<(String, Value)>,
) -> Result<()> {
    v8::scope!(let scope, isolate_mut);
    let local_context: Local<Context> = Local::new(scope, context);
    let scope = &mut ContextScope::new(scope, local_context);
    let global = local_context.global(scope);

    for (name, value) in entries {
        let key = V8String::new(scope, &name).ok_or_else(|| anyhow!("failed to allocate V8 string for global `{name}`"))?;
        let converted = conversions::value_to_local(scope, state, &value);
        if let (Value::Object(handle), Ok(incoming)) = (&value, Local::<Object>::try_from(converted)) {
            if matches!(&*handle.0.borrow(), script_host::value::ObjectData::Plain(_)) {
                if let Some(existing) = global.get(scope, key.into()).and_then(|v| Local::<Object>::try_from(v).ok()) {
                    merge_object(scope, existing, incoming);
                    continue;
                }
            }
        }
        let _: Option<bool> = global.set(scope, key.into(), converted);
    }
    Ok(())
}

fn merge_object(scope: &mut PinScope<'_, '_>, target: Local<Object>, source: Local<Object>) {
    let Some(keys) = source.get_own_property_names(scope, v8::GetPropertyNamesArgs::default()) else { return };
    for index in 0..keys.length() {
        let Some(key) = keys.get_index(scope, index) else { continue };
        let Some(value) = source.get(scope, key) else { continue };
        let _: Option<bool> = target.set(scope, key, value);
    }
}
