//! `V8HostEngine`: a `script_host::JsEngine` implementation over a real V8
//! isolate, modeled closely on the teacher's `V8Engine`
//! (`crates/js/js_engine_v8/src/engine.rs`) — same `Pin<Box<OwnedIsolate>>` +
//! `Global<Context>` layout, same isolate enter/exit re-entry discipline
//! around every public call, same `v8::scope!`/`v8::tc_scope!` usage for
//! running script.

use std::pin::Pin;
use std::rc::Rc;
use std::sync::Once;

use anyhow::{anyhow, Result};
use log::{error, info};
use script_host::event_loop::{CooperativeEventLoop, EventLoop};
use script_host::orchestrator::Adapter;
use script_host::value::Value;
use script_host::JsEngine;
use v8::{
    new_default_platform, Context, ContextScope, CreateParams, Global, Isolate, Local,
    OwnedIsolate, Script, ScriptOrigin, String as V8String, V8,
};

use crate::bindings::{self, ACTIVE_STATE};
use crate::conversions::ConversionState;

/// V8-backed implementation of `script_host::JsEngine`. Owns one isolate and
/// one `CooperativeEventLoop`; `run_jobs` drains that loop to completion
/// between script evaluations, the same boundary `CooperativeEventLoop::tick`
/// draws in the engine-agnostic tests.
pub struct V8HostEngine {
    isolate: Pin<Box<OwnedIsolate>>,
    context: Global<Context>,
    state: Rc<ConversionState>,
    event_loop: Rc<CooperativeEventLoop>,
    adapter: Rc<Adapter>,
}

impl V8HostEngine {
    /// Create a new engine: initializes the V8 platform (once per process),
    /// a fresh isolate and context, and binds every web-platform global onto
    /// that context's global object.
    ///
    /// # Errors
    /// Returns an error if installing globals fails (V8 string allocation
    /// failure only; V8 itself never reports OOM this way).
    pub fn new() -> Result<Self> {
        static START: Once = Once::new();
        START.call_once(|| {
            let platform = new_default_platform(0, false).make_shared();
            V8::initialize_platform(platform);
            V8::initialize();
        });

        let mut isolate = Box::pin(Isolate::new(CreateParams::default()));
        let context = {
            // SAFETY: the isolate is pinned in `isolate`, which outlives this
            // block and every other borrow taken from it.
            let isolate_mut = unsafe { isolate.as_mut().get_unchecked_mut() };
            v8::scope!(let scope, isolate_mut);
            let ctx: Local<Context> = Context::new(scope, Default::default());
            Global::new(scope, ctx)
        };

        let event_loop = Rc::new(CooperativeEventLoop::new());
        let event_loop_trait: Rc<dyn EventLoop> = Rc::clone(&event_loop) as Rc<dyn EventLoop>;
        let adapter = Rc::new(Adapter::new(event_loop_trait));

        let raw_isolate: *mut Isolate = {
            // SAFETY: only the raw address is taken; the isolate itself is
            // never moved again after this point (pinned in `Self`).
            unsafe { isolate.as_mut().get_unchecked_mut() as *mut Isolate }
        };
        let state = Rc::new(ConversionState::new(raw_isolate, Global::clone(&context)));

        info!("V8HostEngine initialized");
        let mut engine = Self { isolate, context, state, event_loop, adapter };
        engine.install_globals(None, None)?;
        Ok(engine)
    }

    /// Install (or re-install, idempotently) every global `Adapter::bind`
    /// produces onto this engine's context.
    ///
    /// # Errors
    /// Returns an error if V8 string allocation fails for any global name.
    pub fn install_globals(&mut self, existing_process: Option<Value>, existing_crypto: Option<Value>) -> Result<()> {
        let entries = self.adapter.bind(existing_process, existing_crypto);
        let isolate_mut = self.enter();
        let result = bindings::install_entries(isolate_mut, &self.context, &self.state, entries);
        self.exit();
        result
    }

    /// The event loop backing `setTimeout`/`Promise`/etc for this engine.
    #[must_use]
    pub fn event_loop(&self) -> Rc<CooperativeEventLoop> {
        Rc::clone(&self.event_loop)
    }

    fn enter(&mut self) -> &mut Isolate {
        // SAFETY: the isolate is pinned and this is the only live mutable
        // reference derived from it for the duration of the following call.
        let isolate_mut = unsafe { self.isolate.as_mut().get_unchecked_mut() };
        unsafe { isolate_mut.enter() };
        ACTIVE_STATE.with(|cell| *cell.borrow_mut() = Some(Rc::clone(&self.state)));
        isolate_mut
    }

    fn exit(&mut self) {
        ACTIVE_STATE.with(|cell| *cell.borrow_mut() = None);
        // SAFETY: mirrors `enter`; every call path that enters also exits
        // exactly once before returning.
        let isolate_mut = unsafe { self.isolate.as_mut().get_unchecked_mut() };
        unsafe { isolate_mut.exit() };
    }

    fn run_script_impl(isolate_mut: &mut Isolate, context: &Global<Context>, state: &Rc<ConversionState>, source: &str, url: &str) -> Result<Value> {
        v8::scope!(let scope, isolate_mut);
        let local_context: Local<Context> = Local::new(scope, context);
        let scope = &mut ContextScope::new(scope, local_context);
        v8::tc_scope!(let tc, scope);

        let code = V8String::new(tc, source).ok_or_else(|| anyhow!("failed to allocate script source"))?;
        let name = V8String::new(tc, url).ok_or_else(|| anyhow!("failed to allocate script url"))?;
        let origin = ScriptOrigin::new(tc, name.into(), 0, 0, false, 0, None, false, false, false, None);

        macro_rules! uncaught {
            () => {{
                if !tc.has_caught() {
                    return Err(anyhow!("script evaluation failed in `{url}` with no captured exception"));
                }
                let message = tc.message().map_or_else(
                    || "uncaught exception".to_owned(),
                    |msg_obj| msg_obj.get(tc).to_rust_string_lossy(tc),
                );
                error!("uncaught exception in `{url}`: {message}");
                return Err(anyhow!("{message}"));
            }};
        }

        let Some(compiled) = Script::compile(tc, code, Some(&origin)) else { uncaught!() };
        let Some(result) = compiled.run(tc) else { uncaught!() };
        Ok(crate::conversions::local_to_value(tc, state, result))
    }

    fn run_jobs_impl(isolate_mut: &mut Isolate, context: &Global<Context>) {
        v8::scope!(let scope, isolate_mut);
        let local_context: Local<Context> = Local::new(scope, context);
        let scope = &mut ContextScope::new(scope, local_context);
        v8::tc_scope!(let tc, scope);
        tc.perform_microtask_checkpoint();
    }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct EngineError(#[from] anyhow::Error);

impl JsEngine for V8HostEngine {
    type Error = EngineError;

    fn eval_script(&mut self, source: &str, url: &str) -> std::result::Result<Value, Self::Error> {
        let state = Rc::clone(&self.state);
        let isolate_mut = self.enter();
        let result = Self::run_script_impl(isolate_mut, &self.context, &state, source, url);
        self.exit();
        result.map_err(EngineError)
    }

    fn run_jobs(&mut self) -> std::result::Result<(), Self::Error> {
        let isolate_mut = self.enter();
        Self::run_jobs_impl(isolate_mut, &self.context);
        self.exit();
        self.event_loop.tick();
        Ok(())
    }
}
