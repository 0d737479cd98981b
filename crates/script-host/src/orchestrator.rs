//! Binding Orchestrator (spec 4.H): `Bind()` installs every global this
//! crate provides in one idempotent call, and `SetConsoleOutput` wires the
//! console sink. Everything it installs is built from the modules
//! elsewhere in this crate; this file only does assembly and the
//! extend-vs-create dance for `process`/`crypto`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::abort::{self, AbortController};
use crate::bindings::{extend_plain_object, HostNamespace};
use crate::clone::structured_clone;
use crate::console::Console;
use crate::error::ScriptError;
use crate::event_loop::EventLoop;
use crate::event_target::{Event, EventTarget};
use crate::promise::{self, ChainedPromise};
use crate::timers;
use crate::value::{CallArgs, HostCallable, ObjectData, Value, VisitedMap};
use crate::web::blob::Blob;
use crate::web::form_data::FormData;
use crate::web::headers::HeadersStore;
use crate::web::text_codec;
use crate::web::url::{ParsedUrl, SearchParams};
use crate::web::{base64, crypto as web_crypto, dom_exception, performance::Performance, storage::Storage};

/// Construction-time knobs for an `Adapter`, mirroring how the teacher
/// assembles one `HostContext` up front and clones it into every callback
/// (`crates/js/src/bindings/mod.rs`) rather than threading loose parameters
/// through each binding function.
pub struct AdapterOptions {
    /// `performance.timeOrigin`, in milliseconds. Overridable so tests get a
    /// deterministic origin instead of wall-clock time.
    pub clock_origin_ms: f64,
    /// Initial state of `console.*` output; equivalent to calling
    /// `set_console_output` once right after construction.
    pub console_enabled: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self { clock_origin_ms: 0.0, console_enabled: true }
    }
}

/// Constructor errors (spec 6: "both non-null or the constructor fails
/// with `invalid-argument`" — modeled here as `ScriptError::TypeError`
/// since there is no script to throw to yet at construction time, and the
/// embedder consumes this as an ordinary Rust `Result`).
pub fn require_non_null<T>(value: Option<T>, what: &str) -> Result<T, ScriptError> {
    value.ok_or_else(|| ScriptError::type_error(format!("{what} must not be null")))
}

/// Everything spec section 3 calls "the Adapter": the event loop handle plus
/// every piece of state a bound global needs to stay alive (storage,
/// performance buffer, console sink). One `Adapter` corresponds to one
/// script realm.
pub struct Adapter {
    pub event_loop: Rc<dyn EventLoop>,
    pub console: Rc<Console>,
    pub local_storage: Rc<Storage>,
    pub session_storage: Rc<Storage>,
    pub performance: Rc<Performance>,
    console_silenced: RefCell<bool>,
    /// Spec section 7 calls this "optional, outside core scope": a host can
    /// wire a callback here and call `report_unhandled_rejection` from
    /// wherever it detects (via its own engine's promise tracking, or the
    /// `__settledState` tag on the plain-object promise wrapper) that a
    /// rejection reached end of job queue unconsumed. This crate doesn't
    /// detect "unhandled" itself — that determination is engine-specific.
    unhandled_rejection: RefCell<Option<Rc<HostCallable>>>,
}

impl Adapter {
    #[must_use]
    pub fn new(event_loop: Rc<dyn EventLoop>) -> Self {
        Self::with_options(event_loop, AdapterOptions::default())
    }

    #[must_use]
    pub fn with_options(event_loop: Rc<dyn EventLoop>, options: AdapterOptions) -> Self {
        Self {
            event_loop,
            console: Rc::new(Console::new()),
            local_storage: Rc::new(Storage::new()),
            session_storage: Rc::new(Storage::new()),
            performance: Rc::new(Performance::new(options.clock_origin_ms)),
            console_silenced: RefCell::new(!options.console_enabled),
            unhandled_rejection: RefCell::new(None),
        }
    }

    /// Register (or clear, with `None`) the unhandled-rejection callback.
    pub fn on_unhandled_rejection(&self, callback: Option<Rc<HostCallable>>) {
        *self.unhandled_rejection.borrow_mut() = callback;
    }

    /// Invoke the registered unhandled-rejection callback, if any, with the
    /// rejection reason. A no-op when nothing is registered.
    pub fn report_unhandled_rejection(&self, reason: &Value) {
        if let Some(callback) = self.unhandled_rejection.borrow().as_ref() {
            let _ = callback(CallArgs::new(vec![reason.clone()]));
        }
    }

    /// `SetConsoleOutput(writer)`; a `None` writer silences all console
    /// methods (spec section 6). This crate routes console output through
    /// the `log` crate rather than an injectable writer object, so
    /// "silencing" means "skip the call entirely" at the binding layer.
    pub fn set_console_output(&self, enabled: bool) {
        *self.console_silenced.borrow_mut() = !enabled;
    }

    #[must_use]
    pub fn console_enabled(&self) -> bool {
        !*self.console_silenced.borrow()
    }

    fn console_namespace(self: &Rc<Self>) -> HostNamespace {
        let adapter = Rc::clone(self);
        let a1 = Rc::clone(&adapter);
        let a2 = Rc::clone(&adapter);
        let a3 = Rc::clone(&adapter);
        let a4 = Rc::clone(&adapter);
        let a5 = Rc::clone(&adapter);
        let a6 = Rc::clone(&adapter);
        let a7 = Rc::clone(&adapter);
        let a8 = Rc::clone(&adapter);
        let a9 = Rc::clone(&adapter);
        let a10 = Rc::clone(&adapter);
        HostNamespace::new()
            .with_fn("dir", move |args: CallArgs| {
                if a1.console_enabled() {
                    a1.console.dir(&args.arg(0));
                }
                Ok(Value::Undefined)
            })
            .with_fn("table", move |args: CallArgs| {
                if a2.console_enabled() {
                    let rows = args.args.clone();
                    a2.console.table(&rows);
                }
                Ok(Value::Undefined)
            })
            .with_fn("trace", move |args: CallArgs| {
                if a3.console_enabled() {
                    let message = args.arg(0).as_str().unwrap_or("").to_owned();
                    a3.console.trace(&message, None);
                }
                Ok(Value::Undefined)
            })
            .with_fn("clear", move |_| {
                a4.console.clear();
                Ok(Value::Undefined)
            })
            .with_fn("count", move |args: CallArgs| {
                if a5.console_enabled() {
                    let label = args.arg(0).as_str().unwrap_or("default").to_owned();
                    a5.console.count(&label);
                }
                Ok(Value::Undefined)
            })
            .with_fn("countReset", move |args: CallArgs| {
                let label = args.arg(0).as_str().unwrap_or("default").to_owned();
                a6.console.count_reset(&label);
                Ok(Value::Undefined)
            })
            .with_fn("time", move |args: CallArgs| {
                let label = args.arg(0).as_str().unwrap_or("default").to_owned();
                a7.console.time(&label);
                Ok(Value::Undefined)
            })
            .with_fn("timeLog", move |args: CallArgs| {
                let label = args.arg(0).as_str().unwrap_or("default").to_owned();
                a8.console.time_log(&label);
                Ok(Value::Undefined)
            })
            .with_fn("timeEnd", move |args: CallArgs| {
                let label = args.arg(0).as_str().unwrap_or("default").to_owned();
                a9.console.time_end(&label);
                Ok(Value::Undefined)
            })
            .with_fn("group", move |args: CallArgs| {
                let label = args.arg(0).as_str().unwrap_or("").to_owned();
                a10.console.group(&label);
                Ok(Value::Undefined)
            })
            .with_fn("groupCollapsed", {
                let adapter = Rc::clone(&adapter);
                move |args: CallArgs| {
                    let label = args.arg(0).as_str().unwrap_or("").to_owned();
                    adapter.console.group_collapsed(&label);
                    Ok(Value::Undefined)
                }
            })
            .with_fn("groupEnd", {
                let adapter = Rc::clone(&adapter);
                move |_| {
                    adapter.console.group_end();
                    Ok(Value::Undefined)
                }
            })
            .with_fn("assert", {
                let adapter = Rc::clone(&adapter);
                move |args: CallArgs| {
                    let condition = matches!(args.arg(0), Value::Boolean(true));
                    let message = args.arg(1).as_str().unwrap_or("").to_owned();
                    adapter.console.assert(condition, &message);
                    Ok(Value::Undefined)
                }
            })
    }

    fn storage_namespace(storage: &Rc<Storage>) -> Value {
        let s1 = Rc::clone(storage);
        let s2 = Rc::clone(storage);
        let s3 = Rc::clone(storage);
        let s4 = Rc::clone(storage);
        let s5 = Rc::clone(storage);
        HostNamespace::new()
            .with_fn("getItem", move |args: CallArgs| {
                let key = args.arg(0).as_str().unwrap_or_default().to_owned();
                Ok(s1.get_item(&key).map_or(Value::Null, Value::string))
            })
            .with_fn("setItem", move |args: CallArgs| {
                let key = args.arg(0).as_str().unwrap_or_default().to_owned();
                let value = args.arg(1).as_str().unwrap_or_default().to_owned();
                s2.set_item(&key, &value);
                Ok(Value::Undefined)
            })
            .with_fn("removeItem", move |args: CallArgs| {
                let key = args.arg(0).as_str().unwrap_or_default().to_owned();
                s3.remove_item(&key);
                Ok(Value::Undefined)
            })
            .with_fn("clear", move |_| {
                s4.clear();
                Ok(Value::Undefined)
            })
            .with_fn("key", move |args: CallArgs| {
                let index = args.arg(0).as_number().unwrap_or(0.0) as usize;
                Ok(s5.key(index).map_or(Value::Null, Value::string))
            })
            .with_property("length", Value::Number(storage.length() as f64))
            .into_value()
    }

    fn performance_namespace(performance: &Rc<Performance>) -> Value {
        let p1 = Rc::clone(performance);
        let p2 = Rc::clone(performance);
        let p3 = Rc::clone(performance);
        let p4 = Rc::clone(performance);
        let p5 = Rc::clone(performance);
        let p6 = Rc::clone(performance);
        let p7 = Rc::clone(performance);
        let origin = performance.time_origin();
        HostNamespace::new()
            .with_fn("now", move |_| Ok(Value::Number(p1.now())))
            .with_property("timeOrigin", Value::Number(origin))
            .with_fn("mark", move |args: CallArgs| {
                let name = args.arg(0).as_str().unwrap_or_default().to_owned();
                p2.mark(&name);
                Ok(Value::Undefined)
            })
            .with_fn("measure", move |args: CallArgs| {
                let name = args.arg(0).as_str().unwrap_or_default().to_owned();
                let start = args.arg(1).as_str().map(str::to_owned);
                let end = args.arg(2).as_str().map(str::to_owned);
                p3.measure(&name, start.as_deref(), end.as_deref()).map_err(ScriptError::into_value)?;
                Ok(Value::Undefined)
            })
            .with_fn("clearMarks", move |_| {
                p4.clear_marks();
                Ok(Value::Undefined)
            })
            .with_fn("clearMeasures", move |_| {
                p5.clear_measures();
                Ok(Value::Undefined)
            })
            .with_fn("getEntriesByName", move |args: CallArgs| {
                let name = args.arg(0).as_str().unwrap_or_default().to_owned();
                let kind = args.arg(1).as_str().map(str::to_owned);
                Ok(entries_to_value(&p6.get_entries_by_name(&name, kind.as_deref())))
            })
            .with_fn("getEntriesByType", move |args: CallArgs| {
                let kind = args.arg(0).as_str().unwrap_or_default().to_owned();
                Ok(entries_to_value(&p7.get_entries_by_type(&kind)))
            })
            .into_value()
    }

    fn crypto_namespace() -> HostNamespace {
        HostNamespace::new()
            .with_fn("getRandomValues", |args: CallArgs| {
                let length = args.arg(0).as_number().unwrap_or(0.0) as usize;
                let bytes = web_crypto::get_random_values(length).map_err(ScriptError::into_value)?;
                Ok(Value::bytes(bytes))
            })
            .with_fn("randomUUID", |_| Ok(Value::string(web_crypto::random_uuid())))
    }

    fn promise_statics(event_loop: Rc<dyn EventLoop>) -> Value {
        let l1 = Rc::clone(&event_loop);
        let l2 = Rc::clone(&event_loop);
        let l3 = Rc::clone(&event_loop);
        let l4 = Rc::clone(&event_loop);
        let l5 = Rc::clone(&event_loop);
        HostNamespace::new()
            .with_fn("resolve", move |args: CallArgs| Ok(Value::promise(promise::static_resolve(Rc::clone(&l1), args.arg(0)))))
            .with_fn("reject", move |args: CallArgs| Ok(Value::promise(promise::static_reject(Rc::clone(&l2), args.arg(0)))))
            .with_fn("all", move |args: CallArgs| {
                promise::static_all(Rc::clone(&l3), &args.arg(0)).map(Value::promise).map_err(ScriptError::into_value)
            })
            .with_fn("allSettled", move |args: CallArgs| {
                promise::static_all_settled(Rc::clone(&l4), &args.arg(0)).map(Value::promise).map_err(ScriptError::into_value)
            })
            .with_fn("race", {
                let event_loop = Rc::clone(&event_loop);
                move |args: CallArgs| {
                    promise::static_race(Rc::clone(&event_loop), &args.arg(0)).map(Value::promise).map_err(ScriptError::into_value)
                }
            })
            .with_fn("any", move |args: CallArgs| {
                promise::static_any(Rc::clone(&l5), &args.arg(0)).map(Value::promise).map_err(ScriptError::into_value)
            })
            .into_value()
    }

    /// `Bind()`: install every global this crate provides. Idempotent —
    /// calling twice simply reassigns the same entries (spec 4.H).
    ///
    /// `existing_process`/`existing_crypto` let an embedding hand in
    /// pre-existing globals of those names to extend rather than replace
    /// (spec 4.H's extend-vs-create rule).
    #[must_use]
    pub fn bind(
        self: &Rc<Self>,
        existing_process: Option<Value>,
        existing_crypto: Option<Value>,
    ) -> Vec<(String, Value)> {
        let event_loop = Rc::clone(&self.event_loop);
        let mut globals = Vec::new();

        globals.push(("setTimeout".to_owned(), timers::set_timeout(Rc::clone(&event_loop))));
        globals.push(("setInterval".to_owned(), timers::set_interval(Rc::clone(&event_loop))));
        globals.push(("setImmediate".to_owned(), timers::set_immediate(Rc::clone(&event_loop))));
        globals.push(("clearTimeout".to_owned(), timers::clear_timeout(Rc::clone(&event_loop))));
        globals.push(("clearInterval".to_owned(), timers::clear_interval(Rc::clone(&event_loop))));
        globals.push(("clearImmediate".to_owned(), timers::clear_immediate(Rc::clone(&event_loop))));
        globals.push(("queueMicrotask".to_owned(), timers::queue_microtask(Rc::clone(&event_loop))));
        globals.push(("delay".to_owned(), timers::delay(Rc::clone(&event_loop))));

        let mut promise_namespace = Self::promise_statics(Rc::clone(&event_loop));
        if let Value::Object(handle) = &mut promise_namespace {
            let l1 = Rc::clone(&event_loop);
            if let ObjectData::Plain(entries) = &mut *handle.0.borrow_mut() {
                entries.push((
                    "construct".to_owned(),
                    Value::function(move |args: CallArgs| {
                        let Some(executor) = args.arg(0).as_object().and_then(|h| match &*h.0.borrow() {
                            ObjectData::Function(f) => Some(Rc::clone(f)),
                            _ => None,
                        }) else {
                            return Err(ScriptError::type_error("Promise executor must be a function").into_value());
                        };
                        let promise = ChainedPromise::pending(Rc::clone(&l1));
                        let resolve_target = Rc::clone(&promise);
                        let resolve_fn = Value::function(move |a: CallArgs| {
                            promise::resolve_value(&resolve_target, a.arg(0));
                            Ok(Value::Undefined)
                        });
                        let reject_target = Rc::clone(&promise);
                        let reject_fn = Value::function(move |a: CallArgs| {
                            promise::reject_value(&reject_target, a.arg(0));
                            Ok(Value::Undefined)
                        });
                        if let Err(thrown) = executor(CallArgs::new(vec![resolve_fn, reject_fn])) {
                            promise::reject_value(&promise, thrown);
                        }
                        Ok(Value::promise(promise))
                    }),
                ));
            }
        }
        globals.push(("Promise".to_owned(), promise_namespace));

        globals.push((
            "structuredClone".to_owned(),
            Value::function(|args: CallArgs| {
                let mut visited = VisitedMap::new();
                structured_clone(&args.arg(0), &mut visited).map_err(ScriptError::into_value)
            }),
        ));

        globals.push((
            "atob".to_owned(),
            Value::function(|args: CallArgs| {
                base64::atob(args.arg(0).as_str().unwrap_or_default()).map(Value::string).map_err(ScriptError::into_value)
            }),
        ));
        globals.push((
            "btoa".to_owned(),
            Value::function(|args: CallArgs| {
                base64::btoa(args.arg(0).as_str().unwrap_or_default()).map(Value::string).map_err(ScriptError::into_value)
            }),
        ));

        globals.push(("console".to_owned(), self.console_namespace().into_value()));
        globals.push(("localStorage".to_owned(), Self::storage_namespace(&self.local_storage)));
        globals.push(("sessionStorage".to_owned(), Self::storage_namespace(&self.session_storage)));
        globals.push(("performance".to_owned(), Self::performance_namespace(&self.performance)));

        let crypto_additions = Self::crypto_namespace().into_value();
        let crypto_entries = match &crypto_additions {
            Value::Object(handle) => match &*handle.0.borrow() {
                ObjectData::Plain(entries) => entries.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let crypto_value = match existing_crypto {
            Some(existing) => extend_plain_object(&existing, crypto_entries),
            None => Value::plain(crypto_entries),
        };
        globals.push(("crypto".to_owned(), crypto_value));

        let process_additions = vec![(
            "nextTick".to_owned(),
            timers::queue_microtask(Rc::clone(&event_loop)),
        )];
        let process_value = match existing_process {
            Some(existing) => extend_plain_object(&existing, process_additions),
            None => Value::plain(process_additions),
        };
        globals.push(("process".to_owned(), process_value));

        globals.push((
            "DOMException".to_owned(),
            Value::plain({
                let mut entries = dom_exception::static_constants();
                entries.push((
                    "construct".to_owned(),
                    Value::function(|args: CallArgs| {
                        let message = args.arg(0).as_str().unwrap_or_default().to_owned();
                        let name = match args.arg(1) {
                            Value::Undefined => "Error".to_owned(),
                            v => v.as_str().unwrap_or("Error").to_owned(),
                        };
                        Ok(dom_exception::construct(&message, &name))
                    }),
                ));
                entries
            }),
        ));

        globals.push(("AbortController".to_owned(), abort_controller_constructor()));
        globals.push(("AbortSignal".to_owned(), abort_signal_statics(Rc::clone(&event_loop))));

        globals.push(("URL".to_owned(), url_constructor()));
        globals.push(("URLSearchParams".to_owned(), url_search_params_constructor()));
        globals.push(("Headers".to_owned(), headers_constructor()));
        globals.push(("Blob".to_owned(), blob_constructor()));
        globals.push(("FormData".to_owned(), form_data_constructor()));
        globals.push(("TextEncoder".to_owned(), text_encoder_constructor()));
        globals.push(("TextDecoder".to_owned(), text_decoder_constructor()));
        globals.push(("EventTarget".to_owned(), event_target_constructor()));
        globals.push(("Event".to_owned(), event_constructor()));
        globals.push(("CustomEvent".to_owned(), custom_event_constructor()));

        globals
    }
}

fn entries_to_value(entries: &[crate::web::performance::PerformanceEntry]) -> Value {
    Value::array(
        entries
            .iter()
            .map(|e| {
                Value::plain(vec![
                    ("name".to_owned(), Value::string(e.name.clone())),
                    ("startTime".to_owned(), Value::Number(e.start_time)),
                    ("duration".to_owned(), Value::Number(e.duration)),
                ])
            })
            .collect(),
    )
}

fn abort_controller_constructor() -> Value {
    Value::function(|_: CallArgs| {
        let controller = Rc::new(AbortController::new());
        let signal = controller.signal();
        let abort_fn = {
            let controller = Rc::clone(&controller);
            Value::function(move |args: CallArgs| {
                let reason = match args.arg(0) {
                    Value::Undefined => None,
                    v => Some(v),
                };
                controller.abort(reason);
                Ok(Value::Undefined)
            })
        };
        Ok(Value::plain(vec![
            ("signal".to_owned(), signal_to_value(&signal)),
            ("abort".to_owned(), abort_fn),
        ]))
    })
}

/// Wrap a real `AbortSignal` as a script-visible plain object, stashing the
/// Rust handle under `__signal` so it can be recovered by identity (e.g. by
/// `AbortSignal.any`) via `resolve_signal` instead of re-derived from the
/// snapshot properties below, which go stale the instant `aborted` flips.
fn signal_to_value(signal: &Rc<abort::AbortSignal>) -> Value {
    let s1 = Rc::clone(signal);
    let s2 = Rc::clone(signal);
    let s3 = Rc::clone(signal);
    Value::plain(vec![
        ("__signal".to_owned(), Value::abort_signal(Rc::clone(signal))),
        ("aborted".to_owned(), Value::Boolean(signal.aborted())),
        ("reason".to_owned(), signal.reason()),
        (
            "addEventListener".to_owned(),
            Value::function(move |args: CallArgs| {
                let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
                if let Some(callback) = as_callable(&args.arg(1)) {
                    s1.add_event_listener(&event_type, callback, false);
                }
                Ok(Value::Undefined)
            }),
        ),
        (
            "removeEventListener".to_owned(),
            Value::function(move |args: CallArgs| {
                let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
                if let Some(callback) = as_callable(&args.arg(1)) {
                    s2.remove_event_listener(&event_type, &callback);
                }
                Ok(Value::Undefined)
            }),
        ),
        (
            "throwIfAborted".to_owned(),
            Value::function(move |_| s3.throw_if_aborted().map(|()| Value::Undefined)),
        ),
    ])
}

fn resolve_signal(value: &Value) -> Option<Rc<abort::AbortSignal>> {
    if let Some(signal) = value.as_abort_signal() {
        return Some(signal);
    }
    let handle = value.as_object()?;
    let ObjectData::Plain(entries) = &*handle.0.borrow() else { return None };
    entries.iter().find(|(k, _)| k == "__signal").and_then(|(_, v)| v.as_abort_signal())
}

fn as_callable(value: &Value) -> Option<Rc<crate::value::HostCallable>> {
    value.as_object().and_then(|h| match &*h.0.borrow() {
        ObjectData::Function(f) => Some(Rc::clone(f)),
        _ => None,
    })
}

fn abort_signal_statics(event_loop: Rc<dyn EventLoop>) -> Value {
    let loop_for_timeout = Rc::clone(&event_loop);
    Value::plain(vec![
        (
            "any".to_owned(),
            Value::function(move |args: CallArgs| {
                let items = crate::iterable::drain_iterable(&args.arg(0)).map_err(ScriptError::into_value)?;
                let signals: Vec<Rc<abort::AbortSignal>> = items.iter().filter_map(resolve_signal).collect();
                if signals.len() != items.len() {
                    return Err(ScriptError::type_error("AbortSignal.any expects an iterable of AbortSignal").into_value());
                }
                Ok(signal_to_value(&abort::any(&signals)))
            }),
        ),
        (
            "timeout".to_owned(),
            Value::function(move |args: CallArgs| {
                let ms = args.arg(0).as_number().unwrap_or(0.0);
                let signal = abort::timeout(&loop_for_timeout, ms);
                Ok(signal_to_value(&signal))
            }),
        ),
    ])
}

/// Read a named own property off a `Value::plain` object, or `None` for
/// anything else (missing key, non-object, or a shape other than `Plain`).
/// The web-global constructors below use this for `options`-bag arguments
/// (`{type}` for `Blob`, `{fatal, ignoreBOM}` for `TextDecoder`, `{detail}`
/// for `CustomEvent`) the same way `signal_to_value`/`resolve_signal` read
/// their own hidden fields.
fn plain_get(value: &Value, key: &str) -> Option<Value> {
    let handle = value.as_object()?;
    let ObjectData::Plain(entries) = &*handle.0.borrow() else { return None };
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Number(n) => format!("{n}"),
        Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerce a `Headers`/`URLSearchParams`/`FormData` constructor's `init`
/// argument into `(name, value)` pairs: a record-like plain object iterates
/// its own enumerable entries directly; anything else is drained as an
/// iterable of `[name, value]` pairs (spec 4.G's "record-like object"
/// acceptance, both forms the real constructors accept).
fn collect_string_pairs(value: &Value) -> Result<Vec<(String, String)>, ScriptError> {
    if let Value::Object(handle) = value {
        if let ObjectData::Plain(entries) = &*handle.0.borrow() {
            return Ok(entries.iter().map(|(k, v)| (k.clone(), value_to_string(v))).collect());
        }
    }
    crate::iterable::drain_iterable(value)?
        .into_iter()
        .map(|item| {
            let pair = crate::iterable::drain_iterable(&item)?;
            let key = pair.first().map(value_to_string).unwrap_or_default();
            let val = pair.get(1).map(value_to_string).unwrap_or_default();
            Ok((key, val))
        })
        .collect()
}

fn url_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let input = args.arg(0).as_str().unwrap_or_default().to_owned();
        let base = args.arg(1).as_str().map(str::to_owned);
        let parsed = ParsedUrl::parse(&input, base.as_deref()).map_err(ScriptError::into_value)?;
        Ok(url_to_value(parsed))
    })
}

/// Wrap a `ParsedUrl` as a script-visible object. Properties are a snapshot
/// taken at construction time, the same tradeoff `signal_to_value` makes for
/// `AbortSignal` — this crate's `Value` model has no accessor-property traps,
/// so a live `url.href = "..."` style assignment from script can't reach back
/// into `ParsedUrl` to re-derive every other field. `searchParams` is its own
/// live namespace over the same mutation surface `SearchParams` exposes.
fn url_to_value(url: ParsedUrl) -> Value {
    let href_for_to_string = url.href();
    Value::plain(vec![
        ("href".to_owned(), Value::string(url.href())),
        ("protocol".to_owned(), Value::string(url.protocol())),
        ("username".to_owned(), Value::string(url.username().to_owned())),
        ("password".to_owned(), Value::string(url.password().to_owned())),
        ("hostname".to_owned(), Value::string(url.hostname().to_owned())),
        ("port".to_owned(), Value::string(url.port())),
        ("pathname".to_owned(), Value::string(url.pathname().to_owned())),
        ("search".to_owned(), Value::string(url.search())),
        ("hash".to_owned(), Value::string(url.hash())),
        ("origin".to_owned(), Value::string(url.origin())),
        ("searchParams".to_owned(), search_params_to_value(url.search_params())),
        ("toString".to_owned(), Value::function(move |_: CallArgs| Ok(Value::string(href_for_to_string.clone())))),
    ])
}

fn url_search_params_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let init = args.arg(0);
        let params = match &init {
            Value::Undefined | Value::Null => SearchParams::new(),
            Value::String(s) => SearchParams::from_query_string(s),
            _ => SearchParams::from_pairs(collect_string_pairs(&init).map_err(ScriptError::into_value)?),
        };
        Ok(search_params_to_value(params))
    })
}

fn search_params_to_value(params: SearchParams) -> Value {
    let shared = Rc::new(RefCell::new(params));
    let p1 = Rc::clone(&shared);
    let p2 = Rc::clone(&shared);
    let p3 = Rc::clone(&shared);
    let p4 = Rc::clone(&shared);
    let p5 = Rc::clone(&shared);
    let p6 = Rc::clone(&shared);
    let p7 = Rc::clone(&shared);
    HostNamespace::new()
        .with_fn("get", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(p1.borrow().get(&key).map_or(Value::Null, Value::string))
        })
        .with_fn("getAll", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(Value::array(p2.borrow().get_all(&key).into_iter().map(Value::string).collect()))
        })
        .with_fn("has", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(Value::Boolean(p3.borrow().has(&key)))
        })
        .with_fn("append", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            p4.borrow_mut().append(&key, &value);
            Ok(Value::Undefined)
        })
        .with_fn("set", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            p5.borrow_mut().set(&key, &value);
            Ok(Value::Undefined)
        })
        .with_fn("delete", move |args: CallArgs| {
            let key = args.arg(0).as_str().unwrap_or_default().to_owned();
            p6.borrow_mut().delete(&key);
            Ok(Value::Undefined)
        })
        .with_fn("toString", move |_: CallArgs| Ok(Value::string(p7.borrow().to_query_string())))
        .into_value()
}

fn headers_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let mut store = HeadersStore::new();
        let init = args.arg(0);
        if !init.is_nullish() {
            let pairs = collect_string_pairs(&init).map_err(ScriptError::into_value)?;
            store.append_pairs(&pairs).map_err(ScriptError::into_value)?;
        }
        Ok(headers_to_value(Rc::new(RefCell::new(store))))
    })
}

fn headers_to_value(store: Rc<RefCell<HeadersStore>>) -> Value {
    let s1 = Rc::clone(&store);
    let s2 = Rc::clone(&store);
    let s3 = Rc::clone(&store);
    let s4 = Rc::clone(&store);
    let s5 = Rc::clone(&store);
    let s6 = Rc::clone(&store);
    let s7 = Rc::clone(&store);
    HostNamespace::new()
        .with_fn("append", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            s1.borrow_mut().append(&name, &value).map_err(ScriptError::into_value)?;
            Ok(Value::Undefined)
        })
        .with_fn("set", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            s2.borrow_mut().set(&name, &value).map_err(ScriptError::into_value)?;
            Ok(Value::Undefined)
        })
        .with_fn("delete", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            s3.borrow_mut().delete(&name);
            Ok(Value::Undefined)
        })
        .with_fn("has", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(Value::Boolean(s4.borrow().has(&name)))
        })
        .with_fn("get", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(s5.borrow().get(&name).map_or(Value::Null, Value::string))
        })
        .with_fn("getSetCookie", move |_| {
            Ok(Value::array(s6.borrow().get_set_cookie().into_iter().map(Value::string).collect()))
        })
        .with_fn("entries", move |_| Ok(s7.borrow().to_value()))
        .into_value()
}

fn extract_blob_type(options: &Value) -> String {
    plain_get(options, "type").and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default()
}

/// Normalize one `new Blob(parts)` element to raw bytes (spec 4.G: strings
/// UTF-8 encode, numbers coerce via `String()` first, `Bytes`/nested `Blob`
/// parts read their bytes directly).
fn blob_part_bytes(part: &Value) -> Vec<u8> {
    match part {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Number(n) => format!("{n}").into_bytes(),
        Value::Boolean(b) => b.to_string().into_bytes(),
        Value::Object(handle) => match &*handle.0.borrow() {
            ObjectData::Bytes(data) => data.clone(),
            ObjectData::Plain(entries) => {
                entries.iter().find(|(k, _)| k == "__blobBytes").and_then(|(_, v)| v.as_bytes()).unwrap_or_default()
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn blob_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let parts_value = args.arg(0);
        let mime_type = extract_blob_type(&args.arg(1));
        let parts: Vec<Vec<u8>> = if parts_value.is_nullish() {
            Vec::new()
        } else {
            crate::iterable::drain_iterable(&parts_value).map_err(ScriptError::into_value)?
                .iter()
                .map(blob_part_bytes)
                .collect()
        };
        let blob = Blob::new(&parts, &mime_type);
        Ok(blob_to_value(blob.array_buffer(), blob.mime_type().to_owned()))
    })
}

/// Wrap a `Blob`'s bytes as a script-visible object. `Blob` is immutable, so
/// unlike `URL` there is no live-vs-snapshot tension here: the bytes are
/// stashed under `__blobBytes` (mirroring `signal_to_value`'s `__signal`
/// convention) so `blob_part_bytes` can read a nested `Blob` part back out,
/// and every method simply rebuilds a `Blob` on demand to reuse its logic.
fn blob_to_value(bytes: Vec<u8>, mime_type: String) -> Value {
    let bytes_for_text = bytes.clone();
    let bytes_for_array_buffer = bytes.clone();
    let bytes_for_slice = bytes.clone();
    let mime_for_slice = mime_type.clone();
    Value::plain(vec![
        ("size".to_owned(), Value::Number(bytes.len() as f64)),
        ("type".to_owned(), Value::string(mime_type)),
        ("__blobBytes".to_owned(), Value::bytes(bytes)),
        (
            "text".to_owned(),
            Value::function(move |_: CallArgs| {
                let blob = Blob::new(&[bytes_for_text.clone()], "");
                blob.text().map(Value::string).map_err(ScriptError::into_value)
            }),
        ),
        ("arrayBuffer".to_owned(), Value::function(move |_: CallArgs| Ok(Value::bytes(bytes_for_array_buffer.clone())))),
        (
            "slice".to_owned(),
            Value::function(move |args: CallArgs| {
                let start = args.arg(0).as_number().map(|n| n as i64);
                let end = args.arg(1).as_number().map(|n| n as i64);
                let content_type = args.arg(2).as_str().map(str::to_owned);
                let blob = Blob::new(&[bytes_for_slice.clone()], &mime_for_slice);
                let sliced = blob.slice(start, end, content_type.as_deref());
                Ok(blob_to_value(sliced.array_buffer(), sliced.mime_type().to_owned()))
            }),
        ),
        ("stream".to_owned(), Value::function(|_: CallArgs| Ok(Value::Undefined))),
    ])
}

fn form_data_constructor() -> Value {
    Value::function(|_: CallArgs| Ok(form_data_to_value(Rc::new(RefCell::new(FormData::new())))))
}

fn form_data_to_value(data: Rc<RefCell<FormData>>) -> Value {
    let d1 = Rc::clone(&data);
    let d2 = Rc::clone(&data);
    let d3 = Rc::clone(&data);
    let d4 = Rc::clone(&data);
    let d5 = Rc::clone(&data);
    let d6 = Rc::clone(&data);
    HostNamespace::new()
        .with_fn("append", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            d1.borrow_mut().append(&name, &value);
            Ok(Value::Undefined)
        })
        .with_fn("set", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            let value = args.arg(1).as_str().unwrap_or_default().to_owned();
            d2.borrow_mut().set(&name, &value);
            Ok(Value::Undefined)
        })
        .with_fn("delete", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            d3.borrow_mut().delete(&name);
            Ok(Value::Undefined)
        })
        .with_fn("get", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(d4.borrow().get(&name).map_or(Value::Null, Value::string))
        })
        .with_fn("getAll", move |args: CallArgs| {
            let name = args.arg(0).as_str().unwrap_or_default().to_owned();
            Ok(Value::array(d5.borrow().get_all(&name).into_iter().map(Value::string).collect()))
        })
        .with_fn("has", {
            let data = Rc::clone(&data);
            move |args: CallArgs| {
                let name = args.arg(0).as_str().unwrap_or_default().to_owned();
                Ok(Value::Boolean(data.borrow().has(&name)))
            }
        })
        .with_fn("entries", move |_| {
            Ok(Value::array(
                d6.borrow()
                    .entries()
                    .iter()
                    .map(|(k, v)| Value::array(vec![Value::string(k.clone()), Value::string(v.clone())]))
                    .collect(),
            ))
        })
        .into_value()
}

fn text_encoder_constructor() -> Value {
    Value::function(|_: CallArgs| {
        Ok(HostNamespace::new()
            .with_property("encoding", Value::string("utf-8"))
            .with_fn("encode", |args: CallArgs| {
                let input = args.arg(0).as_str().unwrap_or_default();
                Ok(Value::bytes(text_codec::encode(input)))
            })
            .with_fn("encodeInto", |args: CallArgs| {
                let input = args.arg(0).as_str().unwrap_or_default().to_owned();
                let dest_len = args.arg(1).as_bytes().map_or(0, |b| b.len());
                let (read, written) = text_codec::encode_into(&input, dest_len);
                Ok(Value::plain(vec![
                    ("read".to_owned(), Value::Number(read as f64)),
                    ("written".to_owned(), Value::Number(written.len() as f64)),
                ]))
            })
            .into_value())
    })
}

fn text_decoder_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let options = args.arg(1);
        let fatal = matches!(plain_get(&options, "fatal"), Some(Value::Boolean(true)));
        let ignore_bom = matches!(plain_get(&options, "ignoreBOM"), Some(Value::Boolean(true)));
        Ok(HostNamespace::new()
            .with_property("encoding", Value::string("utf-8"))
            .with_fn("decode", move |args: CallArgs| {
                let bytes = args.arg(0).as_bytes().unwrap_or_default();
                text_codec::decode(&bytes, fatal, ignore_bom).map(Value::string).map_err(ScriptError::into_value)
            })
            .into_value())
    })
}

fn event_target_constructor() -> Value {
    Value::function(|_: CallArgs| Ok(event_target_to_value(&Rc::new(EventTarget::new()))))
}

fn event_target_to_value(target: &Rc<EventTarget>) -> Value {
    let t1 = Rc::clone(target);
    let t2 = Rc::clone(target);
    let t3 = Rc::clone(target);
    HostNamespace::new()
        .with_fn("addEventListener", move |args: CallArgs| {
            let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
            if let Some(callback) = as_callable(&args.arg(1)) {
                t1.add_event_listener(&event_type, callback, false);
            }
            Ok(Value::Undefined)
        })
        .with_fn("removeEventListener", move |args: CallArgs| {
            let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
            if let Some(callback) = as_callable(&args.arg(1)) {
                t2.remove_event_listener(&event_type, &callback);
            }
            Ok(Value::Undefined)
        })
        .with_fn("dispatchEvent", move |args: CallArgs| {
            let event_value = args.arg(0);
            let event_type = plain_get(&event_value, "type").and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default();
            let detail = plain_get(&event_value, "detail").unwrap_or(Value::Undefined);
            t3.dispatch_event(&Event::custom(event_type, detail));
            Ok(Value::Boolean(true))
        })
        .into_value()
}

fn event_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
        Ok(Event::new(event_type).to_value())
    })
}

fn custom_event_constructor() -> Value {
    Value::function(|args: CallArgs| {
        let event_type = args.arg(0).as_str().unwrap_or_default().to_owned();
        let detail = plain_get(&args.arg(1), "detail").unwrap_or(Value::Undefined);
        Ok(Event::custom(event_type, detail).to_value())
    })
}
