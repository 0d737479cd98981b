//! `AbortController` / `AbortSignal` (spec 4.F), including `AbortSignal.any`
//! and `AbortSignal.timeout`. Built directly on `event_target::EventTarget`
//! for the one-shot `"abort"` dispatch, the same way a real DOM
//! `AbortSignal` is itself an `EventTarget` subclass.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{DomExceptionName, ScriptError};
use crate::event_loop::EventLoop;
use crate::event_target::{Event, EventTarget};
use crate::value::{HostCallable, Value};

/// The signal half. `aborted`/`reason` are monotonic: once set, they never
/// change again (spec 4.F invariant).
pub struct AbortSignal {
    target: EventTarget,
    aborted: Cell<bool>,
    reason: RefCell<Value>,
}

impl AbortSignal {
    #[must_use]
    fn new() -> Rc<Self> {
        Rc::new(Self { target: EventTarget::new(), aborted: Cell::new(false), reason: RefCell::new(Value::Undefined) })
    }

    #[must_use]
    pub fn aborted(&self) -> bool {
        self.aborted.get()
    }

    #[must_use]
    pub fn reason(&self) -> Value {
        self.reason.borrow().clone()
    }

    /// `signal.throwIfAborted()`.
    ///
    /// # Errors
    /// Returns the abort reason (as a thrown `Value`) if already aborted.
    pub fn throw_if_aborted(&self) -> Result<(), Value> {
        if self.aborted() { Err(self.reason()) } else { Ok(()) }
    }

    pub fn add_event_listener(&self, event_type: &str, callback: Rc<HostCallable>, once: bool) {
        self.target.add_event_listener(event_type, callback, once);
    }

    pub fn remove_event_listener(&self, event_type: &str, callback: &Rc<HostCallable>) {
        self.target.remove_event_listener(event_type, callback);
    }

    fn fire(self: &Rc<Self>, reason: Value) {
        if self.aborted.get() {
            return;
        }
        self.aborted.set(true);
        *self.reason.borrow_mut() = reason.clone();
        self.target.dispatch_event(&Event::custom("abort", reason));
    }
}

/// The controller half. `signal()` hands out the paired `AbortSignal`;
/// `abort()` is idempotent past the first call (spec 4.F).
pub struct AbortController {
    signal: Rc<AbortSignal>,
}

impl AbortController {
    #[must_use]
    pub fn new() -> Self {
        Self { signal: AbortSignal::new() }
    }

    #[must_use]
    pub fn signal(&self) -> Rc<AbortSignal> {
        Rc::clone(&self.signal)
    }

    /// Abort with `reason`, or the default `AbortError` DOMException if
    /// `None`. A no-op if already aborted.
    pub fn abort(&self, reason: Option<Value>) {
        let reason = reason.unwrap_or_else(|| ScriptError::default_abort_reason().into_value());
        self.signal.fire(reason);
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// `AbortSignal.any(iterable)`: a signal that aborts as soon as any input
/// signal aborts, adopting that signal's reason, then unsubscribes from
/// every other input (spec 4.F: "unsubscribes from the others") rather than
/// leaving each remaining input holding a listener onto `combined` forever.
/// Draining the iterable argument into `signals` and validating each element
/// is an `AbortSignal` is the binding layer's job (spec 4.F); this takes the
/// already-resolved list.
#[must_use]
pub fn any(signals: &[Rc<AbortSignal>]) -> Rc<AbortSignal> {
    let combined = AbortSignal::new();
    for existing in signals {
        if existing.aborted() {
            combined.fire(existing.reason());
            return combined;
        }
    }

    let owned_signals: Rc<Vec<Rc<AbortSignal>>> = Rc::new(signals.to_vec());
    let callbacks: Rc<RefCell<Vec<Rc<HostCallable>>>> = Rc::new(RefCell::new(Vec::with_capacity(signals.len())));

    for existing in signals {
        let existing_for_listener = Rc::clone(existing);
        let combined_for_listener = Rc::clone(&combined);
        let all_signals = Rc::clone(&owned_signals);
        let all_callbacks = Rc::clone(&callbacks);
        let propagate: Rc<HostCallable> = Rc::new(move |_| {
            combined_for_listener.fire(existing_for_listener.reason());
            for (other_signal, other_callback) in all_signals.iter().zip(all_callbacks.borrow().iter()) {
                other_signal.remove_event_listener("abort", other_callback);
            }
            Ok(Value::Undefined)
        });
        existing.add_event_listener("abort", Rc::clone(&propagate), true);
        callbacks.borrow_mut().push(propagate);
    }
    combined
}

/// `AbortSignal.timeout(ms)`: a signal that aborts with a `TimeoutError`
/// DOMException once `ms` elapses on `event_loop`.
#[must_use]
pub fn timeout(event_loop: &Rc<dyn EventLoop>, ms: f64) -> Rc<AbortSignal> {
    let signal = AbortSignal::new();
    let target = Rc::clone(&signal);
    event_loop.schedule_timeout(
        ms,
        Box::new(move || {
            target.fire(ScriptError::dom_exception(DomExceptionName::TimeoutError, "signal timed out").into_value());
        }),
    );
    signal
}
