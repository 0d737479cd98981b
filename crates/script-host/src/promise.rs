//! The user-visible Promise, driven entirely by the host's `EventLoop`
//! instead of the real engine's native microtask queue (spec 4.D, design
//! notes "Why a shadow Promise?"). `ChainedPromise` is the data model spec
//! section 3 describes; everything in this module operates directly on an
//! already-resolved `Rc<RefCell<ChainedPromise>>` handle, never on a
//! `this`-typed script receiver. The "method theft" guard spec 4.D requires
//! — rejecting `promise.then.call(notAPromise)` — therefore lives one layer
//! up, in the binding that exposes `.then`/`.catch`/`.finally` to script
//! (`script-host-v8`'s `bindings.rs::check_receiver`), which compares the
//! call's `args.this` against the specific promise each method closure was
//! bound to and throws a `TypeError` on mismatch before ever reaching this
//! module.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::ScriptError;
use crate::event_loop::EventLoop;
use crate::iterable::drain_iterable;
use crate::value::{CallArgs, HostCallable, Value};

/// One of the three monotonic states a promise can be in (spec section 3).
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

type SettleCallback = Box<dyn FnOnce(Result<Value, Value>)>;

/// The internal identity backing a user-visible promise object.
pub struct ChainedPromise {
    event_loop: Rc<dyn EventLoop>,
    state: PromiseState,
    reactions: VecDeque<SettleCallback>,
}

impl ChainedPromise {
    /// Create a new pending promise bound to `event_loop` (every reaction it
    /// ever schedules runs as a microtask on that loop).
    #[must_use]
    pub fn pending(event_loop: Rc<dyn EventLoop>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { event_loop, state: PromiseState::Pending, reactions: VecDeque::new() }))
    }

    #[must_use]
    pub const fn state(&self) -> &PromiseState {
        &self.state
    }

    fn outcome(&self) -> Option<Result<Value, Value>> {
        match &self.state {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(v) => Some(Ok(v.clone())),
            PromiseState::Rejected(v) => Some(Err(v.clone())),
        }
    }
}

/// Register `callback` to run (as a microtask) once `promise` settles. If
/// it is already settled, the microtask is scheduled immediately.
fn add_reaction(promise: &Rc<RefCell<ChainedPromise>>, callback: SettleCallback) {
    let already = promise.borrow().outcome();
    match already {
        Some(outcome) => {
            let event_loop = Rc::clone(&promise.borrow().event_loop);
            event_loop.queue_microtask(Box::new(move || callback(outcome)));
        }
        None => promise.borrow_mut().reactions.push_back(callback),
    }
}

/// Transition `promise` out of `Pending`, draining its reaction queue as
/// microtasks, in enqueue order (spec's reaction-drain invariant). A no-op
/// if the promise already settled — this is the single place the "state
/// transitions are monotonic and one-shot" invariant is enforced.
fn settle(promise: &Rc<RefCell<ChainedPromise>>, outcome: Result<Value, Value>) {
    let (event_loop, reactions) = {
        let mut state_ref = promise.borrow_mut();
        if !matches!(state_ref.state, PromiseState::Pending) {
            return;
        }
        state_ref.state = match &outcome {
            Ok(v) => PromiseState::Fulfilled(v.clone()),
            Err(v) => PromiseState::Rejected(v.clone()),
        };
        (Rc::clone(&state_ref.event_loop), std::mem::take(&mut state_ref.reactions))
    };
    for reaction in reactions {
        let outcome = outcome.clone();
        event_loop.queue_microtask(Box::new(move || reaction(outcome)));
    }
}

/// Apply the resolution algorithm (spec 4.D) to settle `promise` with `x`.
pub fn resolve_value(promise: &Rc<RefCell<ChainedPromise>>, x: Value) {
    if !matches!(promise.borrow().state, PromiseState::Pending) {
        return;
    }

    if let Some(x_promise) = x.as_promise() {
        if Rc::ptr_eq(&x_promise, promise) {
            reject_value(promise, ScriptError::type_error("chaining cycle detected").into_value());
            return;
        }
        let target = Rc::clone(promise);
        add_reaction(
            &x_promise,
            Box::new(move |outcome| match outcome {
                Ok(v) => resolve_value(&target, v),
                Err(r) => reject_value(&target, r),
            }),
        );
        return;
    }

    if let Some(then_fn) = x.then_callable() {
        let event_loop = Rc::clone(&promise.borrow().event_loop);
        let target_ok = Rc::clone(promise);
        let target_err = Rc::clone(promise);
        let receiver = x.clone();
        event_loop.queue_microtask(Box::new(move || {
            let resolve_fn = Value::function(move |args: CallArgs| {
                resolve_value(&target_ok, args.arg(0));
                Ok(Value::Undefined)
            });
            let target_err2 = Rc::clone(&target_err);
            let reject_fn = Value::function(move |args: CallArgs| {
                reject_value(&target_err2, args.arg(0));
                Ok(Value::Undefined)
            });
            let call = CallArgs { this: receiver, args: vec![resolve_fn, reject_fn] };
            if let Err(thrown) = (then_fn)(call) {
                reject_value(&target_err, thrown);
            }
        }));
        return;
    }

    settle(promise, Ok(x));
}

/// Reject `promise` with `reason`, a no-op if already settled.
pub fn reject_value(promise: &Rc<RefCell<ChainedPromise>>, reason: Value) {
    settle(promise, Err(reason));
}

/// `new Promise(executor)` (spec 4.D "Construction"). `executor` returning
/// `Err(thrown)` models a synchronous throw; per spec that only rejects the
/// promise if it is still pending.
pub fn new_promise<F>(event_loop: Rc<dyn EventLoop>, executor: F) -> Rc<RefCell<ChainedPromise>>
where
    F: FnOnce(Rc<HostCallable>, Rc<HostCallable>) -> Result<(), Value>,
{
    let promise = ChainedPromise::pending(event_loop);
    let resolve_target = Rc::clone(&promise);
    let resolve_fn: Rc<HostCallable> = Rc::new(move |args: CallArgs| {
        resolve_value(&resolve_target, args.arg(0));
        Ok(Value::Undefined)
    });
    let reject_target = Rc::clone(&promise);
    let reject_fn: Rc<HostCallable> = Rc::new(move |args: CallArgs| {
        reject_value(&reject_target, args.arg(0));
        Ok(Value::Undefined)
    });
    if let Err(thrown) = executor(resolve_fn, reject_fn) {
        reject_value(&promise, thrown);
    }
    promise
}

/// `promise.then(onFulfilled, onRejected)` (spec 4.D "Reactions").
/// `None` handlers pass the settled state through to the derived promise
/// verbatim.
pub fn then(
    promise: &Rc<RefCell<ChainedPromise>>,
    on_fulfilled: Option<Rc<HostCallable>>,
    on_rejected: Option<Rc<HostCallable>>,
) -> Rc<RefCell<ChainedPromise>> {
    let event_loop = Rc::clone(&promise.borrow().event_loop);
    let derived = ChainedPromise::pending(event_loop);
    let derived_for_callback = Rc::clone(&derived);
    add_reaction(
        promise,
        Box::new(move |outcome| {
            let handler = match &outcome {
                Ok(_) => on_fulfilled,
                Err(_) => on_rejected,
            };
            match handler {
                None => match outcome {
                    Ok(v) => resolve_value(&derived_for_callback, v),
                    Err(r) => reject_value(&derived_for_callback, r),
                },
                Some(callback) => {
                    let value = match outcome {
                        Ok(v) | Err(v) => v,
                    };
                    match callback(CallArgs::new(vec![value])) {
                        Ok(result) => resolve_value(&derived_for_callback, result),
                        Err(thrown) => reject_value(&derived_for_callback, thrown),
                    }
                }
            }
        }),
    );
    derived
}

/// `promise.catch(onRejected)` === `promise.then(undefined, onRejected)`.
pub fn catch(promise: &Rc<RefCell<ChainedPromise>>, on_rejected: Rc<HostCallable>) -> Rc<RefCell<ChainedPromise>> {
    then(promise, None, Some(on_rejected))
}

/// `promise.finally(onFinally)`: runs on both outcomes without observing or
/// changing the settled value, unless `onFinally` itself throws or returns a
/// rejected promise (spec 4.D).
pub fn finally(promise: &Rc<RefCell<ChainedPromise>>, on_finally: Rc<HostCallable>) -> Rc<RefCell<ChainedPromise>> {
    let event_loop = Rc::clone(&promise.borrow().event_loop);
    let derived = ChainedPromise::pending(event_loop);
    let derived_for_callback = Rc::clone(&derived);
    add_reaction(
        promise,
        Box::new(move |outcome| {
            let ran = on_finally(CallArgs::new(vec![]));
            match ran {
                Err(thrown) => reject_value(&derived_for_callback, thrown),
                Ok(returned) => {
                    // A returned thenable defers settlement; otherwise pass
                    // the original outcome through untouched.
                    if returned.then_callable().is_some() || returned.as_promise().is_some() {
                        let outcome = outcome.clone();
                        let inner = crate::iterable::await_thenable(
                            &Rc::clone(&derived_for_callback.borrow().event_loop),
                            &returned,
                        );
                        match inner {
                            Some(inner_promise) => {
                                let derived2 = Rc::clone(&derived_for_callback);
                                add_reaction(
                                    &inner_promise,
                                    Box::new(move |inner_outcome| match inner_outcome {
                                        Ok(_) => match outcome {
                                            Ok(v) => resolve_value(&derived2, v),
                                            Err(r) => reject_value(&derived2, r),
                                        },
                                        Err(r) => reject_value(&derived2, r),
                                    }),
                                );
                            }
                            None => match outcome {
                                Ok(v) => resolve_value(&derived_for_callback, v),
                                Err(r) => reject_value(&derived_for_callback, r),
                            },
                        }
                    } else {
                        match outcome {
                            Ok(v) => resolve_value(&derived_for_callback, v),
                            Err(r) => reject_value(&derived_for_callback, r),
                        }
                    }
                }
            }
        }),
    );
    derived
}

/// `Promise.resolve(x)`.
pub fn static_resolve(event_loop: Rc<dyn EventLoop>, x: Value) -> Rc<RefCell<ChainedPromise>> {
    if let Some(existing) = x.as_promise() {
        return existing;
    }
    let promise = ChainedPromise::pending(event_loop);
    resolve_value(&promise, x);
    promise
}

/// `Promise.reject(r)`.
pub fn static_reject(event_loop: Rc<dyn EventLoop>, reason: Value) -> Rc<RefCell<ChainedPromise>> {
    let promise = ChainedPromise::pending(event_loop);
    reject_value(&promise, reason);
    promise
}

/// `Promise.all(iterable)`.
///
/// # Errors
/// Propagates `drain_iterable`'s `ScriptError` when the argument is not
/// iterable.
pub fn static_all(event_loop: Rc<dyn EventLoop>, iterable: &Value) -> Result<Rc<RefCell<ChainedPromise>>, ScriptError> {
    let items = drain_iterable(iterable)?;
    let result = ChainedPromise::pending(Rc::clone(&event_loop));
    if items.is_empty() {
        resolve_value(&result, Value::array(vec![]));
        return Ok(result);
    }
    let total = items.len();
    let collected = Rc::new(RefCell::new(vec![Value::Undefined; total]));
    let remaining = Rc::new(RefCell::new(total));
    for (index, item) in items.into_iter().enumerate() {
        let item_promise = static_resolve(Rc::clone(&event_loop), item);
        let collected = Rc::clone(&collected);
        let remaining = Rc::clone(&remaining);
        let result = Rc::clone(&result);
        add_reaction(
            &item_promise,
            Box::new(move |outcome| match outcome {
                Ok(v) => {
                    collected.borrow_mut()[index] = v;
                    *remaining.borrow_mut() -= 1;
                    if *remaining.borrow() == 0 {
                        resolve_value(&result, Value::array(collected.borrow().clone()));
                    }
                }
                Err(r) => reject_value(&result, r),
            }),
        );
    }
    Ok(result)
}

fn settled_record(status: &str, key: &str, value: Value) -> Value {
    Value::plain(vec![("status".to_owned(), Value::string(status)), (key.to_owned(), value)])
}

/// `Promise.allSettled(iterable)`.
///
/// # Errors
/// Propagates `drain_iterable`'s `ScriptError`.
pub fn static_all_settled(
    event_loop: Rc<dyn EventLoop>,
    iterable: &Value,
) -> Result<Rc<RefCell<ChainedPromise>>, ScriptError> {
    let items = drain_iterable(iterable)?;
    let result = ChainedPromise::pending(Rc::clone(&event_loop));
    if items.is_empty() {
        resolve_value(&result, Value::array(vec![]));
        return Ok(result);
    }
    let total = items.len();
    let collected = Rc::new(RefCell::new(vec![Value::Undefined; total]));
    let remaining = Rc::new(RefCell::new(total));
    for (index, item) in items.into_iter().enumerate() {
        let item_promise = static_resolve(Rc::clone(&event_loop), item);
        let collected = Rc::clone(&collected);
        let remaining = Rc::clone(&remaining);
        let result = Rc::clone(&result);
        add_reaction(
            &item_promise,
            Box::new(move |outcome| {
                collected.borrow_mut()[index] = match outcome {
                    Ok(v) => settled_record("fulfilled", "value", v),
                    Err(r) => settled_record("rejected", "reason", r),
                };
                *remaining.borrow_mut() -= 1;
                if *remaining.borrow() == 0 {
                    resolve_value(&result, Value::array(collected.borrow().clone()));
                }
            }),
        );
    }
    Ok(result)
}

/// `Promise.race(iterable)`. An empty iterable never settles.
///
/// # Errors
/// Propagates `drain_iterable`'s `ScriptError`.
pub fn static_race(event_loop: Rc<dyn EventLoop>, iterable: &Value) -> Result<Rc<RefCell<ChainedPromise>>, ScriptError> {
    let items = drain_iterable(iterable)?;
    let result = ChainedPromise::pending(Rc::clone(&event_loop));
    for item in items {
        let item_promise = static_resolve(Rc::clone(&event_loop), item);
        let result = Rc::clone(&result);
        add_reaction(
            &item_promise,
            Box::new(move |outcome| match outcome {
                Ok(v) => resolve_value(&result, v),
                Err(r) => reject_value(&result, r),
            }),
        );
    }
    Ok(result)
}

/// `Promise.any(iterable)`. Rejects with an `AggregateError` if every input
/// rejects; an empty iterable rejects immediately with an empty-errors one.
///
/// # Errors
/// Propagates `drain_iterable`'s `ScriptError`.
pub fn static_any(event_loop: Rc<dyn EventLoop>, iterable: &Value) -> Result<Rc<RefCell<ChainedPromise>>, ScriptError> {
    let items = drain_iterable(iterable)?;
    let result = ChainedPromise::pending(Rc::clone(&event_loop));
    if items.is_empty() {
        reject_value(&result, ScriptError::AggregateError(vec![]).into_value());
        return Ok(result);
    }
    let total = items.len();
    let errors = Rc::new(RefCell::new(vec![Value::Undefined; total]));
    let remaining = Rc::new(RefCell::new(total));
    for (index, item) in items.into_iter().enumerate() {
        let item_promise = static_resolve(Rc::clone(&event_loop), item);
        let errors = Rc::clone(&errors);
        let remaining = Rc::clone(&remaining);
        let result = Rc::clone(&result);
        add_reaction(
            &item_promise,
            Box::new(move |outcome| match outcome {
                Ok(v) => resolve_value(&result, v),
                Err(r) => {
                    errors.borrow_mut()[index] = r;
                    *remaining.borrow_mut() -= 1;
                    if *remaining.borrow() == 0 {
                        reject_value(&result, ScriptError::AggregateError(errors.borrow().clone()).into_value());
                    }
                }
            }),
        );
    }
    Ok(result)
}
