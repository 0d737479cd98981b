//! `EventTarget`, `Event`, and `CustomEvent` (spec 4.G), the shared listener
//! machinery `AbortSignal`'s `"abort"` dispatch and any future event-bearing
//! web global builds on. Kept deliberately small: no capture/bubble phases,
//! no DOM tree — spec scopes this to "host-defined event targets", not a
//! full DOM event model (see spec Non-goals).

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{CallArgs, HostCallable, Value};

/// A dispatched event. `detail` is only meaningful for `CustomEvent`; plain
/// `Event`s leave it `Undefined`.
#[derive(Clone)]
pub struct Event {
    pub event_type: String,
    pub detail: Value,
}

impl Event {
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self { event_type: event_type.into(), detail: Value::Undefined }
    }

    #[must_use]
    pub fn custom(event_type: impl Into<String>, detail: Value) -> Self {
        Self { event_type: event_type.into(), detail }
    }

    /// Script-visible representation: `{type, detail}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::plain(vec![
            ("type".to_owned(), Value::string(self.event_type.clone())),
            ("detail".to_owned(), self.detail.clone()),
        ])
    }
}

struct Listener {
    callback: Rc<HostCallable>,
    once: bool,
}

/// Listener registry for one event type. `EventTarget` keeps one of these
/// per `event_type` it has ever seen a listener for.
#[derive(Default)]
struct ListenerList {
    listeners: Vec<Listener>,
}

/// A minimal `EventTarget`: `addEventListener`/`removeEventListener`/
/// `dispatchEvent`, keyed by identity of the registered callback (spec 4.G
/// "listener identity for removal").
#[derive(Default)]
pub struct EventTarget {
    by_type: RefCell<Vec<(String, ListenerList)>>,
}

impl EventTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(by_type: &mut Vec<(String, ListenerList)>, event_type: &str) -> &mut ListenerList {
        if let Some(index) = by_type.iter().position(|(t, _)| t == event_type) {
            &mut by_type[index].1
        } else {
            by_type.push((event_type.to_owned(), ListenerList::default()));
            let last = by_type.len() - 1;
            &mut by_type[last].1
        }
    }

    /// Register `callback` for `event_type`. Registering the same callback
    /// identity twice for the same type is a no-op (spec's duplicate-listener
    /// rule).
    pub fn add_event_listener(&self, event_type: &str, callback: Rc<HostCallable>, once: bool) {
        let mut by_type = self.by_type.borrow_mut();
        let list = Self::entry(&mut by_type, event_type);
        if list.listeners.iter().any(|l| Rc::ptr_eq(&l.callback, &callback)) {
            return;
        }
        list.listeners.push(Listener { callback, once });
    }

    /// Remove a previously registered listener by identity. Unknown
    /// callbacks are a silent no-op.
    pub fn remove_event_listener(&self, event_type: &str, callback: &Rc<HostCallable>) {
        let mut by_type = self.by_type.borrow_mut();
        if let Some((_, list)) = by_type.iter_mut().find(|(t, _)| t == event_type) {
            list.listeners.retain(|l| !Rc::ptr_eq(&l.callback, callback));
        }
    }

    /// Invoke every listener registered for `event.event_type`, in
    /// registration order, removing `once` listeners first. Listener
    /// exceptions are swallowed (there is no script-visible caller to
    /// propagate to — spec's "dispatch never throws" note), though a real
    /// host normally reports them via its unhandled-error channel.
    pub fn dispatch_event(&self, event: &Event) {
        let callbacks: Vec<Rc<HostCallable>> = {
            let mut by_type = self.by_type.borrow_mut();
            let Some((_, list)) = by_type.iter_mut().find(|(t, _)| t == event.event_type) else {
                return;
            };
            let snapshot: Vec<Rc<HostCallable>> = list.listeners.iter().map(|l| Rc::clone(&l.callback)).collect();
            list.listeners.retain(|l| !l.once);
            snapshot
        };
        let value = event.to_value();
        for callback in callbacks {
            let _ = callback(CallArgs::new(vec![value.clone()]));
        }
    }
}
