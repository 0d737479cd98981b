//! Engine-agnostic host bindings facade (spec 4.H's building block), in the
//! same shape as the teacher's `HostNamespace`/`HostBindings` builder
//! (`crates/js/src/bindings.rs`), generalized from `Arc<HostFnSync>` +
//! `Send + Sync` (the teacher runs bindings off a multi-threaded executor)
//! down to `Rc<HostCallable>` (this crate's engine is single-threaded —
//! spec section 5).

use std::collections::BTreeMap;

use crate::value::{CallArgs, HostCallable, ObjectData, ObjectHandle, Value};
use std::rc::Rc;

/// A namespace of functions and constant properties destined for one
/// script-visible global object (e.g. `console`, `performance`).
#[derive(Default)]
pub struct HostNamespace {
    functions: BTreeMap<String, Rc<HostCallable>>,
    properties: BTreeMap<String, Value>,
}

impl HostNamespace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fn<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Value, Value> + 'static,
    {
        self.functions.insert(name.to_owned(), Rc::new(function));
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.properties.insert(name.to_owned(), value);
        self
    }

    /// Realize this namespace as a single `Value::plain` object, functions
    /// and properties merged, functions taking precedence on key collision
    /// (a namespace should never define both, but if it does the callable
    /// wins since that is almost always the intended member).
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut entries: Vec<(String, Value)> = self.properties.into_iter().collect();
        for (name, function) in self.functions {
            entries.retain(|(k, _)| k != &name);
            entries.push((name, Value::Object(ObjectHandle::new(ObjectData::Function(function)))));
        }
        Value::plain(entries)
    }
}

/// A full set of namespaces awaiting installation onto script globals.
#[derive(Default)]
pub struct HostBindings {
    namespaces: BTreeMap<String, HostNamespace>,
}

impl HostBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_namespace(mut self, name: &str, namespace: HostNamespace) -> Self {
        self.namespaces.insert(name.to_owned(), namespace);
        self
    }

    /// Consume into `(name, value)` pairs ready for a global-object
    /// installer to assign, in namespace-name order (deterministic, matches
    /// `BTreeMap` iteration).
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.namespaces.into_iter().map(|(name, namespace)| (name, namespace.into_value())).collect()
    }
}

/// Merge `additions` into `existing` in place, preserving `existing`'s own
/// keys on collision (spec 4.H's extend-vs-create rule for `process` and
/// `crypto`: "if the runtime already owns a global of that name... own
/// keys preserved").
pub fn extend_plain_object(existing: &Value, additions: Vec<(String, Value)>) -> Value {
    let Value::Object(handle) = existing else {
        return Value::plain(additions);
    };
    let mut borrowed = handle.0.borrow_mut();
    if let ObjectData::Plain(entries) = &mut *borrowed {
        for (key, value) in additions {
            if !entries.iter().any(|(k, _)| k == &key) {
                entries.push((key, value));
            }
        }
        drop(borrowed);
        return existing.clone();
    }
    drop(borrowed);
    existing.clone()
}
