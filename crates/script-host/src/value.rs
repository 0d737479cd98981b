//! Engine-agnostic representation of JavaScript values.
//!
//! The real scripting engine is an external collaborator (see spec section
//! 1): this module stands in for "whatever value model the embedded engine
//! exposes", playing the same role the teacher's `JSValue`
//! (`crates/js/src/bindings/values.rs`) plays for its much smaller console/
//! document bindings. Every component in this crate (Promise, structured
//! clone, abort, web globals) is written against `Value`, so swapping in a
//! real engine is a matter of writing a bidirectional `Value <-> engine`
//! converter (see `script-host-v8`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::abort::AbortSignal;
use crate::promise::ChainedPromise;

/// Process-unique identifier for a `Symbol`. Symbols are treated as opaque
/// and compared by identity only (spec 4.E, dispatch case 2).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SymbolId(pub u64);

/// A callable host-side function. Scripts invoke these as ordinary
/// functions; the identity of the `Rc` is what a thenable check or a
/// `DataCloneError` test keys off of.
pub type HostCallable = dyn Fn(CallArgs) -> Result<Value, Value>;

/// Arguments passed to a `HostCallable`.
pub struct CallArgs {
    /// The `this` binding, if the engine supplied one.
    pub this: Value,
    /// Positional arguments.
    pub args: Vec<Value>,
}

impl CallArgs {
    /// Build call arguments with an undefined receiver.
    #[must_use]
    pub fn new(args: Vec<Value>) -> Self {
        Self { this: Value::Undefined, args }
    }

    /// Positional argument by index, or `undefined` past the end.
    #[must_use]
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Undefined)
    }
}

/// An engine-agnostic JavaScript value.
///
/// `Object` is the single handle type for every reference-kind value
/// (plain objects, arrays, dates, maps, sets, regexes, errors, functions,
/// promises); `ObjectData` carries the subtype. This mirrors how a real
/// engine has one `Local<Value>`/`Local<Object>` handle type and dispatches
/// on shape, which is exactly the technique spec 4.E requires ("dispatch
/// uses both the presence of the canonical interface... and a matching
/// `constructor.name`").
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(SymbolId),
    Object(ObjectHandle),
}

/// A reference-counted handle to object-kind data. Two handles are the same
/// object iff `Rc::ptr_eq` holds; `identity()` gives a stable integer for use
/// as a `VisitedMap`/`HashMap` key, standing in for the "address-like handle"
/// spec's design notes call for.
#[derive(Clone)]
pub struct ObjectHandle(pub Rc<RefCell<ObjectData>>);

impl ObjectHandle {
    #[must_use]
    pub fn new(data: ObjectData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    /// Stable per-object identity for cycle detection (spec's `VisitedMap`).
    #[must_use]
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// The subtype-specific payload behind an `ObjectHandle`.
pub enum ObjectData {
    /// A plain object (or a host-defined exotic object carrying ordered
    /// own-enumerable properties). Order is insertion order, matching
    /// JS's own-key enumeration for string keys.
    Plain(Vec<(String, Value)>),
    Array(Vec<Value>),
    Date { epoch_ms: f64 },
    RegExp { source: String, flags: String },
    /// Ordered to match `forEach` iteration order (insertion order).
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    Function(Rc<HostCallable>),
    Error { name: String, message: String },
    Promise(Rc<RefCell<ChainedPromise>>),
    /// Stand-in for both `ArrayBuffer` and an integer-typed array view over
    /// one (`Uint8Array` and friends). The web globals that touch binary
    /// data (`Blob`, `TextEncoder`/`TextDecoder`, `crypto.getRandomValues`)
    /// only ever need raw bytes, so this crate does not model the
    /// buffer/view split a real engine has.
    Bytes(Vec<u8>),
    /// Carries the real `AbortSignal` identity so `AbortSignal.any`/the
    /// `"abort"` listener machinery can operate on it directly instead of
    /// re-deriving state from a plain-object snapshot.
    AbortSignal(Rc<AbortSignal>),
}

impl Value {
    #[must_use]
    pub fn string<S: Into<Rc<str>>>(value: S) -> Self {
        Self::String(value.into())
    }

    #[must_use]
    pub fn object(data: ObjectData) -> Self {
        Self::Object(ObjectHandle::new(data))
    }

    #[must_use]
    pub fn array(items: Vec<Value>) -> Self {
        Self::object(ObjectData::Array(items))
    }

    #[must_use]
    pub fn plain(entries: Vec<(String, Value)>) -> Self {
        Self::object(ObjectData::Plain(entries))
    }

    #[must_use]
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Value, Value> + 'static,
    {
        Self::object(ObjectData::Function(Rc::new(f)))
    }

    #[must_use]
    pub fn promise(promise: Rc<RefCell<ChainedPromise>>) -> Self {
        Self::object(ObjectData::Promise(promise))
    }

    #[must_use]
    pub fn bytes(data: Vec<u8>) -> Self {
        Self::object(ObjectData::Bytes(data))
    }

    #[must_use]
    pub fn abort_signal(signal: Rc<AbortSignal>) -> Self {
        Self::object(ObjectData::AbortSignal(signal))
    }

    #[must_use]
    pub fn as_abort_signal(&self) -> Option<Rc<AbortSignal>> {
        let handle = self.as_object()?;
        match &*handle.0.borrow() {
            ObjectData::AbortSignal(signal) => Some(Rc::clone(signal)),
            _ => None,
        }
    }

    /// Copy the bytes out of a `Bytes` value, if this is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        let handle = self.as_object()?;
        match &*handle.0.borrow() {
            ObjectData::Bytes(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Is this `null` or `undefined`? Many coercions short-circuit on this.
    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self {
            Self::Object(handle) => Some(handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// `ToNumber`-style coercion (spec 4.C: "non-numeric delays coerce to
    /// number"), distinct from `as_number`'s strict "only if it already is
    /// one" check. Strings parse via `str::trim`/`f64::parse`, matching JS's
    /// whitespace-tolerant numeric string grammar; an empty or all-whitespace
    /// string coerces to `0.0`, same as `Number("")`. Booleans coerce to
    /// `0.0`/`1.0`, `null` to `0.0`. Anything else that doesn't parse yields
    /// `NaN`, leaving the "NaN/negative clamps to 0" decision to the caller.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(b) => f64::from(*b),
            Self::Null => 0.0,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() { 0.0 } else { trimmed.parse::<f64>().unwrap_or(f64::NAN) }
            }
            Self::Undefined | Self::Symbol(_) | Self::Object(_) => f64::NAN,
        }
    }

    /// `constructor.name`-style tag used by structured clone's subtype
    /// dispatch (spec 4.E). Real engines derive this by walking the
    /// prototype chain; here the tag is simply the `ObjectData` discriminant.
    #[must_use]
    pub fn constructor_name(&self) -> Option<&'static str> {
        let Self::Object(handle) = self else { return None };
        Some(match &*handle.0.borrow() {
            ObjectData::Plain(_) => "Object",
            ObjectData::Array(_) => "Array",
            ObjectData::Date { .. } => "Date",
            ObjectData::RegExp { .. } => "RegExp",
            ObjectData::Map(_) => "Map",
            ObjectData::Set(_) => "Set",
            ObjectData::Function(_) => "Function",
            ObjectData::Error { .. } => "Error",
            ObjectData::Promise(_) => "Promise",
            ObjectData::Bytes(_) => "Uint8Array",
            ObjectData::AbortSignal(_) => "AbortSignal",
        })
    }

    /// A callable `then` property, if this value is an object exposing one
    /// of our function objects under `"then"`. Real engines would do a
    /// property lookup; plain objects here can carry a `"then"` entry to
    /// model host-defined thenables (spec 4.B).
    #[must_use]
    pub fn then_callable(&self) -> Option<Rc<HostCallable>> {
        let handle = self.as_object()?;
        match &*handle.0.borrow() {
            ObjectData::Promise(_) => None,
            ObjectData::Plain(entries) => entries.iter().find(|(k, _)| k == "then").and_then(|(_, v)| match v {
                Value::Object(inner) => match &*inner.0.borrow() {
                    ObjectData::Function(f) => Some(Rc::clone(f)),
                    _ => None,
                },
                _ => None,
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_promise(&self) -> Option<Rc<RefCell<ChainedPromise>>> {
        let handle = self.as_object()?;
        match &*handle.0.borrow() {
            ObjectData::Promise(p) => Some(Rc::clone(p)),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(id) => write!(f, "Symbol({})", id.0),
            Self::Object(handle) => write!(f, "[object {}]", self_tag(handle)),
        }
    }
}

fn self_tag(handle: &ObjectHandle) -> &'static str {
    match &*handle.0.borrow() {
        ObjectData::Plain(_) => "Object",
        ObjectData::Array(_) => "Array",
        ObjectData::Date { .. } => "Date",
        ObjectData::RegExp { .. } => "RegExp",
        ObjectData::Map(_) => "Map",
        ObjectData::Set(_) => "Set",
        ObjectData::Function(_) => "Function",
        ObjectData::Error { .. } => "Error",
        ObjectData::Promise(_) => "Promise",
        ObjectData::Bytes(_) => "Uint8Array",
        ObjectData::AbortSignal(_) => "AbortSignal",
    }
}

/// A per-call identity map, used directly by `structuredClone`'s cycle
/// detection (spec's `VisitedMap`) and reusable anywhere else object
/// identity needs to be remembered for the duration of one operation.
#[derive(Default)]
pub struct VisitedMap {
    seen: HashMap<usize, Value>,
}

impl VisitedMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, handle: &ObjectHandle) -> Option<Value> {
        self.seen.get(&handle.identity()).cloned()
    }

    pub fn insert(&mut self, handle: &ObjectHandle, clone: Value) {
        self.seen.insert(handle.identity(), clone);
    }
}
