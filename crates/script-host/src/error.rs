//! Script-visible error taxonomy (spec section 7).
//!
//! The teacher keeps a tiny two-variant error enum for its console/document
//! bindings (`crates/js/src/bindings/values.rs::JSError`). The web-platform
//! surface this crate exposes needs the richer spec-mandated taxonomy, but
//! the shape — a `thiserror` enum implementers match on, convertible into a
//! `Value` for delivery to script — is the same idea scaled up.

use std::fmt;

use crate::value::{ObjectData, Value};

/// A DOMException name, carrying its legacy numeric `code` (spec section 6).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DomExceptionName {
    IndexSizeError,
    HierarchyRequestError,
    WrongDocumentError,
    InvalidCharacterError,
    NoModificationAllowedError,
    NotFoundError,
    NotSupportedError,
    InvalidStateError,
    SyntaxError,
    InvalidModificationError,
    NamespaceError,
    InvalidAccessError,
    SecurityError,
    NetworkError,
    AbortError,
    QuotaExceededError,
    TimeoutError,
    DataCloneError,
    /// Any name not in the legacy table; `code()` is 0 per spec (DOMException
    /// accepts an arbitrary `name` string).
    Other(&'static str),
}

impl DomExceptionName {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::IndexSizeError => 1,
            Self::HierarchyRequestError => 3,
            Self::WrongDocumentError => 4,
            Self::InvalidCharacterError => 5,
            Self::NoModificationAllowedError => 7,
            Self::NotFoundError => 8,
            Self::NotSupportedError => 9,
            Self::InvalidStateError => 11,
            Self::SyntaxError => 12,
            Self::InvalidModificationError => 13,
            Self::NamespaceError => 14,
            Self::InvalidAccessError => 15,
            Self::SecurityError => 18,
            Self::NetworkError => 19,
            Self::AbortError => 20,
            Self::QuotaExceededError => 22,
            Self::TimeoutError => 23,
            Self::DataCloneError => 25,
            Self::Other(_) => 0,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IndexSizeError => "IndexSizeError",
            Self::HierarchyRequestError => "HierarchyRequestError",
            Self::WrongDocumentError => "WrongDocumentError",
            Self::InvalidCharacterError => "InvalidCharacterError",
            Self::NoModificationAllowedError => "NoModificationAllowedError",
            Self::NotFoundError => "NotFoundError",
            Self::NotSupportedError => "NotSupportedError",
            Self::InvalidStateError => "InvalidStateError",
            Self::SyntaxError => "SyntaxError",
            Self::InvalidModificationError => "InvalidModificationError",
            Self::NamespaceError => "NamespaceError",
            Self::InvalidAccessError => "InvalidAccessError",
            Self::SecurityError => "SecurityError",
            Self::NetworkError => "NetworkError",
            Self::AbortError => "AbortError",
            Self::QuotaExceededError => "QuotaExceededError",
            Self::TimeoutError => "TimeoutError",
            Self::DataCloneError => "DataCloneError",
            Self::Other(name) => name,
        }
    }
}

/// Script-visible failure kinds. Implementers map internal failures onto
/// these before handing them to script as a thrown `Value`.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("RangeError: {0}")]
    RangeError(String),
    #[error("{0}: {1}", .0.name())]
    DomException(DomExceptionName, String),
    #[error("AggregateError: {0} errors")]
    AggregateError(Vec<Value>),
}

impl ScriptError {
    #[must_use]
    pub fn type_error<M: Into<String>>(message: M) -> Self {
        Self::TypeError(message.into())
    }

    #[must_use]
    pub fn range_error<M: Into<String>>(message: M) -> Self {
        Self::RangeError(message.into())
    }

    #[must_use]
    pub fn dom_exception<M: Into<String>>(name: DomExceptionName, message: M) -> Self {
        Self::DomException(name, message.into())
    }

    /// The default reason `AbortController.abort()` uses when none is given
    /// (spec 4.F).
    #[must_use]
    pub fn default_abort_reason() -> Self {
        Self::dom_exception(DomExceptionName::AbortError, "signal is aborted without reason")
    }

    /// Convert this error into a `Value` an engine can throw/settle a
    /// rejected promise with. Host-thrown engine errors are expected to
    /// travel the other direction unchanged (spec section 7's propagation
    /// policy) — this conversion only applies to errors *originating* in
    /// this crate.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::TypeError(message) => error_value("TypeError", message),
            Self::RangeError(message) => error_value("RangeError", message),
            Self::DomException(name, message) => {
                let mut entries = vec![
                    ("name".to_owned(), Value::string(name.name())),
                    ("message".to_owned(), Value::string(message.clone())),
                    ("code".to_owned(), Value::Number(f64::from(name.code()))),
                ];
                entries.push((
                    "toString".to_owned(),
                    Value::function(move |_| Ok(Value::string(format!("{}: {}", name.name(), message)))),
                ));
                Value::plain(entries)
            }
            Self::AggregateError(errors) => {
                let message = format!("{} errors occurred", errors.len());
                Value::plain(vec![
                    ("name".to_owned(), Value::string("AggregateError")),
                    ("message".to_owned(), Value::string(message)),
                    ("errors".to_owned(), Value::array(errors)),
                ])
            }
        }
    }
}

fn error_value(name: &'static str, message: String) -> Value {
    Value::object(ObjectData::Error { name: name.to_owned(), message })
}

impl fmt::Display for DomExceptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
