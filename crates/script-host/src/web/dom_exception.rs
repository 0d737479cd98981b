//! The script-visible `DOMException` constructor (spec 4.G), layered on top
//! of `error::DomExceptionName`/`ScriptError::DomException`, which carries
//! the same name→code table for *host-originated* exceptions. This module
//! is what `new DOMException(message, name)` calls when script constructs
//! one directly with an arbitrary name string.

use crate::error::DomExceptionName;
use crate::value::Value;

fn resolve_name(name: &str) -> DomExceptionName {
    match name {
        "IndexSizeError" => DomExceptionName::IndexSizeError,
        "HierarchyRequestError" => DomExceptionName::HierarchyRequestError,
        "WrongDocumentError" => DomExceptionName::WrongDocumentError,
        "InvalidCharacterError" => DomExceptionName::InvalidCharacterError,
        "NoModificationAllowedError" => DomExceptionName::NoModificationAllowedError,
        "NotFoundError" => DomExceptionName::NotFoundError,
        "NotSupportedError" => DomExceptionName::NotSupportedError,
        "InvalidStateError" => DomExceptionName::InvalidStateError,
        "SyntaxError" => DomExceptionName::SyntaxError,
        "InvalidModificationError" => DomExceptionName::InvalidModificationError,
        "NamespaceError" => DomExceptionName::NamespaceError,
        "InvalidAccessError" => DomExceptionName::InvalidAccessError,
        "SecurityError" => DomExceptionName::SecurityError,
        "NetworkError" => DomExceptionName::NetworkError,
        "AbortError" => DomExceptionName::AbortError,
        "QuotaExceededError" => DomExceptionName::QuotaExceededError,
        "TimeoutError" => DomExceptionName::TimeoutError,
        "DataCloneError" => DomExceptionName::DataCloneError,
        other => DomExceptionName::Other(leak_name(other)),
    }
}

/// `DomExceptionName::Other` needs a `'static str`; constructed names are
/// rare enough (one per `new DOMException(..., customName)` call) that
/// leaking is an acceptable trade for not threading a lifetime through
/// `Value`'s otherwise `'static`-only object model.
fn leak_name(name: &str) -> &'static str {
    Box::leak(name.to_owned().into_boxed_str())
}

/// `new DOMException(message = "", name = "Error")`.
#[must_use]
pub fn construct(message: &str, name: &str) -> Value {
    let resolved = resolve_name(name);
    let message = message.to_owned();
    let name = name.to_owned();
    Value::plain(vec![
        ("name".to_owned(), Value::string(name.clone())),
        ("message".to_owned(), Value::string(message.clone())),
        ("code".to_owned(), Value::Number(f64::from(resolved.code()))),
        ("toString".to_owned(), Value::function(move |_| Ok(Value::string(format!("{name}: {message}"))))),
    ])
}

/// The constructor function's own static integer code constants (spec 4.G:
/// "the constructor function itself carries the integer code constants").
#[must_use]
pub fn static_constants() -> Vec<(String, Value)> {
    vec![
        ("INDEX_SIZE_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::IndexSizeError.code()))),
        ("HIERARCHY_REQUEST_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::HierarchyRequestError.code()))),
        ("WRONG_DOCUMENT_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::WrongDocumentError.code()))),
        ("INVALID_CHARACTER_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::InvalidCharacterError.code()))),
        ("NOT_FOUND_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::NotFoundError.code()))),
        ("NOT_SUPPORTED_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::NotSupportedError.code()))),
        ("INVALID_STATE_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::InvalidStateError.code()))),
        ("SYNTAX_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::SyntaxError.code()))),
        ("NAMESPACE_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::NamespaceError.code()))),
        ("INVALID_ACCESS_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::InvalidAccessError.code()))),
        ("SECURITY_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::SecurityError.code()))),
        ("NETWORK_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::NetworkError.code()))),
        ("ABORT_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::AbortError.code()))),
        ("QUOTA_EXCEEDED_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::QuotaExceededError.code()))),
        ("TIMEOUT_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::TimeoutError.code()))),
        ("DATA_CLONE_ERR".to_owned(), Value::Number(f64::from(DomExceptionName::DataCloneError.code()))),
    ]
}
