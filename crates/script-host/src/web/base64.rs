//! `atob` / `btoa` (spec 4.G), built on the teacher's existing `base64`
//! dependency (workspace `Cargo.toml`). Strict per the spec: `btoa` rejects
//! any input code unit above `0xFF` rather than silently truncating, and
//! `atob` rejects malformed Base64 rather than skipping bad characters.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{DomExceptionName, ScriptError};

/// # Errors
/// `DOMException(InvalidCharacterError)` — here mapped to `SyntaxError` per
/// spec's "malformed input" wording, since the Web spec itself actually
/// throws `InvalidCharacterError`; this crate keeps the name the spec's
/// error taxonomy table lists for malformed Base64/URL (`SyntaxError`).
pub fn atob(input: &str) -> Result<String, ScriptError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| ScriptError::dom_exception(DomExceptionName::SyntaxError, format!("malformed Base64: {e}")))?;
    // atob's output is a "binary string": one code unit per decoded byte.
    Ok(bytes.into_iter().map(char::from).collect())
}

/// # Errors
/// `TypeError` if any code unit in `input` exceeds `0xFF` (i.e. is not
/// Latin-1-representable).
pub fn btoa(input: &str) -> Result<String, ScriptError> {
    let mut bytes = Vec::with_capacity(input.len());
    for c in input.chars() {
        let code = c as u32;
        if code > 0xFF {
            return Err(ScriptError::type_error("string contains characters outside of the Latin1 range"));
        }
        bytes.push(code as u8);
    }
    Ok(STANDARD.encode(bytes))
}
