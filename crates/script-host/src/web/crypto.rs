//! `crypto.getRandomValues` / `crypto.randomUUID` (spec 4.G), using `rand`
//! and `uuid` the way other example repos in the retrieval pack reach for
//! them for the same purpose — the teacher's own stack has no randomness
//! dependency, since nothing in its document/console bindings needs one.

use rand::RngCore;
use uuid::Uuid;

use crate::error::{DomExceptionName, ScriptError};

const MAX_RANDOM_BYTES: usize = 65_536;

/// `getRandomValues(buffer_len)`: returns `buffer_len` fresh random bytes,
/// which the binding layer writes back into the caller's typed array.
///
/// # Errors
/// `DOMException(QuotaExceededError)` if `buffer_len` exceeds 65,536 bytes.
pub fn get_random_values(buffer_len: usize) -> Result<Vec<u8>, ScriptError> {
    if buffer_len > MAX_RANDOM_BYTES {
        return Err(ScriptError::dom_exception(
            DomExceptionName::QuotaExceededError,
            format!("requested {buffer_len} bytes exceeds the 65536 byte quota"),
        ));
    }
    let mut bytes = vec![0u8; buffer_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(bytes)
}

/// `randomUUID()`: a version-4, variant-1 UUID.
#[must_use]
pub fn random_uuid() -> String {
    Uuid::new_v4().to_string()
}
