//! `TextEncoder` / `TextDecoder` (spec 4.G), UTF-8 only. Non-UTF-8 labels
//! are accepted and simply treated as UTF-8 (one of the two choices the
//! spec's Open Questions leaves to the implementer — see `SPEC_FULL.md`).

use crate::error::ScriptError;

/// `new TextEncoder().encode(input)`. A missing/`null`/`undefined` argument
/// is expected to have already been coerced to `""` by the binding layer,
/// consistent with ordinary JS `String()` coercion.
#[must_use]
pub fn encode(input: &str) -> Vec<u8> {
    input.as_bytes().to_vec()
}

/// `encodeInto(input, dest_len)`: returns `(read, written)` where `read`
/// counts UTF-16 code units consumed and `written` counts bytes emitted,
/// truncating at the last whole code point that fits within `dest_len`
/// bytes.
#[must_use]
pub fn encode_into(input: &str, dest_len: usize) -> (usize, Vec<u8>) {
    let mut written = Vec::new();
    let mut read_units = 0usize;
    for ch in input.chars() {
        let encoded_len = ch.len_utf8();
        if written.len() + encoded_len > dest_len {
            break;
        }
        let mut buf = [0u8; 4];
        written.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        read_units += ch.len_utf16();
    }
    (read_units, written)
}

const REPLACEMENT: char = '\u{FFFD}';
const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// `new TextDecoder(label, {fatal, ignoreBOM}).decode(bytes)`.
///
/// # Errors
/// If `fatal` is set, returns `TypeError` on the first invalid UTF-8
/// sequence instead of substituting U+FFFD.
pub fn decode(bytes: &[u8], fatal: bool, ignore_bom: bool) -> Result<String, ScriptError> {
    let bytes = if !ignore_bom && bytes.starts_with(&BOM) { &bytes[3..] } else { bytes };
    if fatal {
        return std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| ScriptError::type_error(format!("invalid UTF-8 sequence: {e}")));
    }
    Ok(String::from_utf8_lossy(bytes).chars().map(|c| if c == '\u{FFFD}' { REPLACEMENT } else { c }).collect())
}
