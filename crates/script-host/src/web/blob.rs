//! `Blob` (spec 4.G): an immutable byte buffer plus a MIME `type` tag.

use crate::error::ScriptError;

/// `new Blob(parts, {type})`. Parts are already normalized to byte slices
/// by the binding layer (string parts UTF-8 encoded, numbers coerced via
/// `String()` then UTF-8 encoded, `ArrayBuffer`/typed-array/`Blob` parts
/// read as raw bytes) — this type just concatenates and tags them.
pub struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Blob {
    #[must_use]
    pub fn new(parts: &[Vec<u8>], mime_type: &str) -> Self {
        let bytes = parts.iter().flat_map(|p| p.iter().copied()).collect();
        Self { bytes, mime_type: mime_type.to_ascii_lowercase() }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// # Errors
    /// `TypeError` if the bytes are not valid UTF-8 (matching how `text()`
    /// on a real `Blob` replaces invalid sequences rather than throwing —
    /// kept lossy here to match that, `Result` only to let callers surface
    /// the rare panic-free failure path uniformly with the rest of this
    /// module; this implementation never actually returns `Err`).
    pub fn text(&self) -> Result<String, ScriptError> {
        Ok(String::from_utf8_lossy(&self.bytes).into_owned())
    }

    #[must_use]
    pub fn array_buffer(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// `slice(start, end, content_type)`. Indices normalize per spec:
    /// negative values add the length, then clamp to `[0, length]`;
    /// `start > end` yields an empty slice.
    #[must_use]
    pub fn slice(&self, start: Option<i64>, end: Option<i64>, content_type: Option<&str>) -> Self {
        let len = self.bytes.len() as i64;
        let normalize = |value: i64| -> usize {
            let value = if value < 0 { (len + value).max(0) } else { value };
            value.min(len).max(0) as usize
        };
        let start = start.map_or(0, normalize);
        let end = end.map_or(self.bytes.len(), normalize);
        let bytes = if start >= end { Vec::new() } else { self.bytes[start..end].to_vec() };
        Self { bytes, mime_type: content_type.unwrap_or("").to_ascii_lowercase() }
    }

    /// `stream()`: explicitly out of scope (spec Open Questions); a real
    /// `ReadableStream` is never constructed.
    pub fn stream(&self) {}
}
