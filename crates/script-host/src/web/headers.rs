//! `Headers` (spec 4.G): a case-insensitive, order-preserving multimap.
//! "Order-preserving" means insertion order of distinct header names;
//! repeated `append` calls for the same name accumulate values under that
//! name rather than reordering it.

use crate::error::ScriptError;
use crate::value::{ObjectData, Value};

/// One stored header: the name as first set/appended (original casing is
/// kept for `entries()`/`forEach`, matching how browsers normalize to
/// lowercase — this crate folds to lowercase on store, simpler and
/// sufficient since lookups are always case-insensitive anyway).
struct Entry {
    name: String,
    values: Vec<String>,
}

/// `HeadersStore` from the glossary: the backing multimap for `Headers`.
#[derive(Default)]
pub struct HeadersStore {
    entries: Vec<Entry>,
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl HeadersStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `init`: `null`/`undefined` yields empty; an array of
    /// `[name, value]` pairs or another `Headers`-shaped object (a plain
    /// object with string values) is accepted at the binding layer, which
    /// calls `append` for each pair in order.
    ///
    /// # Errors
    /// Propagates a `TypeError` if a pair is malformed.
    pub fn append_pairs(&mut self, pairs: &[(String, String)]) -> Result<(), ScriptError> {
        for (name, value) in pairs {
            self.append(name, value)?;
        }
        Ok(())
    }

    fn validate_name(name: &str) -> Result<(), ScriptError> {
        if name.is_empty() || name.bytes().any(|b| b.is_ascii_control() || b == b' ') {
            return Err(ScriptError::type_error(format!("invalid header name: {name:?}")));
        }
        Ok(())
    }

    /// # Errors
    /// `TypeError` for an invalid header name.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), ScriptError> {
        Self::validate_name(name)?;
        let key = fold(name);
        match self.entries.iter_mut().find(|e| e.name == key) {
            Some(entry) => entry.values.push(value.to_owned()),
            None => self.entries.push(Entry { name: key, values: vec![value.to_owned()] }),
        }
        Ok(())
    }

    /// # Errors
    /// `TypeError` for an invalid header name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ScriptError> {
        Self::validate_name(name)?;
        let key = fold(name);
        self.entries.retain(|e| e.name != key);
        self.entries.push(Entry { name: key, values: vec![value.to_owned()] });
        Ok(())
    }

    pub fn delete(&mut self, name: &str) {
        let key = fold(name);
        self.entries.retain(|e| e.name != key);
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        let key = fold(name);
        self.entries.iter().any(|e| e.name == key)
    }

    /// `get(name)`: values joined with `", "`, or `None` if absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let key = fold(name);
        self.entries.iter().find(|e| e.name == key).map(|e| e.values.join(", "))
    }

    /// `getSetCookie()`: `set-cookie` values, never joined (spec explicitly
    /// calls this out since joining cookies with `,` is invalid HTTP).
    #[must_use]
    pub fn get_set_cookie(&self) -> Vec<String> {
        self.entries.iter().find(|e| e.name == "set-cookie").map(|e| e.values.clone()).unwrap_or_default()
    }

    /// `entries()` in insertion order, each name's multiple values pre-joined
    /// the way `get` would, matching the Fetch spec's combined-value
    /// iteration (except `set-cookie`, each kept separate).
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .flat_map(|e| {
                if e.name == "set-cookie" {
                    e.values.iter().map(|v| (e.name.clone(), v.clone())).collect::<Vec<_>>()
                } else {
                    vec![(e.name.clone(), e.values.join(", "))]
                }
            })
            .collect()
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let entries = self
            .entries()
            .into_iter()
            .map(|(name, value)| Value::array(vec![Value::string(name), Value::string(value)]))
            .collect();
        Value::object(ObjectData::Array(entries))
    }
}
