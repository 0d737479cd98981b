//! `URL` / `URLSearchParams` (spec 4.G), built on the `url` crate the same
//! way the teacher already depends on it for its own document/navigation
//! handling (workspace `Cargo.toml`). Parsing and re-serialization are
//! delegated to `url::Url`; `searchParams` stays "live" by re-parsing
//! `search` through `url::form_urlencoded` on demand rather than caching a
//! separate representation that could drift from `href`.

use url::Url;

use crate::error::{DomExceptionName, ScriptError};

/// An ordered multimap of string pairs, matching `URLSearchParams`'s own
/// iteration contract (spec 4.G).
#[derive(Default, Clone)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let pairs = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn append(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_owned(), value.to_owned()));
    }

    /// `set(key, value)`: replaces all existing values for `key`, keeping
    /// the position of the first occurrence (URLSearchParams' `set`
    /// contract).
    pub fn set(&mut self, key: &str, value: &str) {
        let mut replaced = false;
        self.pairs.retain_mut(|(k, v)| {
            if k == key {
                if replaced {
                    return false;
                }
                *v = value.to_owned();
                replaced = true;
            }
            true
        });
        if !replaced {
            self.pairs.push((key.to_owned(), value.to_owned()));
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// `sort()`: stable sort by key, per code unit (byte order here, since
    /// keys are treated as opaque strings).
    pub fn sort(&mut self) {
        self.pairs.sort_by(|a, b| a.0.cmp(&b.0));
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// A parsed URL (spec 4.G). `href` is the single source of truth; every
/// other accessor re-derives from the underlying `url::Url`, and every
/// setter re-parses `href` after mutating.
pub struct ParsedUrl {
    inner: Url,
}

impl ParsedUrl {
    /// # Errors
    /// `TypeError` if `input` (resolved against `base`, if given) does not
    /// parse as an absolute URL.
    pub fn parse(input: &str, base: Option<&str>) -> Result<Self, ScriptError> {
        let inner = match base {
            Some(base) => {
                let base_url =
                    Url::parse(base).map_err(|e| ScriptError::type_error(format!("invalid base URL: {e}")))?;
                base_url.join(input).map_err(|e| ScriptError::type_error(format!("invalid URL: {e}")))?
            }
            None => Url::parse(input).map_err(|e| ScriptError::type_error(format!("invalid URL: {e}")))?,
        };
        Ok(Self { inner })
    }

    #[must_use]
    pub fn href(&self) -> String {
        self.inner.as_str().to_owned()
    }

    /// # Errors
    /// `TypeError` if the replacement string does not re-parse.
    pub fn set_href(&mut self, href: &str) -> Result<(), ScriptError> {
        self.inner = Url::parse(href).map_err(|e| ScriptError::type_error(format!("invalid URL: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn protocol(&self) -> String {
        format!("{}:", self.inner.scheme())
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.inner.username()
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.inner.password().unwrap_or("")
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        self.inner.host_str().unwrap_or("")
    }

    #[must_use]
    pub fn port(&self) -> String {
        self.inner.port().map_or_else(String::new, |p| p.to_string())
    }

    #[must_use]
    pub fn pathname(&self) -> &str {
        self.inner.path()
    }

    #[must_use]
    pub fn search(&self) -> String {
        self.inner.query().map_or_else(String::new, |q| format!("?{q}"))
    }

    pub fn set_search(&mut self, search: &str) {
        let trimmed = search.trim_start_matches('?');
        self.inner.set_query(if trimmed.is_empty() { None } else { Some(trimmed) });
    }

    #[must_use]
    pub fn hash(&self) -> String {
        self.inner.fragment().map_or_else(String::new, |f| format!("#{f}"))
    }

    pub fn set_hash(&mut self, hash: &str) {
        let trimmed = hash.trim_start_matches('#');
        self.inner.set_fragment(if trimmed.is_empty() { None } else { Some(trimmed) });
    }

    /// `origin`: scheme + host + port, with no trailing path/query/fragment.
    #[must_use]
    pub fn origin(&self) -> String {
        self.inner.origin().ascii_serialization()
    }

    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        SearchParams::from_query_string(&self.search())
    }

    pub fn set_search_params(&mut self, params: &SearchParams) {
        self.set_search(&params.to_query_string());
    }
}

/// Validate a `URLSearchParams` init value has already been coerced to
/// pairs at the binding layer; this module only ever deals in `(String,
/// String)` pairs, matching the spec's "record-like object" acceptance via
/// own-enumerable-key iteration performed upstream.
pub fn require_absolute(input: &str) -> Result<(), ScriptError> {
    if Url::parse(input).is_ok() {
        Ok(())
    } else {
        Err(ScriptError::dom_exception(DomExceptionName::SyntaxError, format!("{input} is not an absolute URL")))
    }
}
