//! `localStorage` / `sessionStorage` (spec 4.G). An ordered string→string
//! map, one instance each, backing both globals — no per-origin bucketing
//! the way the teacher's `StorageRegistry` does
//! (`crates/js/src/bindings/storage.rs`), since this crate has no concept of
//! "origin"; an embedder that needs origin isolation constructs one
//! `Storage` per origin itself.

use std::cell::RefCell;

/// Insertion-order-preserving string store, matching `Storage.key(index)`'s
/// requirement that keys have a stable enumeration order.
#[derive(Default)]
pub struct Storage {
    entries: RefCell<Vec<(String, String)>>,
}

impl Storage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.entries.borrow().len()
    }

    /// `getItem(key)`: `None` maps to script `null` at the binding layer.
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries.borrow().iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    pub fn set_item(&self, key: &str, value: &str) {
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => entries.push((key.to_owned(), value.to_owned())),
        }
    }

    pub fn remove_item(&self, key: &str) {
        self.entries.borrow_mut().retain(|(k, _)| k != key);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// `key(index)`: the key at enumeration position `index`, or `None` past
    /// the end.
    #[must_use]
    pub fn key(&self, index: usize) -> Option<String> {
        self.entries.borrow().get(index).map(|(k, _)| k.clone())
    }
}

