//! `performance` (spec 4.G): `now()`/`timeOrigin` plus a mark/measure entry
//! buffer. Timing is read from the same `Instant` origin the event loop
//! uses conceptually, but this type is self-contained so it can be attached
//! to an Adapter without borrowing the loop.

use std::time::Instant;

use crate::error::{DomExceptionName, ScriptError};

#[derive(Clone)]
pub enum EntryKind {
    Mark,
    Measure,
}

#[derive(Clone)]
pub struct PerformanceEntry {
    pub name: String,
    pub kind: EntryKind,
    pub start_time: f64,
    pub duration: f64,
}

/// `performance`'s mark/measure buffer plus a stable time origin.
pub struct Performance {
    origin: Instant,
    time_origin_ms: f64,
    entries: std::cell::RefCell<Vec<PerformanceEntry>>,
}

impl Performance {
    #[must_use]
    pub fn new(time_origin_ms: f64) -> Self {
        Self { origin: Instant::now(), time_origin_ms, entries: std::cell::RefCell::new(Vec::new()) }
    }

    #[must_use]
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1_000.0
    }

    #[must_use]
    pub fn time_origin(&self) -> f64 {
        self.time_origin_ms
    }

    pub fn mark(&self, name: &str) {
        self.entries.borrow_mut().push(PerformanceEntry {
            name: name.to_owned(),
            kind: EntryKind::Mark,
            start_time: self.now(),
            duration: 0.0,
        });
    }

    /// `measure(name, startMark, endMark)`. `start_mark`/`end_mark` of
    /// `None` mean "time origin" / "now", matching the Performance spec's
    /// defaulting rules for the two-string-argument overload this crate
    /// supports (the options-bag overload is the binding layer's job to
    /// destructure into these same arguments).
    ///
    /// # Errors
    /// `DOMException(SyntaxError)` if a named mark does not exist (spec's
    /// chosen behavior for its own Open Question on this point).
    pub fn measure(&self, name: &str, start_mark: Option<&str>, end_mark: Option<&str>) -> Result<(), ScriptError> {
        let start_time = match start_mark {
            Some(mark_name) => self.find_mark_time(mark_name)?,
            None => 0.0,
        };
        let end_time = match end_mark {
            Some(mark_name) => self.find_mark_time(mark_name)?,
            None => self.now(),
        };
        self.entries.borrow_mut().push(PerformanceEntry {
            name: name.to_owned(),
            kind: EntryKind::Measure,
            start_time,
            duration: end_time - start_time,
        });
        Ok(())
    }

    fn find_mark_time(&self, name: &str) -> Result<f64, ScriptError> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find(|e| matches!(e.kind, EntryKind::Mark) && e.name == name)
            .map(|e| e.start_time)
            .ok_or_else(|| ScriptError::dom_exception(DomExceptionName::SyntaxError, format!("mark '{name}' not found")))
    }

    #[must_use]
    pub fn get_entries_by_name(&self, name: &str, kind: Option<&str>) -> Vec<PerformanceEntry> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.name == name && kind.map_or(true, |k| kind_matches(&e.kind, k)))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get_entries_by_type(&self, kind: &str) -> Vec<PerformanceEntry> {
        self.entries.borrow().iter().filter(|e| kind_matches(&e.kind, kind)).cloned().collect()
    }

    pub fn clear_marks(&self) {
        self.entries.borrow_mut().retain(|e| !matches!(e.kind, EntryKind::Mark));
    }

    pub fn clear_measures(&self) {
        self.entries.borrow_mut().retain(|e| !matches!(e.kind, EntryKind::Measure));
    }
}

fn kind_matches(kind: &EntryKind, label: &str) -> bool {
    matches!((kind, label), (EntryKind::Mark, "mark") | (EntryKind::Measure, "measure"))
}
