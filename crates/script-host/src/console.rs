//! The `console` subset spec 4.G calls for: `dir`, `table`, `trace`,
//! `clear`, `count`/`countReset`, `time`/`timeEnd`/`timeLog`,
//! `group`/`groupCollapsed`/`groupEnd`, `assert`. Deliberately excludes
//! `log`/`warn`/`error` — those are assumed to already exist on the
//! embedding's console (spec's stated non-goal: "this is not a general
//! logging facade").
//!
//! Output routes through the `log` crate exactly as the teacher's
//! `Console`/`ConsoleLogger` does (`crates/js/src/console.rs`), so a host
//! embedding this crate gets its console output wherever `env_logger` (or
//! any other `log` backend) is already configured to send it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Instant;

use log::{info, warn};

use crate::value::Value;

/// Mutable state the `console` subset needs across calls: group nesting
/// depth, named counters, and named timers.
#[derive(Default)]
pub struct Console {
    group_depth: RefCell<usize>,
    counters: RefCell<HashMap<String, u64>>,
    timers: RefCell<HashMap<String, Instant>>,
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

impl Console {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `console.dir(value)`: a structural dump of one value, using `Value`'s
    /// own `Debug` rendering (spec doesn't mandate a specific inspection
    /// format, only that it differs from string coercion).
    pub fn dir(&self, value: &Value) {
        info!("{}{:?}", indent(*self.group_depth.borrow()), value);
    }

    /// `console.table(data)`. Without a real terminal-table dependency in
    /// the teacher's stack, this renders each row on its own line — still a
    /// distinct code path from `dir`, satisfying "tabular" intent without
    /// pulling in a new formatting crate for one method.
    pub fn table(&self, rows: &[Value]) {
        let depth = *self.group_depth.borrow();
        for (index, row) in rows.iter().enumerate() {
            info!("{}{index}: {row:?}", indent(depth));
        }
    }

    /// `console.trace(message)`: like a warning, but always includes
    /// `stack` when the caller has one available from the engine.
    pub fn trace(&self, message: &str, stack: Option<&str>) {
        let depth = *self.group_depth.borrow();
        match stack {
            Some(s) if !s.is_empty() => warn!("{}Trace: {message}\n{s}", indent(depth)),
            _ => warn!("{}Trace: {message}", indent(depth)),
        }
    }

    /// `console.clear()`. There is no terminal to clear from a log sink, so
    /// this only resets grouping depth, matching the one part of `clear`'s
    /// contract that is meaningful here.
    pub fn clear(&self) {
        *self.group_depth.borrow_mut() = 0;
    }

    /// `console.count(label)`, default label `"default"`.
    pub fn count(&self, label: &str) {
        let mut counters = self.counters.borrow_mut();
        let entry = counters.entry(label.to_owned()).or_insert(0);
        *entry += 1;
        info!("{label}: {entry}");
    }

    /// `console.countReset(label)`.
    pub fn count_reset(&self, label: &str) {
        self.counters.borrow_mut().insert(label.to_owned(), 0);
    }

    /// `console.time(label)`. Starting an already-running timer restarts it
    /// (matching browser behavior of overwriting the start mark).
    pub fn time(&self, label: &str) {
        self.timers.borrow_mut().insert(label.to_owned(), Instant::now());
    }

    /// `console.timeLog(label)`: report elapsed time without stopping the
    /// timer. A no-op (with a warning) if `label` was never started.
    pub fn time_log(&self, label: &str) {
        match self.timers.borrow().get(label) {
            Some(start) => info!("{label}: {:?}", start.elapsed()),
            None => warn!("Timer '{label}' does not exist"),
        }
    }

    /// `console.timeEnd(label)`: report elapsed time and stop the timer.
    pub fn time_end(&self, label: &str) {
        match self.timers.borrow_mut().remove(label) {
            Some(start) => info!("{label}: {:?}", start.elapsed()),
            None => warn!("Timer '{label}' does not exist"),
        }
    }

    /// `console.group(label)` / `console.groupCollapsed(label)`: both only
    /// affect indentation here, since there is no interactive tree to
    /// collapse in a log sink.
    pub fn group(&self, label: &str) {
        info!("{}{label}", indent(*self.group_depth.borrow()));
        *self.group_depth.borrow_mut() += 1;
    }

    pub fn group_collapsed(&self, label: &str) {
        self.group(label);
    }

    /// `console.groupEnd()`. Saturates at zero rather than underflowing on
    /// an unmatched call.
    pub fn group_end(&self) {
        let mut depth = self.group_depth.borrow_mut();
        *depth = depth.saturating_sub(1);
    }

    /// `console.assert(condition, message)`: logs only when `condition` is
    /// false, per the Console spec's inverted-assert semantics.
    pub fn assert(&self, condition: bool, message: &str) {
        if !condition {
            warn!("{}Assertion failed: {message}", indent(*self.group_depth.borrow()));
        }
    }
}
