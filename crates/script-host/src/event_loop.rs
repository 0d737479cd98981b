//! The event loop interface and one concrete, cooperative implementation.
//!
//! Spec section 1 lists "the event loop (timer scheduling, microtask queue,
//! lifecycle)" as an external collaborator, "specified only at its
//! interface" — so `EventLoop` below is that interface, not a prescription
//! for how a host must build one. `CooperativeEventLoop` is the reference
//! implementation this crate ships so the Adapter is actually usable without
//! an embedder supplying their own; its shape (a pending-work queue drained
//! by an explicit pump call) follows the same "host drives, engine never
//! blocks" discipline the teacher's `JsEngine::run_jobs` embodies
//! (`crates/js/src/lib.rs`) and that the teacher's `DOMMirror::update` /
//! `try_update_sync` pair demonstrates for draining a channel to quiescence
//! (`crates/js/src/lib.rs`).

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Opaque identifier returned by scheduling calls (spec's `TimerHandle`).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TimerHandle(pub u64);

/// Loop lifecycle states (spec section 5).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LoopState {
    Awake,
    Shutting,
    Terminated,
}

/// A scheduled callback. Intervals keep re-running the same `Rc`-like
/// callback, so it is `Fn`, not `FnOnce`; one-shot timers and microtasks are
/// modeled as intervals that clear themselves after firing once.
pub type LoopCallback = Box<dyn FnMut()>;

/// The host-facing scheduling surface every timer/microtask/immediate API in
/// `timers.rs` is built on top of. A host embedding a real engine may swap in
/// whatever loop it already runs (e.g. a tokio reactor) by implementing this
/// trait instead of using `CooperativeEventLoop`.
pub trait EventLoop {
    fn state(&self) -> LoopState;

    /// Schedule a one-shot callback to fire no earlier than `delay_ms` from
    /// now. Returns `None` if the loop is terminated.
    fn schedule_timeout(&self, delay_ms: f64, callback: LoopCallback) -> Option<TimerHandle>;

    /// Schedule a recurring callback firing every `delay_ms`.
    fn schedule_interval(&self, delay_ms: f64, callback: LoopCallback) -> Option<TimerHandle>;

    /// Schedule a callback for the next macrotask slot, after the currently
    /// draining microtask batch (spec 4.C `setImmediate`).
    fn schedule_immediate(&self, callback: LoopCallback) -> Option<TimerHandle>;

    /// Cancel a previously scheduled timer/interval/immediate. Unknown or
    /// already-fired ids are a silent no-op (spec's `TimerHandle` contract).
    fn clear_timer(&self, handle: TimerHandle);

    /// Enqueue a microtask. Shared by `queueMicrotask`, `process.nextTick`,
    /// and Promise reaction scheduling (spec 4.C/4.D/5: one queue).
    fn queue_microtask(&self, callback: Box<dyn FnOnce()>);
}

struct TimerEntry {
    due_ms: f64,
    seq: u64,
    handle: TimerHandle,
    interval_ms: Option<f64>,
    callback: RefCell<Option<LoopCallback>>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}
impl Eq for TimerEntry {}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest (then
        // earliest-scheduled) entry sorts first.
        other
            .due_ms
            .partial_cmp(&self.due_ms)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A single-threaded, cooperatively-driven event loop: timers, one
/// microtask queue, and an immediate queue, all drained by explicit calls to
/// `run_ready` / `run_microtasks`. Nothing here spawns a background thread;
/// that is the point — the engine is never touched off the caller's thread
/// (spec section 5).
pub struct CooperativeEventLoop {
    origin: Instant,
    state: Cell<LoopState>,
    next_id: Cell<u64>,
    next_seq: Cell<u64>,
    timers: RefCell<BinaryHeap<TimerEntry>>,
    cleared: RefCell<std::collections::HashSet<u64>>,
    microtasks: RefCell<std::collections::VecDeque<Box<dyn FnOnce()>>>,
    immediates: RefCell<std::collections::VecDeque<(u64, LoopCallback)>>,
}

impl CooperativeEventLoop {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Cell::new(LoopState::Awake),
            next_id: Cell::new(1),
            next_seq: Cell::new(0),
            timers: RefCell::new(BinaryHeap::new()),
            cleared: RefCell::new(std::collections::HashSet::new()),
            microtasks: RefCell::new(std::collections::VecDeque::new()),
            immediates: RefCell::new(std::collections::VecDeque::new()),
        }
    }

    /// Milliseconds elapsed since this loop was created.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1_000.0
    }

    fn next_handle(&self) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1).max(1));
        TimerHandle(id)
    }

    fn next_seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq.wrapping_add(1));
        seq
    }

    /// Run every microtask currently queued, plus any microtasks those
    /// microtasks enqueue, until the queue is empty (spec ordering
    /// guarantee #1/#2).
    pub fn run_microtasks(&self) {
        loop {
            let next = self.microtasks.borrow_mut().pop_front();
            let Some(task) = next else { break };
            task();
        }
    }

    /// Run every timer whose due time has passed, earliest-and-then-
    /// earliest-scheduled first, draining microtasks after each one (spec
    /// ordering guarantee #1 and #3).
    pub fn run_due_timers(&self) {
        loop {
            let now = self.now_ms();
            let due = {
                let mut heap = self.timers.borrow_mut();
                match heap.peek() {
                    Some(entry) if entry.due_ms <= now => heap.pop(),
                    _ => None,
                }
            };
            let Some(entry) = due else { break };
            if self.cleared.borrow_mut().remove(&entry.handle.0) {
                continue;
            }
            if let Some(mut callback) = entry.callback.borrow_mut().take() {
                callback();
                if let Some(interval_ms) = entry.interval_ms {
                    self.timers.borrow_mut().push(TimerEntry {
                        due_ms: now + interval_ms,
                        seq: self.next_seq(),
                        handle: entry.handle,
                        interval_ms: Some(interval_ms),
                        callback: RefCell::new(Some(callback)),
                    });
                }
            }
            self.run_microtasks();
        }
    }

    /// Run every `setImmediate` callback queued so far, each followed by a
    /// microtask drain (spec 4.C/5).
    pub fn run_immediates(&self) {
        loop {
            let next = self.immediates.borrow_mut().pop_front();
            let Some((id, mut callback)) = next else { break };
            if self.cleared.borrow_mut().remove(&id) {
                continue;
            }
            callback();
            self.run_microtasks();
        }
    }

    /// Run one full tick: due timers, then immediates, with microtasks
    /// drained after every macrotask.
    pub fn tick(&self) {
        self.run_microtasks();
        self.run_due_timers();
        self.run_immediates();
    }

    /// Begin graceful shutdown; no further scheduling succeeds.
    pub fn shut_down(&self) {
        self.state.set(LoopState::Shutting);
    }

    pub fn terminate(&self) {
        self.state.set(LoopState::Terminated);
    }
}

impl Default for CooperativeEventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Negative/NaN delays coerce to zero (spec 4.C).
fn clamp_delay(delay_ms: f64) -> f64 {
    if delay_ms.is_nan() || delay_ms < 0.0 {
        0.0
    } else {
        delay_ms
    }
}

impl EventLoop for CooperativeEventLoop {
    fn state(&self) -> LoopState {
        self.state.get()
    }

    fn schedule_timeout(&self, delay_ms: f64, callback: LoopCallback) -> Option<TimerHandle> {
        if self.state() == LoopState::Terminated {
            return None;
        }
        let handle = self.next_handle();
        self.timers.borrow_mut().push(TimerEntry {
            due_ms: self.now_ms() + clamp_delay(delay_ms),
            seq: self.next_seq(),
            handle,
            interval_ms: None,
            callback: RefCell::new(Some(callback)),
        });
        Some(handle)
    }

    fn schedule_interval(&self, delay_ms: f64, callback: LoopCallback) -> Option<TimerHandle> {
        if self.state() == LoopState::Terminated {
            return None;
        }
        let handle = self.next_handle();
        let delay_ms = clamp_delay(delay_ms);
        self.timers.borrow_mut().push(TimerEntry {
            due_ms: self.now_ms() + delay_ms,
            seq: self.next_seq(),
            handle,
            interval_ms: Some(delay_ms),
            callback: RefCell::new(Some(callback)),
        });
        Some(handle)
    }

    fn schedule_immediate(&self, callback: LoopCallback) -> Option<TimerHandle> {
        if self.state() == LoopState::Terminated {
            return None;
        }
        let handle = self.next_handle();
        self.immediates.borrow_mut().push_back((handle.0, callback));
        Some(handle)
    }

    fn clear_timer(&self, handle: TimerHandle) {
        self.cleared.borrow_mut().insert(handle.0);
    }

    fn queue_microtask(&self, callback: Box<dyn FnOnce()>) {
        self.microtasks.borrow_mut().push_back(callback);
    }
}
