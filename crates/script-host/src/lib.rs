//! Host-side integration layer that equips an embedded, single-threaded
//! scripting engine with web-platform globals, coupled to an externally
//! driven cooperative event loop.
//!
//! This crate is engine-agnostic: every component here is written against
//! `value::Value`, a stand-in for whatever value model a real engine
//! exposes. An engine adapter (see the sibling `script-host-v8` crate)
//! bridges a concrete engine's values into `Value` and installs the
//! globals `orchestrator::Adapter::bind` produces.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::unimplemented, clippy::todo)]

pub mod abort;
pub mod bindings;
pub mod bridge;
pub mod clone;
pub mod console;
pub mod error;
pub mod event_loop;
pub mod event_target;
pub mod iterable;
pub mod orchestrator;
pub mod promise;
pub mod timers;
pub mod value;
pub mod web;

pub use abort::{AbortController, AbortSignal};
pub use error::{DomExceptionName, ScriptError};
pub use event_loop::{CooperativeEventLoop, EventLoop, LoopState, TimerHandle};
pub use orchestrator::{Adapter, AdapterOptions};
pub use promise::ChainedPromise;
pub use value::{CallArgs, HostCallable, ObjectData, ObjectHandle, Value};

/// A minimal interface a host exposes for driving script evaluation once
/// `Adapter::bind` has installed globals into it. Engines implement this
/// the way the teacher's `JsEngine` trait is implemented per concrete
/// engine (`crates/js/src/lib.rs`); this crate has no engine of its own, so
/// it only declares the shape a caller can depend on.
pub trait JsEngine {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Evaluate a classic script.
    ///
    /// # Errors
    /// Returns the engine's own error type on a parse or runtime failure.
    fn eval_script(&mut self, source: &str, url: &str) -> Result<value::Value, Self::Error>;

    /// Run pending microtasks/jobs until idle. For this crate, "idle" means
    /// `CooperativeEventLoop::tick` returning with nothing left to run.
    ///
    /// # Errors
    /// Returns the engine's own error type if a pending job panics inside
    /// the engine (timer/microtask callback exceptions are the loop's
    /// concern, not this trait's — see `event_loop`).
    fn run_jobs(&mut self) -> Result<(), Self::Error>;
}
