//! V8-backed implementation of `script_host::JsEngine`.
//!
//! This crate is the thin half of the split: every web-platform global,
//! every Promise/abort/timer semantic lives in `script-host`, written
//! against `script_host::Value`. All this crate does is convert `Value` to
//! and from a real V8 isolate's `Local<Value>` handles and drive script
//! evaluation, the same division of labor the teacher keeps between `js`
//! (engine-agnostic bindings) and `js_engine_v8` (the V8 adapter,
//! `crates/js/js_engine_v8/src/engine.rs`).

mod bindings;
mod conversions;
mod engine;

pub use engine::V8HostEngine;
