#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end checks that `V8HostEngine` actually evaluates script against a
//! real isolate and that the installed globals are reachable from script,
//! mirroring how the teacher's `js_engine_v8` crate is exercised by its own
//! integration tests.

use script_host::JsEngine;
use script_host_v8::V8HostEngine;

#[test]
fn eval_script_returns_the_expression_result() {
    let mut engine = V8HostEngine::new().expect("engine initializes");
    let result = engine.eval_script("1 + 2", "test://arithmetic").expect("script evaluates");
    assert_eq!(result.as_number(), Some(3.0));
}

#[test]
fn set_timeout_is_installed_and_callable() {
    let mut engine = V8HostEngine::new().expect("engine initializes");
    let result = engine
        .eval_script("typeof setTimeout", "test://timer-presence")
        .expect("script evaluates");
    assert_eq!(result.as_str(), Some("function"));
}

#[test]
fn timer_callback_runs_after_run_jobs_drains_the_loop() {
    let mut engine = V8HostEngine::new().expect("engine initializes");
    engine
        .eval_script("globalThis.__fired = false; setTimeout(() => { globalThis.__fired = true; }, 0);", "test://timer-fires")
        .expect("script evaluates");
    engine.run_jobs().expect("jobs drain without error");
    let fired = engine.eval_script("globalThis.__fired", "test://timer-check").expect("script evaluates");
    assert_eq!(format!("{fired:?}"), "true");
}

#[test]
fn text_encoder_round_trips_through_script() {
    let mut engine = V8HostEngine::new().expect("engine initializes");
    let result = engine
        .eval_script(
            "const bytes = new TextEncoder().encode('hi'); new TextDecoder().decode(bytes);",
            "test://text-codec",
        )
        .expect("script evaluates");
    assert_eq!(result.as_str(), Some("hi"));
}
