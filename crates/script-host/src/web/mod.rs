//! Web-platform globals (spec 4.G): data types with no engine binding of
//! their own. `bindings.rs` installs these onto script-visible namespaces;
//! everything here is plain Rust, testable without a fake engine.

pub mod base64;
pub mod blob;
pub mod crypto;
pub mod dom_exception;
pub mod form_data;
pub mod headers;
pub mod performance;
pub mod storage;
pub mod text_codec;
pub mod url;
