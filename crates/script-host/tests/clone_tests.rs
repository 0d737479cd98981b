#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! `structuredClone` cycle detection, non-cloneable rejection, and the
//! Map/Set identity-not-preserved behavior the spec calls out by example.

use std::rc::Rc;

use script_host::clone::structured_clone;
use script_host::error::DomExceptionName;
use script_host::event_loop::CooperativeEventLoop;
use script_host::promise::ChainedPromise;
use script_host::value::{ObjectData, Value, VisitedMap};
use script_host::{AbortController, ScriptError};

fn number_property(value: &Value, key: &str) -> Option<f64> {
    let handle = value.as_object()?;
    match &*handle.0.borrow() {
        ObjectData::Plain(entries) => entries.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_number()),
        _ => None,
    }
}

#[test]
fn self_referential_object_clones_without_looping() {
    let obj = Value::plain(vec![]);
    if let Value::Object(handle) = &obj {
        let self_ref = obj.clone();
        if let ObjectData::Plain(entries) = &mut *handle.0.borrow_mut() {
            entries.push(("self".to_owned(), self_ref));
        }
    }

    let cloned = structured_clone(&obj, &mut VisitedMap::new()).expect("cycles must clone, not loop forever");

    let original_handle = obj.as_object().expect("object");
    let cloned_handle = cloned.as_object().expect("object");
    assert!(!original_handle.ptr_eq(cloned_handle), "clone must be a distinct object");

    let cloned_self = match &*cloned_handle.0.borrow() {
        ObjectData::Plain(entries) => entries.iter().find(|(k, _)| k == "self").map(|(_, v)| v.clone()),
        _ => None,
    }
    .expect("cloned object keeps its self property");
    let cloned_self_handle = cloned_self.as_object().expect("object");
    assert!(cloned_self_handle.ptr_eq(cloned_handle), "the cycle must point back at the clone itself");
}

#[test]
fn function_is_not_cloneable() {
    let f = Value::function(|_| Ok(Value::Undefined));
    let err = structured_clone(&f, &mut VisitedMap::new()).expect_err("functions cannot be structured-cloned");
    match err {
        ScriptError::DomException(DomExceptionName::DataCloneError, _) => {}
        other => panic!("expected DataCloneError, got {other:?}"),
    }
}

#[test]
fn error_object_is_not_cloneable() {
    let err_value = Value::object(ObjectData::Error { name: "Error".to_owned(), message: "boom".to_owned() });
    let err = structured_clone(&err_value, &mut VisitedMap::new()).expect_err("Error objects cannot be cloned");
    assert!(matches!(err, ScriptError::DomException(DomExceptionName::DataCloneError, _)));
}

#[test]
fn map_clone_preserves_values_but_not_identity() {
    let inner = Value::plain(vec![("n".to_owned(), Value::Number(1.0))]);
    let m = Value::object(ObjectData::Map(vec![(Value::string("k"), inner.clone())]));

    let cloned = structured_clone(&m, &mut VisitedMap::new()).expect("maps are cloneable");

    let m_handle = m.as_object().expect("object");
    let cloned_handle = cloned.as_object().expect("object");
    assert!(!m_handle.ptr_eq(cloned_handle), "c === m must be false");

    let cloned_entry_value = match &*cloned_handle.0.borrow() {
        ObjectData::Map(entries) => entries.iter().find(|(k, _)| k.as_str() == Some("k")).map(|(_, v)| v.clone()),
        _ => None,
    }
    .expect("cloned map keeps its entry");

    assert_eq!(number_property(&cloned_entry_value, "n"), Some(1.0));

    let inner_handle = inner.as_object().expect("object");
    let cloned_entry_handle = cloned_entry_value.as_object().expect("object");
    assert!(!inner_handle.ptr_eq(cloned_entry_handle), "c.get(\"k\") === m.get(\"k\") must be false");
}

#[test]
fn promise_clones_as_itself_rather_than_erroring() {
    let event_loop = Rc::new(CooperativeEventLoop::new()) as Rc<dyn script_host::EventLoop>;
    let promise = ChainedPromise::pending(event_loop);
    let value = Value::promise(Rc::clone(&promise));

    let cloned = structured_clone(&value, &mut VisitedMap::new()).expect("Promise is an unsupported pseudo-type, not an error source");

    let original_handle = value.as_object().expect("object");
    let cloned_handle = cloned.as_object().expect("object");
    assert!(original_handle.ptr_eq(cloned_handle), "Promise passes through by identity, it is not duplicated");
}

#[test]
fn abort_signal_clones_as_itself_rather_than_erroring() {
    let controller = AbortController::new();
    let value = Value::abort_signal(controller.signal());

    let cloned = structured_clone(&value, &mut VisitedMap::new()).expect("AbortSignal is an unsupported pseudo-type, not an error source");

    let original_handle = value.as_object().expect("object");
    let cloned_handle = cloned.as_object().expect("object");
    assert!(original_handle.ptr_eq(cloned_handle), "AbortSignal passes through by identity, it is not duplicated");
}

#[test]
fn set_clone_preserves_members_but_not_identity() {
    let member = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
    let s = Value::object(ObjectData::Set(vec![member.clone()]));

    let cloned = structured_clone(&s, &mut VisitedMap::new()).expect("sets are cloneable");

    let cloned_handle = cloned.as_object().expect("object");
    let cloned_member = match &*cloned_handle.0.borrow() {
        ObjectData::Set(items) => items.first().cloned(),
        _ => None,
    }
    .expect("cloned set keeps its member");

    let member_handle = member.as_object().expect("object");
    let cloned_member_handle = cloned_member.as_object().expect("object");
    assert!(!member_handle.ptr_eq(cloned_member_handle));
}
