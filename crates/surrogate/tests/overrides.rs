//! Override declarations: bases, per-instance overrides and the state namespace.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use surrogate::{
    Class, ConstructionError, ExcType, Op, ProxyBase, ProxyFactory, RunResult, Value, direct, forward, ops, original,
    proxy, proxy_with, state, types::Instance,
};

fn noop(_this: &Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::None)
}

fn sink_class() -> Arc<Class> {
    Class::builder("Sink")
        .method("write", |this, args| {
            let written = ops::getattr(this, "written")?;
            ops::setattr(this, "written", ops::add(&written, &args[0])?)?;
            Ok(Value::None)
        })
        .build()
}

#[test]
fn operation_override_replaces_forwarding() {
    let quiet = ProxyBase::builder("quiet")
        .direct("__str__", |_this, _args| Ok(Value::str("<proxy>")))
        .build()
        .unwrap();
    let p = proxy_with(Value::Int(7), &quiet).unwrap();
    assert_eq!(ops::str(&p).unwrap(), "<proxy>");
    // operations without an override still forward
    assert_eq!(ops::repr(&p).unwrap(), "7");
    assert_eq!(original(&p).unwrap(), Value::Int(7));
}

#[test]
fn attribute_override_binds_to_proxy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let counting = ProxyBase::builder("counting")
        .declare(direct("write", move |this, args| {
            counted.fetch_add(1, Ordering::Relaxed);
            ops::call_method(&original(this)?, "write", args)
        }))
        .build()
        .unwrap();

    let sink = Instance::create(&sink_class(), [("written", Value::str(""))]);
    let p = proxy_with(sink.clone(), &counting).unwrap();
    ops::call_method(&p, "write", &[Value::str("ab")]).unwrap();
    ops::call_method(&p, "write", &[Value::str("cd")]).unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), 2);
    assert_eq!(ops::getattr(&sink, "written").unwrap(), Value::str("abcd"));
    // the wrapped class itself is untouched
    ops::call_method(&sink, "write", &[Value::str("!")]).unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 2);
}

#[test]
fn override_can_add_a_capability() {
    let iterable = ProxyBase::builder("iterable")
        .direct("__iter__", |this, _args| {
            let n = ops::to_int(&original(this)?)?;
            ops::iter(&Value::list((0..n).map(Value::Int).collect()))
        })
        .build()
        .unwrap();
    let p = proxy_with(Value::Int(3), &iterable).unwrap();
    assert!(ops::hasattr(&p, "__iter__").unwrap());
    assert_eq!(ops::to_vec(&p).unwrap(), vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    // plain proxies of the same class still mirror `int`
    assert!(!ops::hasattr(&proxy(Value::Int(3)), "__iter__").unwrap());
}

#[test]
fn override_delegates_with_forward() {
    let doubling = ProxyBase::builder("doubling")
        .direct("__len__", |this, args| {
            let len = forward(this, Op::Len, args)?;
            ops::mul(&len, &Value::Int(2))
        })
        .build()
        .unwrap();
    let p = proxy_with(Value::list(vec![Value::None; 3]), &doubling).unwrap();
    assert_eq!(ops::len(&p).unwrap(), 6);
}

#[test]
fn child_base_inherits_and_overrides() {
    let parent = ProxyBase::builder("labelled")
        .direct("__str__", |_this, _args| Ok(Value::str("parent")))
        .direct("__repr__", |_this, _args| Ok(Value::str("parent-repr")))
        .build()
        .unwrap();
    let child = ProxyBase::builder("relabelled")
        .extends(&parent)
        .direct("__str__", |_this, _args| Ok(Value::str("child")))
        .build()
        .unwrap();
    assert!(child.is_subbase_of(&parent));

    let p = proxy_with(Value::Int(1), &child).unwrap();
    assert_eq!(ops::str(&p).unwrap(), "child");
    assert_eq!(ops::repr(&p).unwrap(), "parent-repr");
    assert_eq!(ops::type_of(&p).name(), "relabelled[int]");
}

#[test]
fn instance_override_affects_one_proxy() {
    let list = Value::list(vec![Value::Int(1)]);
    let first = proxy(list.clone());
    let second = proxy(list);

    state(&first)
        .unwrap()
        .set_override("__len__", Arc::new(|_this: &Value, _args: &[Value]| -> RunResult<Value> {
            Ok(Value::Int(99))
        }))
        .unwrap();
    assert_eq!(ops::len(&first).unwrap(), 99);
    assert_eq!(ops::len(&second).unwrap(), 1);

    state(&first).unwrap().remove_override("__len__");
    assert_eq!(ops::len(&first).unwrap(), 1);
}

#[test]
fn state_namespace_is_detached() {
    let p = proxy(Value::Int(42));
    state(&p).unwrap().set("label", Value::str("answer"));

    assert_eq!(state(&p).unwrap().get("label"), Some(&Value::str("answer")));
    // the proxy's forwarded namespace never sees state entries
    assert!(!ops::hasattr(&p, "label").unwrap());
    assert_eq!(original(&p).unwrap(), Value::Int(42));

    let err = state(&Value::Int(42)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: expected a proxy, got 'int'");
}

#[test]
fn nested_state_borrow_fails_cleanly() {
    let p = proxy(Value::Int(1));
    let held = state(&p).unwrap();
    let err = state(&p).unwrap_err();
    assert!(err.matches(ExcType::RuntimeError));
    // routing reads the record too, so it reports the same conflict instead of panicking
    assert!(ops::repr(&p).unwrap_err().matches(ExcType::RuntimeError));
    // the wrapped value stays reachable while the record is held
    assert_eq!(original(&p).unwrap(), Value::Int(1));
    assert_eq!(forward(&p, Op::Repr, &[]).unwrap(), Value::str("1"));
    drop(held);
    assert_eq!(ops::repr(&p).unwrap(), "1");
}

#[test]
fn override_reaches_original_while_holding_state() {
    let counting = ProxyBase::builder("counting")
        .direct("__len__", |this, _args| {
            let mut record = state(this)?;
            let calls = record.get("calls").and_then(Value::as_int).unwrap_or_default();
            record.set("calls", Value::Int(calls + 1));
            let len = ops::len(&original(this)?)?;
            Ok(Value::Int(i64::try_from(len).unwrap_or_default()))
        })
        .build()
        .unwrap();
    let p = proxy_with(Value::list(vec![Value::None; 2]), &counting).unwrap();
    assert_eq!(ops::len(&p).unwrap(), 2);
    assert_eq!(ops::len(&p).unwrap(), 2);
    assert_eq!(state(&p).unwrap().get("calls"), Some(&Value::Int(2)));
}

fn thing_class() -> Arc<Class> {
    Class::builder("Thing").attribute("name").build()
}

#[test]
fn getattr_override_handles_missing_names() {
    let fallback = ProxyBase::builder("fallback")
        .direct("__getattr__", |_this, args| {
            Ok(Value::str(&format!("fallback:{}", args[0].as_str().unwrap_or_default())))
        })
        .build()
        .unwrap();
    let thing = Instance::create(&thing_class(), [("name", Value::str("widget"))]);
    let p = proxy_with(thing.clone(), &fallback).unwrap();

    assert_eq!(ops::getattr(&p, "missing").unwrap(), Value::str("fallback:missing"));
    // names the wrapped value resolves never reach the fallback
    assert_eq!(ops::getattr(&p, "name").unwrap(), Value::str("widget"));
    assert!(ops::hasattr(&p, "anything").unwrap());
    assert!(!ops::hasattr(&thing, "missing").unwrap());
}

#[test]
fn getattr_override_covers_masked_names() {
    let fallback = ProxyBase::builder("fallback")
        .direct("__getattr__", |_this, _args| Ok(Value::str("hidden")))
        .build()
        .unwrap();
    let thing = Instance::create(&thing_class(), [("name", Value::str("widget"))]);
    let p = ProxyFactory::new().mask_proxy_with(thing, ["name"], &fallback).unwrap();
    assert_eq!(ops::getattr(&p, "name").unwrap(), Value::str("hidden"));
}

#[test]
fn writes_to_overridden_attributes_stay_on_the_proxy() {
    let labelled = ProxyBase::builder("labelled")
        .direct("label", |_this, _args| Ok(Value::str("default")))
        .build()
        .unwrap();
    let thing = Instance::create(&thing_class(), [("name", Value::str("widget"))]);
    let p = proxy_with(thing.clone(), &labelled).unwrap();

    ops::setattr(&p, "label", Value::str("custom")).unwrap();
    assert_eq!(ops::getattr(&p, "label").unwrap(), Value::str("custom"));
    assert!(!ops::hasattr(&thing, "label").unwrap());
    assert_eq!(state(&p).unwrap().get("label"), Some(&Value::str("custom")));

    // deleting restores the override
    ops::delattr(&p, "label").unwrap();
    let label = ops::getattr(&p, "label").unwrap();
    assert_eq!(ops::call(&label, &[]).unwrap(), Value::str("default"));
    let err = ops::delattr(&p, "label").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Thing' object has no attribute 'label'");

    // other names still reach the wrapped instance
    ops::setattr(&p, "name", Value::str("gadget")).unwrap();
    assert_eq!(ops::getattr(&thing, "name").unwrap(), Value::str("gadget"));
}

#[test]
fn override_sees_its_own_proxy_resolve_afresh() {
    let recursive = ProxyBase::builder("recursive")
        .direct("__str__", |this, _args| Ok(Value::str(&format!("<{}>", ops::repr(this)?))))
        .direct("__repr__", |this, _args| Ok(Value::str(&format!("r{}", ops::repr(&original(this)?)?))))
        .build()
        .unwrap();
    let p = proxy_with(Value::Int(5), &recursive).unwrap();
    assert_eq!(ops::str(&p).unwrap(), "<r5>");
}

#[test]
fn invalid_declarations_fail_to_build() {
    let err = ProxyBase::builder("bad name").build().unwrap_err();
    assert_eq!(err, ConstructionError::InvalidName { name: "bad name".to_owned() });

    let err = ProxyBase::builder("base").direct("", noop).build().unwrap_err();
    assert_eq!(err, ConstructionError::InvalidName { name: String::new() });

    let err = ProxyBase::builder("base").direct("__frobnicate__", noop).build().unwrap_err();
    assert_eq!(err, ConstructionError::UnknownOperation { name: "__frobnicate__".to_owned() });

    let err = ProxyBase::builder("base").direct("write", noop).direct("write", noop).build().unwrap_err();
    assert_eq!(
        err,
        ConstructionError::DuplicateOverride {
            base: "base".to_owned(),
            name: "write".to_owned()
        }
    );
    assert_eq!(err.to_string(), "proxy base 'base' declares write more than once");
}

#[test]
fn paired_override_needs_its_partner() {
    let entering = ProxyBase::builder("entering")
        .direct("__enter__", |this, _args| Ok(this.clone()))
        .build()
        .unwrap();

    let err = proxy_with(Value::Int(1), &entering).unwrap_err();
    assert_eq!(
        err,
        ConstructionError::MissingCounterpart {
            base: "entering".to_owned(),
            wrapped: "int".to_owned(),
            op: Op::Enter,
            counterpart: Op::Exit,
        }
    );
    let exc: surrogate::Exception = err.into();
    assert!(exc.matches(ExcType::TypeError));

    // a wrapped class with `__exit__` supplies the partner
    let scoped = Class::builder("Scoped")
        .method("__enter__", |this, _args| Ok(this.clone()))
        .method("__exit__", |_this, _args| Ok(Value::Bool(false)))
        .build();
    let factory = ProxyFactory::new();
    let p = factory.proxy_with(Instance::create(&scoped, []), &entering).unwrap();
    let entered = ops::with_scope(&p, |value| Ok(value.is(&p))).unwrap();
    assert_eq!(entered, Some(true));
}
