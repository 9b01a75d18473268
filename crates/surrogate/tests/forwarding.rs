//! Forwarding behavior of plain proxies: every operation reaches the wrapped value and
//! its result or error comes back unchanged.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use surrogate::{
    BinaryOp, Class, ExcType, Op, RunResult, Value, inspect, ops, original, proxy,
    types::{Instance, int_type, list_type},
};

fn ints(items: &[i64]) -> Value {
    Value::list(items.iter().map(|i| Value::Int(*i)).collect())
}

/// A class with a context scope that records how it was exited.
fn scope_class(suppress: bool) -> Arc<Class> {
    Class::builder("Scope")
        .method("__enter__", |this, _args| {
            ops::setattr(this, "entered", Value::Bool(true))?;
            Ok(Value::str("resource"))
        })
        .method("__exit__", move |this, args| {
            ops::setattr(this, "exit_type", args[0].clone())?;
            Ok(Value::Bool(suppress))
        })
        .build()
}

#[test]
fn list_scenario() {
    let list = ints(&[1, 2, 3]);
    let p = proxy(list.clone());

    assert_eq!(ops::len(&p).unwrap(), 3);
    assert_eq!(ops::getitem(&p, &Value::Int(0)).unwrap(), Value::Int(1));
    assert_eq!(ops::to_vec(&p).unwrap(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert!(ops::contains(&p, &Value::Int(2)).unwrap());
    assert_eq!(ops::repr(&p).unwrap(), "[1, 2, 3]");

    ops::call_method(&p, "append", &[Value::Int(4)]).unwrap();
    assert_eq!(ops::len(&list).unwrap(), 4);
    assert!(original(&p).unwrap().is(&list));
}

#[test]
fn equality_and_hash_forward() {
    let p = proxy(Value::Int(5));
    assert!(ops::eq(&p, &Value::Int(5)).unwrap());
    assert!(ops::eq(&Value::Int(5), &p).unwrap());
    assert!(ops::lt(&p, &Value::Int(6)).unwrap());
    assert_eq!(ops::hash(&p).unwrap(), ops::hash(&Value::Int(5)).unwrap());

    let err = ops::hash(&proxy(ints(&[]))).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
}

#[test]
fn errors_pass_through_verbatim() {
    let p = proxy(ints(&[1]));
    let err = ops::getitem(&p, &Value::Int(5)).unwrap_err();
    assert_eq!(err.to_string(), "IndexError: list index out of range");

    let err = ops::getattr(&p, "missing").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'list' object has no attribute 'missing'");
}

#[test]
fn inplace_on_mutable_keeps_proxy() {
    let list = ints(&[1]);
    let p = proxy(list.clone());
    let rebound = ops::iadd(&p, &ints(&[2])).unwrap();
    assert!(rebound.is(&p));
    assert_eq!(ops::len(&list).unwrap(), 2);
}

#[test]
fn inplace_on_immutable_returns_new_value() {
    let p = proxy(Value::Int(2));
    let rebound = ops::iadd(&p, &Value::Int(3)).unwrap();
    assert!(!rebound.is_proxy());
    assert_eq!(rebound, Value::Int(5));
    assert_eq!(original(&p).unwrap(), Value::Int(2));
}

#[test]
fn reflected_operations_reach_proxies() {
    let result = ops::binary(&Value::Int(1), &proxy(Value::Int(2)), BinaryOp::Or).unwrap();
    assert_eq!(result, Value::Int(3));
    let result = ops::binary(&Value::Int(10), &proxy(Value::Int(4)), BinaryOp::Sub).unwrap();
    assert_eq!(result, Value::Int(6));
    let result = ops::add(&proxy(Value::Int(1)), &proxy(Value::Float(0.5))).unwrap();
    assert_eq!(result, Value::Float(1.5));
    let result = ops::add(&Value::Float(4.5), &proxy(Value::Int(2))).unwrap();
    assert_eq!(result, Value::Float(6.5));
    let result = ops::add(&proxy(Value::str("foo")), &Value::str("bar")).unwrap();
    assert_eq!(result, Value::str("foobar"));

    let err = ops::add(&Value::Int(2), &proxy(Value::str("foo"))).unwrap_err();
    assert!(err.matches(ExcType::TypeError));
}

#[test]
fn context_scope_forwards() {
    let scope = Instance::create(&scope_class(false), []);
    let p = proxy(scope.clone());
    let entered = ops::with_scope(&p, |resource| Ok(resource.clone())).unwrap();
    assert_eq!(entered, Some(Value::str("resource")));
    assert_eq!(ops::getattr(&scope, "entered").unwrap(), Value::Bool(true));
    assert_eq!(ops::getattr(&scope, "exit_type").unwrap(), Value::None);
}

#[test]
fn context_scope_suppression_forwards() {
    let suppressing = proxy(Instance::create(&scope_class(true), []));
    let result: Option<()> = ops::with_scope(&suppressing, |_| Err(ExcType::value_error("boom"))).unwrap();
    assert_eq!(result, None);
    assert_eq!(ops::getattr(&suppressing, "exit_type").unwrap(), Value::str("ValueError"));

    let propagating = proxy(Instance::create(&scope_class(false), []));
    let err = ops::with_scope(&propagating, |_| -> surrogate::RunResult<()> { Err(ExcType::value_error("boom")) })
        .unwrap_err();
    assert_eq!(err.to_string(), "ValueError: boom");
}

#[test]
fn isinstance_reports_wrapped_class() {
    let p = proxy(ints(&[]));
    assert!(ops::isinstance(&p, &list_type()).unwrap());
    assert!(!ops::isinstance(&p, &int_type()).unwrap());
    assert_eq!(ops::type_of(&p).name(), "proxy[list]");
    assert_eq!(ops::getattr(&p, "__class__").unwrap(), Value::Class(list_type()));
}

#[test]
fn capability_mirroring() {
    let point = Class::builder("Point").attribute("x").method("__len__", |_, _| Ok(Value::Int(2))).build();
    let values = [
        Value::Int(1),
        Value::Float(1.5),
        Value::str("abc"),
        Value::bytes(b"abc"),
        ints(&[1]),
        Value::tuple(vec![Value::Int(1)]),
        Value::dict([("a", Value::Int(1))]),
        Instance::create(&point, [("x", Value::Int(1))]),
        Value::None,
    ];
    for value in values {
        let p = proxy(value.clone());
        assert_eq!(inspect(&p.class()), inspect(&value.class()), "{}", value.type_name());
        assert_eq!(ops::supported_ops(&p).unwrap(), ops::supported_ops(&value).unwrap());
        for op in [Op::Len, Op::Iter, Op::Hash, Op::Call, Op::Add, Op::Enter] {
            assert_eq!(
                ops::hasattr(&p, op.dunder()).unwrap(),
                ops::hasattr(&value, op.dunder()).unwrap(),
                "{op} on {}",
                value.type_name()
            );
        }
    }
}

#[test]
fn unsupported_operations_stay_unsupported() {
    let p = proxy(Value::Int(3));
    let err = ops::len(&p).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: object of type 'int' has no len()");
    assert!(ops::iter(&p).is_err());
    assert!(!ops::hasattr(&p, "__iter__").unwrap());
}

#[test]
fn missing_operation_errors_match_the_wrapped_value() {
    let cases: [(Value, fn(&Value) -> RunResult<()>); 4] = [
        (ints(&[]), |v| ops::hash(v).map(drop)),
        (Value::Int(3), |v| ops::len(v).map(drop)),
        (Value::Int(3), |v| ops::iter(v).map(drop)),
        (ints(&[1]), |v| ops::sub(v, &Value::Int(1)).map(drop)),
    ];
    for (value, op) in cases {
        let direct = op(&value).unwrap_err().to_string();
        assert_eq!(op(&proxy(value.clone())).unwrap_err().to_string(), direct);
        assert_eq!(op(&proxy(proxy(value))).unwrap_err().to_string(), direct);
    }
}

#[test]
fn attribute_writes_reach_the_wrapped_instance() {
    let class = Class::builder("Box").build();
    let instance = Instance::create(&class, [("v", Value::Int(1))]);
    let p = proxy(instance.clone());
    ops::setattr(&p, "v", Value::Int(2)).unwrap();
    assert_eq!(ops::getattr(&instance, "v").unwrap(), Value::Int(2));
    ops::delattr(&p, "v").unwrap();
    assert!(!ops::hasattr(&instance, "v").unwrap());
}

#[test]
fn legacy_division_forwards_as_itself() {
    let ratio = Class::builder("Ratio")
        .method("__truediv__", |_this, _args| Ok(Value::str("true")))
        .method("__div__", |_this, _args| Ok(Value::str("legacy")))
        .build();
    let p = proxy(Instance::create(&ratio, []));
    assert_eq!(ops::call_slot(&p, Op::Div, &[Value::Int(2)]).unwrap(), Value::str("legacy"));
    assert_eq!(ops::binary(&p, &Value::Int(2), BinaryOp::TrueDiv).unwrap(), Value::str("true"));
}

#[test]
fn proxies_nest() {
    let list = ints(&[1, 2]);
    let inner = proxy(list.clone());
    let outer = proxy(inner.clone());
    assert_eq!(ops::type_of(&outer).name(), "proxy[proxy[list]]");
    assert_eq!(ops::len(&outer).unwrap(), 2);
    assert!(original(&outer).unwrap().is(&inner));
    assert!(ops::isinstance(&outer, &list_type()).unwrap());
}

#[test]
fn truthiness_and_conversions_forward() {
    assert!(!ops::truthy(&proxy(Value::Int(0))).unwrap());
    assert!(ops::truthy(&proxy(ints(&[1]))).unwrap());
    assert_eq!(ops::to_float(&proxy(Value::Int(2))).unwrap(), 2.0);
    assert_eq!(ops::index(&proxy(Value::Int(2))).unwrap(), 2);
    assert_eq!(ops::format(&proxy(Value::Int(42)), ">5").unwrap(), "   42");
    // a proxied integer indexes like the integer
    assert_eq!(ops::getitem(&ints(&[7, 8]), &proxy(Value::Int(1))).unwrap(), Value::Int(8));
}
