//! Masking proxies hide attribute names without touching the wrapped value.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use surrogate::{Class, ExcType, ProxyBase, ProxyFactory, Value, mask_proxy, ops, original, types::Instance};

fn record_class() -> Arc<Class> {
    Class::builder("Record")
        .attribute("a")
        .attribute("b")
        .attribute("c")
        .method("total", |this, _args| {
            let a = ops::getattr(this, "a")?;
            let b = ops::getattr(this, "b")?;
            ops::add(&a, &b)
        })
        .build()
}

fn record() -> Value {
    Instance::create(
        &record_class(),
        [("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))],
    )
}

#[test]
fn masked_name_reads_as_missing() {
    let value = record();
    let p = mask_proxy(value.clone(), ["b"]);

    assert_eq!(ops::getattr(&p, "a").unwrap(), Value::Int(1));
    assert_eq!(ops::getattr(&p, "c").unwrap(), Value::Int(3));
    let err = ops::getattr(&p, "b").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Record' object has no attribute 'b'");
    assert!(!ops::hasattr(&p, "b").unwrap());

    // the wrapped value still has it
    assert_eq!(ops::getattr(&value, "b").unwrap(), Value::Int(2));
    assert!(original(&p).unwrap().is(&value));
}

#[test]
fn masked_name_cannot_be_written_or_deleted() {
    let value = record();
    let p = mask_proxy(value.clone(), ["b"]);

    let err = ops::setattr(&p, "b", Value::Int(20)).unwrap_err();
    assert!(err.matches(ExcType::AttributeError));
    let err = ops::delattr(&p, "b").unwrap_err();
    assert!(err.matches(ExcType::AttributeError));
    assert_eq!(ops::getattr(&value, "b").unwrap(), Value::Int(2));

    ops::setattr(&p, "a", Value::Int(10)).unwrap();
    assert_eq!(ops::getattr(&value, "a").unwrap(), Value::Int(10));
}

#[test]
fn listing_leaves_masked_names_out() {
    let value = record();
    let p = mask_proxy(value.clone(), ["b", "total"]);

    let visible = ops::dir(&p).unwrap();
    assert!(visible.contains(&"a".to_owned()));
    assert!(visible.contains(&"c".to_owned()));
    assert!(!visible.contains(&"b".to_owned()));
    assert!(!visible.contains(&"total".to_owned()));

    let all = ops::dir(&value).unwrap();
    assert!(all.contains(&"b".to_owned()));
    assert!(all.contains(&"total".to_owned()));
}

#[test]
fn methods_of_the_wrapped_value_see_unmasked_state() {
    let p = mask_proxy(record(), ["b"]);
    // `total` runs against the wrapped instance, where `b` is visible
    assert_eq!(ops::call_method(&p, "total", &[]).unwrap(), Value::Int(3));
}

#[test]
fn independent_masks_over_one_value() {
    let value = record();
    let hide_a = mask_proxy(value.clone(), ["a"]);
    let hide_c = mask_proxy(value.clone(), ["c"]);

    assert!(ops::getattr(&hide_a, "a").is_err());
    assert_eq!(ops::getattr(&hide_a, "c").unwrap(), Value::Int(3));
    assert_eq!(ops::getattr(&hide_c, "a").unwrap(), Value::Int(1));
    assert!(ops::getattr(&hide_c, "c").is_err());

    // both share the masking type for `Record`
    assert!(Arc::ptr_eq(&ops::type_of(&hide_a), &ops::type_of(&hide_c)));
}

#[test]
fn non_attribute_operations_forward() {
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    let p = mask_proxy(list.clone(), ["append"]);

    assert_eq!(ops::len(&p).unwrap(), 2);
    assert_eq!(ops::getitem(&p, &Value::Int(1)).unwrap(), Value::Int(2));
    assert!(ops::getattr(&p, "append").is_err());
    assert_eq!(ops::call_method(&p, "pop", &[]).unwrap(), Value::Int(2));
    assert_eq!(ops::len(&list).unwrap(), 1);
}

#[test]
fn override_beats_mask() {
    let base = ProxyBase::builder("announcing")
        .direct("b", |_this, _args| Ok(Value::str("from override")))
        .build()
        .unwrap();
    let factory = ProxyFactory::new();
    let p = factory.mask_proxy_with(record(), ["b", "c"], &base).unwrap();

    let bound = ops::getattr(&p, "b").unwrap();
    assert_eq!(ops::call(&bound, &[]).unwrap(), Value::str("from override"));
    assert!(ops::getattr(&p, "c").is_err());
    assert_eq!(ops::getattr(&p, "a").unwrap(), Value::Int(1));
}

#[test]
fn masking_nests() {
    let value = record();
    let inner = mask_proxy(value, ["a"]);
    let outer = mask_proxy(inner, ["c"]);

    assert!(ops::getattr(&outer, "a").is_err());
    assert!(ops::getattr(&outer, "c").is_err());
    assert_eq!(ops::getattr(&outer, "b").unwrap(), Value::Int(2));
    let err = ops::getattr(&outer, "c").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Record' object has no attribute 'c'");
}
