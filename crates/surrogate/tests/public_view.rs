//! Public views expose exactly the members named by a set of interfaces.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use surrogate::{
    Class, ExcType, Interface, ProxyFactory, Value, api, api_of, ops, private_api, public_view, types::Instance,
};

fn file_class() -> Arc<Class> {
    Class::builder("File")
        .attribute("name")
        .attribute("fd")
        .method("read", |_this, _args| Ok(Value::bytes(b"data")))
        .method("write", |_this, args| Ok(Value::Int(i64::try_from(ops::len(&args[0])?).unwrap_or_default())))
        .method("close", |this, _args| {
            ops::setattr(this, "fd", Value::None)?;
            Ok(Value::None)
        })
        .method("fileno", |this, _args| ops::getattr(this, "fd"))
        .build()
}

fn file() -> Value {
    Instance::create(&file_class(), [("name", Value::str("log.txt")), ("fd", Value::Int(3))])
}

fn reader() -> Interface {
    Interface::new("Reader", ["read", "name"])
}

fn closer() -> Interface {
    Interface::new("Closer", ["close"])
}

#[test]
fn interface_members_are_reachable() {
    let value = file();
    let view = public_view(value.clone(), &[reader(), closer()]).unwrap();

    let read = ops::getattr(&view, "read").unwrap();
    assert_eq!(ops::call(&read, &[]).unwrap(), Value::bytes(b"data"));
    assert_eq!(ops::getattr(&view, "name").unwrap(), Value::str("log.txt"));
    ops::call_method(&view, "close", &[]).unwrap();
    assert_eq!(ops::getattr(&value, "fd").unwrap(), Value::None);
}

#[test]
fn everything_else_is_hidden() {
    let view = public_view(file(), &[reader(), closer()]).unwrap();

    let err = ops::getattr(&view, "write").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'File' object has no attribute 'write'");
    assert!(ops::getattr(&view, "fd").unwrap_err().matches(ExcType::AttributeError));
    assert!(!ops::hasattr(&view, "fileno").unwrap());

    let listed = ops::dir(&view).unwrap();
    assert!(listed.contains(&"read".to_owned()));
    assert!(!listed.contains(&"write".to_owned()));
}

#[test]
fn completeness_and_soundness() {
    let value = file();
    let ifaces = [reader(), closer()];
    let view = public_view(value.clone(), &ifaces).unwrap();
    let defined = api_of(&value).unwrap();

    for name in &defined {
        let exposed = ifaces.iter().any(|iface| iface.contains(name));
        assert_eq!(ops::hasattr(&view, name).unwrap(), exposed, "{name}");
    }
    assert_eq!(
        private_api(&value, &ifaces).unwrap().len(),
        defined.len() - 3,
        "read, name and close are public"
    );
}

#[test]
fn instance_attributes_are_part_of_the_api() {
    let account = Class::builder("Account").attribute("owner").build();
    let value = Instance::create(&account, [("owner", Value::str("ada"))]);
    ops::setattr(&value, "password", Value::str("hunter2")).unwrap();
    assert!(api_of(&value).unwrap().contains("password"));

    let view = public_view(value, &[Interface::new("Owned", ["owner"])]).unwrap();
    assert_eq!(ops::getattr(&view, "owner").unwrap(), Value::str("ada"));
    let err = ops::getattr(&view, "password").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'Account' object has no attribute 'password'");
    assert!(!ops::dir(&view).unwrap().contains(&"password".to_owned()));
}

#[test]
fn names_the_value_lacks_stay_missing() {
    let iface = Interface::new("Seekable", ["seek"]);
    let view = public_view(file(), &[iface]).unwrap();
    let err = ops::getattr(&view, "seek").unwrap_err();
    assert_eq!(err.to_string(), "AttributeError: 'File' object has no attribute 'seek'");
}

#[test]
fn operations_still_forward() {
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    let view = ProxyFactory::new()
        .public_view(list, &[Interface::new("Sized", ["__len__"])])
        .unwrap();
    assert_eq!(ops::len(&view).unwrap(), 2);
    assert!(ops::getattr(&view, "append").is_err());
    assert_eq!(ops::repr(&view).unwrap(), "[1, 2]");
}

#[test]
fn class_interfaces() {
    let iface = Interface::from_class(&file_class());
    assert_eq!(iface.name(), "File");
    assert!(iface.contains("write"));
    assert!(iface.contains("fd"));
    assert_eq!(iface.members(), &api(&file_class()));

    // a view through the class's own interface hides nothing
    let view = public_view(file(), &[iface]).unwrap();
    assert_eq!(ops::call_method(&view, "write", &[Value::str("abc")]).unwrap(), Value::Int(3));
}
