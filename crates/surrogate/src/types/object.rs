//! `object`, `type` and the small singleton and callable classes.
//!
//! `object` carries the generic attribute protocol every other class inherits:
//! instance attributes first, then class members (methods bound to the receiver,
//! properties evaluated), then the class's `__getattr__` fallback.

use std::{rc::Rc, sync::Arc};

use super::{BoundMethod, Class, Instance, Member, object_type};
use crate::{
    args,
    exception::{ExcType, RunResult},
    ops, py_hash,
    value::Value,
};

pub(super) fn build_object() -> Arc<Class> {
    Class::builder("object")
        .without_bases()
        .method("__getattribute__", generic_getattribute)
        .method("__setattr__", generic_setattr)
        .method("__delattr__", generic_delattr)
        .method("__dir__", generic_dir)
        .method("__repr__", |this, args| {
            args::check_zero_args("object.__repr__", args)?;
            Ok(Value::from(format!("<{} object at {:#x}>", this.type_name(), this.identity())))
        })
        .method("__str__", |this, args| {
            args::check_zero_args("object.__str__", args)?;
            ops::repr(this).map(Value::from)
        })
        .method("__format__", |this, args| {
            let spec = args::get_str_arg("object.__format__", args)?;
            if spec.is_empty() {
                ops::str(this).map(Value::from)
            } else {
                Err(ExcType::type_error(format!(
                    "unsupported format string passed to {}.__format__",
                    this.type_name()
                )))
            }
        })
        .method("__eq__", |this, args| {
            let other = args::get_one_arg("object.__eq__", args)?;
            Ok(if this.is(other) { Value::Bool(true) } else { Value::NotImplemented })
        })
        .method("__ne__", |this, args| {
            let other = args::get_one_arg("object.__ne__", args)?;
            match ops::call_slot(this, crate::Op::Eq, std::slice::from_ref(other))? {
                Value::NotImplemented => Ok(Value::NotImplemented),
                eq => Ok(Value::Bool(!ops::truthy(&eq)?)),
            }
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("object.__hash__", args)?;
            Ok(Value::Int(py_hash::hash_identity(this.identity())))
        })
        .build()
}

/// Attribute lookup shared by every class that does not replace `__getattribute__`.
pub(crate) fn generic_getattribute(this: &Value, args: &[Value]) -> RunResult<Value> {
    let name = args::get_str_arg("__getattribute__", args)?;
    if name == "__class__" {
        return Ok(Value::Class(this.class()));
    }
    if let Value::Instance(instance) = this
        && let Some(value) = instance.get_attr(name)
    {
        return Ok(value);
    }
    let class = this.class();
    match class.lookup(name) {
        Some(Member::Method(method)) => Ok(Value::BoundMethod(Rc::new(BoundMethod::new(
            this.clone(),
            name,
            Arc::clone(method),
        )))),
        Some(Member::Property(getter)) => getter(this, &[]),
        _ => match class.method("__getattr__") {
            Some(fallback) => fallback(this, &[Value::str(name)]),
            None => Err(ExcType::attribute_error(class.name(), name)),
        },
    }
}

fn generic_setattr(this: &Value, args: &[Value]) -> RunResult<Value> {
    let (name, value) = args::get_two_args("__setattr__", args)?;
    let name = args::expect_str("__setattr__", name)?;
    match this {
        Value::Instance(instance) => {
            instance.set_attr(name, value.clone());
            Ok(Value::None)
        }
        other => Err(ExcType::attribute_error(other.type_name(), name)),
    }
}

fn generic_delattr(this: &Value, args: &[Value]) -> RunResult<Value> {
    let name = args::get_str_arg("__delattr__", args)?;
    match this {
        Value::Instance(instance) => instance.del_attr(name).map(|()| Value::None),
        other => Err(ExcType::attribute_error(other.type_name(), name)),
    }
}

/// Instance attributes, every resolvable class member and `__class__`, sorted.
fn generic_dir(this: &Value, args: &[Value]) -> RunResult<Value> {
    args::check_zero_args("__dir__", args)?;
    let mut names = this.class().member_names();
    if let Value::Instance(instance) = this {
        names.extend(instance.attrs().keys().cloned());
    }
    names.push("__class__".to_owned());
    names.sort_unstable();
    names.dedup();
    Ok(Value::list(names.into_iter().map(Value::from).collect()))
}

pub(super) fn build_type() -> Arc<Class> {
    Class::builder("type")
        .base(&object_type())
        .native()
        .property("__name__", |this| Ok(Value::str(class_of(this)?.name())))
        .method("__repr__", |this, args| {
            args::check_zero_args("type.__repr__", args)?;
            Ok(Value::from(format!("<class '{}'>", class_of(this)?.name())))
        })
        .method("__call__", type_call)
        .build()
}

fn class_of(this: &Value) -> RunResult<&Arc<Class>> {
    this.as_class().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor requires a 'type' object but received a '{}'",
            this.type_name()
        ))
    })
}

/// Instantiates a user class and runs its `__init__`.
fn type_call(this: &Value, args: &[Value]) -> RunResult<Value> {
    let class = class_of(this)?;
    if class.is_native() {
        return Err(ExcType::type_error(format!("cannot create '{}' instances", class.name())));
    }
    let instance = Value::Instance(Rc::new(Instance::new(class)));
    match class.method("__init__") {
        Some(init) => {
            let result = init(&instance, args)?;
            if !result.is_none() {
                return Err(ExcType::type_error(format!(
                    "__init__() should return None, not '{}'",
                    result.type_name()
                )));
            }
        }
        None if !args.is_empty() => {
            return Err(ExcType::type_error(format!("{}() takes no arguments", class.name())));
        }
        None => {}
    }
    Ok(instance)
}

pub(super) fn build_none_type() -> Arc<Class> {
    Class::builder("NoneType")
        .base(&object_type())
        .native()
        .method("__repr__", |_this, args| {
            args::check_zero_args("NoneType.__repr__", args)?;
            Ok(Value::str("None"))
        })
        .method("__bool__", |_this, args| {
            args::check_zero_args("NoneType.__bool__", args)?;
            Ok(Value::Bool(false))
        })
        .method("__hash__", |_this, args| {
            args::check_zero_args("NoneType.__hash__", args)?;
            Ok(Value::Int(py_hash::NONE_HASH))
        })
        .build()
}

pub(super) fn build_not_implemented_type() -> Arc<Class> {
    Class::builder("NotImplementedType")
        .base(&object_type())
        .native()
        .method("__repr__", |_this, args| {
            args::check_zero_args("NotImplementedType.__repr__", args)?;
            Ok(Value::str("NotImplemented"))
        })
        .build()
}

pub(super) fn build_function() -> Arc<Class> {
    Class::builder("function")
        .base(&object_type())
        .native()
        .property("__name__", |this| match this {
            Value::Function(func) => Ok(Value::str(func.name())),
            other => Err(ExcType::attribute_error(other.type_name(), "__name__")),
        })
        .method("__repr__", |this, args| {
            args::check_zero_args("function.__repr__", args)?;
            match this {
                Value::Function(func) => Ok(Value::from(format!("{func:?}"))),
                other => Ok(Value::from(format!("<{}>", other.type_name()))),
            }
        })
        .method("__call__", |this, args| match this {
            Value::Function(func) => func.call(args),
            other => Err(ExcType::type_error_not_callable(&other.type_name())),
        })
        .build()
}

pub(super) fn build_method() -> Arc<Class> {
    Class::builder("method")
        .base(&object_type())
        .native()
        .property("__name__", |this| match this {
            Value::BoundMethod(method) => Ok(Value::str(method.name())),
            other => Err(ExcType::attribute_error(other.type_name(), "__name__")),
        })
        .property("__self__", |this| match this {
            Value::BoundMethod(method) => Ok(method.receiver().clone()),
            other => Err(ExcType::attribute_error(other.type_name(), "__self__")),
        })
        .method("__repr__", |this, args| {
            args::check_zero_args("method.__repr__", args)?;
            match this {
                Value::BoundMethod(method) => Ok(Value::from(format!(
                    "<bound method {} of {}>",
                    method.name(),
                    ops::repr(method.receiver())?
                ))),
                other => Ok(Value::from(format!("<{}>", other.type_name()))),
            }
        })
        .method("__call__", |this, args| match this {
            Value::BoundMethod(method) => method.call(args),
            other => Err(ExcType::type_error_not_callable(&other.type_name())),
        })
        .build()
}

pub(super) fn build_exception() -> Arc<Class> {
    Class::builder("Exception")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("Exception.__repr__", args)?;
            match this {
                Value::Exception(exc) => Ok(Value::from(exc.py_repr())),
                other => Ok(Value::from(format!("<{}>", other.type_name()))),
            }
        })
        .method("__str__", |this, args| {
            args::check_zero_args("Exception.__str__", args)?;
            match this {
                Value::Exception(exc) => Ok(Value::str(exc.message().unwrap_or_default())),
                other => ops::repr(other).map(Value::from),
            }
        })
        .build()
}
