//! `dict`: insertion-ordered mapping with string, integer and bool keys.

use std::{rc::Rc, sync::Arc};

use indexmap::IndexMap;

use super::{Class, object_type, with_repr_guard};
use crate::{
    args,
    exception::{ExcType, RunResult},
    ops,
    value::{DictRef, Value},
};

/// Storage type of a dict value.
pub type DictMap = IndexMap<DictKey, Value, ahash::RandomState>;

/// A hashable dict key.
///
/// `True`/`False` are stored as `1`/`0`, matching the `1 == True` equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Int(i64),
    Str(Rc<str>),
}

impl DictKey {
    /// Converts a value into a key, raising `TypeError` for unsupported key types.
    pub fn from_value(value: &Value) -> RunResult<Self> {
        match value {
            Value::Str(s) => Ok(Self::Str(Rc::clone(s))),
            Value::Int(i) => Ok(Self::Int(*i)),
            Value::Bool(b) => Ok(Self::Int(i64::from(*b))),
            other => {
                // unhashable values report themselves as such
                ops::hash(other)?;
                Err(ExcType::type_error(format!(
                    "dict keys must be str or int, not '{}'",
                    other.type_name()
                )))
            }
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Str(s) => Value::Str(Rc::clone(s)),
        }
    }
}

fn dict_receiver(this: &Value) -> RunResult<&DictRef> {
    match this {
        Value::Dict(map) => Ok(map),
        other => Err(ExcType::type_error(format!(
            "descriptor requires a 'dict' object but received a '{}'",
            other.type_name()
        ))),
    }
}

fn snapshot(this: &Value) -> RunResult<Vec<(DictKey, Value)>> {
    Ok(dict_receiver(this)?
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect())
}

fn missing(key: &Value) -> crate::Exception {
    match ops::repr(key) {
        Ok(repr) => ExcType::key_error(&repr),
        Err(err) => err,
    }
}

fn dicts_equal(this: &Value, other: &Value) -> RunResult<bool> {
    let left = snapshot(this)?;
    let right = dict_receiver(other)?;
    if left.len() != right.borrow().len() {
        return Ok(false);
    }
    for (key, value) in left {
        let Some(other_value) = right.borrow().get(&key).cloned() else {
            return Ok(false);
        };
        if !value.is(&other_value) && !ops::eq(&value, &other_value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(super) fn build_dict() -> Arc<Class> {
    Class::builder("dict")
        .base(&object_type())
        .native()
        .block("__hash__")
        .method("__repr__", |this, args| {
            args::check_zero_args("dict.__repr__", args)?;
            let entries = snapshot(this)?;
            with_repr_guard(this, "{...}", || {
                let parts = entries
                    .iter()
                    .map(|(k, v)| -> RunResult<String> {
                        Ok(format!("{}: {}", ops::repr(&k.to_value())?, ops::repr(v)?))
                    })
                    .collect::<RunResult<Vec<String>>>()?;
                Ok(format!("{{{}}}", parts.join(", ")))
            })
            .map(Value::from)
        })
        .method("__len__", |this, args| {
            args::check_zero_args("dict.__len__", args)?;
            Ok(Value::Int(dict_receiver(this)?.borrow().len() as i64))
        })
        .method("__getitem__", |this, args| {
            let key = args::get_one_arg("dict.__getitem__", args)?;
            let lookup = DictKey::from_value(key)?;
            let found = dict_receiver(this)?.borrow().get(&lookup).cloned();
            found.ok_or_else(|| missing(key))
        })
        .method("__setitem__", |this, args| {
            let (key, value) = args::get_two_args("dict.__setitem__", args)?;
            let key = DictKey::from_value(key)?;
            dict_receiver(this)?.borrow_mut().insert(key, value.clone());
            Ok(Value::None)
        })
        .method("__delitem__", |this, args| {
            let key = args::get_one_arg("dict.__delitem__", args)?;
            let lookup = DictKey::from_value(key)?;
            let removed = dict_receiver(this)?.borrow_mut().shift_remove(&lookup);
            removed.map(|_| Value::None).ok_or_else(|| missing(key))
        })
        .method("__iter__", |this, args| {
            args::check_zero_args("dict.__iter__", args)?;
            let keys = snapshot(this)?.into_iter().map(|(k, _)| k.to_value()).collect();
            Ok(Value::iterator(keys))
        })
        .method("__contains__", |this, args| {
            let key = args::get_one_arg("dict.__contains__", args)?;
            let key = DictKey::from_value(key)?;
            Ok(Value::Bool(dict_receiver(this)?.borrow().contains_key(&key)))
        })
        .method("__eq__", |this, args| {
            let other = args::get_one_arg("dict.__eq__", args)?;
            match other {
                Value::Dict(_) => dicts_equal(this, other).map(Value::Bool),
                _ => Ok(Value::NotImplemented),
            }
        })
        .method("__ne__", |this, args| {
            let other = args::get_one_arg("dict.__ne__", args)?;
            match other {
                Value::Dict(_) => dicts_equal(this, other).map(|eq| Value::Bool(!eq)),
                _ => Ok(Value::NotImplemented),
            }
        })
        .method("get", |this, args| {
            let (key, default) = args::get_one_two_args("get", args)?;
            let lookup = DictKey::from_value(key)?;
            let found = dict_receiver(this)?.borrow().get(&lookup).cloned();
            Ok(found.unwrap_or_else(|| default.cloned().unwrap_or(Value::None)))
        })
        .method("pop", |this, args| {
            let (key, default) = args::get_one_two_args("pop", args)?;
            let lookup = DictKey::from_value(key)?;
            let removed = dict_receiver(this)?.borrow_mut().shift_remove(&lookup);
            match (removed, default) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(missing(key)),
            }
        })
        .method("keys", |this, args| {
            args::check_zero_args("dict.keys", args)?;
            Ok(Value::list(snapshot(this)?.into_iter().map(|(k, _)| k.to_value()).collect()))
        })
        .method("values", |this, args| {
            args::check_zero_args("dict.values", args)?;
            Ok(Value::list(snapshot(this)?.into_iter().map(|(_, v)| v).collect()))
        })
        .method("items", |this, args| {
            args::check_zero_args("dict.items", args)?;
            Ok(Value::list(
                snapshot(this)?
                    .into_iter()
                    .map(|(k, v)| Value::tuple(vec![k.to_value(), v]))
                    .collect(),
            ))
        })
        .build()
}
