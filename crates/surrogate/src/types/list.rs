//! `list` and `tuple`.
//!
//! Members that call back into user code (`repr`, equality, iteration of an
//! argument) work on a snapshot of the items so the list is never borrowed
//! across such a call.

use std::sync::Arc;

use super::{Class, object_type, sequence_index, with_repr_guard};
use crate::{
    args,
    exception::{ExcType, RunResult},
    ops, py_hash,
    value::{ListRef, Value},
};

fn list_receiver(this: &Value) -> RunResult<&ListRef> {
    this.as_list().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor requires a 'list' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn tuple_receiver(this: &Value) -> RunResult<&[Value]> {
    match this {
        Value::Tuple(items) => Ok(items),
        other => Err(ExcType::type_error(format!(
            "descriptor requires a 'tuple' object but received a '{}'",
            other.type_name()
        ))),
    }
}

fn snapshot(this: &Value) -> RunResult<Vec<Value>> {
    Ok(list_receiver(this)?.borrow().clone())
}

fn repr_items(items: &[Value]) -> RunResult<Vec<String>> {
    items.iter().map(ops::repr).collect()
}

/// Element-wise equality of two sequences through the `==` protocol.
fn items_equal(left: &[Value], right: &[Value]) -> RunResult<bool> {
    if left.len() != right.len() {
        return Ok(false);
    }
    for (a, b) in left.iter().zip(right) {
        if !a.is(b) && !ops::eq(a, b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn items_contain(items: &[Value], needle: &Value) -> RunResult<bool> {
    for item in items {
        if item.is(needle) || ops::eq(item, needle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn repeat(items: &[Value], other: &Value) -> Option<Vec<Value>> {
    let n = usize::try_from(other.as_int()?).unwrap_or(0);
    Some(items.iter().cloned().cycle().take(items.len() * n).collect())
}

// ============================================================================
// list
// ============================================================================

pub(super) fn build_list() -> Arc<Class> {
    Class::builder("list")
        .base(&object_type())
        .native()
        .block("__hash__")
        .method("__repr__", |this, args| {
            args::check_zero_args("list.__repr__", args)?;
            let items = snapshot(this)?;
            with_repr_guard(this, "[...]", || Ok(format!("[{}]", repr_items(&items)?.join(", "))))
                .map(Value::from)
        })
        .method("__len__", |this, args| {
            args::check_zero_args("list.__len__", args)?;
            Ok(Value::Int(list_receiver(this)?.borrow().len() as i64))
        })
        .method("__getitem__", |this, args| {
            let key = args::get_one_arg("list.__getitem__", args)?;
            let list = list_receiver(this)?;
            let len = list.borrow().len();
            let index = sequence_index(key, len, "list")?;
            Ok(list.borrow()[index].clone())
        })
        .method("__setitem__", |this, args| {
            let (key, value) = args::get_two_args("list.__setitem__", args)?;
            let list = list_receiver(this)?;
            let len = list.borrow().len();
            let index = sequence_index(key, len, "list assignment")?;
            list.borrow_mut()[index] = value.clone();
            Ok(Value::None)
        })
        .method("__delitem__", |this, args| {
            let key = args::get_one_arg("list.__delitem__", args)?;
            let list = list_receiver(this)?;
            let len = list.borrow().len();
            let index = sequence_index(key, len, "list assignment")?;
            list.borrow_mut().remove(index);
            Ok(Value::None)
        })
        .method("__iter__", |this, args| {
            args::check_zero_args("list.__iter__", args)?;
            Ok(Value::iterator(snapshot(this)?))
        })
        .method("__reversed__", |this, args| {
            args::check_zero_args("list.__reversed__", args)?;
            let mut items = snapshot(this)?;
            items.reverse();
            Ok(Value::iterator(items))
        })
        .method("__contains__", |this, args| {
            let needle = args::get_one_arg("list.__contains__", args)?;
            items_contain(&snapshot(this)?, needle).map(Value::Bool)
        })
        .method("__eq__", |this, args| {
            let other = args::get_one_arg("list.__eq__", args)?;
            match other.as_list() {
                Some(_) => items_equal(&snapshot(this)?, &snapshot(other)?).map(Value::Bool),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("__ne__", |this, args| {
            let other = args::get_one_arg("list.__ne__", args)?;
            match other.as_list() {
                Some(_) => items_equal(&snapshot(this)?, &snapshot(other)?).map(|eq| Value::Bool(!eq)),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("__add__", |this, args| {
            let other = args::get_one_arg("list.__add__", args)?;
            match other.as_list() {
                Some(_) => {
                    let mut items = snapshot(this)?;
                    items.extend(snapshot(other)?);
                    Ok(Value::list(items))
                }
                None => Err(ExcType::type_error(format!(
                    "can only concatenate list (not \"{}\") to list",
                    other.type_name()
                ))),
            }
        })
        .method("__iadd__", |this, args| {
            let other = args::get_one_arg("list.__iadd__", args)?;
            let items = ops::to_vec(other)?;
            list_receiver(this)?.borrow_mut().extend(items);
            Ok(this.clone())
        })
        .method("__mul__", |this, args| {
            let other = args::get_one_arg("list.__mul__", args)?;
            Ok(repeat(&snapshot(this)?, other).map_or(Value::NotImplemented, Value::list))
        })
        .method("__rmul__", |this, args| {
            let other = args::get_one_arg("list.__rmul__", args)?;
            Ok(repeat(&snapshot(this)?, other).map_or(Value::NotImplemented, Value::list))
        })
        .method("__imul__", |this, args| {
            let other = args::get_one_arg("list.__imul__", args)?;
            match repeat(&snapshot(this)?, other) {
                Some(items) => {
                    *list_receiver(this)?.borrow_mut() = items;
                    Ok(this.clone())
                }
                None => Ok(Value::NotImplemented),
            }
        })
        .method("append", |this, args| {
            let item = args::get_one_arg("list.append", args)?;
            list_receiver(this)?.borrow_mut().push(item.clone());
            Ok(Value::None)
        })
        .method("extend", |this, args| {
            let iterable = args::get_one_arg("list.extend", args)?;
            let items = ops::to_vec(iterable)?;
            list_receiver(this)?.borrow_mut().extend(items);
            Ok(Value::None)
        })
        .method("insert", |this, args| {
            let (index, item) = args::get_two_args("list.insert", args)?;
            let index = ops::index(index)?;
            let list = list_receiver(this)?;
            let len = list.borrow().len() as i64;
            let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
            list.borrow_mut().insert(position as usize, item.clone());
            Ok(Value::None)
        })
        .method("pop", |this, args| {
            let index = args::get_zero_one_arg("pop", args)?;
            let list = list_receiver(this)?;
            let len = list.borrow().len();
            if len == 0 {
                return Err(ExcType::IndexError.with_message("pop from empty list"));
            }
            let index = match index {
                Some(index) => sequence_index(index, len, "pop")?,
                None => len - 1,
            };
            Ok(list.borrow_mut().remove(index))
        })
        .method("clear", |this, args| {
            args::check_zero_args("list.clear", args)?;
            list_receiver(this)?.borrow_mut().clear();
            Ok(Value::None)
        })
        .method("index", |this, args| {
            let needle = args::get_one_arg("list.index", args)?;
            for (i, item) in snapshot(this)?.iter().enumerate() {
                if item.is(needle) || ops::eq(item, needle)? {
                    return Ok(Value::Int(i as i64));
                }
            }
            Err(ExcType::value_error(format!("{} is not in list", ops::repr(needle)?)))
        })
        .method("count", |this, args| {
            let needle = args::get_one_arg("list.count", args)?;
            let mut count = 0;
            for item in snapshot(this)? {
                if item.is(needle) || ops::eq(&item, needle)? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        })
        .build()
}

// ============================================================================
// tuple
// ============================================================================

pub(super) fn build_tuple() -> Arc<Class> {
    Class::builder("tuple")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("tuple.__repr__", args)?;
            let items = tuple_receiver(this)?;
            with_repr_guard(this, "(...)", || {
                let parts = repr_items(items)?;
                Ok(match parts.as_slice() {
                    [single] => format!("({single},)"),
                    _ => format!("({})", parts.join(", ")),
                })
            })
            .map(Value::from)
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("tuple.__hash__", args)?;
            let hashes = tuple_receiver(this)?.iter().map(ops::hash).collect::<RunResult<Vec<i64>>>()?;
            Ok(Value::Int(py_hash::hash_sequence(hashes)))
        })
        .method("__len__", |this, args| {
            args::check_zero_args("tuple.__len__", args)?;
            Ok(Value::Int(tuple_receiver(this)?.len() as i64))
        })
        .method("__getitem__", |this, args| {
            let key = args::get_one_arg("tuple.__getitem__", args)?;
            let items = tuple_receiver(this)?;
            let index = sequence_index(key, items.len(), "tuple")?;
            Ok(items[index].clone())
        })
        .method("__iter__", |this, args| {
            args::check_zero_args("tuple.__iter__", args)?;
            Ok(Value::iterator(tuple_receiver(this)?.to_vec()))
        })
        .method("__contains__", |this, args| {
            let needle = args::get_one_arg("tuple.__contains__", args)?;
            items_contain(tuple_receiver(this)?, needle).map(Value::Bool)
        })
        .method("__eq__", |this, args| {
            let other = args::get_one_arg("tuple.__eq__", args)?;
            match other {
                Value::Tuple(other) => items_equal(tuple_receiver(this)?, other).map(Value::Bool),
                _ => Ok(Value::NotImplemented),
            }
        })
        .method("__ne__", |this, args| {
            let other = args::get_one_arg("tuple.__ne__", args)?;
            match other {
                Value::Tuple(other) => items_equal(tuple_receiver(this)?, other).map(|eq| Value::Bool(!eq)),
                _ => Ok(Value::NotImplemented),
            }
        })
        .method("__add__", |this, args| {
            let other = args::get_one_arg("tuple.__add__", args)?;
            match other {
                Value::Tuple(other) => {
                    let mut items = tuple_receiver(this)?.to_vec();
                    items.extend(other.iter().cloned());
                    Ok(Value::tuple(items))
                }
                _ => Ok(Value::NotImplemented),
            }
        })
        .build()
}
