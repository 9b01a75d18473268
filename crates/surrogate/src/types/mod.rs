//! The host object model: runtime classes and the built-in types.
//!
//! Built-in classes are created once per process and shared; `Value::class()`
//! hands out clones of these `Arc`s.

pub mod class;
pub mod dict;
mod format;
mod function;
mod iter;
mod list;
mod numeric;
mod object;
pub(crate) mod str;

use std::{
    cell::RefCell,
    sync::{Arc, LazyLock},
};

pub use class::{Class, ClassBuilder, ClassId, Instance, Member, Method};
pub use dict::{DictKey, DictMap};
pub use function::{BoundMethod, Function};
pub use iter::SeqIter;
pub(crate) use numeric::float_repr;
pub(crate) use object::generic_getattribute;

use crate::{
    exception::{ExcType, RunResult},
    ops,
    value::Value,
};

static OBJECT: LazyLock<Arc<Class>> = LazyLock::new(object::build_object);
static TYPE: LazyLock<Arc<Class>> = LazyLock::new(object::build_type);
static NONE_TYPE: LazyLock<Arc<Class>> = LazyLock::new(object::build_none_type);
static NOT_IMPLEMENTED_TYPE: LazyLock<Arc<Class>> = LazyLock::new(object::build_not_implemented_type);
static FUNCTION: LazyLock<Arc<Class>> = LazyLock::new(object::build_function);
static METHOD: LazyLock<Arc<Class>> = LazyLock::new(object::build_method);
static EXCEPTION: LazyLock<Arc<Class>> = LazyLock::new(object::build_exception);
static INT: LazyLock<Arc<Class>> = LazyLock::new(numeric::build_int);
static BOOL: LazyLock<Arc<Class>> = LazyLock::new(numeric::build_bool);
static FLOAT: LazyLock<Arc<Class>> = LazyLock::new(numeric::build_float);
static STR: LazyLock<Arc<Class>> = LazyLock::new(str::build_str);
static BYTES: LazyLock<Arc<Class>> = LazyLock::new(str::build_bytes);
static LIST: LazyLock<Arc<Class>> = LazyLock::new(list::build_list);
static TUPLE: LazyLock<Arc<Class>> = LazyLock::new(list::build_tuple);
static DICT: LazyLock<Arc<Class>> = LazyLock::new(dict::build_dict);
static ITERATOR: LazyLock<Arc<Class>> = LazyLock::new(iter::build_iterator);

/// The root class every other class derives from.
#[must_use]
pub fn object_type() -> Arc<Class> {
    Arc::clone(&OBJECT)
}

#[must_use]
pub fn type_type() -> Arc<Class> {
    Arc::clone(&TYPE)
}

#[must_use]
pub fn none_type() -> Arc<Class> {
    Arc::clone(&NONE_TYPE)
}

#[must_use]
pub fn not_implemented_type() -> Arc<Class> {
    Arc::clone(&NOT_IMPLEMENTED_TYPE)
}

#[must_use]
pub fn function_type() -> Arc<Class> {
    Arc::clone(&FUNCTION)
}

#[must_use]
pub fn method_type() -> Arc<Class> {
    Arc::clone(&METHOD)
}

#[must_use]
pub fn exception_type() -> Arc<Class> {
    Arc::clone(&EXCEPTION)
}

#[must_use]
pub fn int_type() -> Arc<Class> {
    Arc::clone(&INT)
}

#[must_use]
pub fn bool_type() -> Arc<Class> {
    Arc::clone(&BOOL)
}

#[must_use]
pub fn float_type() -> Arc<Class> {
    Arc::clone(&FLOAT)
}

#[must_use]
pub fn str_type() -> Arc<Class> {
    Arc::clone(&STR)
}

#[must_use]
pub fn bytes_type() -> Arc<Class> {
    Arc::clone(&BYTES)
}

#[must_use]
pub fn list_type() -> Arc<Class> {
    Arc::clone(&LIST)
}

#[must_use]
pub fn tuple_type() -> Arc<Class> {
    Arc::clone(&TUPLE)
}

#[must_use]
pub fn dict_type() -> Arc<Class> {
    Arc::clone(&DICT)
}

#[must_use]
pub fn iterator_type() -> Arc<Class> {
    Arc::clone(&ITERATOR)
}

/// Resolves a subscript to a position in `0..len`, counting negative indexes from the end.
///
/// Non-integer keys go through `__index__`, so a proxied integer indexes like the integer.
pub(crate) fn sequence_index(key: &Value, len: usize, kind: &str) -> RunResult<usize> {
    let raw = match key.as_int() {
        Some(i) => i,
        None if key.class().has_member("__index__") => ops::index(key)?,
        None => {
            return Err(ExcType::type_error(format!(
                "{kind} indices must be integers, not '{}'",
                key.type_name()
            )));
        }
    };
    let len = len as i64;
    let index = if raw < 0 { raw + len } else { raw };
    if (0..len).contains(&index) {
        Ok(index as usize)
    } else {
        Err(ExcType::index_error_out_of_range(kind))
    }
}

thread_local! {
    /// Identities of the containers whose `repr` is currently being produced on this thread.
    static REPR_ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Runs a container `repr`, yielding `placeholder` when the container is reached again
/// while its own `repr` is still in progress (a self-referencing container).
pub(crate) fn with_repr_guard(
    this: &Value,
    placeholder: &str,
    render: impl FnOnce() -> RunResult<String>,
) -> RunResult<String> {
    let id = this.identity();
    let reentered = REPR_ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        if active.contains(&id) {
            true
        } else {
            active.push(id);
            false
        }
    });
    if reentered {
        return Ok(placeholder.to_owned());
    }
    let result = render();
    REPR_ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        if let Some(pos) = active.iter().rposition(|entry| *entry == id) {
            active.remove(pos);
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_classes_are_shared() {
        assert!(Arc::ptr_eq(&list_type(), &Value::list(vec![]).class()));
        assert!(bool_type().is_subclass_of(&int_type()));
        assert!(int_type().is_subclass_of(&object_type()));
    }

    #[test]
    fn negative_indexes_count_from_end() {
        assert_eq!(sequence_index(&Value::Int(-1), 3, "list").unwrap(), 2);
        let err = sequence_index(&Value::Int(3), 3, "list").unwrap_err();
        assert_eq!(err.to_string(), "IndexError: list index out of range");
    }

    #[test]
    fn self_referencing_list_repr_terminates() {
        let list = Value::list(vec![Value::Int(1)]);
        list.as_list().unwrap().borrow_mut().push(list.clone());
        assert_eq!(ops::repr(&list).unwrap(), "[1, [...]]");
    }
}
