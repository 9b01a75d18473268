//! Snapshot iterator used by every built-in iterable.

use std::{cell::RefCell, collections::VecDeque, fmt, sync::Arc};

use super::{Class, object_type};
use crate::{
    args,
    exception::{ExcType, RunResult},
    value::Value,
};

/// Iterates over the items an iterable held when `__iter__` was called.
pub struct SeqIter {
    items: RefCell<VecDeque<Value>>,
}

impl SeqIter {
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items.into()),
        }
    }

    /// Takes the next item, or `None` once exhausted.
    pub fn advance(&self) -> Option<Value> {
        self.items.borrow_mut().pop_front()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.borrow().len()
    }
}

impl fmt::Debug for SeqIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeqIter").field("remaining", &self.remaining()).finish()
    }
}

fn receiver(this: &Value) -> RunResult<&SeqIter> {
    match this {
        Value::Iterator(it) => Ok(it),
        other => Err(ExcType::type_error(format!(
            "descriptor requires an 'iterator' object but received a '{}'",
            other.type_name()
        ))),
    }
}

pub(super) fn build_iterator() -> Arc<Class> {
    Class::builder("iterator")
        .base(&object_type())
        .native()
        .method("__iter__", |this, args| {
            args::check_zero_args("iterator.__iter__", args)?;
            Ok(this.clone())
        })
        .method("__next__", |this, args| {
            args::check_zero_args("iterator.__next__", args)?;
            receiver(this)?
                .advance()
                .ok_or_else(|| ExcType::StopIteration.into())
        })
        .method("__length_hint__", |this, args| {
            args::check_zero_args("iterator.__length_hint__", args)?;
            Ok(Value::Int(receiver(this)?.remaining() as i64))
        })
        .build()
}
