//! Per-instance proxy state.
//!
//! Each proxy owns exactly one [`StateRecord`]. Lookup is by instance identity and never
//! goes through dispatch, so reading or changing state triggers no forwarding, masking,
//! overrides or tracing.

use std::{
    any::{Any, TypeId},
    cell::RefMut,
    fmt,
};

use ahash::AHashMap;
use indexmap::IndexMap;

use super::{
    ProxyId, ProxyInstance,
    base::{ConstructionError, ProxyBase, validate_override_name},
};
use crate::{
    exception::{ExcType, RunResult},
    masking::MaskSet,
    types::Method,
    value::Value,
};

/// Host-side state of one proxy instance.
pub struct StateRecord {
    overrides: IndexMap<String, Method>,
    mask: Option<MaskSet>,
    /// Free-form namespace, separate from the wrapped value's attributes.
    attrs: IndexMap<String, Value>,
    /// Typed host data such as a running checksum.
    extensions: AHashMap<TypeId, Box<dyn Any>>,
}

impl StateRecord {
    pub(crate) fn new(base: &ProxyBase, mask: Option<MaskSet>) -> Self {
        Self {
            overrides: base.overrides().clone(),
            mask,
            attrs: IndexMap::new(),
            extensions: AHashMap::new(),
        }
    }

    /// The overrides in effect for this instance.
    #[must_use]
    pub fn overrides(&self) -> &IndexMap<String, Method> {
        &self.overrides
    }

    #[must_use]
    pub fn has_override(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    /// Overrides `name` on this instance only.
    ///
    /// An operation override only takes effect when the proxy's type has the operation;
    /// types are fixed at synthesis, so declare new operations on the base instead.
    pub fn set_override(&mut self, name: &str, func: Method) -> Result<Option<Method>, ConstructionError> {
        validate_override_name(name)?;
        Ok(self.overrides.insert(name.to_owned(), func))
    }

    /// Removes an override so the member is forwarded again.
    pub fn remove_override(&mut self, name: &str) -> Option<Method> {
        self.overrides.shift_remove(name)
    }

    #[must_use]
    pub fn mask(&self) -> Option<&MaskSet> {
        self.mask.as_ref()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.attrs.insert(name.to_owned(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attrs.shift_remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Stores a typed extension, returning the one it replaces.
    pub fn insert_ext<T: Any>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok().map(|old| *old))
    }

    #[must_use]
    pub fn ext<T: Any>(&self) -> Option<&T> {
        self.extensions.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn ext_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.extensions.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn remove_ext<T: Any>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast().ok().map(|old| *old))
    }
}

impl fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRecord")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("mask", &self.mask)
            .field("attrs", &self.attrs)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

fn instance(value: &Value) -> RunResult<&ProxyInstance> {
    match value {
        Value::Proxy(inst) => Ok(inst),
        other => Err(ExcType::type_error(format!(
            "expected a proxy, got '{}'",
            other.type_name()
        ))),
    }
}

/// Borrows the state record of a proxy for reading and writing.
///
/// Fails with `TypeError` for non-proxies and with `RuntimeError` while the record is
/// already borrowed, e.g. by an enclosing caller still holding it.
pub fn state(value: &Value) -> RunResult<RefMut<'_, StateRecord>> {
    let inst = instance(value)?;
    inst.state_cell()
        .try_borrow_mut()
        .map_err(|_| ExcType::runtime_error(format!("state of {} is already borrowed", inst.id())))
}

/// The value a proxy wraps.
///
/// Never routed and never blocked by a held [`state`] borrow, so overrides can always
/// reach the wrapped value.
pub fn original(value: &Value) -> RunResult<Value> {
    Ok(instance(value)?.original().clone())
}

#[must_use]
pub fn is_proxy(value: &Value) -> bool {
    value.is_proxy()
}

#[must_use]
pub fn proxy_id(value: &Value) -> Option<ProxyId> {
    match value {
        Value::Proxy(inst) => Some(inst.id()),
        _ => None,
    }
}

/// Reads the parts of a record the router needs without holding the borrow.
pub(crate) fn with_record<T>(inst: &ProxyInstance, read: impl FnOnce(&StateRecord) -> T) -> RunResult<T> {
    let record = inst
        .state_cell()
        .try_borrow()
        .map_err(|_| ExcType::runtime_error(format!("state of {} is being modified", inst.id())))?;
    Ok(read(&record))
}
