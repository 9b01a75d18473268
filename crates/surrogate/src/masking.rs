//! Attribute masking.
//!
//! A masking proxy hides a set of member names: attribute access to them fails exactly
//! as it would for a member the wrapped value never had, and attribute listings leave
//! them out. The wrapped value is never touched, and several masking proxies over one
//! value each keep their own mask.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::{
    proxy::{ConstructionError, ProxyBase, ProxyFactory},
    value::Value,
};

/// An immutable set of masked member names, cheap to clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskSet {
    names: Arc<IndexSet<String>>,
}

impl MaskSet {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        names.into_iter().map(Into::into).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Masked names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Drops masked names from an attribute listing; non-string entries are kept.
    #[must_use]
    pub fn visible(&self, listing: Vec<Value>) -> Vec<Value> {
        listing
            .into_iter()
            .filter(|entry| entry.as_str().is_none_or(|name| !self.contains(name)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for MaskSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: Arc::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}

impl ProxyFactory {
    /// Wraps `value` in a proxy that hides `names`.
    #[must_use]
    pub fn mask_proxy<S: Into<String>>(&self, value: Value, names: impl IntoIterator<Item = S>) -> Value {
        self.proxy_unchecked(value, &ProxyBase::masking(), Some(MaskSet::new(names)))
    }

    /// Wraps `value` in a proxy that hides `names` and routes through `base`'s overrides.
    ///
    /// Overrides take precedence over the mask, so a masked name with an override still
    /// resolves to the override.
    pub fn mask_proxy_with<S: Into<String>>(
        &self,
        value: Value,
        names: impl IntoIterator<Item = S>,
        base: &Arc<ProxyBase>,
    ) -> Result<Value, ConstructionError> {
        self.proxy_masked(value, base, MaskSet::new(names))
    }
}
