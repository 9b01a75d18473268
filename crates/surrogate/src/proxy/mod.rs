//! Transparent proxies.
//!
//! A proxy is a `Value::Proxy` wrapping another value. Its runtime class is synthesized
//! per `(wrapped class, proxy base)` pair by the [`ProxyFactory`] and exposes exactly the
//! operations of the wrapped class plus those the base declares. Every operation on the
//! proxy is routed through the dispatch router, which consults the instance's
//! [`StateRecord`] for overrides and masks before forwarding to the wrapped value.
//!
//! # Usage
//!
//! ```
//! use surrogate::{ProxyBase, Value, direct, ops, original, proxy, proxy_with};
//!
//! let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
//! let p = proxy(list.clone());
//! assert_eq!(ops::len(&p).unwrap(), 3);
//! assert!(original(&p).unwrap().is(&list));
//!
//! let quiet = ProxyBase::builder("quiet")
//!     .declare(direct("__str__", |_this, _args| Ok(Value::str("<proxy>"))))
//!     .build()
//!     .unwrap();
//! let q = proxy_with(Value::Int(7), &quiet).unwrap();
//! assert_eq!(ops::str(&q).unwrap(), "<proxy>");
//! assert_eq!(ops::repr(&q).unwrap(), "7");
//! ```

mod base;
mod factory;
pub(crate) mod router;
mod state;

use std::{
    cell::RefCell,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use crate::value::Value;

pub use base::{BaseId, ConstructionError, OverrideDeclaration, ProxyBase, ProxyBaseBuilder, direct};
pub use factory::{ProxyFactory, ProxyType};
pub use router::forward;
pub use state::{StateRecord, is_proxy, original, proxy_id, state};

/// Process-unique proxy instance identifier.
///
/// Stable for the lifetime of the instance and never reused, so trace events can
/// refer to instances after they are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ProxyId(u32);

impl ProxyId {
    /// Creates a proxy ID from a raw integer.
    #[must_use]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer identifier.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    fn next() -> Self {
        static NEXT_PROXY_ID: AtomicU32 = AtomicU32::new(0);
        Self(NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy#{}", self.0)
    }
}

/// The payload of a `Value::Proxy`: identity, synthesized type, wrapped value and state
/// record.
///
/// The state record lives here, outside any namespace the wrapped value or the router
/// can reach, so forwarding and masking never see it. The wrapped value is fixed at
/// construction and kept outside the record, so reading it never conflicts with a
/// caller holding [`state`].
pub struct ProxyInstance {
    id: ProxyId,
    ty: Arc<ProxyType>,
    original: Value,
    state: RefCell<StateRecord>,
}

impl ProxyInstance {
    pub(crate) fn new(ty: Arc<ProxyType>, original: Value, state: StateRecord) -> Self {
        Self {
            id: ProxyId::next(),
            ty,
            original,
            state: RefCell::new(state),
        }
    }

    #[must_use]
    pub fn id(&self) -> ProxyId {
        self.id
    }

    #[must_use]
    pub fn proxy_type(&self) -> &Arc<ProxyType> {
        &self.ty
    }

    /// The wrapped value.
    #[must_use]
    pub fn original(&self) -> &Value {
        &self.original
    }

    pub(crate) fn state_cell(&self) -> &RefCell<StateRecord> {
        &self.state
    }
}

impl fmt::Debug for ProxyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("id", &self.id)
            .field("type", &self.ty.name())
            .field("original", &self.original)
            .finish_non_exhaustive()
    }
}
