//! Proxy bases: named, immutable sets of override declarations.

use std::{
    fmt,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

use indexmap::IndexMap;

use crate::{
    capability::{CapabilitySet, Op},
    exception::{ExcType, Exception, RunResult},
    types::Method,
    value::Value,
};

/// Process-unique proxy base identifier; part of the proxy type cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BaseId(u64);

impl BaseId {
    fn next() -> Self {
        static NEXT_BASE_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_BASE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One override: a member name and the function that replaces it on the proxy.
///
/// The function receives the proxy itself as the receiver; [`original`](crate::original)
/// reaches the wrapped value.
#[derive(Clone)]
pub struct OverrideDeclaration {
    name: String,
    func: Method,
}

impl OverrideDeclaration {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn func(&self) -> &Method {
        &self.func
    }
}

impl fmt::Debug for OverrideDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OverrideDeclaration({})", self.name)
    }
}

/// Declares that `name` on proxies of a base is handled by `func` instead of the
/// wrapped value.
///
/// `name` is either an operation member (`"__str__"`, `"__iter__"`) or a plain attribute
/// name (`"write"`); attribute access to a plain name yields `func` bound to the proxy.
pub fn direct(
    name: &str,
    func: impl Fn(&Value, &[Value]) -> RunResult<Value> + Send + Sync + 'static,
) -> OverrideDeclaration {
    OverrideDeclaration {
        name: name.to_owned(),
        func: Arc::new(func),
    }
}

/// Reasons a proxy base or proxy type cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// A base or override name that is empty or not an identifier.
    InvalidName { name: String },
    /// A double-underscore override name that is not a protocol operation.
    UnknownOperation { name: String },
    /// The same name declared twice in one base.
    DuplicateOverride { base: String, name: String },
    /// An overridden paired operation whose partner neither the wrapped class nor the
    /// base provides.
    MissingCounterpart {
        base: String,
        wrapped: String,
        op: Op,
        counterpart: Op,
    },
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name } => write!(f, "invalid override name {name:?}"),
            Self::UnknownOperation { name } => {
                write!(f, "{name} is not a protocol operation and cannot be overridden")
            }
            Self::DuplicateOverride { base, name } => {
                write!(f, "proxy base '{base}' declares {name} more than once")
            }
            Self::MissingCounterpart {
                base,
                wrapped,
                op,
                counterpart,
            } => write!(
                f,
                "proxy base '{base}' overrides {op} but '{wrapped}' does not support {counterpart}",
            ),
        }
    }
}

impl std::error::Error for ConstructionError {}

impl From<ConstructionError> for Exception {
    fn from(err: ConstructionError) -> Self {
        ExcType::type_error(err)
    }
}

/// Checks that `name` can be declared as an override.
pub(crate) fn validate_override_name(name: &str) -> Result<(), ConstructionError> {
    if !is_identifier(name) {
        return Err(ConstructionError::InvalidName { name: name.to_owned() });
    }
    if is_dunder(name) && Op::from_dunder(name).is_none() {
        return Err(ConstructionError::UnknownOperation { name: name.to_owned() });
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// A named set of override declarations, optionally extending another base.
///
/// Bases are immutable once built and shared by every proxy type synthesized from them.
pub struct ProxyBase {
    id: BaseId,
    name: String,
    parent: Option<Arc<ProxyBase>>,
    /// Own declarations merged over the parent's; a child declaration wins.
    resolved: IndexMap<String, Method>,
}

static PLAIN: LazyLock<Arc<ProxyBase>> = LazyLock::new(|| ProxyBase::root("proxy"));
static MASKING: LazyLock<Arc<ProxyBase>> = LazyLock::new(|| ProxyBase::root("masking_proxy"));

impl ProxyBase {
    /// Starts building a base that extends [`ProxyBase::plain`].
    #[must_use]
    pub fn builder(name: &str) -> ProxyBaseBuilder {
        ProxyBaseBuilder {
            name: name.to_owned(),
            parent: None,
            declarations: Vec::new(),
        }
    }

    fn root(name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: BaseId::next(),
            name: name.to_owned(),
            parent: None,
            resolved: IndexMap::new(),
        })
    }

    /// The base with no overrides: everything is forwarded.
    #[must_use]
    pub fn plain() -> Arc<Self> {
        Arc::clone(&PLAIN)
    }

    /// The base used by masking proxies and public views.
    #[must_use]
    pub fn masking() -> Arc<Self> {
        Arc::clone(&MASKING)
    }

    #[must_use]
    pub fn id(&self) -> BaseId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Every override in effect, inherited ones included.
    #[must_use]
    pub fn overrides(&self) -> &IndexMap<String, Method> {
        &self.resolved
    }

    /// Names of the overrides in effect, in declaration order.
    pub fn override_names(&self) -> impl Iterator<Item = &str> {
        self.resolved.keys().map(String::as_str)
    }

    /// The operations the overrides provide.
    #[must_use]
    pub fn declared_ops(&self) -> CapabilitySet {
        self.resolved.keys().filter_map(|name| Op::from_dunder(name)).collect()
    }

    /// Whether any override is a plain attribute name rather than an operation.
    #[must_use]
    pub fn has_attribute_overrides(&self) -> bool {
        self.resolved.keys().any(|name| Op::from_dunder(name).is_none())
    }

    /// Whether `self` is `other` or extends it, directly or transitively.
    #[must_use]
    pub fn is_subbase_of(&self, other: &Self) -> bool {
        let mut current = Some(self);
        while let Some(base) = current {
            if base.id == other.id {
                return true;
            }
            current = base.parent.as_deref();
        }
        false
    }
}

impl fmt::Debug for ProxyBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyBase")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("overrides", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ProxyBase`]; validation happens in [`build`](Self::build).
#[derive(Debug)]
pub struct ProxyBaseBuilder {
    name: String,
    parent: Option<Arc<ProxyBase>>,
    declarations: Vec<OverrideDeclaration>,
}

impl ProxyBaseBuilder {
    /// Inherits every declaration of `parent`.
    #[must_use]
    pub fn extends(mut self, parent: &Arc<ProxyBase>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    #[must_use]
    pub fn declare(mut self, declaration: OverrideDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Shorthand for `declare(direct(name, func))`.
    #[must_use]
    pub fn direct(
        self,
        name: &str,
        func: impl Fn(&Value, &[Value]) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.declare(direct(name, func))
    }

    pub fn build(self) -> Result<Arc<ProxyBase>, ConstructionError> {
        if !is_identifier(&self.name) {
            return Err(ConstructionError::InvalidName { name: self.name });
        }
        let parent = self.parent.unwrap_or_else(ProxyBase::plain);
        let mut own: IndexMap<String, Method> = IndexMap::with_capacity(self.declarations.len());
        for declaration in self.declarations {
            validate_override_name(&declaration.name)?;
            if own.contains_key(&declaration.name) {
                return Err(ConstructionError::DuplicateOverride {
                    base: self.name,
                    name: declaration.name,
                });
            }
            own.insert(declaration.name, declaration.func);
        }
        let mut resolved = parent.resolved.clone();
        resolved.extend(own);
        Ok(Arc::new(ProxyBase {
            id: BaseId::next(),
            name: self.name,
            parent: Some(parent),
            resolved,
        }))
    }
}
