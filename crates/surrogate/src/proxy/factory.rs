//! Proxy type synthesis and caching.

use std::{
    fmt,
    sync::{
        Arc, LazyLock, Mutex, OnceLock, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use ahash::AHashMap;

use super::{
    ProxyInstance,
    base::{BaseId, ConstructionError, ProxyBase},
    router,
    state::StateRecord,
};
use crate::{
    capability::{CapabilitySet, Op, inspect},
    config::ProxyConfig,
    masking::MaskSet,
    tracer::DispatchTracer,
    types::{Class, ClassId},
    value::Value,
};

/// Operations whose override requires the partner operation to exist on the proxy.
const COUNTERPARTS: [(Op, Op); 3] = [
    (Op::Enter, Op::Exit),
    (Op::Exit, Op::Enter),
    (Op::GetAttr, Op::GetAttribute),
];

/// Configuration and tracer shared by a factory and every proxy type it synthesizes.
pub(crate) struct DispatchContext {
    pub config: ProxyConfig,
    tracer: Option<Mutex<Box<dyn DispatchTracer + Send>>>,
}

impl DispatchContext {
    /// Runs `hook` against the installed tracer, if any.
    pub fn trace(&self, hook: impl FnOnce(&mut dyn DispatchTracer)) {
        if let Some(tracer) = &self.tracer {
            let mut tracer = tracer.lock().unwrap_or_else(PoisonError::into_inner);
            hook(&mut **tracer);
        }
    }
}

/// A synthesized proxy type: the routing class plus what it was built from.
pub struct ProxyType {
    class: Arc<Class>,
    wrapped: Arc<Class>,
    base: Arc<ProxyBase>,
    slots: CapabilitySet,
    context: Arc<DispatchContext>,
}

impl ProxyType {
    /// The synthesized class, named `"{base}[{wrapped}]"`.
    #[must_use]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.class.name()
    }

    /// The class of the values this type wraps.
    #[must_use]
    pub fn wrapped_class(&self) -> &Arc<Class> {
        &self.wrapped
    }

    #[must_use]
    pub fn base(&self) -> &Arc<ProxyBase> {
        &self.base
    }

    /// The operations instances of this type support.
    #[must_use]
    pub fn slots(&self) -> CapabilitySet {
        self.slots
    }

    pub(crate) fn context(&self) -> &DispatchContext {
        &self.context
    }
}

impl fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyType")
            .field("name", &self.name())
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

type CacheKey = (ClassId, BaseId);

/// Creates proxies and owns the proxy type cache.
///
/// One type is synthesized per `(wrapped class, base)` pair and reused for every later
/// request, including concurrent ones: the cache lock only guards the map, and a per-key
/// `OnceLock` makes racing callers wait for the single synthesis.
pub struct ProxyFactory {
    context: Arc<DispatchContext>,
    cache: Mutex<AHashMap<CacheKey, Arc<OnceLock<Arc<ProxyType>>>>>,
    syntheses: AtomicUsize,
}

static GLOBAL: LazyLock<ProxyFactory> = LazyLock::new(ProxyFactory::new);

impl ProxyFactory {
    /// Creates a factory with the default configuration and no tracer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProxyConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ProxyConfig) -> Self {
        Self::from_context(DispatchContext { config, tracer: None })
    }

    /// Creates a factory that reports engine events to `tracer`.
    #[must_use]
    pub fn with_tracer(config: ProxyConfig, tracer: impl DispatchTracer + Send + 'static) -> Self {
        Self::from_context(DispatchContext {
            config,
            tracer: Some(Mutex::new(Box::new(tracer))),
        })
    }

    fn from_context(context: DispatchContext) -> Self {
        Self {
            context: Arc::new(context),
            cache: Mutex::new(AHashMap::new()),
            syntheses: AtomicUsize::new(0),
        }
    }

    /// The process-wide factory used by the crate-level free functions.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.context.config
    }

    /// Returns the proxy type for values of `wrapped` under `base`, synthesizing it on
    /// first use.
    ///
    /// Fails with `MissingCounterpart` when the base overrides one half of a paired
    /// operation and neither `wrapped` nor the base provides the other half.
    pub fn proxy_type(&self, wrapped: &Arc<Class>, base: &Arc<ProxyBase>) -> Result<Arc<ProxyType>, ConstructionError> {
        check_counterparts(wrapped, base)?;
        Ok(self.cached_type(wrapped, base))
    }

    /// Wraps `value` in a proxy that forwards every operation.
    #[must_use]
    pub fn proxy(&self, value: Value) -> Value {
        self.proxy_unchecked(value, &ProxyBase::plain(), None)
    }

    /// Wraps `value` in a proxy whose operations are first routed through `base`'s
    /// overrides.
    pub fn proxy_with(&self, value: Value, base: &Arc<ProxyBase>) -> Result<Value, ConstructionError> {
        let ty = self.proxy_type(&value.class(), base)?;
        Ok(instantiate(ty, value, None))
    }

    /// Wraps `value` under a base that declares no paired operations, so the
    /// counterpart check cannot fail.
    pub(crate) fn proxy_unchecked(&self, value: Value, base: &Arc<ProxyBase>, mask: Option<MaskSet>) -> Value {
        let ty = self.cached_type(&value.class(), base);
        instantiate(ty, value, mask)
    }

    /// Wraps `value` under `base` with a mask.
    pub(crate) fn proxy_masked(
        &self,
        value: Value,
        base: &Arc<ProxyBase>,
        mask: MaskSet,
    ) -> Result<Value, ConstructionError> {
        let ty = self.proxy_type(&value.class(), base)?;
        Ok(instantiate(ty, value, Some(mask)))
    }

    /// Number of proxy types this factory has synthesized.
    #[must_use]
    pub fn syntheses(&self) -> usize {
        self.syntheses.load(Ordering::Acquire)
    }

    /// Number of entries in the type cache.
    #[must_use]
    pub fn cached_types(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drops every cached type wrapping `class`, returning how many were dropped.
    ///
    /// Live proxies keep their types; the next request synthesizes a fresh one.
    pub fn evict(&self, class: &Class) -> usize {
        let mut cache = self.lock_cache();
        let before = cache.len();
        cache.retain(|(class_id, _), _| *class_id != class.id());
        before - cache.len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, AHashMap<CacheKey, Arc<OnceLock<Arc<ProxyType>>>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached_type(&self, wrapped: &Arc<Class>, base: &Arc<ProxyBase>) -> Arc<ProxyType> {
        let cell = {
            let mut cache = self.lock_cache();
            Arc::clone(cache.entry((wrapped.id(), base.id())).or_default())
        };
        let mut synthesized = false;
        let ty = cell.get_or_init(|| {
            synthesized = true;
            self.synthesize(wrapped, base)
        });
        if !synthesized {
            self.context.trace(|tracer| tracer.on_cache_hit(ty.name()));
        }
        Arc::clone(ty)
    }

    fn synthesize(&self, wrapped: &Arc<Class>, base: &Arc<ProxyBase>) -> Arc<ProxyType> {
        let mut slots = inspect(wrapped);
        if !self.context.config.mirror_legacy {
            slots = slots.without_legacy();
        }
        slots = slots.union(base.declared_ops());
        if base.has_attribute_overrides() {
            slots.insert(Op::GetAttribute);
        }

        let name = format!("{}[{}]", base.name(), wrapped.name());
        let mut builder = Class::builder(&name).without_bases().native();
        for op in slots.iter() {
            builder = builder.method(op.dunder(), move |this, args| router::dispatch(this, op, args));
        }
        let class = builder.build();

        self.context.trace(|tracer| tracer.on_synthesize(&name, slots.len()));
        self.syntheses.fetch_add(1, Ordering::AcqRel);
        Arc::new(ProxyType {
            class,
            wrapped: Arc::clone(wrapped),
            base: Arc::clone(base),
            slots,
            context: Arc::clone(&self.context),
        })
    }
}

impl Default for ProxyFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("config", &self.context.config)
            .field("cached_types", &self.cached_types())
            .field("syntheses", &self.syntheses())
            .finish_non_exhaustive()
    }
}

fn check_counterparts(wrapped: &Class, base: &ProxyBase) -> Result<(), ConstructionError> {
    let declared = base.declared_ops();
    let available = inspect(wrapped).union(declared);
    for (op, counterpart) in COUNTERPARTS {
        if declared.contains(op) && !available.contains(counterpart) {
            return Err(ConstructionError::MissingCounterpart {
                base: base.name().to_owned(),
                wrapped: wrapped.name().to_owned(),
                op,
                counterpart,
            });
        }
    }
    Ok(())
}

fn instantiate(ty: Arc<ProxyType>, value: Value, mask: Option<MaskSet>) -> Value {
    let record = StateRecord::new(ty.base(), mask);
    Value::Proxy(std::rc::Rc::new(ProxyInstance::new(ty, value, record)))
}
