#![doc = include_str!("../../../README.md")]

mod args;
pub mod capability;
pub mod config;
mod exception;
mod masking;
pub mod ops;
mod proxy;
mod public;
mod py_hash;
pub mod resource;
pub mod tracer;
pub mod types;
mod value;

use std::sync::Arc;

pub use crate::{
    capability::{BinaryOp, Category, CapabilitySet, CompareOp, Op, UnaryOp, inspect, inspect_value},
    config::{ConfigError, ProxyConfig},
    exception::{ExcType, Exception, RunResult},
    masking::MaskSet,
    proxy::{
        BaseId, ConstructionError, OverrideDeclaration, ProxyBase, ProxyBaseBuilder, ProxyFactory, ProxyId,
        ProxyInstance, ProxyType, StateRecord, direct, forward, is_proxy, original, proxy_id, state,
    },
    public::{Interface, api, api_of, private_api, public_view},
    resource::{DEFAULT_MAX_DISPATCH_DEPTH, ResourceError},
    tracer::{
        DispatchTracer, NoopTracer, ProfilingReport, ProfilingTracer, RecordingTracer, Resolution, StderrTracer,
        TraceEvent,
    },
    types::{Class, ClassBuilder, Instance, Method},
    value::Value,
};

/// Wraps `value` in a proxy that forwards every operation, using the global factory.
#[must_use]
pub fn proxy(value: Value) -> Value {
    ProxyFactory::global().proxy(value)
}

/// Wraps `value` in a proxy routed through `base`'s overrides, using the global factory.
pub fn proxy_with(value: Value, base: &Arc<ProxyBase>) -> Result<Value, ConstructionError> {
    ProxyFactory::global().proxy_with(value, base)
}

/// Wraps `value` in a proxy that hides `names`, using the global factory.
#[must_use]
pub fn mask_proxy<S: Into<String>>(value: Value, names: impl IntoIterator<Item = S>) -> Value {
    ProxyFactory::global().mask_proxy(value, names)
}

