//! The dispatch router.
//!
//! Every slot of a synthesized proxy class calls [`dispatch`]. Exactly one tier resolves
//! each call, in this order:
//!
//! 1. override: the instance has an override for the operation; attribute access to a
//!    name with an override yields that override bound to the proxy
//! 2. mask: attribute access to a masked name fails the way the wrapped value fails for
//!    a missing attribute, and attribute listings leave masked names out
//! 3. forward: the same operation runs on the wrapped value
//!
//! Forwarded arithmetic and comparisons run the whole operator against the wrapped
//! value rather than only its member, so `4.5 + proxy(2)` is `6.5` even though `int`
//! has no reflected member accepting a float.
//!
//! Attribute access that fails with `AttributeError` falls back to a `__getattr__`
//! override when the instance has one. Writing or deleting a name the instance
//! overrides as an attribute stays on the proxy: the value is kept in the state record
//! and read back in place of the override until deleted.
//!
//! Re-entrant calls (an override operating on its own proxy) resolve afresh.

use std::{rc::Rc, sync::Arc};

use strum::IntoEnumIterator;

use super::{ProxyInstance, state::with_record};
use crate::{
    args,
    capability::{BinaryOp, Category, CompareOp, Op},
    exception::{ExcType, RunResult},
    masking::MaskSet,
    ops,
    resource::{DepthGuard, ResourceError},
    tracer::Resolution,
    types::{BoundMethod, Method},
    value::Value,
};

enum Tier {
    Override(Method),
    Direct(Method),
    /// A value assigned over an attribute override.
    Shadowed(Value),
    /// Assignment or deletion of a name overridden as an attribute.
    Local,
    Masked,
    MaskedListing(Value, MaskSet),
    Forward(Value),
}

impl Tier {
    fn resolution(&self) -> Resolution {
        match self {
            Self::Override(_) => Resolution::Override,
            Self::Direct(_) | Self::Shadowed(_) | Self::Local => Resolution::Direct,
            Self::Masked | Self::MaskedListing(..) => Resolution::Masked,
            Self::Forward(_) => Resolution::Forwarded,
        }
    }
}

/// Name argument of an attribute access operation.
fn attribute_name(op: Op, args: &[Value]) -> Option<&str> {
    if op.category() == Category::AttributeAccess {
        args.first().and_then(Value::as_str)
    } else {
        None
    }
}

fn resolve(inst: &ProxyInstance, op: Op, attr: Option<&str>) -> RunResult<Tier> {
    with_record(inst, |record| {
        if let Some(func) = record.overrides().get(op.dunder()) {
            return Tier::Override(Arc::clone(func));
        }
        if let Some(name) = attr
            && let Some(func) = record.overrides().get(name)
        {
            match op {
                Op::GetAttribute => {
                    return match record.get(name) {
                        Some(value) => Tier::Shadowed(value.clone()),
                        None => Tier::Direct(Arc::clone(func)),
                    };
                }
                Op::SetAttr | Op::DelAttr => return Tier::Local,
                _ => {}
            }
        }
        if let Some(mask) = record.mask() {
            if attr.is_some_and(|name| mask.contains(name)) {
                return Tier::Masked;
            }
            if op == Op::Dir {
                return Tier::MaskedListing(inst.original().clone(), mask.clone());
            }
        }
        Tier::Forward(inst.original().clone())
    })
}

/// The `__getattr__` override to try after attribute access on `inst` failed.
fn getattr_fallback(inst: &ProxyInstance) -> RunResult<Option<Method>> {
    with_record(inst, |record| record.overrides().get(Op::GetAttr.dunder()).cloned())
}

/// Routes operation `op` on proxy `this`.
pub(crate) fn dispatch(this: &Value, op: Op, args: &[Value]) -> RunResult<Value> {
    let Value::Proxy(inst) = this else {
        return Err(ExcType::type_error(format!(
            "descriptor '{}' requires a proxy but received a '{}'",
            op.dunder(),
            this.type_name()
        )));
    };
    let context = inst.proxy_type().context();
    let guard = match DepthGuard::enter(context.config.max_dispatch_depth) {
        Ok(guard) => guard,
        Err(err) => {
            let ResourceError::Depth { limit, .. } = err;
            context.trace(|tracer| tracer.on_depth_exceeded(limit));
            return Err(err.into());
        }
    };

    let attr = attribute_name(op, args);
    let tier = resolve(inst, op, attr)?;
    context.trace(|tracer| tracer.on_dispatch(inst.id(), op, attr, tier.resolution(), guard.depth()));

    match run(this, inst, op, attr, tier, args) {
        Err(err) if op == Op::GetAttribute && err.matches(ExcType::AttributeError) => {
            match getattr_fallback(inst)? {
                Some(fallback) => fallback(this, args),
                None => Err(err),
            }
        }
        result => result,
    }
}

fn run(
    this: &Value,
    inst: &ProxyInstance,
    op: Op,
    attr: Option<&str>,
    tier: Tier,
    args: &[Value],
) -> RunResult<Value> {
    let name = attr.unwrap_or_default();
    match tier {
        Tier::Override(func) => func(this, args),
        Tier::Direct(func) => Ok(Value::BoundMethod(Rc::new(BoundMethod::new(this.clone(), name, func)))),
        Tier::Shadowed(value) => Ok(value),
        Tier::Local => {
            let mut record = inst
                .state_cell()
                .try_borrow_mut()
                .map_err(|_| ExcType::runtime_error(format!("state of {} is already borrowed", inst.id())))?;
            if op == Op::SetAttr {
                let (_, value) = args::get_two_args("__setattr__", args)?;
                record.set(name, value.clone());
                return Ok(Value::None);
            }
            match record.remove(name) {
                Some(_) => Ok(Value::None),
                None => Err(ExcType::attribute_error(this.unwrapped().type_name(), name)),
            }
        }
        Tier::Masked => Err(ExcType::attribute_error(this.unwrapped().type_name(), name)),
        Tier::MaskedListing(original, mask) => {
            let listing = ops::call_slot(&original, op, args)?;
            Ok(Value::list(mask.visible(ops::to_vec(&listing)?)))
        }
        Tier::Forward(original) => {
            let result = forward_to(&original, op, args)?;
            // in-place ops that mutate the wrapped value keep the proxy bound
            if op.is_inplace() && result.is(&original) {
                Ok(this.clone())
            } else {
                Ok(result)
            }
        }
    }
}

/// Runs `op` on the value `proxy` wraps, bypassing the proxy's overrides and mask.
///
/// Overrides call this to delegate after doing their own work.
pub fn forward(proxy: &Value, op: Op, args: &[Value]) -> RunResult<Value> {
    let original = super::original(proxy)?;
    forward_to(&original, op, args)
}

/// Which side of a binary operator a member implements.
#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// The operator a binary member implements. The legacy `__div__`/`__rdiv__` pair is
/// left out so those members are forwarded as themselves.
fn arithmetic(op: Op) -> Option<(BinaryOp, Side)> {
    BinaryOp::iter().find_map(|bop| {
        if bop.forward() == op {
            Some((bop, Side::Left))
        } else if bop.reflected() == op {
            Some((bop, Side::Right))
        } else {
            None
        }
    })
}

fn forward_to(original: &Value, op: Op, args: &[Value]) -> RunResult<Value> {
    let [other] = args else {
        return ops::call_slot(original, op, args);
    };
    if let Some((bop, side)) = arithmetic(op) {
        return match side {
            Side::Left => ops::binary(original, other, bop),
            Side::Right => ops::binary(other, original, bop),
        };
    }
    if let Some(cop) = CompareOp::iter().find(|cop| cop.op() == op) {
        return ops::compare(original, other, cop);
    }
    ops::call_slot(original, op, args)
}
