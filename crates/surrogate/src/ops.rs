//! Protocol entry points.
//!
//! Every operation on a value goes through these functions: they look the protocol
//! member up on the value's class and call it, applying the reflected, in-place and
//! legacy fallbacks. Because proxies are values whose class routes each member
//! through the dispatch router, the same calls work unchanged on proxies.

use std::{slice, sync::Arc};

use strum::IntoEnumIterator;

use crate::{
    capability::{BinaryOp, CompareOp, Op, UnaryOp},
    exception::{ExcType, Exception, RunResult},
    types::{Class, Method},
    value::Value,
};

// ============================================================================
// Slot access
// ============================================================================

/// Type name for errors about a missing operation. A proxy lacks exactly the operations
/// its wrapped value lacks, so it reports the innermost wrapped type.
fn reported_type(value: &Value) -> String {
    value.unwrapped().type_name()
}

fn slot(value: &Value, op: Op) -> Option<Method> {
    value.class().method(op.dunder())
}

/// Calls `op` on `value` when its class defines the member.
pub(crate) fn try_slot(value: &Value, op: Op, args: &[Value]) -> Option<RunResult<Value>> {
    slot(value, op).map(|method| method(value, args))
}

/// Calls `op` on `value`, raising `AttributeError` when the class lacks the member.
pub fn call_slot(value: &Value, op: Op, args: &[Value]) -> RunResult<Value> {
    match slot(value, op) {
        Some(method) => method(value, args),
        None => Err(ExcType::attribute_error(reported_type(value), op.dunder())),
    }
}

/// Calls a slot whose absence is a type error specific to the operation.
fn require_slot(
    value: &Value,
    op: Op,
    args: &[Value],
    missing: impl FnOnce(&str) -> Exception,
) -> RunResult<Value> {
    match slot(value, op) {
        Some(method) => method(value, args),
        None => Err(missing(&reported_type(value))),
    }
}

fn expect_int(result: Value, member: &str) -> RunResult<i64> {
    result.as_int().ok_or_else(|| {
        ExcType::type_error(format!(
            "{member} returned non-int (type {})",
            result.type_name()
        ))
    })
}

// ============================================================================
// Text conversion
// ============================================================================

/// `repr(value)`.
pub fn repr(value: &Value) -> RunResult<String> {
    let result = match try_slot(value, Op::Repr, &[]) {
        Some(result) => result?,
        None => return Ok(format!("<{} object>", value.type_name())),
    };
    match result {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(ExcType::type_error(format!(
            "__repr__ returned non-string (type {})",
            other.type_name()
        ))),
    }
}

/// `str(value)`; falls back to `repr` when the class has no `__str__`.
pub fn str(value: &Value) -> RunResult<String> {
    let Some(result) = try_slot(value, Op::Str, &[]) else {
        return repr(value);
    };
    match result? {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(ExcType::type_error(format!(
            "__str__ returned non-string (type {})",
            other.type_name()
        ))),
    }
}

/// `bytes(value)` for values that define `__bytes__`.
pub fn bytes(value: &Value) -> RunResult<Vec<u8>> {
    let result = require_slot(value, Op::Bytes, &[], |name| {
        ExcType::type_error(format!("cannot convert '{name}' object to bytes"))
    })?;
    match result {
        Value::Bytes(b) => Ok(b.to_vec()),
        other => Err(ExcType::type_error(format!(
            "__bytes__ returned non-bytes (type {})",
            other.type_name()
        ))),
    }
}

/// `format(value, spec)`.
pub fn format(value: &Value, spec: &str) -> RunResult<String> {
    let result = require_slot(value, Op::Format, &[Value::str(spec)], |name| {
        ExcType::type_error(format!("unsupported format string passed to {name}.__format__"))
    })?;
    match result {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(ExcType::type_error(format!(
            "__format__ must return a str, not {}",
            other.type_name()
        ))),
    }
}

// ============================================================================
// Comparison, hashing, truth
// ============================================================================

/// Rich comparison with swapped reflection, identity fallback for `==`/`!=` and the
/// legacy three-way `__cmp__` as a last resort.
pub fn compare(left: &Value, right: &Value, op: CompareOp) -> RunResult<Value> {
    if let Some(result) = try_slot(left, op.op(), slice::from_ref(right)) {
        let result = result?;
        if !result.is_not_implemented() {
            return Ok(result);
        }
    }
    if let Some(result) = try_slot(right, op.swapped().op(), slice::from_ref(left)) {
        let result = result?;
        if !result.is_not_implemented() {
            return Ok(result);
        }
    }
    if let Some(result) = try_slot(left, Op::Cmp, slice::from_ref(right)) {
        let result = result?;
        if let Some(order) = result.as_int() {
            return Ok(Value::Bool(op.holds(order.cmp(&0))));
        }
    }
    match op {
        CompareOp::Eq => Ok(Value::Bool(left.is(right))),
        CompareOp::Ne => Ok(Value::Bool(!left.is(right))),
        _ => Err(ExcType::type_error_not_orderable(
            op.symbol(),
            &reported_type(left),
            &reported_type(right),
        )),
    }
}

/// `left == right`.
pub fn eq(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Eq)?)
}

/// `left != right`.
pub fn ne(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Ne)?)
}

/// `left < right`.
pub fn lt(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Lt)?)
}

/// `left <= right`.
pub fn le(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Le)?)
}

/// `left > right`.
pub fn gt(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Gt)?)
}

/// `left >= right`.
pub fn ge(left: &Value, right: &Value) -> RunResult<bool> {
    truthy(&compare(left, right, CompareOp::Ge)?)
}

/// `hash(value)`.
pub fn hash(value: &Value) -> RunResult<i64> {
    let result = require_slot(value, Op::Hash, &[], ExcType::type_error_unhashable)?;
    expect_int(result, "__hash__")
}

/// Truth value: `__bool__`, then legacy `__nonzero__`, then `__len__ != 0`, else true.
pub fn truthy(value: &Value) -> RunResult<bool> {
    match value {
        Value::Bool(b) => return Ok(*b),
        Value::None => return Ok(false),
        _ => {}
    }
    for op in [Op::Bool, Op::Nonzero] {
        if let Some(result) = try_slot(value, op, &[]) {
            return match result? {
                Value::Bool(b) => Ok(b),
                other => Err(ExcType::type_error(format!(
                    "{} should return bool, returned {}",
                    op.dunder(),
                    other.type_name()
                ))),
            };
        }
    }
    if let Some(result) = try_slot(value, Op::Len, &[]) {
        return Ok(expect_int(result?, "__len__")? != 0);
    }
    Ok(true)
}

// ============================================================================
// Attributes
// ============================================================================

/// `getattr(value, name)`.
pub fn getattr(value: &Value, name: &str) -> RunResult<Value> {
    match slot(value, Op::GetAttribute) {
        Some(method) => method(value, &[Value::str(name)]),
        None => Err(ExcType::attribute_error(reported_type(value), name)),
    }
}

/// `setattr(value, name, new)`.
pub fn setattr(value: &Value, name: &str, new: Value) -> RunResult<()> {
    match slot(value, Op::SetAttr) {
        Some(method) => method(value, &[Value::str(name), new]).map(drop),
        None => Err(ExcType::attribute_error(reported_type(value), name)),
    }
}

/// `delattr(value, name)`.
pub fn delattr(value: &Value, name: &str) -> RunResult<()> {
    match slot(value, Op::DelAttr) {
        Some(method) => method(value, &[Value::str(name)]).map(drop),
        None => Err(ExcType::attribute_error(reported_type(value), name)),
    }
}

/// `hasattr(value, name)`: true unless attribute access raises `AttributeError`.
pub fn hasattr(value: &Value, name: &str) -> RunResult<bool> {
    match getattr(value, name) {
        Ok(_) => Ok(true),
        Err(err) if err.matches(ExcType::AttributeError) => Ok(false),
        Err(err) => Err(err),
    }
}

/// `dir(value)`: the listing produced by `__dir__`, sorted.
pub fn dir(value: &Value) -> RunResult<Vec<String>> {
    let listing = require_slot(value, Op::Dir, &[], |name| {
        ExcType::type_error(format!("'{name}' object does not support dir()"))
    })?;
    let mut names = to_vec(&listing)?
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                ExcType::type_error(format!("__dir__ must list str, not {}", item.type_name()))
            })
        })
        .collect::<RunResult<Vec<String>>>()?;
    names.sort_unstable();
    Ok(names)
}

// ============================================================================
// Calls
// ============================================================================

/// `value(*args)`.
pub fn call(value: &Value, args: &[Value]) -> RunResult<Value> {
    require_slot(value, Op::Call, args, ExcType::type_error_not_callable)
}

/// `value.name(*args)`.
pub fn call_method(value: &Value, name: &str, args: &[Value]) -> RunResult<Value> {
    let method = getattr(value, name)?;
    call(&method, args)
}

// ============================================================================
// Containers
// ============================================================================

/// `len(value)`.
pub fn len(value: &Value) -> RunResult<usize> {
    let result = require_slot(value, Op::Len, &[], ExcType::type_error_no_len)?;
    let n = expect_int(result, "__len__")?;
    usize::try_from(n).map_err(|_| ExcType::value_error("__len__() should return >= 0"))
}

/// `operator.length_hint(value, default)`: `__len__`, then `__length_hint__`, then `default`.
pub fn length_hint(value: &Value, default: usize) -> RunResult<usize> {
    if slot(value, Op::Len).is_some() {
        return len(value);
    }
    match try_slot(value, Op::LengthHint, &[]) {
        Some(result) => {
            let result = result?;
            if result.is_not_implemented() {
                return Ok(default);
            }
            let n = expect_int(result, "__length_hint__")?;
            usize::try_from(n).map_err(|_| ExcType::value_error("__length_hint__() should return >= 0"))
        }
        None => Ok(default),
    }
}

/// `value[key]`.
pub fn getitem(value: &Value, key: &Value) -> RunResult<Value> {
    require_slot(
        value,
        Op::GetItem,
        slice::from_ref(key),
        ExcType::type_error_not_subscriptable,
    )
}

/// `value[key] = item`.
pub fn setitem(value: &Value, key: &Value, item: Value) -> RunResult<()> {
    require_slot(value, Op::SetItem, &[key.clone(), item], |name| {
        ExcType::type_error(format!("'{name}' object does not support item assignment"))
    })
    .map(drop)
}

/// `del value[key]`.
pub fn delitem(value: &Value, key: &Value) -> RunResult<()> {
    require_slot(value, Op::DelItem, slice::from_ref(key), |name| {
        ExcType::type_error(format!("'{name}' object does not support item deletion"))
    })
    .map(drop)
}

/// `item in container`: `__contains__`, else iteration with `==`.
pub fn contains(container: &Value, item: &Value) -> RunResult<bool> {
    if let Some(result) = try_slot(container, Op::Contains, slice::from_ref(item)) {
        return truthy(&result?);
    }
    let iterator = iter(container).map_err(|_| {
        ExcType::type_error(format!(
            "argument of type '{}' is not iterable",
            reported_type(container)
        ))
    })?;
    while let Some(candidate) = next(&iterator)? {
        if candidate.is(item) || eq(&candidate, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// Iteration
// ============================================================================

/// `iter(value)`.
pub fn iter(value: &Value) -> RunResult<Value> {
    require_slot(value, Op::Iter, &[], ExcType::type_error_not_iterable)
}

/// `next(iterator)`, mapping exhaustion to `None`.
pub fn next(iterator: &Value) -> RunResult<Option<Value>> {
    let result = require_slot(iterator, Op::Next, &[], |name| {
        ExcType::type_error(format!("'{name}' object is not an iterator"))
    });
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.matches(ExcType::StopIteration) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Drains an iterable into a vector.
pub fn to_vec(iterable: &Value) -> RunResult<Vec<Value>> {
    let iterator = iter(iterable)?;
    let mut items = Vec::with_capacity(length_hint(&iterator, 0).unwrap_or(0));
    while let Some(item) = next(&iterator)? {
        items.push(item);
    }
    Ok(items)
}

/// `reversed(value)`: `__reversed__`, else `__len__` with `__getitem__`.
pub fn reversed(value: &Value) -> RunResult<Value> {
    if let Some(result) = try_slot(value, Op::Reversed, &[]) {
        return result;
    }
    if slot(value, Op::GetItem).is_none() || slot(value, Op::Len).is_none() {
        return Err(ExcType::type_error(format!(
            "'{}' object is not reversible",
            reported_type(value)
        )));
    }
    let count = len(value)?;
    let mut items = Vec::with_capacity(count);
    for i in (0..count).rev() {
        items.push(getitem(value, &Value::Int(i as i64))?);
    }
    Ok(Value::iterator(items))
}

// ============================================================================
// Arithmetic
// ============================================================================

fn legacy_binary(op: BinaryOp) -> Option<(Op, Op)> {
    (op == BinaryOp::TrueDiv).then_some((Op::Div, Op::RDiv))
}

/// Binary arithmetic: `left.__op__(right)`, then `right.__rop__(left)`.
///
/// Classes that only define the legacy `__div__`/`__rdiv__` still support `/`.
pub fn binary(left: &Value, right: &Value, op: BinaryOp) -> RunResult<Value> {
    let mut candidates = vec![(op.forward(), op.reflected())];
    if let Some(legacy) = legacy_binary(op) {
        candidates.push(legacy);
    }
    for (forward, reflected) in candidates {
        if let Some(result) = try_slot(left, forward, slice::from_ref(right)) {
            let result = result?;
            if !result.is_not_implemented() {
                return Ok(result);
            }
        }
        if let Some(result) = try_slot(right, reflected, slice::from_ref(left)) {
            let result = result?;
            if !result.is_not_implemented() {
                return Ok(result);
            }
        }
    }
    Err(ExcType::type_error_unsupported_operands(
        op.symbol(),
        &reported_type(left),
        &reported_type(right),
    ))
}

/// In-place arithmetic: `left.__iop__(right)` if present and not `NotImplemented`,
/// else the binary operation.
///
/// The result is what the caller rebinds the left name to; mutable containers return
/// themselves, immutable values return a new value.
pub fn inplace(left: &Value, right: &Value, op: BinaryOp) -> RunResult<Value> {
    let mut candidates: Vec<Op> = op.inplace().into_iter().collect();
    if op == BinaryOp::TrueDiv {
        candidates.push(Op::IDiv);
    }
    for member in candidates {
        if let Some(result) = try_slot(left, member, slice::from_ref(right)) {
            let result = result?;
            if !result.is_not_implemented() {
                return Ok(result);
            }
        }
    }
    binary(left, right, op).map_err(|err| {
        if err.matches(ExcType::TypeError) && err.message().is_some_and(|m| m.starts_with("unsupported operand")) {
            ExcType::type_error_unsupported_operands(
                &op.inplace_symbol(),
                &reported_type(left),
                &reported_type(right),
            )
        } else {
            err
        }
    })
}

/// `left + right`.
pub fn add(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, right, BinaryOp::Add)
}

/// `left - right`.
pub fn sub(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, right, BinaryOp::Sub)
}

/// `left * right`.
pub fn mul(left: &Value, right: &Value) -> RunResult<Value> {
    binary(left, right, BinaryOp::Mul)
}

/// `left += right`.
pub fn iadd(left: &Value, right: &Value) -> RunResult<Value> {
    inplace(left, right, BinaryOp::Add)
}

/// Unary arithmetic.
pub fn unary(value: &Value, op: UnaryOp) -> RunResult<Value> {
    require_slot(value, op.op(), &[], |name| {
        ExcType::type_error_bad_unary_operand(op.symbol(), name)
    })
}

/// `-value`.
pub fn neg(value: &Value) -> RunResult<Value> {
    unary(value, UnaryOp::Neg)
}

// ============================================================================
// Numeric conversion
// ============================================================================

/// `int(value)` for values defining `__int__` (legacy `__long__` accepted), or `__index__`.
pub fn to_int(value: &Value) -> RunResult<i64> {
    for op in [Op::Int, Op::Long, Op::Index] {
        if let Some(result) = try_slot(value, op, &[]) {
            return expect_int(result?, op.dunder());
        }
    }
    Err(ExcType::type_error(format!(
        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
        reported_type(value)
    )))
}

/// `float(value)`.
pub fn to_float(value: &Value) -> RunResult<f64> {
    if let Some(result) = try_slot(value, Op::Float, &[]) {
        return match result? {
            Value::Float(f) => Ok(f),
            other => Err(ExcType::type_error(format!(
                "__float__ returned non-float (type {})",
                other.type_name()
            ))),
        };
    }
    if slot(value, Op::Index).is_some() {
        return index(value).map(|i| i as f64);
    }
    Err(ExcType::type_error(format!(
        "float() argument must be a string or a real number, not '{}'",
        reported_type(value)
    )))
}

/// `operator.index(value)`: lossless integer conversion.
pub fn index(value: &Value) -> RunResult<i64> {
    let result = require_slot(value, Op::Index, &[], ExcType::type_error_not_integer)?;
    expect_int(result, "__index__")
}

// ============================================================================
// Context scope
// ============================================================================

/// Runs `body` inside the context scope of `manager`.
///
/// Calls `__enter__`, passes its result to `body`, then `__exit__`: with three `None`s on
/// success, or with the exception's type name, the exception and `None` on failure. A
/// truthy `__exit__` result suppresses the failure, which is reported as `Ok(None)`.
pub fn with_scope<T>(manager: &Value, body: impl FnOnce(&Value) -> RunResult<T>) -> RunResult<Option<T>> {
    let (Some(enter), Some(exit)) = (slot(manager, Op::Enter), slot(manager, Op::Exit)) else {
        return Err(ExcType::type_error(format!(
            "'{}' object does not support the context manager protocol",
            reported_type(manager)
        )));
    };
    let entered = enter(manager, &[])?;
    match body(&entered) {
        Ok(value) => {
            exit(manager, &[Value::None, Value::None, Value::None])?;
            Ok(Some(value))
        }
        Err(err) => {
            let exc_name: &'static str = err.exc_type().into();
            let suppress = exit(
                manager,
                &[Value::str(exc_name), Value::from(err.clone()), Value::None],
            )?;
            if truthy(&suppress)? { Ok(None) } else { Err(err) }
        }
    }
}

// ============================================================================
// Types
// ============================================================================

/// The runtime class of `value`; for a proxy this is the synthesized proxy class.
#[must_use]
pub fn type_of(value: &Value) -> Arc<Class> {
    value.class()
}

/// `isinstance(value, class)`, resolving the class through `value.__class__` so a proxy
/// reports the class of the value it wraps.
pub fn isinstance(value: &Value, class: &Class) -> RunResult<bool> {
    if value.class().is_subclass_of(class) {
        return Ok(true);
    }
    match getattr(value, "__class__") {
        Ok(Value::Class(reported)) => Ok(reported.is_subclass_of(class)),
        Ok(_) => Ok(false),
        Err(err) if err.matches(ExcType::AttributeError) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Every protocol operation `value` supports, probed through `hasattr`.
///
/// On a proxy this exercises the full attribute path, including masks and overrides.
pub fn supported_ops(value: &Value) -> RunResult<Vec<Op>> {
    let mut supported = Vec::new();
    for op in Op::iter() {
        if hasattr(value, op.dunder())? {
            supported.push(op);
        }
    }
    Ok(supported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_int_float_arithmetic_uses_reflection() {
        let result = add(&Value::Int(1), &Value::Float(0.5)).unwrap();
        assert_eq!(result, Value::Float(1.5));
    }

    #[test]
    fn unsupported_operands_message() {
        let err = add(&Value::Int(1), &Value::str("a")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
    }

    #[test]
    fn inplace_on_int_falls_back_to_binary() {
        let result = iadd(&Value::Int(2), &Value::Int(3)).unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn truthiness_uses_len() {
        assert!(!truthy(&Value::list(vec![])).unwrap());
        assert!(truthy(&Value::str("x")).unwrap());
        assert!(!truthy(&Value::Int(0)).unwrap());
    }

    #[test]
    fn unhashable_list() {
        let err = hash(&Value::list(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
    }
}
