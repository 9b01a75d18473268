//! `int`, `bool` and `float`.
//!
//! Integers are 64-bit; arithmetic that leaves that range raises `OverflowError`.
//! Mixed int/float arithmetic works through the reflected members: `int.__add__`
//! declines a float with `NotImplemented` and `float.__radd__` handles it.

use std::{cmp::Ordering, sync::Arc};

use strum::IntoEnumIterator;

use super::{Class, format::{FormatSpec, unknown_code}, int_type, object_type};
use crate::{
    args,
    capability::{BinaryOp, CompareOp, UnaryOp},
    exception::{ExcType, RunResult},
    py_hash,
    value::Value,
};

fn int_receiver(this: &Value) -> RunResult<i64> {
    this.as_int().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor requires an 'int' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn float_receiver(this: &Value) -> RunResult<f64> {
    match this {
        Value::Float(f) => Ok(*f),
        other => Err(ExcType::type_error(format!(
            "descriptor requires a 'float' object but received a '{}'",
            other.type_name()
        ))),
    }
}

fn comparison_result(op: CompareOp, ordering: Option<Ordering>) -> Value {
    match ordering {
        Some(ordering) => Value::Bool(op.holds(ordering)),
        // NaN compares unequal to everything
        None => Value::Bool(op == CompareOp::Ne),
    }
}

// ============================================================================
// int
// ============================================================================

pub(super) fn build_int() -> Arc<Class> {
    let mut builder = Class::builder("int")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("int.__repr__", args)?;
            Ok(Value::from(int_receiver(this)?.to_string()))
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("int.__hash__", args)?;
            Ok(Value::Int(py_hash::hash_int(int_receiver(this)?)))
        })
        .method("__bool__", |this, args| {
            args::check_zero_args("int.__bool__", args)?;
            Ok(Value::Bool(int_receiver(this)? != 0))
        })
        .method("__int__", |this, args| {
            args::check_zero_args("int.__int__", args)?;
            Ok(Value::Int(int_receiver(this)?))
        })
        .method("__index__", |this, args| {
            args::check_zero_args("int.__index__", args)?;
            Ok(Value::Int(int_receiver(this)?))
        })
        .method("__float__", |this, args| {
            args::check_zero_args("int.__float__", args)?;
            Ok(Value::Float(int_receiver(this)? as f64))
        })
        .method("__format__", |this, args| {
            let spec = args::get_str_arg("int.__format__", args)?;
            format_int(this, int_receiver(this)?, spec)
        });

    for op in CompareOp::iter() {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            let other = args::get_one_arg(name, args)?;
            match other.as_int() {
                Some(b) => Ok(comparison_result(op, Some(int_receiver(this)?.cmp(&b)))),
                None => Ok(Value::NotImplemented),
            }
        });
    }

    for op in BinaryOp::iter().filter(|op| *op != BinaryOp::MatMul) {
        let forward = op.forward().dunder();
        let reflected = op.reflected().dunder();
        builder = builder
            .method(forward, move |this, args| {
                let other = args::get_one_arg(forward, args)?;
                match other.as_int() {
                    Some(b) => int_binary(op, int_receiver(this)?, b),
                    None => Ok(Value::NotImplemented),
                }
            })
            .method(reflected, move |this, args| {
                let other = args::get_one_arg(reflected, args)?;
                match other.as_int() {
                    Some(a) => int_binary(op, a, int_receiver(this)?),
                    None => Ok(Value::NotImplemented),
                }
            });
    }

    for op in UnaryOp::iter() {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            args::check_zero_args(name, args)?;
            let a = int_receiver(this)?;
            let result = match op {
                UnaryOp::Neg => a.checked_neg(),
                UnaryOp::Pos => Some(a),
                UnaryOp::Abs => a.checked_abs(),
                UnaryOp::Invert => Some(!a),
            };
            result.map(Value::Int).ok_or_else(ExcType::overflow)
        });
    }

    builder.build()
}

pub(super) fn build_bool() -> Arc<Class> {
    Class::builder("bool")
        .base(&int_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("bool.__repr__", args)?;
            Ok(Value::str(if int_receiver(this)? != 0 { "True" } else { "False" }))
        })
        .build()
}

fn floor_div(a: i64, b: i64) -> RunResult<i64> {
    let q = a.checked_div(b).ok_or_else(ExcType::overflow)?;
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

fn int_binary(op: BinaryOp, a: i64, b: i64) -> RunResult<Value> {
    const DIV_ZERO: &str = "integer division or modulo by zero";
    let int = |result: Option<i64>| result.map(Value::Int).ok_or_else(ExcType::overflow);
    match op {
        BinaryOp::Add => int(a.checked_add(b)),
        BinaryOp::Sub => int(a.checked_sub(b)),
        BinaryOp::Mul => int(a.checked_mul(b)),
        BinaryOp::TrueDiv => {
            if b == 0 {
                Err(ExcType::zero_division("division by zero"))
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        BinaryOp::FloorDiv if b == 0 => Err(ExcType::zero_division(DIV_ZERO)),
        BinaryOp::FloorDiv => floor_div(a, b).map(Value::Int),
        BinaryOp::Mod if b == 0 => Err(ExcType::zero_division(DIV_ZERO)),
        BinaryOp::Mod => Ok(Value::Int(floor_mod(a, b))),
        BinaryOp::DivMod if b == 0 => Err(ExcType::zero_division(DIV_ZERO)),
        BinaryOp::DivMod => Ok(Value::tuple(vec![Value::Int(floor_div(a, b)?), Value::Int(floor_mod(a, b))])),
        BinaryOp::Pow if b < 0 => {
            if a == 0 {
                Err(ExcType::zero_division("0.0 cannot be raised to a negative power"))
            } else {
                Ok(Value::Float((a as f64).powf(b as f64)))
            }
        }
        BinaryOp::Pow => int(u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))),
        BinaryOp::LShift | BinaryOp::RShift if b < 0 => Err(ExcType::value_error("negative shift count")),
        BinaryOp::LShift => {
            if a == 0 {
                return Ok(Value::Int(0));
            }
            let shifted = u32::try_from(b)
                .ok()
                .filter(|shift| *shift < 64)
                .map(|shift| a << shift)
                .filter(|shifted| shifted >> b == a);
            int(shifted)
        }
        BinaryOp::RShift => Ok(Value::Int(if b >= 64 {
            if a < 0 { -1 } else { 0 }
        } else {
            a >> b
        })),
        BinaryOp::And => Ok(Value::Int(a & b)),
        BinaryOp::Xor => Ok(Value::Int(a ^ b)),
        BinaryOp::Or => Ok(Value::Int(a | b)),
        BinaryOp::MatMul => Ok(Value::NotImplemented),
    }
}

fn format_int(this: &Value, value: i64, spec: &str) -> RunResult<Value> {
    let parsed = FormatSpec::parse(spec)?;
    let body = match parsed.kind {
        None | Some('d') => value.to_string(),
        Some('x') => radix(value, |v| format!("{v:x}")),
        Some('X') => radix(value, |v| format!("{v:X}")),
        Some('o') => radix(value, |v| format!("{v:o}")),
        Some('b') => radix(value, |v| format!("{v:b}")),
        Some(kind @ ('f' | 'F' | 'e' | 'E' | '%' | 'g')) => float_body(value as f64, kind, parsed.precision)?,
        Some(kind) => return Err(unknown_code(kind, &this.type_name())),
    };
    Ok(Value::from(parsed.pad(&parsed.signed(body), true)))
}

fn radix(value: i64, render: impl Fn(u64) -> String) -> String {
    if value < 0 {
        format!("-{}", render(value.unsigned_abs()))
    } else {
        render(value.unsigned_abs())
    }
}

// ============================================================================
// float
// ============================================================================

/// Shortest round-tripping text, with a `.0` on integral values.
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value.abs() >= 1e16 || (value != 0.0 && value.abs() < 1e-4) {
        return exponent_style(&format!("{value:e}"));
    }
    if value == value.trunc() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Rewrites Rust's `1.5e6` exponent notation to the `1.5e+06` form.
fn exponent_style(text: &str) -> String {
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => text.to_owned(),
    }
}

fn float_body(value: f64, kind: char, precision: Option<usize>) -> RunResult<String> {
    let precision = precision.unwrap_or(6);
    Ok(match kind {
        'f' | 'F' => format!("{value:.precision$}"),
        'e' => exponent_style(&format!("{value:.precision$e}")),
        'E' => exponent_style(&format!("{value:.precision$e}")).to_uppercase(),
        '%' => format!("{:.precision$}%", value * 100.0),
        _ => float_repr(value),
    })
}

fn format_float(this: &Value, value: f64, spec: &str) -> RunResult<Value> {
    let parsed = FormatSpec::parse(spec)?;
    let body = match parsed.kind {
        None => match parsed.precision {
            Some(precision) => format!("{value:.precision$}"),
            None => float_repr(value),
        },
        Some(kind @ ('f' | 'F' | 'e' | 'E' | '%' | 'g')) => float_body(value, kind, parsed.precision)?,
        Some(kind) => return Err(unknown_code(kind, &this.type_name())),
    };
    Ok(Value::from(parsed.pad(&parsed.signed(body), true)))
}

fn float_binary(op: BinaryOp, a: f64, b: f64) -> RunResult<Value> {
    let python_mod = |a: f64, b: f64| {
        let r = a % b;
        if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }
    };
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::TrueDiv if b == 0.0 => Err(ExcType::zero_division("float division by zero")),
        BinaryOp::TrueDiv => Ok(Value::Float(a / b)),
        BinaryOp::FloorDiv if b == 0.0 => Err(ExcType::zero_division("float floor division by zero")),
        BinaryOp::FloorDiv => Ok(Value::Float((a / b).floor())),
        BinaryOp::Mod if b == 0.0 => Err(ExcType::zero_division("float modulo by zero")),
        BinaryOp::Mod => Ok(Value::Float(python_mod(a, b))),
        BinaryOp::DivMod if b == 0.0 => Err(ExcType::zero_division("float divmod()")),
        BinaryOp::DivMod => Ok(Value::tuple(vec![
            Value::Float((a / b).floor()),
            Value::Float(python_mod(a, b)),
        ])),
        BinaryOp::Pow if a == 0.0 && b < 0.0 => {
            Err(ExcType::zero_division("0.0 cannot be raised to a negative power"))
        }
        BinaryOp::Pow => Ok(Value::Float(a.powf(b))),
        _ => Ok(Value::NotImplemented),
    }
}

pub(super) fn build_float() -> Arc<Class> {
    let mut builder = Class::builder("float")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("float.__repr__", args)?;
            Ok(Value::from(float_repr(float_receiver(this)?)))
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("float.__hash__", args)?;
            Ok(Value::Int(py_hash::hash_float(float_receiver(this)?)))
        })
        .method("__bool__", |this, args| {
            args::check_zero_args("float.__bool__", args)?;
            Ok(Value::Bool(float_receiver(this)? != 0.0))
        })
        .method("__int__", |this, args| {
            args::check_zero_args("float.__int__", args)?;
            let value = float_receiver(this)?;
            if value.is_nan() {
                return Err(ExcType::value_error("cannot convert float NaN to integer"));
            }
            if value.is_infinite() || value.trunc() < i64::MIN as f64 || value.trunc() > i64::MAX as f64 {
                return Err(ExcType::OverflowError.with_message("cannot convert float infinity to integer"));
            }
            Ok(Value::Int(value.trunc() as i64))
        })
        .method("__float__", |this, args| {
            args::check_zero_args("float.__float__", args)?;
            Ok(Value::Float(float_receiver(this)?))
        })
        .method("__format__", |this, args| {
            let spec = args::get_str_arg("float.__format__", args)?;
            format_float(this, float_receiver(this)?, spec)
        });

    for op in CompareOp::iter() {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            let other = args::get_one_arg(name, args)?;
            match other.as_float() {
                Some(b) => Ok(comparison_result(op, float_receiver(this)?.partial_cmp(&b))),
                None => Ok(Value::NotImplemented),
            }
        });
    }

    let float_ops = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::TrueDiv,
        BinaryOp::FloorDiv,
        BinaryOp::Mod,
        BinaryOp::DivMod,
        BinaryOp::Pow,
    ];
    for op in float_ops {
        let forward = op.forward().dunder();
        let reflected = op.reflected().dunder();
        builder = builder
            .method(forward, move |this, args| {
                let other = args::get_one_arg(forward, args)?;
                match other.as_float() {
                    Some(b) => float_binary(op, float_receiver(this)?, b),
                    None => Ok(Value::NotImplemented),
                }
            })
            .method(reflected, move |this, args| {
                let other = args::get_one_arg(reflected, args)?;
                match other.as_float() {
                    Some(a) => float_binary(op, a, float_receiver(this)?),
                    None => Ok(Value::NotImplemented),
                }
            });
    }

    for op in [UnaryOp::Neg, UnaryOp::Pos, UnaryOp::Abs] {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            args::check_zero_args(name, args)?;
            let a = float_receiver(this)?;
            Ok(Value::Float(match op {
                UnaryOp::Neg => -a,
                UnaryOp::Abs => a.abs(),
                _ => a,
            }))
        });
    }

    builder.build()
}
