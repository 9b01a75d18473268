//! `str` and `bytes`.

use std::sync::Arc;

use strum::IntoEnumIterator;

use super::{Class, format::{FormatSpec, unknown_code}, object_type, sequence_index};
use crate::{
    args,
    capability::CompareOp,
    exception::{ExcType, RunResult},
    ops, py_hash,
    value::Value,
};

/// Quotes text the way `repr()` does: single quotes unless the text contains a single
/// quote and no double quote.
#[must_use]
pub(crate) fn string_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// `b'...'` literal form of a byte string.
#[must_use]
pub(crate) fn bytes_repr(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') { b'"' } else { b'\'' };
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(char::from(quote));
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(char::from(b));
            }
            0x20..=0x7e => out.push(char::from(b)),
            b => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(char::from(quote));
    out
}

fn str_receiver(this: &Value) -> RunResult<&str> {
    this.as_str().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor requires a 'str' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn bytes_receiver(this: &Value) -> RunResult<&[u8]> {
    this.as_bytes().ok_or_else(|| {
        ExcType::type_error(format!(
            "descriptor requires a 'bytes' object but received a '{}'",
            this.type_name()
        ))
    })
}

/// `str * n` and `n * str`, with negative counts producing the empty string.
fn repeat_count(other: &Value) -> Option<usize> {
    other.as_int().map(|n| usize::try_from(n).unwrap_or(0))
}

// ============================================================================
// str
// ============================================================================

pub(super) fn build_str() -> Arc<Class> {
    let mut builder = Class::builder("str")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("str.__repr__", args)?;
            Ok(Value::from(string_repr(str_receiver(this)?)))
        })
        .method("__str__", |this, args| {
            args::check_zero_args("str.__str__", args)?;
            str_receiver(this)?;
            Ok(this.clone())
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("str.__hash__", args)?;
            Ok(Value::Int(py_hash::hash_str(str_receiver(this)?)))
        })
        .method("__len__", |this, args| {
            args::check_zero_args("str.__len__", args)?;
            Ok(Value::Int(str_receiver(this)?.chars().count() as i64))
        })
        .method("__getitem__", |this, args| {
            let key = args::get_one_arg("str.__getitem__", args)?;
            let text = str_receiver(this)?;
            let len = text.chars().count();
            let index = sequence_index(key, len, "string")?;
            Ok(text.chars().nth(index).map_or(Value::None, |c| Value::from(c.to_string())))
        })
        .method("__contains__", |this, args| {
            let needle = args::get_one_arg("str.__contains__", args)?;
            match needle.as_str() {
                Some(needle) => Ok(Value::Bool(str_receiver(this)?.contains(needle))),
                None => Err(ExcType::type_error(format!(
                    "'in <string>' requires string as left operand, not {}",
                    needle.type_name()
                ))),
            }
        })
        .method("__iter__", |this, args| {
            args::check_zero_args("str.__iter__", args)?;
            let chars = str_receiver(this)?.chars().map(|c| Value::from(c.to_string())).collect();
            Ok(Value::iterator(chars))
        })
        .method("__add__", |this, args| {
            let other = args::get_one_arg("str.__add__", args)?;
            match other.as_str() {
                Some(other) => Ok(Value::from(format!("{}{other}", str_receiver(this)?))),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("__mul__", |this, args| {
            let other = args::get_one_arg("str.__mul__", args)?;
            match repeat_count(other) {
                Some(n) => Ok(Value::from(str_receiver(this)?.repeat(n))),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("__rmul__", |this, args| {
            let other = args::get_one_arg("str.__rmul__", args)?;
            match repeat_count(other) {
                Some(n) => Ok(Value::from(str_receiver(this)?.repeat(n))),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("__format__", |this, args| {
            let spec = args::get_str_arg("str.__format__", args)?;
            let parsed = FormatSpec::parse(spec)?;
            match parsed.kind {
                None | Some('s') => {
                    let text = str_receiver(this)?;
                    let text: String = match parsed.precision {
                        Some(precision) => text.chars().take(precision).collect(),
                        None => text.to_owned(),
                    };
                    Ok(Value::from(parsed.pad(&text, false)))
                }
                Some(kind) => Err(unknown_code(kind, "str")),
            }
        })
        .method("upper", |this, args| {
            args::check_zero_args("str.upper", args)?;
            Ok(Value::from(str_receiver(this)?.to_uppercase()))
        })
        .method("lower", |this, args| {
            args::check_zero_args("str.lower", args)?;
            Ok(Value::from(str_receiver(this)?.to_lowercase()))
        })
        .method("startswith", |this, args| {
            let prefix = args::get_str_arg("str.startswith", args)?;
            Ok(Value::Bool(str_receiver(this)?.starts_with(prefix)))
        })
        .method("replace", |this, args| {
            let (old, new) = args::get_two_args("str.replace", args)?;
            let old = args::expect_str("str.replace", old)?;
            let new = args::expect_str("str.replace", new)?;
            Ok(Value::from(str_receiver(this)?.replace(old, new)))
        })
        .method("join", |this, args| {
            let iterable = args::get_one_arg("str.join", args)?;
            let separator = str_receiver(this)?;
            let mut parts = Vec::new();
            for (i, item) in ops::to_vec(iterable)?.iter().enumerate() {
                match item.as_str() {
                    Some(part) => parts.push(part.to_owned()),
                    None => {
                        return Err(ExcType::type_error(format!(
                            "sequence item {i}: expected str instance, {} found",
                            item.type_name()
                        )));
                    }
                }
            }
            Ok(Value::from(parts.join(separator)))
        });

    for op in CompareOp::iter() {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            let other = args::get_one_arg(name, args)?;
            match other.as_str() {
                Some(other) => Ok(Value::Bool(op.holds(str_receiver(this)?.cmp(other)))),
                None => Ok(Value::NotImplemented),
            }
        });
    }

    builder.build()
}

// ============================================================================
// bytes
// ============================================================================

pub(super) fn build_bytes() -> Arc<Class> {
    let mut builder = Class::builder("bytes")
        .base(&object_type())
        .native()
        .method("__repr__", |this, args| {
            args::check_zero_args("bytes.__repr__", args)?;
            Ok(Value::from(bytes_repr(bytes_receiver(this)?)))
        })
        .method("__bytes__", |this, args| {
            args::check_zero_args("bytes.__bytes__", args)?;
            bytes_receiver(this)?;
            Ok(this.clone())
        })
        .method("__hash__", |this, args| {
            args::check_zero_args("bytes.__hash__", args)?;
            Ok(Value::Int(py_hash::hash_bytes(bytes_receiver(this)?)))
        })
        .method("__len__", |this, args| {
            args::check_zero_args("bytes.__len__", args)?;
            Ok(Value::Int(bytes_receiver(this)?.len() as i64))
        })
        .method("__getitem__", |this, args| {
            let key = args::get_one_arg("bytes.__getitem__", args)?;
            let bytes = bytes_receiver(this)?;
            let index = sequence_index(key, bytes.len(), "bytes")?;
            Ok(Value::Int(i64::from(bytes[index])))
        })
        .method("__iter__", |this, args| {
            args::check_zero_args("bytes.__iter__", args)?;
            let items = bytes_receiver(this)?.iter().map(|b| Value::Int(i64::from(*b))).collect();
            Ok(Value::iterator(items))
        })
        .method("__contains__", |this, args| {
            let needle = args::get_one_arg("bytes.__contains__", args)?;
            let haystack = bytes_receiver(this)?;
            match needle {
                Value::Bytes(needle) => Ok(Value::Bool(
                    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == &needle[..]),
                )),
                other => match other.as_int().and_then(|b| u8::try_from(b).ok()) {
                    Some(byte) => Ok(Value::Bool(haystack.contains(&byte))),
                    None => Err(ExcType::type_error(format!(
                        "a bytes-like object is required, not '{}'",
                        other.type_name()
                    ))),
                },
            }
        })
        .method("__add__", |this, args| {
            let other = args::get_one_arg("bytes.__add__", args)?;
            match other.as_bytes() {
                Some(other) => Ok(Value::bytes(&[bytes_receiver(this)?, other].concat())),
                None => Ok(Value::NotImplemented),
            }
        })
        .method("decode", |this, args| {
            args::check_zero_args("bytes.decode", args)?;
            match std::str::from_utf8(bytes_receiver(this)?) {
                Ok(text) => Ok(Value::str(text)),
                Err(err) => Err(ExcType::value_error(format!("'utf-8' codec can't decode bytes: {err}"))),
            }
        })
        .method("hex", |this, args| {
            args::check_zero_args("bytes.hex", args)?;
            let hex: String = bytes_receiver(this)?.iter().map(|b| format!("{b:02x}")).collect();
            Ok(Value::from(hex))
        });

    for op in [CompareOp::Eq, CompareOp::Ne] {
        let name = op.op().dunder();
        builder = builder.method(name, move |this, args| {
            let other = args::get_one_arg(name, args)?;
            match other.as_bytes() {
                Some(other) => Ok(Value::Bool(op.holds(bytes_receiver(this)?.cmp(other)))),
                None => Ok(Value::NotImplemented),
            }
        });
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_picks_quotes() {
        assert_eq!(string_repr("abc"), "'abc'");
        assert_eq!(string_repr("it's"), "\"it's\"");
        assert_eq!(string_repr("a\nb"), "'a\\nb'");
    }

    #[test]
    fn bytes_repr_escapes_non_printable() {
        assert_eq!(bytes_repr(b"ab\x00"), "b'ab\\x00'");
    }
}
