use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can raise a host exception.
pub type RunResult<T> = Result<T, Exception>;

/// Exception types raised by the object model and the proxy engine.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// primary exception class - matches any exception in `is_subclass_of` checks.
    Exception,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    OverflowError,
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    LookupError,
    IndexError,
    KeyError,

    // --- RuntimeError hierarchy ---
    RuntimeError,
    NotImplementedError,
    /// Raised when proxy dispatch nests deeper than the configured limit.
    RecursionError,

    AttributeError,
    TypeError,
    ValueError,
    StopIteration,
    OSError,
}

impl ExcType {
    /// Checks if this exception type would be caught by a handler for `handler_type`.
    ///
    /// - `Exception` catches everything
    /// - `LookupError` is the base for `KeyError` and `IndexError`
    /// - `ArithmeticError` is the base for `ZeroDivisionError` and `OverflowError`
    /// - `RuntimeError` is the base for `RecursionError` and `NotImplementedError`
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => true,
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::ZeroDivisionError | Self::OverflowError),
            Self::RuntimeError => matches!(self, Self::RecursionError | Self::NotImplementedError),
            _ => false,
        }
    }

    /// Creates an exception of this type with a message.
    #[must_use]
    pub fn with_message(self, message: impl Display) -> Exception {
        Exception::new(self, Some(message.to_string()))
    }

    /// Creates an AttributeError for a missing attribute.
    ///
    /// Matches CPython's format: `AttributeError: '{type_name}' object has no attribute '{attr}'`
    #[must_use]
    pub fn attribute_error(type_name: impl Display, attr: &str) -> Exception {
        Self::AttributeError.with_message(format!("'{type_name}' object has no attribute '{attr}'"))
    }

    /// Creates a simple TypeError with a custom message.
    #[must_use]
    pub fn type_error(msg: impl Display) -> Exception {
        Self::TypeError.with_message(msg)
    }

    /// Creates a simple ValueError with a custom message.
    #[must_use]
    pub fn value_error(msg: impl Display) -> Exception {
        Self::ValueError.with_message(msg)
    }

    /// Creates a simple RuntimeError with a custom message.
    #[must_use]
    pub fn runtime_error(msg: impl Display) -> Exception {
        Self::RuntimeError.with_message(msg)
    }

    /// Matches CPython's format: `TypeError: unsupported operand type(s) for +: 'int' and 'str'`
    #[must_use]
    pub(crate) fn type_error_unsupported_operands(symbol: &str, left: &str, right: &str) -> Exception {
        Self::type_error(format!(
            "unsupported operand type(s) for {symbol}: '{left}' and '{right}'"
        ))
    }

    /// Matches CPython's format: `TypeError: bad operand type for unary -: 'str'`
    #[must_use]
    pub(crate) fn type_error_bad_unary_operand(symbol: &str, type_name: &str) -> Exception {
        Self::type_error(format!("bad operand type for {symbol}: '{type_name}'"))
    }

    /// Matches CPython's format: `TypeError: '<' not supported between instances of 'int' and 'str'`
    #[must_use]
    pub(crate) fn type_error_not_orderable(symbol: &str, left: &str, right: &str) -> Exception {
        Self::type_error(format!(
            "'{symbol}' not supported between instances of '{left}' and '{right}'"
        ))
    }

    /// Matches CPython's format: `TypeError: unhashable type: 'list'`
    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: &str) -> Exception {
        Self::type_error(format!("unhashable type: '{type_name}'"))
    }

    /// Matches CPython's format: `TypeError: 'int' object is not callable`
    #[must_use]
    pub(crate) fn type_error_not_callable(type_name: &str) -> Exception {
        Self::type_error(format!("'{type_name}' object is not callable"))
    }

    /// Matches CPython's format: `TypeError: 'int' object is not iterable`
    #[must_use]
    pub(crate) fn type_error_not_iterable(type_name: &str) -> Exception {
        Self::type_error(format!("'{type_name}' object is not iterable"))
    }

    /// Matches CPython's format: `TypeError: object of type 'int' has no len()`
    #[must_use]
    pub(crate) fn type_error_no_len(type_name: &str) -> Exception {
        Self::type_error(format!("object of type '{type_name}' has no len()"))
    }

    /// Matches CPython's format: `TypeError: 'int' object is not subscriptable`
    #[must_use]
    pub(crate) fn type_error_not_subscriptable(type_name: &str) -> Exception {
        Self::type_error(format!("'{type_name}' object is not subscriptable"))
    }

    /// Matches CPython's format: `TypeError: 'str' object cannot be interpreted as an integer`
    #[must_use]
    pub(crate) fn type_error_not_integer(type_name: &str) -> Exception {
        Self::type_error(format!("'{type_name}' object cannot be interpreted as an integer"))
    }

    /// Matches CPython's format: `TypeError: len() takes exactly one argument (2 given)`
    #[must_use]
    pub(crate) fn type_error_arg_count(name: &str, expected: usize, actual: usize) -> Exception {
        if expected == 1 {
            Self::type_error(format!("{name}() takes exactly one argument ({actual} given)"))
        } else {
            Self::type_error(format!("{name} expected {expected} arguments, got {actual}"))
        }
    }

    /// Matches CPython's format: `TypeError: dict.keys() takes no arguments (1 given)`
    #[must_use]
    pub(crate) fn type_error_no_args(name: &str, actual: usize) -> Exception {
        Self::type_error(format!("{name}() takes no arguments ({actual} given)"))
    }

    /// Matches CPython's format: `TypeError: pop expected at most 1 argument, got 2`
    #[must_use]
    pub(crate) fn type_error_at_most(name: &str, max: usize, actual: usize) -> Exception {
        let plural = if max == 1 { "" } else { "s" };
        Self::type_error(format!("{name} expected at most {max} argument{plural}, got {actual}"))
    }

    /// Matches CPython's format: `IndexError: list index out of range`
    #[must_use]
    pub(crate) fn index_error_out_of_range(type_name: &str) -> Exception {
        Self::IndexError.with_message(format!("{type_name} index out of range"))
    }

    /// KeyError carries the repr of the missing key as its message.
    #[must_use]
    pub(crate) fn key_error(key_repr: &str) -> Exception {
        Self::KeyError.with_message(key_repr)
    }

    #[must_use]
    pub(crate) fn zero_division(msg: &str) -> Exception {
        Self::ZeroDivisionError.with_message(msg)
    }

    /// Matches CPython's format: `OverflowError: integer overflow`
    #[must_use]
    pub(crate) fn overflow() -> Exception {
        Self::OverflowError.with_message("integer overflow")
    }
}

/// A raised exception: its type plus an optional message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exception {
    exc_type: ExcType,
    message: Option<String>,
}

impl Exception {
    #[must_use]
    pub fn new(exc_type: ExcType, message: Option<String>) -> Self {
        Self { exc_type, message }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether a handler for `handler_type` would catch this exception.
    #[must_use]
    pub fn matches(&self, handler_type: ExcType) -> bool {
        self.exc_type.is_subclass_of(handler_type)
    }

    /// Formats the exception the way `repr()` shows it, e.g. `ValueError('bad')`.
    #[must_use]
    pub fn py_repr(&self) -> String {
        match &self.message {
            Some(msg) => format!("{}({})", self.exc_type, crate::types::str::string_repr(msg)),
            None => format!("{}()", self.exc_type),
        }
    }
}

impl Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl std::error::Error for Exception {}

impl From<ExcType> for Exception {
    fn from(exc_type: ExcType) -> Self {
        Self::new(exc_type, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_matches_handlers() {
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::RecursionError.is_subclass_of(ExcType::RuntimeError));
        assert!(ExcType::AttributeError.is_subclass_of(ExcType::Exception));
        assert!(!ExcType::TypeError.is_subclass_of(ExcType::ValueError));
    }

    #[test]
    fn attribute_error_message_shape() {
        let err = ExcType::attribute_error("list", "x");
        assert_eq!(err.to_string(), "AttributeError: 'list' object has no attribute 'x'");
    }

    #[test]
    fn exc_type_parses_from_name() {
        let parsed: ExcType = "ZeroDivisionError".parse().unwrap();
        assert_eq!(parsed, ExcType::ZeroDivisionError);
        let name: &'static str = ExcType::OSError.into();
        assert_eq!(name, "OSError");
    }
}
