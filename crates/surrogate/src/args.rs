//! Positional argument checks for host methods.
//!
//! Every member of a class receives its arguments as a borrowed slice; these helpers
//! validate the arity and hand back borrowed views with CPython-shaped errors.

use crate::{
    exception::{ExcType, RunResult},
    value::Value,
};

/// Checks that zero arguments were passed.
pub(crate) fn check_zero_args(name: &str, args: &[Value]) -> RunResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ExcType::type_error_no_args(name, args.len()))
    }
}

/// Checks that exactly one positional argument was passed, returning it.
pub(crate) fn get_one_arg<'a>(name: &str, args: &'a [Value]) -> RunResult<&'a Value> {
    match args {
        [a] => Ok(a),
        _ => Err(ExcType::type_error_arg_count(name, 1, args.len())),
    }
}

/// Checks that exactly two positional arguments were passed, returning them as a tuple.
pub(crate) fn get_two_args<'a>(name: &str, args: &'a [Value]) -> RunResult<(&'a Value, &'a Value)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(ExcType::type_error_arg_count(name, 2, args.len())),
    }
}

/// Checks that exactly three positional arguments were passed, returning them as a tuple.
pub(crate) fn get_three_args<'a>(name: &str, args: &'a [Value]) -> RunResult<(&'a Value, &'a Value, &'a Value)> {
    match args {
        [a, b, c] => Ok((a, b, c)),
        _ => Err(ExcType::type_error_arg_count(name, 3, args.len())),
    }
}

/// Accepts zero or one positional argument.
pub(crate) fn get_zero_one_arg<'a>(name: &str, args: &'a [Value]) -> RunResult<Option<&'a Value>> {
    match args {
        [] => Ok(None),
        [a] => Ok(Some(a)),
        _ => Err(ExcType::type_error_at_most(name, 1, args.len())),
    }
}

/// Accepts one or two positional arguments.
pub(crate) fn get_one_two_args<'a>(name: &str, args: &'a [Value]) -> RunResult<(&'a Value, Option<&'a Value>)> {
    match args {
        [a] => Ok((a, None)),
        [a, b] => Ok((a, Some(b))),
        [] => Err(ExcType::type_error(format!("{name} expected at least 1 argument, got 0"))),
        _ => Err(ExcType::type_error_at_most(name, 2, args.len())),
    }
}

/// Extracts a single string argument, the shape every attribute-protocol member takes.
pub(crate) fn get_str_arg<'a>(name: &str, args: &'a [Value]) -> RunResult<&'a str> {
    let value = get_one_arg(name, args)?;
    expect_str(name, value)
}

/// Borrows `value` as a string or raises the CPython attribute-name TypeError.
pub(crate) fn expect_str<'a>(name: &str, value: &'a Value) -> RunResult<&'a str> {
    value.as_str().ok_or_else(|| {
        ExcType::type_error(format!(
            "{name}(): argument must be str, not {}",
            value.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_errors_name_the_callee() {
        let err = get_one_arg("len", &[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: len() takes exactly one argument (2 given)");

        let err = check_zero_args("list.clear", &[Value::None]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: list.clear() takes no arguments (1 given)");
    }

    #[test]
    fn str_arg_rejects_other_types() {
        let err = get_str_arg("getattr", &[Value::Int(3)]).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
        assert_eq!(get_str_arg("getattr", &[Value::from("x")]).unwrap(), "x");
    }
}
