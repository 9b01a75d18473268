//! Format-spec mini-language shared by the `__format__` members of the built-in classes.
//!
//! Supports `[[fill]align][+][0][width][.precision][type]`.

use crate::exception::{ExcType, RunResult};

/// A parsed format specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormatSpec {
    pub fill: char,
    pub align: Option<char>,
    pub sign_plus: bool,
    pub zero_pad: bool,
    pub width: usize,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    pub(crate) fn parse(spec: &str) -> RunResult<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let is_align = |c: &char| matches!(c, '<' | '>' | '^');
        let mut i = 0;
        let mut fill = ' ';
        let mut align = None;
        if chars.len() >= 2 && is_align(&chars[1]) {
            fill = chars[0];
            align = Some(chars[1]);
            i = 2;
        } else if chars.first().is_some_and(is_align) {
            align = Some(chars[0]);
            i = 1;
        }

        let sign_plus = chars.get(i) == Some(&'+');
        if sign_plus {
            i += 1;
        }
        let zero_pad = chars.get(i) == Some(&'0');
        if zero_pad {
            i += 1;
        }

        let width = read_number(&chars, &mut i).unwrap_or(0);
        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            precision = Some(read_number(&chars, &mut i).ok_or_else(|| ExcType::value_error("Format specifier missing precision"))?);
        }

        let kind = chars.get(i).copied();
        if kind.is_some() {
            i += 1;
        }
        if i != chars.len() {
            return Err(ExcType::value_error("Invalid format specifier"));
        }
        Ok(Self {
            fill,
            align,
            sign_plus,
            zero_pad,
            width,
            precision,
            kind,
        })
    }

    /// Pads `body` to the requested width.
    ///
    /// Numbers right-align by default and zero-pad after their sign; text left-aligns.
    pub(crate) fn pad(&self, body: &str, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body.to_owned();
        }
        let missing = self.width - len;
        if self.zero_pad && self.align.is_none() && numeric {
            let (sign, digits) = match body.strip_prefix(['-', '+']) {
                Some(rest) => (&body[..1], rest),
                None => ("", body),
            };
            return format!("{sign}{}{digits}", "0".repeat(missing));
        }
        let fill = |n: usize| self.fill.to_string().repeat(n);
        match self.align.unwrap_or(if numeric { '>' } else { '<' }) {
            '<' => format!("{body}{}", fill(missing)),
            '^' => format!("{}{body}{}", fill(missing / 2), fill(missing - missing / 2)),
            _ => format!("{}{body}", fill(missing)),
        }
    }

    /// Prefixes `+` on non-negative numbers when requested.
    pub(crate) fn signed(&self, body: String) -> String {
        if self.sign_plus && !body.starts_with('-') {
            format!("+{body}")
        } else {
            body
        }
    }
}

fn read_number(chars: &[char], i: &mut usize) -> Option<usize> {
    let start = *i;
    while chars.get(*i).is_some_and(char::is_ascii_digit) {
        *i += 1;
    }
    if start == *i {
        return None;
    }
    chars[start..*i].iter().collect::<String>().parse().ok()
}

/// Matches CPython's format: `ValueError: Unknown format code 'd' for object of type 'float'`
pub(crate) fn unknown_code(kind: char, type_name: &str) -> crate::Exception {
    ExcType::value_error(format!("Unknown format code '{kind}' for object of type '{type_name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_spec() {
        let spec = FormatSpec::parse("*^+08.3f").unwrap();
        assert_eq!(spec.fill, '*');
        assert_eq!(spec.align, Some('^'));
        assert!(spec.sign_plus);
        assert!(spec.zero_pad);
        assert_eq!(spec.width, 8);
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('f'));
    }

    #[test]
    fn zero_pad_goes_after_sign() {
        let spec = FormatSpec::parse("05").unwrap();
        assert_eq!(spec.pad("-42", true), "-0042");
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(FormatSpec::parse("5dd").is_err());
        assert!(FormatSpec::parse(".f").is_err());
    }
}
