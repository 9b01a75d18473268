//! Deterministic hash helpers for the built-in classes.
//!
//! Hashes are stable across runs so that tests and traces are reproducible.
//!
//! ## Cross-type hash invariant
//!
//! If `a == b` then `hash(a) == hash(b)`. Since `1 == 1.0 == True`, the int, float
//! and bool hashes agree on equal values: integral floats take the integer path, and
//! integers hash modulo the Mersenne prime `2^61 - 1`.

use std::hash::BuildHasher;

use ahash::RandomState;

/// Mersenne prime used for numeric hashing: `2^61 - 1`.
const MODULUS: i64 = (1 << 61) - 1;

/// Fixed seeds keep text hashes identical between runs.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Hash of `None`.
pub(crate) const NONE_HASH: i64 = 0x0fca_86f0;

fn fixed_state() -> RandomState {
    RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3])
}

/// `-1` is reserved as an error sentinel by the numeric protocol, so it maps to `-2`.
fn finish(raw: i64) -> i64 {
    if raw == -1 { -2 } else { raw }
}

/// Hashes an integer with the sign-preserving modular algorithm.
#[must_use]
pub(crate) fn hash_int(value: i64) -> i64 {
    let remainder = (i128::from(value).unsigned_abs() % MODULUS as u128) as i64;
    finish(if value < 0 { -remainder } else { remainder })
}

/// Hashes a float; integral values hash like the equal integer.
///
/// Special values:
/// - `+inf` hashes to `314159`
/// - `-inf` hashes to `-314159`
/// - `NaN` hashes to `0`
#[must_use]
pub(crate) fn hash_float(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { 314_159 } else { -314_159 };
    }
    if value.is_nan() {
        return 0;
    }
    let truncated = value.trunc();
    if value == truncated && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
        return hash_int(truncated as i64);
    }
    finish(fixed_state().hash_one(value.to_bits()) as i64)
}

/// Hashes text content.
#[must_use]
pub(crate) fn hash_str(value: &str) -> i64 {
    if value.is_empty() {
        return 0;
    }
    finish(fixed_state().hash_one(value) as i64)
}

/// Hashes byte content; equal to the hash of the same bytes viewed as text.
#[must_use]
pub(crate) fn hash_bytes(value: &[u8]) -> i64 {
    match std::str::from_utf8(value) {
        Ok(text) => hash_str(text),
        Err(_) => finish(fixed_state().hash_one(value) as i64),
    }
}

/// Combines element hashes in order (tuple hashing).
#[must_use]
pub(crate) fn hash_sequence(hashes: impl IntoIterator<Item = i64>) -> i64 {
    let mut acc: i64 = 0x0034_5678;
    let mut len: i64 = 0;
    for h in hashes {
        acc = (acc ^ h).wrapping_mul(1_000_003);
        len += 1;
    }
    finish(acc ^ len)
}

/// Default hash for objects without value semantics: derived from their identity.
#[must_use]
pub(crate) fn hash_identity(identity: usize) -> i64 {
    finish((identity >> 4) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_and_integral_float_agree() {
        assert_eq!(hash_int(1), hash_float(1.0));
        assert_eq!(hash_int(-42), hash_float(-42.0));
        assert_eq!(hash_int(0), 0);
    }

    #[test]
    fn minus_one_is_remapped() {
        assert_eq!(hash_int(-1), -2);
    }

    #[test]
    fn modulus_wraps_large_values() {
        assert_eq!(hash_int(MODULUS), 0);
        assert_eq!(hash_int(MODULUS + 5), 5);
        assert_eq!(hash_int(i64::MIN), hash_int(i64::MIN));
    }

    #[test]
    fn text_hash_is_deterministic() {
        assert_eq!(hash_str("spam"), hash_str("spam"));
        assert_ne!(hash_str("spam"), hash_str("eggs"));
        assert_eq!(hash_str(""), 0);
        assert_eq!(hash_bytes(b"spam"), hash_str("spam"));
    }

    #[test]
    fn sequence_hash_depends_on_order() {
        assert_ne!(hash_sequence([1, 2]), hash_sequence([2, 1]));
    }

    #[test]
    fn special_floats() {
        assert_eq!(hash_float(f64::INFINITY), 314_159);
        assert_eq!(hash_float(f64::NEG_INFINITY), -314_159);
        assert_eq!(hash_float(f64::NAN), 0);
    }
}
