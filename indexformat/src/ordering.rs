//! The two orders every index is sorted by.
use crate::types::TypedValue;
use crate::{Error, Result};
use std::cmp::Ordering;

/// Lexicographic order over byte strings. When one string is a prefix of the
/// other, the shorter one comes first.
pub fn byte_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

pub fn byte_less(a: &[u8], b: &[u8]) -> bool {
    byte_cmp(a, b) == Ordering::Less
}

/// Order two values of the same kind.
///
/// Floats compare numerically, so `-0.0` equals `0.0`. NaN has no numeric
/// place; it falls back to the IEEE 754 total order, which puts positive
/// NaNs after `+inf` and negative NaNs before `-inf`.
pub fn value_cmp(a: &TypedValue, b: &TypedValue) -> Result<Ordering> {
    use TypedValue::*;
    let ordering = match (a, b) {
        (Int32(x), Int32(y)) => x.cmp(y),
        (Int64(x), Int64(y)) | (Timestamp(x), Timestamp(y)) => x.cmp(y),
        (Float32(x), Float32(y)) => x.partial_cmp(y).unwrap_or_else(|| x.total_cmp(y)),
        (Float64(x), Float64(y)) => x.partial_cmp(y).unwrap_or_else(|| x.total_cmp(y)),
        (String(x), String(y)) => byte_cmp(x.as_bytes(), y.as_bytes()),
        (Bytes(x), Bytes(y)) => byte_cmp(x, y),
        _ => {
            return Err(Error::InvalidComparison {
                left: a.kind(),
                right: b.kind(),
            })
        }
    };
    Ok(ordering)
}

pub fn value_less(a: &TypedValue, b: &TypedValue) -> Result<bool> {
    Ok(value_cmp(a, b)? == Ordering::Less)
}
