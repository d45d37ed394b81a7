//! Fixed binary forms for values.
//!
//! Numbers are little-endian: `int32`/`float32` take 4 bytes,
//! `int64`/`float64`/`timestamp` take 8. Strings and byte strings are their
//! raw bytes with no length in front; whoever stores them knows how long
//! they are.
use crate::types::{DataKind, TypedValue};
use crate::{Error, Result};
use std::convert::TryInto;

/// Encode a value in its kind's binary form.
pub fn encode_value(value: &TypedValue) -> Vec<u8> {
    match value {
        TypedValue::Int32(v) => v.to_le_bytes().to_vec(),
        TypedValue::Int64(v) | TypedValue::Timestamp(v) => v.to_le_bytes().to_vec(),
        TypedValue::Float32(v) => v.to_le_bytes().to_vec(),
        TypedValue::Float64(v) => v.to_le_bytes().to_vec(),
        TypedValue::String(s) => s.as_bytes().to_vec(),
        TypedValue::Bytes(b) => b.clone(),
    }
}

macro_rules! read_fixed {
    ($ty:ty, $kind:expr, $bytes:expr) => {{
        let buf: [u8; std::mem::size_of::<$ty>()] =
            $bytes.try_into().map_err(|_| short_buffer($kind, $bytes.len()))?;
        <$ty>::from_le_bytes(buf)
    }};
}

fn short_buffer(kind: DataKind, len: usize) -> Error {
    Error::DecodeError(format!(
        "{} needs {} bytes, got {}",
        kind,
        kind.fixed_width().unwrap_or(0),
        len
    ))
}

/// Decode bytes produced by `encode_value` for a value of `kind`.
///
/// Fixed-width kinds require exactly their width.
pub fn decode_value(kind: DataKind, bytes: &[u8]) -> Result<TypedValue> {
    let value = match kind {
        DataKind::Int32 => TypedValue::Int32(read_fixed!(i32, kind, bytes)),
        DataKind::Int64 => TypedValue::Int64(read_fixed!(i64, kind, bytes)),
        DataKind::Float32 => TypedValue::Float32(read_fixed!(f32, kind, bytes)),
        DataKind::Float64 => TypedValue::Float64(read_fixed!(f64, kind, bytes)),
        DataKind::Timestamp => TypedValue::Timestamp(read_fixed!(i64, kind, bytes)),
        DataKind::String => TypedValue::String(String::from_utf8(bytes.to_vec())?),
        DataKind::Bytes => TypedValue::Bytes(bytes.to_vec()),
    };
    Ok(value)
}
