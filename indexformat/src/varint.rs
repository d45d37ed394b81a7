//! Signed variable-length integers.
//!
//! The value is zig-zag mapped to unsigned (`0, -1, 1, -2, ...` become
//! `0, 1, 2, 3, ...`) and written seven bits at a time, least significant
//! group first, with the high bit set on every byte but the last. This is
//! byte-for-byte the encoding of Go's `binary.PutVarint`.
use crate::{Error, Result};

/// The longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

pub fn put_varint(buf: &mut Vec<u8>, x: i64) {
    let mut ux = ((x << 1) ^ (x >> 63)) as u64;
    while ux >= 0x80 {
        buf.push(ux as u8 | 0x80);
        ux >>= 7;
    }
    buf.push(ux as u8);
}

/// Read a varint from the front of `buf`, returning it with the number of
/// bytes it took.
///
/// Running out of bytes mid-varint is a truncated stream; a varint that does
/// not fit in 64 bits is a corrupt one.
pub fn read_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let mut ux: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(overflow());
        }
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(overflow());
            }
            ux |= u64::from(byte) << shift;
            let x = ((ux >> 1) as i64) ^ -((ux & 1) as i64);
            return Ok((x, i + 1));
        }
        ux |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(Error::TruncatedStream {
        needed: buf.len() + 1,
        remaining: buf.len(),
    })
}

fn overflow() -> Error {
    Error::CorruptStream("varint overflows 64 bits".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(x: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        put_varint(&mut buf, x);
        buf
    }

    #[test]
    fn matches_zig_zag_layout() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(-1), vec![0x01]);
        assert_eq!(encoded(1), vec![0x02]);
        assert_eq!(encoded(63), vec![0x7e]);
        assert_eq!(encoded(64), vec![0x80, 0x01]);
        assert_eq!(encoded(300), vec![0xd8, 0x04]);
        assert_eq!(encoded(i64::max_value()).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn reads_back_extremes() {
        for &x in &[0, 1, -1, 4, 127, 128, -129, i64::max_value(), i64::min_value()] {
            let buf = encoded(x);
            assert_eq!(read_varint(&buf).unwrap(), (x, buf.len()));
        }
    }

    #[test]
    fn reads_only_the_first_varint() {
        let mut buf = encoded(300);
        buf.extend_from_slice(&[0xff, 0xff]);
        assert_eq!(read_varint(&buf).unwrap(), (300, 2));
    }

    #[test]
    fn incomplete_varint_is_truncated() {
        assert!(match read_varint(&[]) {
            Err(Error::TruncatedStream { .. }) => true,
            _ => false,
        });
        assert!(match read_varint(&[0x80, 0x80]) {
            Err(Error::TruncatedStream { .. }) => true,
            _ => false,
        });
    }

    #[test]
    fn oversized_varint_is_corrupt() {
        assert!(match read_varint(&[0xff; 11]) {
            Err(Error::CorruptStream(_)) => true,
            _ => false,
        });
        let mut ten = vec![0xff; 9];
        ten.push(0x02);
        assert!(match read_varint(&ten) {
            Err(Error::CorruptStream(_)) => true,
            _ => false,
        });
    }
}
