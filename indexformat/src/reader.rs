use crate::codec::decode_value;
use crate::types::{DataKind, TypedValue};
use crate::varint::read_varint;
use crate::{Error, Result};
use std::convert::TryFrom;

/// Reads back a stream written by `RecordWriter`.
///
/// The cursor only ever moves forward, and only past bytes it has
/// validated; any malformed length stops the reader with an error.
pub struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    /// Fails with `EmptyStream` for a zero-length buffer.
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.is_empty() {
            return Err(Error::EmptyStream);
        }
        Ok(RecordReader { buf, pos: 0 })
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn read_length(&mut self) -> Result<usize> {
        let (x, size) = read_varint(self.remaining())?;
        if x < 0 {
            warn!("negative length {} at offset {}", x, self.pos);
            return Err(Error::CorruptStream(format!(
                "negative length {} at offset {}",
                x, self.pos
            )));
        }
        let len = usize::try_from(x).map_err(|_| {
            Error::CorruptStream(format!("length {} at offset {} is out of range", x, self.pos))
        })?;
        self.pos += size;
        Ok(len)
    }

    /// Read one length-prefixed record.
    pub fn read_record(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let len = self.read_length()?;
        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            warn!(
                "record at offset {} claims {} bytes, {} remaining",
                start, len, remaining
            );
            self.pos = start;
            return Err(Error::TruncatedStream {
                needed: len,
                remaining,
            });
        }
        let record = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        trace!("read record at offset {} ({} bytes)", start, len);
        Ok(record)
    }

    pub fn read_count(&mut self) -> Result<usize> {
        self.read_length()
    }

    /// Read a value record written by `RecordWriter::write_value`.
    pub fn read_value(&mut self) -> Result<TypedValue> {
        let offset = self.pos;
        let record = self.read_record()?;
        let (tag, bytes) = record
            .split_first()
            .ok_or_else(|| Error::CorruptStream(format!("value at offset {} has no tag", offset)))?;
        let kind = DataKind::from_tag(*tag)?;
        decode_value(kind, bytes).map_err(|e| match e {
            Error::DecodeError(msg) => {
                Error::CorruptStream(format!("value at offset {}: {}", offset, msg))
            }
            other => other,
        })
    }
}
