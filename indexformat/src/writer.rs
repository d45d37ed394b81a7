use crate::codec::encode_value;
use crate::types::TypedValue;
use crate::varint::{put_varint, MAX_VARINT_LEN};
use crate::{Error, Result};
use std::convert::TryFrom;
use std::io::Write;

/// Writes a stream of length-prefixed records.
///
/// Every record is a varint byte count followed by that many bytes. Counts
/// (such as the length of a posting list) are written as a bare varint.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    sink: W,
    records: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W) -> Self {
        RecordWriter { sink, records: 0 }
    }

    fn write_varint(&mut self, x: usize) -> Result<()> {
        let x = i64::try_from(x)
            .map_err(|_| Error::CorruptStream(format!("length {} does not fit a varint", x)))?;
        let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
        put_varint(&mut buf, x);
        self.sink.write_all(&buf)?;
        Ok(())
    }

    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        self.write_varint(payload.len())?;
        self.sink.write_all(payload)?;
        self.records += 1;
        trace!("wrote record #{} ({} bytes)", self.records, payload.len());
        Ok(())
    }

    pub fn write_count(&mut self, count: usize) -> Result<()> {
        self.write_varint(count)
    }

    /// Write a value as one record: its type tag, then its encoded bytes.
    pub fn write_value(&mut self, value: &TypedValue) -> Result<()> {
        let mut payload = vec![value.kind().tag()];
        payload.extend(encode_value(value));
        self.write_record(&payload)
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
