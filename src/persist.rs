//! Turning whole indexes into flat byte streams and back.
//!
//! A primary index is one record per row id, in byte order.
//!
//! A secondary index is, per distinct value in value order:
//!
//! ```text
//! varint(len) [type tag][value bytes]     the value
//! varint(count)                           how many rows hold it (> 0)
//! varint(len) [row id]                    count times, in insertion order
//! ```
//!
//! Neither stream has a header, so an index with no entries serializes to
//! zero bytes, which `deserialize` reports as `EmptyStream`. Callers that
//! take that to mean "no entries yet" use `deserialize_or_empty`.
use crate::index::secondary::{IndexKey, Postings};
use crate::index::{PrimaryKeyIndex, RowId, SecondaryValueIndex};
use crate::{Error, Result};
use indexformat::{DataKind, Error as FormatError, RecordReader, RecordWriter};
use std::collections::{BTreeMap, BTreeSet};

fn corrupt(msg: String) -> Error {
    Error::Format(FormatError::CorruptStream(msg))
}

fn is_empty_stream(err: &Error) -> bool {
    match err.format_error() {
        Some(err) => err.is_recoverable(),
        None => false,
    }
}

impl PrimaryKeyIndex {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let rows = self.read();
        let mut writer = RecordWriter::new(Vec::new());
        for row in rows.iter() {
            writer.write_record(row.as_bytes())?;
        }
        Ok(writer.into_inner())
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = RecordReader::new(bytes)?;
        let mut rows = BTreeSet::new();
        while !reader.is_exhausted() {
            rows.insert(RowId::from(reader.read_record()?));
        }
        Ok(PrimaryKeyIndex::from_rows(rows))
    }

    pub fn deserialize_or_empty(bytes: &[u8]) -> Result<Self> {
        match PrimaryKeyIndex::deserialize(bytes) {
            Err(ref e) if is_empty_stream(e) => Ok(PrimaryKeyIndex::new()),
            other => other,
        }
    }
}

impl SecondaryValueIndex {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let entries = self.read();
        let mut writer = RecordWriter::new(Vec::new());
        for (key, rows) in entries.iter() {
            writer.write_value(&key.0)?;
            writer.write_count(rows.len())?;
            for row in rows {
                writer.write_record(row.as_bytes())?;
            }
        }
        Ok(writer.into_inner())
    }

    /// Rebuild an index from its stream. The index's kind is taken from the
    /// type tag of the first value; every other value must carry the same tag.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = RecordReader::new(bytes)?;
        let mut kind: Option<DataKind> = None;
        let mut entries: Postings = BTreeMap::new();
        while !reader.is_exhausted() {
            let offset = reader.position();
            let value = reader.read_value()?;
            let expected = *kind.get_or_insert(value.kind());
            if expected != value.kind() {
                return Err(corrupt(format!(
                    "{} value at offset {} in a {} index",
                    value.kind(),
                    offset,
                    expected
                )));
            }

            let count = reader.read_count()?;
            if count == 0 {
                return Err(corrupt(format!("value at offset {} has no rows", offset)));
            }
            let mut rows = Vec::new();
            for _ in 0..count {
                rows.push(RowId::from(reader.read_record()?));
            }

            if entries.insert(IndexKey(value), rows).is_some() {
                return Err(corrupt(format!("value at offset {} is repeated", offset)));
            }
        }
        // The buffer was not empty, so at least one value was read.
        let kind = kind.ok_or_else(|| corrupt("no values in stream".to_owned()))?;
        Ok(SecondaryValueIndex::from_entries(kind, entries))
    }

    /// Like `deserialize`, but an empty stream gives an empty index of `kind`,
    /// and values of any other kind are rejected.
    pub fn deserialize_or_empty(kind: DataKind, bytes: &[u8]) -> Result<Self> {
        let index = match SecondaryValueIndex::deserialize(bytes) {
            Err(ref e) if is_empty_stream(e) => return Ok(SecondaryValueIndex::new(kind)),
            other => other?,
        };
        if index.kind() != kind {
            return Err(corrupt(format!(
                "stream holds {} values, expected {}",
                index.kind(),
                kind
            )));
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexformat::TypedValue;

    fn format_error(result: Result<impl Sized>) -> FormatError {
        match result {
            Err(Error::Format(err)) => err,
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected an error"),
        }
    }

    fn primary_with(n: usize) -> PrimaryKeyIndex {
        let index = PrimaryKeyIndex::new();
        for i in 0..n {
            index.insert(RowId::from(format!("row-{:05}", i).into_bytes()));
        }
        index
    }

    fn secondary_with(n: usize) -> SecondaryValueIndex {
        let index = SecondaryValueIndex::new(DataKind::Int32);
        for i in 0..n {
            // Every value is shared by up to three rows.
            let value = TypedValue::Int32((i / 3) as i32 - 100);
            index
                .insert(value, RowId::from(format!("row-{}", i).into_bytes()))
                .unwrap();
        }
        index
    }

    #[test]
    fn primary_wire_layout() {
        let index = PrimaryKeyIndex::new();
        index.insert("bb".into());
        index.insert("a".into());
        assert_eq!(index.serialize().unwrap(), vec![0x02, b'a', 0x04, b'b', b'b']);
    }

    #[test]
    fn secondary_wire_layout() {
        let index = SecondaryValueIndex::new(DataKind::Int32);
        index.insert(TypedValue::Int32(1), "x".into()).unwrap();
        index.insert(TypedValue::Int32(1), "yz".into()).unwrap();
        assert_eq!(
            index.serialize().unwrap(),
            vec![
                0x0a, 0x00, 0x01, 0x00, 0x00, 0x00, // int32 tag + 1
                0x04, // two rows
                0x02, b'x', 0x04, b'y', b'z',
            ]
        );
    }

    #[test]
    fn primary_round_trips() {
        for &n in &[1, 1000] {
            let index = primary_with(n);
            let restored = PrimaryKeyIndex::deserialize(&index.serialize().unwrap()).unwrap();
            assert_eq!(restored.ascend().collect::<Vec<_>>(), index.ascend().collect::<Vec<_>>());
            assert_eq!(restored.len(), n);
        }
    }

    #[test]
    fn secondary_round_trips() {
        for &n in &[1, 1000] {
            let index = secondary_with(n);
            let restored = SecondaryValueIndex::deserialize(&index.serialize().unwrap()).unwrap();
            assert_eq!(restored.kind(), DataKind::Int32);
            assert_eq!(restored.ascend().collect::<Vec<_>>(), index.ascend().collect::<Vec<_>>());
            assert_eq!(restored.posting_count(), n);
        }
    }

    #[test]
    fn string_and_float_indexes_round_trip() {
        let names = SecondaryValueIndex::new(DataKind::String);
        names.insert("alice".into(), "r1".into()).unwrap();
        names.insert("".into(), "r2".into()).unwrap();
        names.insert("alice".into(), "r3".into()).unwrap();
        let restored = SecondaryValueIndex::deserialize(&names.serialize().unwrap()).unwrap();
        assert_eq!(restored.ascend().collect::<Vec<_>>(), names.ascend().collect::<Vec<_>>());

        let floats = SecondaryValueIndex::new(DataKind::Float64);
        for (i, v) in [2.5, -0.0, std::f64::NAN, -1e9].iter().enumerate() {
            floats
                .insert(TypedValue::Float64(*v), RowId::from(vec![i as u8]))
                .unwrap();
        }
        let restored = SecondaryValueIndex::deserialize(&floats.serialize().unwrap()).unwrap();
        let before: Vec<u64> = floats.ascend().map(|(v, _)| bits(&v)).collect();
        let after: Vec<u64> = restored.ascend().map(|(v, _)| bits(&v)).collect();
        assert_eq!(before, after);
    }

    fn bits(value: &TypedValue) -> u64 {
        match value {
            TypedValue::Float64(f) => f.to_bits(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_indexes_serialize_to_nothing() {
        let primary = PrimaryKeyIndex::new();
        let bytes = primary.serialize().unwrap();
        assert!(bytes.is_empty());
        assert!(format_error(PrimaryKeyIndex::deserialize(&bytes)).is_recoverable());
        assert!(PrimaryKeyIndex::deserialize_or_empty(&bytes).unwrap().is_empty());

        let secondary = SecondaryValueIndex::new(DataKind::Bytes);
        let bytes = secondary.serialize().unwrap();
        assert!(format_error(SecondaryValueIndex::deserialize(&bytes)).is_recoverable());
        let restored = SecondaryValueIndex::deserialize_or_empty(DataKind::Bytes, &bytes).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.kind(), DataKind::Bytes);
    }

    #[test]
    fn truncated_final_record_is_reported() {
        let mut bytes = primary_with(10).serialize().unwrap();
        bytes.pop();
        match format_error(PrimaryKeyIndex::deserialize(&bytes)) {
            FormatError::TruncatedStream { needed, remaining } => {
                assert_eq!(needed, 9);
                assert_eq!(remaining, 8);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut bytes = secondary_with(10).serialize().unwrap();
        bytes.truncate(bytes.len() - 2);
        match format_error(SecondaryValueIndex::deserialize(&bytes)) {
            FormatError::TruncatedStream { .. } => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn negative_length_is_corrupt() {
        // A valid record followed by a length of -1.
        let bytes = vec![0x02, b'a', 0x01, b'b'];
        match format_error(PrimaryKeyIndex::deserialize(&bytes)) {
            FormatError::CorruptStream(_) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_secondary_streams_are_corrupt() {
        let mut zero_rows = RecordWriter::new(Vec::new());
        zero_rows.write_value(&TypedValue::Int32(1)).unwrap();
        zero_rows.write_count(0).unwrap();

        let mut mixed = RecordWriter::new(Vec::new());
        mixed.write_value(&TypedValue::Int32(1)).unwrap();
        mixed.write_count(1).unwrap();
        mixed.write_record(b"r1").unwrap();
        mixed.write_value(&TypedValue::Int64(2)).unwrap();
        mixed.write_count(1).unwrap();
        mixed.write_record(b"r2").unwrap();

        let mut repeated = RecordWriter::new(Vec::new());
        for row in &[b"r1", b"r2"] {
            repeated.write_value(&TypedValue::Int32(1)).unwrap();
            repeated.write_count(1).unwrap();
            repeated.write_record(*row).unwrap();
        }

        let mut negative_count = RecordWriter::new(Vec::new());
        negative_count.write_value(&TypedValue::Int32(1)).unwrap();
        let mut negative_count = negative_count.into_inner();
        negative_count.push(0x03);

        for bytes in vec![
            zero_rows.into_inner(),
            mixed.into_inner(),
            repeated.into_inner(),
            negative_count,
        ] {
            match format_error(SecondaryValueIndex::deserialize(&bytes)) {
                FormatError::CorruptStream(_) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn expected_kind_is_enforced() {
        let bytes = secondary_with(3).serialize().unwrap();
        match format_error(SecondaryValueIndex::deserialize_or_empty(DataKind::Int64, &bytes)) {
            FormatError::CorruptStream(_) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(SecondaryValueIndex::deserialize_or_empty(DataKind::Int32, &bytes).is_ok());
    }
}
