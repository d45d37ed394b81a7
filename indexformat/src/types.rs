//! The registry of value kinds and the values themselves.
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of value a column can hold.
///
/// The discriminant doubles as the type tag written in front of each value
/// in a persisted secondary index, so it must never be reordered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Int32 = 0,
    Int64 = 1,
    Float32 = 2,
    Float64 = 3,
    String = 4,
    Bytes = 5,
    Timestamp = 6,
}

impl DataKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        REGISTRY
            .iter()
            .map(|t| t.kind)
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| Error::CorruptStream(format!("unknown type tag {}", tag)))
    }

    pub fn name(self) -> &'static str {
        REGISTRY[self as usize].name
    }

    /// The encoded width for fixed-width kinds, `None` for strings and bytes.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataKind::Int32 | DataKind::Float32 => Some(4),
            DataKind::Int64 | DataKind::Float64 | DataKind::Timestamp => Some(8),
            DataKind::String | DataKind::Bytes => None,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataType {
    pub kind: DataKind,
    pub name: &'static str,
}

/// All supported types, indexed by their tag.
pub const REGISTRY: [DataType; 7] = [
    DataType { kind: DataKind::Int32, name: "int32" },
    DataType { kind: DataKind::Int64, name: "int64" },
    DataType { kind: DataKind::Float32, name: "float32" },
    DataType { kind: DataKind::Float64, name: "float64" },
    DataType { kind: DataKind::String, name: "string" },
    DataType { kind: DataKind::Bytes, name: "bytes" },
    DataType { kind: DataKind::Timestamp, name: "timestamp" },
];

/// Look up a type by its registered name.
pub fn resolve_type(name: &str) -> Result<DataType> {
    REGISTRY
        .iter()
        .find(|t| t.name == name)
        .copied()
        .ok_or_else(|| Error::UnknownType(name.to_owned()))
}

/// A single column value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Stored exactly like an `Int64`.
    Timestamp(i64),
}

impl TypedValue {
    pub fn kind(&self) -> DataKind {
        match self {
            TypedValue::Int32(_) => DataKind::Int32,
            TypedValue::Int64(_) => DataKind::Int64,
            TypedValue::Float32(_) => DataKind::Float32,
            TypedValue::Float64(_) => DataKind::Float64,
            TypedValue::String(_) => DataKind::String,
            TypedValue::Bytes(_) => DataKind::Bytes,
            TypedValue::Timestamp(_) => DataKind::Timestamp,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::String(s.to_owned())
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypedValue::Int32(v) => write!(f, "{}", v),
            TypedValue::Int64(v) => write!(f, "{}", v),
            TypedValue::Float32(v) => write!(f, "{}", v),
            TypedValue::Float64(v) => write!(f, "{}", v),
            TypedValue::String(s) => write!(f, "{:?}", s),
            TypedValue::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            TypedValue::Timestamp(v) => write!(f, "@{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_registered_name() {
        for t in REGISTRY.iter() {
            assert_eq!(resolve_type(t.name).unwrap(), *t);
            assert_eq!(DataKind::from_tag(t.kind.tag()).unwrap(), t.kind);
        }
    }

    #[test]
    fn rejects_unknown_names_and_tags() {
        match resolve_type("Int32") {
            Err(Error::UnknownType(name)) => assert_eq!(name, "Int32"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(DataKind::from_tag(7).is_err());
    }
}
