use crate::codec::{decode_value, encode_value};
use crate::id::IdGenerator;
use crate::types::{resolve_type, DataKind, DataType, TypedValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The schema of a single column.
///
/// Columns are created with the builder methods and never change after:
///
/// ```rust
/// # use indexformat::{ColumnDescriptor, IdGenerator};
/// let ids = IdGenerator::new([1, 2, 3, 4, 5, 6]);
/// let name = ColumnDescriptor::new("name", "string", &ids)?
///     .length(100)
///     .indexed(&ids)?;
/// assert!(name.index_id().is_some());
/// # Ok::<(), indexformat::Error>(())
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    name: String,
    data_type: String,
    /// Only meaningful for strings. Zero means unbounded.
    #[serde(default)]
    max_length: usize,
    column_id: String,
    /// Present iff the column is indexed.
    #[serde(default)]
    index_id: Option<String>,
}

impl ColumnDescriptor {
    /// A non-indexed, unbounded column of the named type.
    pub fn new(name: &str, type_name: &str, ids: &IdGenerator) -> Result<Self> {
        resolve_type(type_name)?;
        Ok(ColumnDescriptor {
            name: name.to_owned(),
            data_type: type_name.to_owned(),
            max_length: 0,
            column_id: ids.generate_string()?,
            index_id: None,
        })
    }

    pub fn length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Mark the column as indexed, assigning it an index id.
    pub fn indexed(mut self, ids: &IdGenerator) -> Result<Self> {
        if self.index_id.is_none() {
            self.index_id = Some(ids.generate_string()?);
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    pub fn index_id(&self) -> Option<&str> {
        self.index_id.as_ref().map(String::as_str)
    }

    pub fn is_indexed(&self) -> bool {
        self.index_id.is_some()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Columns read from a schema file carry their type as a name, so it is
    /// resolved again here.
    pub fn data_type(&self) -> Result<DataType> {
        resolve_type(&self.data_type)
    }

    pub fn kind(&self) -> Result<DataKind> {
        Ok(self.data_type()?.kind)
    }

    /// Encode a value for this column.
    ///
    /// The value's kind must be the column's kind, with one exception:
    /// `bytes` columns also take an `Int64`, stored as its 8 little-endian
    /// bytes. Such a value decodes back as `Bytes`.
    pub fn encode(&self, value: &TypedValue) -> Result<Vec<u8>> {
        let kind = self.kind()?;
        match (kind, value) {
            (DataKind::Bytes, TypedValue::Int64(v)) => Ok(v.to_le_bytes().to_vec()),
            (DataKind::String, TypedValue::String(s)) => {
                self.check_length(s.len())?;
                Ok(encode_value(value))
            }
            _ if value.kind() == kind => Ok(encode_value(value)),
            _ => Err(Error::TypeMismatch {
                expected: kind,
                actual: value.kind(),
            }),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<TypedValue> {
        let kind = self.kind()?;
        if kind == DataKind::String {
            self.check_length(bytes.len())?;
        }
        decode_value(kind, bytes)
    }

    /// Check that `value` may be stored in this column, without encoding it.
    pub fn validate(&self, value: &TypedValue) -> Result<()> {
        self.encode(value).map(|_| ())
    }

    fn check_length(&self, len: usize) -> Result<()> {
        if self.max_length > 0 && len > self.max_length {
            return Err(Error::LengthExceeded {
                len,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

/// The schema of a table: its id and its columns.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub table_id: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: &str, columns: Vec<ColumnDescriptor>, ids: &IdGenerator) -> Result<Self> {
        Ok(TableDescriptor {
            name: name.to_owned(),
            table_id: ids.generate_string()?,
            columns,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_indexed())
    }

    /// The column indexed under `index_id`.
    pub fn index_column(&self, index_id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.index_id() == Some(index_id))
    }
}
