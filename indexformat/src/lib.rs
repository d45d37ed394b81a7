//! The binary layer of babydb's indexes.
//!
//! Column values are typed, and every type has one fixed binary form:
//! fixed-width numbers are little-endian, strings and byte strings are
//! written raw. Index contents are persisted as a flat stream of
//! varint-length-prefixed records, read back with `RecordReader` and written
//! with `RecordWriter`.

#[macro_use]
extern crate log;

mod codec;
mod column;
mod error;
mod id;
mod ordering;
mod reader;
mod types;
pub mod varint;
mod writer;

pub use codec::{decode_value, encode_value};
pub use column::{ColumnDescriptor, TableDescriptor};
pub use error::{Error, Result};
pub use id::IdGenerator;
pub use ordering::{byte_cmp, byte_less, value_cmp, value_less};
pub use reader::RecordReader;
pub use types::{resolve_type, DataKind, DataType, TypedValue, REGISTRY};
pub use writer::RecordWriter;
