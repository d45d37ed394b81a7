//! In-memory ordered indexes.
//!
//! Each index sits behind its own `RwLock`: lookups and scans of one index
//! run side by side, mutations of it run alone, and different indexes never
//! wait on each other.

mod primary;
pub(crate) mod secondary;

pub use primary::PrimaryKeyIndex;
pub use secondary::SecondaryValueIndex;

use indexformat::byte_cmp;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An opaque row identifier.
///
/// Cheap to clone: the primary index and every posting list a row appears in
/// share the same bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RowId(Arc<[u8]>);

impl RowId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Ord for RowId {
    fn cmp(&self, other: &Self) -> Ordering {
        byte_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for RowId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<[u8]> for RowId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RowId {
    fn from(bytes: Vec<u8>) -> Self {
        RowId(bytes.into())
    }
}

impl From<&[u8]> for RowId {
    fn from(bytes: &[u8]) -> Self {
        RowId(bytes.into())
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId::from(s.as_bytes())
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "RowId({:?})", s),
            Err(_) => write!(f, "RowId({:02x?})", &self.0[..]),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_ids_sort_by_bytes() {
        let mut ids: Vec<RowId> = vec!["b".into(), "ab".into(), "a".into(), "".into()];
        ids.sort();
        let sorted: Vec<Vec<u8>> = ids.iter().map(|id| id.as_bytes().to_vec()).collect();
        assert_eq!(
            sorted,
            vec![b"".to_vec(), b"a".to_vec(), b"ab".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn clones_share_bytes() {
        let id = RowId::from(vec![1, 2, 3]);
        let copy = id.clone();
        assert!(std::ptr::eq(id.as_bytes(), copy.as_bytes()));
        assert_eq!(id.to_string(), "010203");
    }
}
