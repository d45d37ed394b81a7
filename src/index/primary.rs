use super::RowId;
use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// The ordered set of row ids of one table.
#[derive(Default)]
pub struct PrimaryKeyIndex {
    rows: RwLock<BTreeSet<RowId>>,
}

impl PrimaryKeyIndex {
    pub fn new() -> Self {
        PrimaryKeyIndex::default()
    }

    pub(crate) fn from_rows(rows: BTreeSet<RowId>) -> Self {
        PrimaryKeyIndex {
            rows: RwLock::new(rows),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, BTreeSet<RowId>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a row. Returns false if it was already there.
    pub fn insert(&self, row: RowId) -> bool {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.insert(row)
    }

    /// Remove a row. Returns false if it wasn't there.
    pub fn delete(&self, row: &RowId) -> bool {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.remove(row)
    }

    pub fn contains(&self, row: &RowId) -> bool {
        self.read().contains(row)
    }

    /// The rows in byte order, as of this call.
    ///
    /// Later inserts and deletes do not show up in the returned iterator;
    /// call again to see them.
    pub fn ascend(&self) -> std::vec::IntoIter<RowId> {
        let snapshot: Vec<RowId> = self.read().iter().cloned().collect();
        snapshot.into_iter()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let index = PrimaryKeyIndex::new();
        assert!(index.insert("row".into()));
        assert!(!index.insert("row".into()));
        assert_eq!(index.ascend().collect::<Vec<_>>(), vec![RowId::from("row")]);
    }

    #[test]
    fn delete_removes_only_that_row() {
        let index = PrimaryKeyIndex::new();
        index.insert("a".into());
        index.insert("b".into());
        assert!(index.delete(&"a".into()));
        assert!(!index.delete(&"a".into()));
        assert!(!index.delete(&"never".into()));
        assert!(!index.contains(&"a".into()));
        assert_eq!(index.ascend().collect::<Vec<_>>(), vec![RowId::from("b")]);
    }

    #[test]
    fn ascends_in_byte_order() {
        let index = PrimaryKeyIndex::new();
        for id in &["zz", "a", "ab", "b", "aa"] {
            index.insert((*id).into());
        }
        let rows: Vec<RowId> = index.ascend().collect();
        let expected: Vec<RowId> = vec!["a".into(), "aa".into(), "ab".into(), "b".into(), "zz".into()];
        assert_eq!(rows, expected);
    }

    #[test]
    fn ascend_is_a_snapshot() {
        let index = PrimaryKeyIndex::new();
        index.insert("a".into());
        let iter = index.ascend();
        index.insert("b".into());
        index.delete(&"a".into());
        assert_eq!(iter.collect::<Vec<_>>(), vec![RowId::from("a")]);
        assert_eq!(index.ascend().collect::<Vec<_>>(), vec![RowId::from("b")]);
    }
}
