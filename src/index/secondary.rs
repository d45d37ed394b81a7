use super::RowId;
use crate::Result;
use indexformat::{value_cmp, DataKind, Error as FormatError, TypedValue};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// A value as a tree key.
///
/// An index only ever holds values of its own kind, so comparing two keys
/// never fails in practice. Should it happen anyway, keys fall back to being
/// ordered by kind, which still gives the tree a total order.
#[derive(Debug, Clone)]
pub(crate) struct IndexKey(pub(crate) TypedValue);

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        value_cmp(&self.0, &other.0).unwrap_or_else(|_| self.0.kind().cmp(&other.0.kind()))
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

pub(crate) type Postings = BTreeMap<IndexKey, Vec<RowId>>;

/// A non-unique index over one column: every distinct value maps to the
/// rows holding it, in the order they were added.
pub struct SecondaryValueIndex {
    kind: DataKind,
    entries: RwLock<Postings>,
}

impl SecondaryValueIndex {
    pub fn new(kind: DataKind) -> Self {
        SecondaryValueIndex::from_entries(kind, BTreeMap::new())
    }

    pub(crate) fn from_entries(kind: DataKind, entries: Postings) -> Self {
        SecondaryValueIndex {
            kind,
            entries: RwLock::new(entries),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Postings> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The kind of every value in this index.
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    fn check_kind(&self, value: &TypedValue) -> Result<()> {
        if value.kind() != self.kind {
            return Err(FormatError::TypeMismatch {
                expected: self.kind,
                actual: value.kind(),
            }
            .into());
        }
        Ok(())
    }

    /// Add `row` to the rows holding `value`.
    pub fn insert(&self, value: TypedValue, row: RowId) -> Result<()> {
        self.check_kind(&value)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(IndexKey(value)).or_insert_with(Vec::new).push(row);
        Ok(())
    }

    /// Remove one occurrence of `row` from the rows holding `value`, dropping
    /// the value once no rows are left. Returns whether anything was removed.
    pub fn delete(&self, value: &TypedValue, row: &RowId) -> Result<bool> {
        self.check_kind(value)?;
        let key = IndexKey(value.clone());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let rows = match entries.get_mut(&key) {
            Some(rows) => rows,
            None => return Ok(false),
        };
        let position = match rows.iter().position(|r| r == row) {
            Some(position) => position,
            None => return Ok(false),
        };
        rows.remove(position);
        if rows.is_empty() {
            entries.remove(&key);
        }
        Ok(true)
    }

    /// The rows holding exactly `value`, in insertion order.
    pub fn lookup(&self, value: &TypedValue) -> Result<Vec<RowId>> {
        self.check_kind(value)?;
        let entries = self.read();
        Ok(entries
            .get(&IndexKey(value.clone()))
            .cloned()
            .unwrap_or_default())
    }

    /// Every value with its rows, in value order, as of this call.
    pub fn ascend(&self) -> std::vec::IntoIter<(TypedValue, Vec<RowId>)> {
        let snapshot: Vec<(TypedValue, Vec<RowId>)> = self
            .read()
            .iter()
            .map(|(key, rows)| (key.0.clone(), rows.clone()))
            .collect();
        snapshot.into_iter()
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of (value, row) pairs.
    pub fn posting_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn name(s: &str) -> TypedValue {
        TypedValue::String(s.to_owned())
    }

    #[test]
    fn rows_sharing_a_value_keep_insertion_order() {
        let index = SecondaryValueIndex::new(DataKind::String);
        index.insert(name("alice"), "r1".into()).unwrap();
        index.insert(name("bob"), "r3".into()).unwrap();
        index.insert(name("alice"), "r2".into()).unwrap();

        let rows = index.lookup(&name("alice")).unwrap();
        assert_eq!(rows, vec![RowId::from("r1"), RowId::from("r2")]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.posting_count(), 3);
    }

    #[test]
    fn entry_disappears_with_its_last_row() {
        let index = SecondaryValueIndex::new(DataKind::String);
        index.insert(name("v"), "r1".into()).unwrap();
        index.insert(name("v"), "r2".into()).unwrap();

        assert!(index.delete(&name("v"), &"r1".into()).unwrap());
        assert_eq!(index.lookup(&name("v")).unwrap(), vec![RowId::from("r2")]);

        assert!(index.delete(&name("v"), &"r2".into()).unwrap());
        assert!(index.lookup(&name("v")).unwrap().is_empty());
        assert!(index.is_empty());

        assert!(!index.delete(&name("v"), &"r2".into()).unwrap());
    }

    #[test]
    fn deleting_an_absent_row_keeps_the_entry() {
        let index = SecondaryValueIndex::new(DataKind::Int32);
        index.insert(TypedValue::Int32(1), "r1".into()).unwrap();
        assert!(!index.delete(&TypedValue::Int32(1), &"r9".into()).unwrap());
        assert_eq!(index.lookup(&TypedValue::Int32(1)).unwrap().len(), 1);
    }

    #[test]
    fn ascends_in_value_order() {
        let index = SecondaryValueIndex::new(DataKind::Int64);
        for (v, row) in &[(30, "c"), (-5, "a"), (12, "b"), (-5, "d")] {
            index.insert(TypedValue::Int64(*v), (*row).into()).unwrap();
        }
        let values: Vec<TypedValue> = index.ascend().map(|(v, _)| v).collect();
        assert_eq!(
            values,
            vec![TypedValue::Int64(-5), TypedValue::Int64(12), TypedValue::Int64(30)]
        );
        let (_, first_rows) = index.ascend().next().unwrap();
        assert_eq!(first_rows, vec![RowId::from("a"), RowId::from("d")]);
    }

    #[test]
    fn signed_zeros_share_one_entry() {
        let index = SecondaryValueIndex::new(DataKind::Float64);
        index.insert(TypedValue::Float64(-0.0), "r1".into()).unwrap();
        index.insert(TypedValue::Float64(0.0), "r2".into()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.lookup(&TypedValue::Float64(0.0)).unwrap(),
            vec![RowId::from("r1"), RowId::from("r2")]
        );
        assert!(index.delete(&TypedValue::Float64(0.0), &"r1".into()).unwrap());
        assert_eq!(
            index.lookup(&TypedValue::Float64(-0.0)).unwrap(),
            vec![RowId::from("r2")]
        );
    }

    #[test]
    fn other_kinds_are_rejected_without_changes() {
        let index = SecondaryValueIndex::new(DataKind::Int32);
        match index.insert(TypedValue::Int64(1), "r".into()) {
            Err(Error::Format(FormatError::TypeMismatch { expected, actual })) => {
                assert_eq!(expected, DataKind::Int32);
                assert_eq!(actual, DataKind::Int64);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(index.is_empty());
        assert!(index.lookup(&name("x")).is_err());
        assert!(index.delete(&name("x"), &"r".into()).is_err());
    }
}
