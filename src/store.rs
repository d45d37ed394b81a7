//! The durable store persisted indexes are written to.
use crate::Result;
use indexformat::DataKind;
use serde::{Deserialize, Serialize};
use sled::{Batch, Db};
use std::path::Path;

/// One write in a `WriteBatch`.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

/// Writes that become visible together or not at all.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { key, value });
    }

    pub fn remove(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Remove { key });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// A transactional key/value store.
pub trait Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Returns false if the key was not there.
    fn remove(&self, key: &[u8]) -> Result<bool>;
    /// All pairs whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
    /// Apply every write in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}

pub struct SledEngine {
    pub db: Db,
}

impl SledEngine {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(SledEngine {
            db: sled::open(path)?,
        })
    }
}

impl Engine for SledEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<bool> {
        let removed = self.db.remove(key)?.is_some();
        self.db.flush()?;
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut pairs = Vec::new();
        for pair in self.db.scan_prefix(prefix) {
            let (key, value) = pair?;
            pairs.push((key.to_vec(), value.to_vec()));
        }
        Ok(pairs)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        let mut sled_batch = Batch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => sled_batch.insert(key, value),
                BatchOp::Remove { key } => sled_batch.remove(key),
            }
        }
        self.db.apply_batch(sled_batch)?;
        self.db.flush()?;
        Ok(())
    }
}

pub(crate) const PRIMARY_PREFIX: &str = "primary/";
pub(crate) const SECONDARY_PREFIX: &str = "secondary/";
pub(crate) const MANIFEST_PREFIX: &str = "manifest/";

pub fn primary_key(table_id: &str) -> Vec<u8> {
    format!("{}{}", PRIMARY_PREFIX, table_id).into_bytes()
}

pub fn secondary_key(index_id: &str) -> Vec<u8> {
    format!("{}{}", SECONDARY_PREFIX, index_id).into_bytes()
}

pub fn manifest_key(table_id: &str) -> Vec<u8> {
    format!("{}{}", MANIFEST_PREFIX, table_id).into_bytes()
}

/// What was persisted for one table, so the blobs can be found again
/// without the schema.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Manifest {
    pub table_id: String,
    /// Id and value kind of every persisted secondary index.
    pub indexes: Vec<(String, DataKind)>,
}

impl Manifest {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Every manifest in the store.
    pub fn load_all(engine: &impl Engine) -> Result<Vec<Manifest>> {
        engine
            .scan_prefix(MANIFEST_PREFIX.as_bytes())?
            .iter()
            .map(|(_, value)| Manifest::from_bytes(value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn batch_applies_puts_and_removes() {
        let dir = TempDir::new().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        engine.put(b"stale", b"1").unwrap();

        let mut batch = WriteBatch::default();
        batch.put(b"a".to_vec(), b"x".to_vec());
        batch.put(b"b".to_vec(), Vec::new());
        batch.remove(b"stale".to_vec());
        assert_eq!(batch.len(), 3);
        engine.commit(batch).unwrap();

        assert_eq!(engine.get(b"a").unwrap(), Some(b"x".to_vec()));
        assert_eq!(engine.get(b"b").unwrap(), Some(Vec::new()));
        assert_eq!(engine.get(b"stale").unwrap(), None);
        assert!(!engine.remove(b"stale").unwrap());
    }

    #[test]
    fn manifests_are_found_by_prefix() {
        let dir = TempDir::new().unwrap();
        let engine = SledEngine::open(dir.path()).unwrap();
        let manifest = Manifest {
            table_id: "t1".to_owned(),
            indexes: vec![("i1".to_owned(), DataKind::String)],
        };
        engine
            .put(&manifest_key("t1"), &manifest.to_bytes().unwrap())
            .unwrap();
        engine.put(&primary_key("t1"), b"").unwrap();

        assert_eq!(Manifest::load_all(&engine).unwrap(), vec![manifest]);
    }
}
