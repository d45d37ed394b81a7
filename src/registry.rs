use metrohash::MetroHash64;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

const METROHASH_SEED: u64 = 0x385f_829f_0031_3111;

/// Maps ids to shared structures, split into independently locked shards.
///
/// Looking up or creating an entry only locks the shard its id hashes to, so
/// work on unrelated tables never queues behind one lock.
pub struct Registry<V> {
    shards: Vec<RwLock<HashMap<String, Arc<V>>>>,
}

impl<V> Registry<V> {
    pub fn new(shards: usize) -> Self {
        Registry {
            shards: (0..shards.max(1)).map(|_| RwLock::default()).collect(),
        }
    }

    fn shard(&self, id: &str) -> &RwLock<HashMap<String, Arc<V>>> {
        let mut hasher = MetroHash64::with_seed(METROHASH_SEED);
        id.hash(&mut hasher);
        let index = hasher.finish() % self.shards.len() as u64;
        &self.shards[index as usize]
    }

    pub fn get(&self, id: &str) -> Option<Arc<V>> {
        let shard = self.shard(id).read().unwrap_or_else(PoisonError::into_inner);
        shard.get(id).cloned()
    }

    /// Get the entry for `id`, creating it with `create` if there is none.
    ///
    /// Returns the entry and whether this call created it. When two callers
    /// race, exactly one of them creates the entry and both get the same one.
    pub fn get_or_create<F>(&self, id: &str, create: F) -> (Arc<V>, bool)
    where
        F: FnOnce() -> V,
    {
        if let Some(existing) = self.get(id) {
            return (existing, false);
        }
        let mut shard = self.shard(id).write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = shard.get(id) {
            return (Arc::clone(existing), false);
        }
        let created = Arc::new(create());
        shard.insert(id.to_owned(), Arc::clone(&created));
        (created, true)
    }

    /// Put `value` under `id`, returning what was there before.
    pub fn replace(&self, id: &str, value: V) -> Option<Arc<V>> {
        let mut shard = self.shard(id).write().unwrap_or_else(PoisonError::into_inner);
        shard.insert(id.to_owned(), Arc::new(value))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<V>> {
        let mut shard = self.shard(id).write().unwrap_or_else(PoisonError::into_inner);
        shard.remove(id)
    }

    /// All ids currently registered, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|shard| {
                let shard = shard.read().unwrap_or_else(PoisonError::into_inner);
                let ids: Vec<String> = shard.keys().cloned().collect();
                ids
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
