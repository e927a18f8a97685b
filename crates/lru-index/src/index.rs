//! Mutex-guarded LRU index

use crate::list::{EvictionList, NodeRef};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Upper bound on slots reserved up front; larger indexes grow on demand
const PREALLOCATE_LIMIT: usize = 1024;

struct Inner<K, V> {
    map: HashMap<K, NodeRef>,
    list: EvictionList<(K, V)>,
}

/// Fixed-capacity key/value index with least-recently-used eviction.
///
/// Every key in the map owns exactly one list node and every list node is
/// named by exactly one key. A single lock covers all operations, so
/// concurrent callers observe `set`, `get`, `remove` and `clear` in some
/// total order.
pub struct CacheIndex<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
}

impl<K, V> CacheIndex<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an index holding at most `capacity` entries (clamped to 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let reserve = capacity.min(PREALLOCATE_LIMIT);
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(reserve),
                list: EvictionList::with_capacity(reserve),
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace `key`, promoting it to most-recently used.
    ///
    /// Returns `true` when the key was already present. Inserting a new key
    /// into a full index evicts the least-recently-used entry first.
    pub fn set(&self, key: K, value: V) -> bool {
        let mut inner = self.lock();

        let existing = inner.map.get(&key).copied();
        let was_present = match existing {
            Some(node) => {
                inner.list.remove(node);
                true
            }
            None => {
                if inner.list.len() >= self.capacity {
                    inner.evict_back();
                }
                false
            }
        };

        let node = inner.list.push_front((key.clone(), value));
        inner.map.insert(key, node);
        was_present
    }

    /// Look up `key`, promoting it to most-recently used on a hit
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let node = inner.map.get(key).copied()?;
        inner.list.move_to_front(node);
        inner.list.get(node).map(|(_, value)| value.clone())
    }

    /// Drop `key` from the index, returning its value if it was present
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let node = inner.map.remove(key)?;
        inner.list.remove(node).map(|(_, value)| value)
    }

    /// Reset to an empty index; capacity is unchanged
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.list.clear();
    }

    /// Snapshot of keys from most- to least-recently used
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.lock().list.iter().map(|(key, _)| key.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // No operation leaves the map and list out of step across a panic
        // point, so a poisoned lock still guards a consistent index.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash,
{
    fn evict_back(&mut self) {
        let Some(back) = self.list.back() else {
            return;
        };
        if let Some((key, _)) = self.list.remove(back) {
            self.map.remove(&key);
            debug!(remaining = self.list.len(), "Evicted least-recently-used entry");
        }
    }
}
