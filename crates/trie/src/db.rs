use std::{fmt::Debug, sync::RwLock};

use hashbrown::HashMap;

use crate::error::TrieError;

/// A byte-keyed store backing one or more tries.
///
/// All methods take `&self` so a single store can be shared between tries, snapshots and threads.
/// Implementations serialize writers internally.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns true if the store holds a value for `key`.
    fn contains(&self, key: &[u8]) -> Result<bool, TrieError>;

    /// Returns the value stored under `key`, if any.
    fn try_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError>;

    /// Removes the value stored under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &[u8]) -> Result<(), TrieError>;
}

/// An in-memory [`KeyValueStore`] guarded by a [`RwLock`].
///
/// ```
/// use meridian_trie::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set(b"key".to_vec(), b"value".to_vec()).expect("store is not poisoned");
/// assert_eq!(store.try_get(b"key").expect("store is not poisoned"), Some(b"value".to_vec()));
/// assert!(!store.contains(b"other").expect("store is not poisoned"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or_default()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn contains(&self, key: &[u8]) -> Result<bool, TrieError> {
        Ok(self.inner.read().map_err(|_| TrieError::LockError)?.contains_key(key))
    }

    fn try_get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(self.inner.read().map_err(|_| TrieError::LockError)?.get(key).cloned())
    }

    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError> {
        self.inner.write().map_err(|_| TrieError::LockError)?.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<(), TrieError> {
        self.inner.write().map_err(|_| TrieError::LockError)?.remove(key);
        Ok(())
    }
}
