use std::{collections::BTreeMap, sync::Arc};

use alloy::primitives::{keccak256, B256};

use crate::{db::KeyValueStore, error::TrieError, trie::Trie};

const PREIMAGE_PREFIX: &[u8] = b"secure-key-";

/// A [`Trie`] keyed by `keccak256(key)`.
///
/// Every [`SecureTrie::set`] also records the `hash -> key` preimage in the backing store so the
/// original keys can be recovered with [`SecureTrie::to_dictionary`].
///
/// ```
/// use std::sync::Arc;
/// use meridian_trie::{MemoryStore, SecureTrie};
///
/// let mut trie = SecureTrie::new(Arc::new(MemoryStore::new()));
/// trie.set(b"alice", b"100".to_vec()).expect("insert failed");
///
/// let dictionary = trie.to_dictionary().expect("all preimages are recorded");
/// assert_eq!(dictionary.get(&b"alice".to_vec()), Some(&b"100".to_vec()));
/// ```
#[derive(Clone, Debug)]
pub struct SecureTrie {
    trie: Trie,
}

impl SecureTrie {
    /// Creates an empty secure trie over `db`.
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { trie: Trie::new(db) }
    }

    /// Opens the secure trie with the given root hash in `db`.
    pub fn open(db: Arc<dyn KeyValueStore>, root: B256) -> Self {
        Self { trie: Trie::open(db, root) }
    }

    /// Returns the store key under which the preimage of `hash` is recorded.
    pub fn preimage_key(hash: B256) -> Vec<u8> {
        [PREIMAGE_PREFIX, hash.as_slice()].concat()
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        self.trie.get(keccak256(key).as_slice())
    }

    /// Stores `value` under `key` and records the preimage of the hashed key.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), TrieError> {
        let hashed = keccak256(key);
        self.trie.db().set(Self::preimage_key(hashed), key.to_vec())?;
        self.trie.set(hashed.as_slice(), value)
    }

    /// Removes `key`, returning the value it held.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        self.trie.remove(keccak256(key).as_slice())
    }

    /// Returns the root hash of the underlying trie.
    pub fn root_hash(&self) -> B256 {
        self.trie.root_hash()
    }

    /// Returns the underlying trie.
    pub fn inner(&self) -> &Trie {
        &self.trie
    }

    /// Returns every entry keyed by its original key.
    pub fn to_dictionary(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, TrieError> {
        self.trie
            .entries()?
            .into_iter()
            .map(|(hashed, value)| {
                let hash = B256::try_from(hashed.as_slice())
                    .map_err(|_| TrieError::InconsistentTree("secure trie key is not a hash"))?;
                let key = self
                    .trie
                    .db()
                    .try_get(&Self::preimage_key(hash))?
                    .ok_or(TrieError::MissingPreimage(hash))?;
                Ok((key, value))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_get_after_set_and_remove() {
        let mut trie = SecureTrie::new(Arc::new(MemoryStore::new()));
        trie.set(b"key", b"value".to_vec()).expect("insert failed");
        assert_eq!(trie.get(b"key").expect("lookup failed"), Some(b"value".to_vec()));
        assert_eq!(trie.inner().get(b"key").expect("lookup failed"), None);

        trie.remove(b"key").expect("remove failed");
        assert_eq!(trie.get(b"key").expect("lookup failed"), None);
    }

    #[test]
    fn test_missing_preimage() {
        let db: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut trie = SecureTrie::new(db.clone());
        trie.set(b"key", b"value".to_vec()).expect("insert failed");

        let hash = keccak256(b"key");
        db.remove(&SecureTrie::preimage_key(hash)).expect("remove failed");

        match trie.to_dictionary() {
            Err(TrieError::MissingPreimage(missing)) => assert_eq!(missing, hash),
            other => panic!("expected a missing preimage, got {other:?}"),
        }
    }
}
