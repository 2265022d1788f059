//! Error types for trie operations

use alloy::primitives::B256;

/// Errors raised while reading or mutating a trie.
#[derive(Debug, thiserror::Error)]
pub enum TrieError {
    /// The stored nodes do not form a valid trie.
    #[error("inconsistent trie structure: {0}")]
    InconsistentTree(&'static str),

    /// A node could not be decoded from its RLP encoding.
    #[error("rlp error: {0}")]
    Rlp(#[from] alloy::rlp::Error),

    /// A hashed key has no recorded preimage.
    #[error("missing preimage for hashed key {0}")]
    MissingPreimage(B256),

    /// A node referenced by hash is not present in the backing store.
    #[error("missing trie node {0}")]
    MissingNode(B256),

    /// A thread panicked while holding the store lock.
    #[error("lock error: the backing store lock is poisoned")]
    LockError,
}
