//! Merkle-Patricia trie implementation for the meridian world state.
//!
//! Tries are stored in a [`KeyValueStore`]: every node whose RLP encoding is at least 32 bytes long
//! is written under its keccak hash, smaller nodes are inlined into their parent. The root node is
//! always stored under the root hash, so a trie can be reopened from nothing but the store and a
//! root with [`Trie::open`].

/// Key-value store abstraction and the in-memory implementation.
pub mod db;

/// Error types for trie operations.
pub mod error;

/// Nibble path helpers and hex-prefix encoding.
pub mod nibbles;

/// Trie nodes and their RLP encoding.
pub mod node;

mod rlp;

/// Secure trie, keyed by `keccak256(key)`.
pub mod secure;

/// The Merkle-Patricia trie.
pub mod trie;

pub use db::{KeyValueStore, MemoryStore};
pub use error::TrieError;
pub use secure::SecureTrie;
pub use trie::{Trie, EMPTY_ROOT};
