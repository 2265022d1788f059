use std::sync::Arc;

use alloy::{
    primitives::{keccak256, B256},
    rlp::EMPTY_STRING_CODE,
};
use lazy_static::lazy_static;
use tracing::trace;

use crate::{
    db::KeyValueStore,
    error::TrieError,
    nibbles::{bytes_to_nibbles, common_prefix_len, nibbles_to_bytes},
    node::{empty_children, Children, Node, NodeRef},
};

lazy_static! {
    /// Root hash of a trie with no entries, `keccak256(rlp(""))`.
    pub static ref EMPTY_ROOT: B256 = keccak256([EMPTY_STRING_CODE]);
}

/// A Merkle-Patricia trie bound to a root hash in a shared [`KeyValueStore`].
///
/// Mutations write the new nodes to the store immediately and move the root. Old nodes are never
/// deleted, so any earlier root hash stays readable through [`Trie::open`].
///
/// ```
/// use std::sync::Arc;
/// use meridian_trie::{MemoryStore, Trie, EMPTY_ROOT};
///
/// let mut trie = Trie::new(Arc::new(MemoryStore::new()));
/// assert_eq!(trie.root_hash(), *EMPTY_ROOT);
///
/// trie.set(b"dog", b"puppy".to_vec()).expect("insert failed");
/// assert_eq!(trie.get(b"dog").expect("lookup failed"), Some(b"puppy".to_vec()));
/// assert_ne!(trie.root_hash(), *EMPTY_ROOT);
/// ```
#[derive(Clone, Debug)]
pub struct Trie {
    db: Arc<dyn KeyValueStore>,
    root: B256,
}

impl Trie {
    /// Creates an empty trie over `db`.
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db, root: *EMPTY_ROOT }
    }

    /// Opens the trie with the given root hash in `db`. Nodes are resolved lazily, so a missing
    /// root surfaces as [`TrieError::MissingNode`] on first access.
    pub fn open(db: Arc<dyn KeyValueStore>, root: B256) -> Self {
        Self { db, root }
    }

    /// Returns the root hash over the whole content of the trie.
    pub fn root_hash(&self) -> B256 {
        self.root
    }

    /// Returns true if the trie holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root == *EMPTY_ROOT
    }

    /// Returns the backing store.
    pub fn db(&self) -> &Arc<dyn KeyValueStore> {
        &self.db
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        let nibbles = bytes_to_nibbles(key);
        let mut path = nibbles.as_slice();
        let mut node_ref = self.root_ref();

        loop {
            let Some(node) = self.resolve(&node_ref)? else {
                return Ok(None);
            };
            match node {
                Node::Leaf { path: leaf_path, value } => {
                    return Ok((leaf_path == path).then_some(value));
                }
                Node::Extension { path: ext_path, child } => {
                    if !path.starts_with(&ext_path) {
                        return Ok(None);
                    }
                    path = &path[ext_path.len()..];
                    node_ref = child;
                }
                Node::Branch { mut children, value } => match path.split_first() {
                    None => return Ok(value),
                    Some((nibble, rest)) => {
                        node_ref = std::mem::take(&mut children[*nibble as usize]);
                        path = rest;
                    }
                },
            }
        }
    }

    /// Stores `value` under `key`. An empty value removes the key.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), TrieError> {
        if value.is_empty() {
            self.remove(key)?;
            return Ok(());
        }

        let root = self.insert_at(&self.root_ref(), &bytes_to_nibbles(key), value)?;
        self.root = self.commit(root)?;
        trace!(root = %self.root, "trie insert");
        Ok(())
    }

    /// Removes `key`, returning the value it held.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, TrieError> {
        match self.remove_at(&self.root_ref(), &bytes_to_nibbles(key))? {
            None => Ok(None),
            Some((root, removed)) => {
                self.root = self.commit(root)?;
                trace!(root = %self.root, "trie remove");
                Ok(Some(removed))
            }
        }
    }

    /// Walks the whole trie and returns every entry, ordered by key.
    pub fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TrieError> {
        let mut entries = Vec::new();
        self.collect(&self.root_ref(), &mut Vec::new(), &mut entries)?;
        Ok(entries)
    }

    fn root_ref(&self) -> NodeRef {
        if self.is_empty() {
            NodeRef::Empty
        } else {
            NodeRef::Hash(self.root)
        }
    }

    fn resolve(&self, node_ref: &NodeRef) -> Result<Option<Node>, TrieError> {
        match node_ref {
            NodeRef::Empty => Ok(None),
            NodeRef::Inline(raw) => Node::decode(raw).map(Some),
            NodeRef::Hash(hash) => {
                let raw =
                    self.db.try_get(hash.as_slice())?.ok_or(TrieError::MissingNode(*hash))?;
                Node::decode(&raw).map(Some)
            }
        }
    }

    /// Encodes `node`, storing it under its hash unless it is small enough to be inlined.
    fn reference(&self, node: Node) -> Result<NodeRef, TrieError> {
        let encoded = node.encode();
        if encoded.len() < 32 {
            return Ok(NodeRef::Inline(encoded));
        }
        let hash = keccak256(&encoded);
        self.db.set(hash.to_vec(), encoded)?;
        Ok(NodeRef::Hash(hash))
    }

    /// The root is always hashed and stored, even when its encoding is short.
    fn commit(&self, root: NodeRef) -> Result<B256, TrieError> {
        match root {
            NodeRef::Empty => Ok(*EMPTY_ROOT),
            NodeRef::Hash(hash) => Ok(hash),
            NodeRef::Inline(raw) => {
                let hash = keccak256(&raw);
                self.db.set(hash.to_vec(), raw)?;
                Ok(hash)
            }
        }
    }

    fn insert_at(
        &self,
        node_ref: &NodeRef,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<NodeRef, TrieError> {
        let node = match self.resolve(node_ref)? {
            None => Node::Leaf { path: path.to_vec(), value },
            Some(Node::Leaf { path: leaf_path, value: leaf_value }) => {
                if leaf_path == path {
                    Node::Leaf { path: leaf_path, value }
                } else {
                    let common = common_prefix_len(&leaf_path, path);
                    let mut children = empty_children();
                    let mut branch_value = None;
                    self.place(&mut children, &mut branch_value, &leaf_path[common..], leaf_value)?;
                    self.place(&mut children, &mut branch_value, &path[common..], value)?;
                    let branch = Node::Branch { children, value: branch_value };
                    self.with_prefix(&path[..common], branch)?
                }
            }
            Some(Node::Extension { path: ext_path, child }) => {
                let common = common_prefix_len(&ext_path, path);
                if common == ext_path.len() {
                    let child = self.insert_at(&child, &path[common..], value)?;
                    Node::Extension { path: ext_path, child }
                } else {
                    let mut children = empty_children();
                    let mut branch_value = None;

                    // the extension is split at the first diverging nibble
                    let rest = &ext_path[common..];
                    children[rest[0] as usize] = if rest.len() == 1 {
                        child
                    } else {
                        self.reference(Node::Extension { path: rest[1..].to_vec(), child })?
                    };
                    self.place(&mut children, &mut branch_value, &path[common..], value)?;
                    let branch = Node::Branch { children, value: branch_value };
                    self.with_prefix(&path[..common], branch)?
                }
            }
            Some(Node::Branch { mut children, value: branch_value }) => match path.split_first() {
                None => Node::Branch { children, value: Some(value) },
                Some((nibble, rest)) => {
                    let index = *nibble as usize;
                    children[index] = self.insert_at(&children[index], rest, value)?;
                    Node::Branch { children, value: branch_value }
                }
            },
        };
        self.reference(node)
    }

    /// Places a value below a fresh branch: in the branch itself when the path is exhausted,
    /// otherwise in a leaf under the first nibble.
    fn place(
        &self,
        children: &mut Children,
        branch_value: &mut Option<Vec<u8>>,
        path: &[u8],
        value: Vec<u8>,
    ) -> Result<(), TrieError> {
        match path.split_first() {
            None => *branch_value = Some(value),
            Some((nibble, rest)) => {
                children[*nibble as usize] =
                    self.reference(Node::Leaf { path: rest.to_vec(), value })?;
            }
        }
        Ok(())
    }

    fn with_prefix(&self, prefix: &[u8], branch: Node) -> Result<Node, TrieError> {
        if prefix.is_empty() {
            return Ok(branch);
        }
        Ok(Node::Extension { path: prefix.to_vec(), child: self.reference(branch)? })
    }

    /// Returns `None` if the key is absent, otherwise the new node reference and the removed value.
    fn remove_at(
        &self,
        node_ref: &NodeRef,
        path: &[u8],
    ) -> Result<Option<(NodeRef, Vec<u8>)>, TrieError> {
        match self.resolve(node_ref)? {
            None => Ok(None),
            Some(Node::Leaf { path: leaf_path, value }) => {
                Ok((leaf_path == path).then_some((NodeRef::Empty, value)))
            }
            Some(Node::Extension { path: ext_path, child }) => {
                if !path.starts_with(&ext_path) {
                    return Ok(None);
                }
                let Some((child, removed)) = self.remove_at(&child, &path[ext_path.len()..])?
                else {
                    return Ok(None);
                };
                Ok(Some((self.join(ext_path, child)?, removed)))
            }
            Some(Node::Branch { mut children, value }) => {
                let (value, removed) = match path.split_first() {
                    None => match value {
                        Some(removed) => (None, removed),
                        None => return Ok(None),
                    },
                    Some((nibble, rest)) => {
                        let index = *nibble as usize;
                        let Some((child, removed)) = self.remove_at(&children[index], rest)? else {
                            return Ok(None);
                        };
                        children[index] = child;
                        (value, removed)
                    }
                };
                Ok(Some((self.collapse(children, value)?, removed)))
            }
        }
    }

    /// Prepends `prefix` to the node behind `child`, merging short nodes into one.
    fn join(&self, mut prefix: Vec<u8>, child: NodeRef) -> Result<NodeRef, TrieError> {
        let node = match self.resolve(&child)? {
            None => return Ok(NodeRef::Empty),
            Some(Node::Leaf { path, value }) => {
                prefix.extend(path);
                Node::Leaf { path: prefix, value }
            }
            Some(Node::Extension { path, child }) => {
                prefix.extend(path);
                Node::Extension { path: prefix, child }
            }
            Some(Node::Branch { .. }) => Node::Extension { path: prefix, child },
        };
        self.reference(node)
    }

    /// Normalizes a branch after a removal: a branch left with only a value becomes a leaf, one
    /// left with a single child is merged into it.
    fn collapse(&self, children: Children, value: Option<Vec<u8>>) -> Result<NodeRef, TrieError> {
        let occupied = children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.is_empty())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        match (occupied.as_slice(), value) {
            ([], None) => Err(TrieError::InconsistentTree("branch node with no entries")),
            ([], Some(value)) => self.reference(Node::Leaf { path: Vec::new(), value }),
            ([index], None) => {
                let child = children[*index].clone();
                self.join(vec![*index as u8], child)
            }
            (_, value) => self.reference(Node::Branch { children, value }),
        }
    }

    fn collect(
        &self,
        node_ref: &NodeRef,
        prefix: &mut Vec<u8>,
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), TrieError> {
        match self.resolve(node_ref)? {
            None => {}
            Some(Node::Leaf { path, value }) => {
                let len = prefix.len();
                prefix.extend(path);
                out.push((nibbles_to_bytes(prefix)?, value));
                prefix.truncate(len);
            }
            Some(Node::Extension { path, child }) => {
                let len = prefix.len();
                prefix.extend(path);
                self.collect(&child, prefix, out)?;
                prefix.truncate(len);
            }
            Some(Node::Branch { children, value }) => {
                if let Some(value) = value {
                    out.push((nibbles_to_bytes(prefix)?, value));
                }
                for (nibble, child) in children.iter().enumerate() {
                    prefix.push(nibble as u8);
                    self.collect(child, prefix, out)?;
                    prefix.pop();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn trie() -> Trie {
        Trie::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_overwrite_value() {
        let mut trie = trie();
        trie.set(b"key", b"one".to_vec()).expect("insert failed");
        let first_root = trie.root_hash();
        trie.set(b"key", b"two".to_vec()).expect("insert failed");
        assert_ne!(trie.root_hash(), first_root);
        assert_eq!(trie.get(b"key").expect("lookup failed"), Some(b"two".to_vec()));
    }

    #[test]
    fn test_prefix_keys_use_branch_values() {
        let mut trie = trie();
        trie.set(b"do", b"verb".to_vec()).expect("insert failed");
        trie.set(b"dog", b"puppy".to_vec()).expect("insert failed");
        trie.set(b"d", b"letter".to_vec()).expect("insert failed");

        assert_eq!(trie.get(b"do").expect("lookup failed"), Some(b"verb".to_vec()));
        assert_eq!(trie.get(b"dog").expect("lookup failed"), Some(b"puppy".to_vec()));
        assert_eq!(trie.get(b"d").expect("lookup failed"), Some(b"letter".to_vec()));
        assert_eq!(trie.get(b"dogs").expect("lookup failed"), None);
        assert_eq!(trie.get(b"").expect("lookup failed"), None);
    }

    #[test]
    fn test_remove_collapses_to_previous_root() {
        let mut trie = trie();
        trie.set(b"doe", b"reindeer".to_vec()).expect("insert failed");
        let root = trie.root_hash();

        trie.set(b"dog", b"puppy".to_vec()).expect("insert failed");
        assert_eq!(trie.remove(b"dog").expect("remove failed"), Some(b"puppy".to_vec()));
        assert_eq!(trie.root_hash(), root);

        assert_eq!(trie.remove(b"dog").expect("remove failed"), None);
        assert_eq!(trie.remove(b"doe").expect("remove failed"), Some(b"reindeer".to_vec()));
        assert!(trie.is_empty());
    }

    #[test]
    fn test_empty_value_removes() {
        let mut trie = trie();
        trie.set(b"a", b"1".to_vec()).expect("insert failed");
        trie.set(b"a", Vec::new()).expect("insert failed");
        assert_eq!(trie.root_hash(), *EMPTY_ROOT);
    }

    #[test]
    fn test_open_previous_root() {
        let mut trie = trie();
        trie.set(b"horse", b"stallion".to_vec()).expect("insert failed");
        let root = trie.root_hash();
        trie.set(b"horse", b"mare".to_vec()).expect("insert failed");

        let old = Trie::open(trie.db().clone(), root);
        assert_eq!(old.get(b"horse").expect("lookup failed"), Some(b"stallion".to_vec()));
    }

    #[test]
    fn test_open_unknown_root() {
        let trie = Trie::open(Arc::new(MemoryStore::new()), B256::repeat_byte(0x42));
        assert!(matches!(trie.get(b"x"), Err(TrieError::MissingNode(_))));
    }

    #[test]
    fn test_entries_sorted() {
        let mut trie = trie();
        for key in [&b"b"[..], b"a", b"ab", b"ba"] {
            trie.set(key, key.to_vec()).expect("insert failed");
        }
        let keys = trie
            .entries()
            .expect("walk failed")
            .into_iter()
            .map(|(key, _)| key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![b"a".to_vec(), b"ab".to_vec(), b"b".to_vec(), b"ba".to_vec()]);
    }
}
