use alloy::primitives::B256;

use crate::{
    error::TrieError,
    nibbles::{decode_compact, encode_compact},
    rlp::{decode_list, encode_bytes, encode_list, RlpItem},
};

/// A reference from a parent node to a child node.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum NodeRef {
    /// No child.
    #[default]
    Empty,
    /// A child stored in the backing store under its keccak hash.
    Hash(B256),
    /// A child whose RLP encoding is shorter than 32 bytes, embedded in the parent.
    Inline(Vec<u8>),
}

impl NodeRef {
    /// Returns true if the reference points at nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Appends this reference, as it appears inside its parent, to `out`.
    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            NodeRef::Empty => encode_bytes(&[], out),
            NodeRef::Hash(hash) => encode_bytes(hash.as_slice(), out),
            NodeRef::Inline(raw) => out.extend_from_slice(raw),
        }
    }

    fn from_item(item: &RlpItem<'_>) -> Result<Self, TrieError> {
        if item.list {
            return Ok(NodeRef::Inline(item.raw.to_vec()));
        }
        match item.payload.len() {
            0 => Ok(NodeRef::Empty),
            32 => Ok(NodeRef::Hash(B256::from_slice(item.payload))),
            _ => Err(TrieError::InconsistentTree("child reference is neither a hash nor a node")),
        }
    }
}

/// The children of a branch node, indexed by nibble.
pub type Children = Box<[NodeRef; 16]>;

/// Returns a branch child array with every slot empty.
pub fn empty_children() -> Children {
    Box::new(std::array::from_fn(|_| NodeRef::Empty))
}

/// A Merkle-Patricia trie node. Paths are stored as nibbles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Terminates a key: the remaining path and the stored value.
    Leaf {
        /// The remaining key nibbles.
        path: Vec<u8>,
        /// The stored value.
        value: Vec<u8>,
    },
    /// A shared path segment leading to a branch.
    Extension {
        /// The shared nibbles.
        path: Vec<u8>,
        /// The branch below the shared segment.
        child: NodeRef,
    },
    /// A sixteen-way fork, with an optional value for keys ending here.
    Branch {
        /// One child per nibble.
        children: Children,
        /// The value of the key that ends at this branch.
        value: Option<Vec<u8>>,
    },
}

impl Node {
    /// Encodes the node with Ethereum's RLP node encoding.
    ///
    /// ```
    /// use meridian_trie::node::Node;
    ///
    /// let leaf = Node::Leaf { path: vec![0x1, 0x2], value: b"a".to_vec() };
    /// assert_eq!(leaf.encode(), vec![0xc4, 0x82, 0x20, 0x12, b'a']);
    /// assert_eq!(Node::decode(&leaf.encode()).expect("valid node"), leaf);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        match self {
            Node::Leaf { path, value } => {
                encode_bytes(&encode_compact(path, true), &mut payload);
                encode_bytes(value, &mut payload);
            }
            Node::Extension { path, child } => {
                encode_bytes(&encode_compact(path, false), &mut payload);
                child.encode_into(&mut payload);
            }
            Node::Branch { children, value } => {
                for child in children.iter() {
                    child.encode_into(&mut payload);
                }
                encode_bytes(value.as_deref().unwrap_or_default(), &mut payload);
            }
        }
        encode_list(&payload)
    }

    /// Decodes a node from its RLP encoding.
    pub fn decode(raw: &[u8]) -> Result<Self, TrieError> {
        let items = decode_list(raw)?;
        match items.as_slice() {
            [path, second] => {
                if path.list {
                    return Err(TrieError::InconsistentTree("node path must be a string"));
                }
                let (path, is_leaf) = decode_compact(path.payload)?;
                if is_leaf {
                    Ok(Node::Leaf { path, value: second.payload.to_vec() })
                } else {
                    let child = NodeRef::from_item(second)?;
                    if child.is_empty() {
                        return Err(TrieError::InconsistentTree("extension without a child"));
                    }
                    Ok(Node::Extension { path, child })
                }
            }
            [branches @ .., value] if branches.len() == 16 => {
                let mut children = empty_children();
                for (slot, item) in children.iter_mut().zip(branches) {
                    *slot = NodeRef::from_item(item)?;
                }
                let value = (!value.payload.is_empty()).then(|| value.payload.to_vec());
                Ok(Node::Branch { children, value })
            }
            _ => Err(TrieError::InconsistentTree("node is neither a branch nor a short node")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_roundtrip() {
        let mut children = empty_children();
        children[3] = NodeRef::Hash(B256::repeat_byte(0xaa));
        children[7] = NodeRef::Inline(Node::Leaf { path: vec![], value: vec![1] }.encode());
        let branch = Node::Branch { children, value: Some(b"v".to_vec()) };

        let decoded = Node::decode(&branch.encode()).expect("valid branch");
        assert_eq!(decoded, branch);
    }

    #[test]
    fn test_extension_roundtrip() {
        let extension = Node::Extension {
            path: vec![0x1, 0x2, 0x3],
            child: NodeRef::Hash(B256::repeat_byte(1)),
        };
        assert_eq!(Node::decode(&extension.encode()).expect("valid extension"), extension);
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        let raw = encode_list(&[0x01, 0x02, 0x03]);
        assert!(Node::decode(&raw).is_err());
    }
}
