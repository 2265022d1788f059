use std::sync::Arc;

use alloy::primitives::b256;
use meridian_trie::{KeyValueStore, MemoryStore, SecureTrie, Trie, EMPTY_ROOT};

fn trie_with(entries: &[(&str, &str)]) -> Trie {
    let mut trie = Trie::new(Arc::new(MemoryStore::new()));
    for (key, value) in entries {
        trie.set(key.as_bytes(), value.as_bytes().to_vec()).expect("insert failed");
    }
    trie
}

#[test]
fn test_empty_root() {
    assert_eq!(
        *EMPTY_ROOT,
        b256!("0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
    );
    assert_eq!(trie_with(&[]).root_hash(), *EMPTY_ROOT);
}

#[test]
fn test_dogs_vector() {
    let trie = trie_with(&[("doe", "reindeer"), ("dog", "puppy"), ("dogglesworth", "cat")]);
    assert_eq!(
        trie.root_hash(),
        b256!("0x8aad789dff2f538bca5d8ea56e8abe10f4c7ba3a5dea95fea4cd6e7c3a1168d3")
    );
}

#[test]
fn test_puppy_vector() {
    let trie =
        trie_with(&[("do", "verb"), ("horse", "stallion"), ("doge", "coin"), ("dog", "puppy")]);
    assert_eq!(
        trie.root_hash(),
        b256!("0x5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84")
    );
}

#[test]
fn test_root_independent_of_insertion_order() {
    let entries = [("do", "verb"), ("dog", "puppy"), ("doge", "coin"), ("horse", "stallion")];
    let forward = trie_with(&entries);

    let mut reversed = entries;
    reversed.reverse();
    let backward = trie_with(&reversed);

    assert_eq!(forward.root_hash(), backward.root_hash());
}

#[test]
fn test_insert_then_remove_restores_root() {
    let mut trie = trie_with(&[("doe", "reindeer"), ("dog", "puppy")]);
    let root = trie.root_hash();

    trie.set(b"dogglesworth", b"cat".to_vec()).expect("insert failed");
    trie.set(b"d", b"short".to_vec()).expect("insert failed");
    trie.remove(b"d").expect("remove failed");
    trie.remove(b"dogglesworth").expect("remove failed");

    assert_eq!(trie.root_hash(), root);
}

#[test]
fn test_many_keys_roundtrip() {
    let mut trie = Trie::new(Arc::new(MemoryStore::new()));
    for i in 0u32..256 {
        trie.set(&i.to_be_bytes(), (i * 3).to_be_bytes().to_vec()).expect("insert failed");
    }
    for i in 0u32..256 {
        assert_eq!(
            trie.get(&i.to_be_bytes()).expect("lookup failed"),
            Some((i * 3).to_be_bytes().to_vec())
        );
    }
    assert_eq!(trie.entries().expect("walk failed").len(), 256);

    for i in (0u32..256).step_by(2) {
        trie.remove(&i.to_be_bytes()).expect("remove failed");
    }
    assert_eq!(trie.entries().expect("walk failed").len(), 128);
    assert_eq!(trie.get(&4u32.to_be_bytes()).expect("lookup failed"), None);
    assert_eq!(
        trie.get(&5u32.to_be_bytes()).expect("lookup failed"),
        Some(15u32.to_be_bytes().to_vec())
    );
}

#[test]
fn test_secure_trie_dictionary_recovers_keys() {
    let store = Arc::new(MemoryStore::new());
    let mut trie = SecureTrie::new(store.clone());
    trie.set(b"alpha", b"1".to_vec()).expect("insert failed");
    trie.set(b"beta", b"2".to_vec()).expect("insert failed");
    trie.set(b"gamma", b"3".to_vec()).expect("insert failed");
    trie.remove(b"beta").expect("remove failed");

    let dictionary = trie.to_dictionary().expect("preimages recorded");
    assert_eq!(dictionary.len(), 2);
    assert_eq!(dictionary[&b"alpha".to_vec()], b"1".to_vec());
    assert_eq!(dictionary[&b"gamma".to_vec()], b"3".to_vec());

    // the preimage table lives next to the nodes
    assert!(store
        .contains(&SecureTrie::preimage_key(alloy::primitives::keccak256(b"alpha")))
        .expect("store is not poisoned"));

    let reopened = SecureTrie::open(store, trie.root_hash());
    assert_eq!(reopened.get(b"gamma").expect("lookup failed"), Some(b"3".to_vec()));
}
