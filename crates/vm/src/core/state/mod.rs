//! The world state: accounts in a secure Merkle-Patricia trie, plus the per-transaction
//! bookkeeping that rolls back together with it.

mod account;

use std::{collections::BTreeMap, sync::Arc};

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use hashbrown::{HashMap, HashSet};
use meridian_common::utils::words::padded_slice;
use meridian_trie::{KeyValueStore, MemoryStore, SecureTrie, TrieError};
use tracing::debug;

pub use account::Account;
use account::{decode_word, encode_word};

use crate::{
    core::{constants::EMPTY_CODE_HASH, log::Log},
    error::{Error, ExceptionalHalt},
};

/// The world state.
///
/// Accounts live in a [`SecureTrie`] keyed by address; each account's storage is a secure trie
/// of its own whose root is kept in the account. Code is stored in the backing store under its
/// hash. Nodes are never deleted from the backing store, so any earlier root can be reopened,
/// which is how [`State::apply`] rolls back.
///
/// ```
/// use alloy::primitives::{Address, U256};
/// use meridian_vm::core::state::State;
///
/// let mut state = State::new();
/// let alice = Address::repeat_byte(0xa1);
///
/// let snapshot = state.snapshot();
/// state.add_balance(alice, U256::from(100)).expect("state is consistent");
/// assert_eq!(state.get_balance(alice).expect("state is consistent"), U256::from(100));
///
/// state.apply(&snapshot);
/// assert!(!state.account_exists(alice).expect("state is consistent"));
/// ```
#[derive(Debug)]
pub struct State {
    db: Arc<dyn KeyValueStore>,
    world: SecureTrie,
    logs: Vec<Log>,
    log_index: u64,
    self_destructs: HashSet<Address>,
    created: HashSet<Address>,
    touched: HashSet<Address>,
    warm_addresses: HashSet<Address>,
    warm_storage: HashSet<(Address, U256)>,
    original_storage: HashMap<(Address, U256), U256>,
    transient: HashMap<(Address, U256), U256>,
}

/// A copy of every mutable [`State`] field, taken with [`State::snapshot`] and restored with
/// [`State::apply`].
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    root: B256,
    logs: Vec<Log>,
    log_index: u64,
    self_destructs: HashSet<Address>,
    created: HashSet<Address>,
    touched: HashSet<Address>,
    warm_addresses: HashSet<Address>,
    warm_storage: HashSet<(Address, U256)>,
    original_storage: HashMap<(Address, U256), U256>,
    transient: HashMap<(Address, U256), U256>,
}

impl StateSnapshot {
    /// The world state root at the time of the snapshot.
    pub fn root(&self) -> B256 {
        self.root
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Creates an empty state backed by a fresh [`MemoryStore`].
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates an empty state over `db`.
    pub fn with_store(db: Arc<dyn KeyValueStore>) -> Self {
        let world = SecureTrie::new(db.clone());
        Self::from_parts(db, world)
    }

    /// Opens the state with the given root in `db`.
    pub fn open(db: Arc<dyn KeyValueStore>, root: B256) -> Self {
        let world = SecureTrie::open(db.clone(), root);
        Self::from_parts(db, world)
    }

    fn from_parts(db: Arc<dyn KeyValueStore>, world: SecureTrie) -> Self {
        Self {
            db,
            world,
            logs: Vec::new(),
            log_index: 0,
            self_destructs: HashSet::new(),
            created: HashSet::new(),
            touched: HashSet::new(),
            warm_addresses: HashSet::new(),
            warm_storage: HashSet::new(),
            original_storage: HashMap::new(),
            transient: HashMap::new(),
        }
    }

    /// The backing store.
    pub fn db(&self) -> &Arc<dyn KeyValueStore> {
        &self.db
    }

    /// The world state root hash.
    pub fn root_hash(&self) -> B256 {
        self.world.root_hash()
    }

    /// Looks up an account.
    pub fn get_account(&self, address: Address) -> Result<Option<Account>, Error> {
        match self.world.get(address.as_slice())? {
            Some(raw) => Ok(Some(Account::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn account_or_default(&self, address: Address) -> Result<Account, Error> {
        Ok(self.get_account(address)?.unwrap_or_default())
    }

    fn put_account(&mut self, address: Address, account: &Account) -> Result<(), Error> {
        self.world.set(address.as_slice(), account.encode())?;
        self.touched.insert(address);
        Ok(())
    }

    /// Returns true if the account is in the trie, even if it is empty.
    pub fn account_exists(&self, address: Address) -> Result<bool, Error> {
        Ok(self.world.get(address.as_slice())?.is_some())
    }

    /// Returns true if the account does not exist or is empty (EIP-161 "dead").
    pub fn is_empty(&self, address: Address) -> Result<bool, Error> {
        Ok(self.get_account(address)?.is_none_or(|account| account.is_empty()))
    }

    /// Removes an account and its storage from the world state.
    pub fn remove_account(&mut self, address: Address) -> Result<(), Error> {
        debug!(%address, "removing account");
        self.world.remove(address.as_slice())?;
        Ok(())
    }

    /// The balance of `address`, zero for missing accounts.
    pub fn get_balance(&self, address: Address) -> Result<U256, Error> {
        Ok(self.get_account(address)?.map(|account| account.balance).unwrap_or_default())
    }

    /// Sets the balance of `address`, creating the account if needed.
    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.balance = balance;
        self.put_account(address, &account)
    }

    /// Credits `amount` to `address`, creating the account if needed.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.balance = account.balance.saturating_add(amount);
        self.put_account(address, &account)
    }

    /// Debits `amount` from `address`, failing with [`ExceptionalHalt::InsufficientBalance`]
    /// instead of going negative.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.balance =
            account.balance.checked_sub(amount).ok_or(ExceptionalHalt::InsufficientBalance)?;
        self.put_account(address, &account)
    }

    /// Moves `value` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), Error> {
        self.sub_balance(from, value)?;
        self.add_balance(to, value)
    }

    /// The nonce of `address`, zero for missing accounts.
    pub fn get_nonce(&self, address: Address) -> Result<u64, Error> {
        Ok(self.get_account(address)?.map(|account| account.nonce).unwrap_or_default())
    }

    /// Sets the nonce of `address`, creating the account if needed.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.nonce = nonce;
        self.put_account(address, &account)
    }

    /// Increments the nonce of `address`, creating the account if needed.
    pub fn increment_nonce(&mut self, address: Address) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        account.nonce = account.nonce.saturating_add(1);
        self.put_account(address, &account)
    }

    /// The code hash of `address`, zero for missing accounts.
    pub fn get_code_hash(&self, address: Address) -> Result<B256, Error> {
        Ok(self.get_account(address)?.map(|account| account.code_hash).unwrap_or_default())
    }

    /// The code of `address`, empty for missing accounts.
    pub fn get_code(&self, address: Address) -> Result<Bytes, Error> {
        let Some(account) = self.get_account(address)? else {
            return Ok(Bytes::new());
        };
        if !account.has_code() {
            return Ok(Bytes::new());
        }
        let code = self
            .db
            .try_get(account.code_hash.as_slice())?
            .ok_or(TrieError::MissingNode(account.code_hash))?;
        Ok(Bytes::from(code))
    }

    /// `size` bytes of the code of `address` starting at `offset`, zero-padded past the end.
    pub fn get_code_segment(
        &self,
        address: Address,
        offset: usize,
        size: usize,
    ) -> Result<Vec<u8>, Error> {
        Ok(padded_slice(&self.get_code(address)?, offset, size))
    }

    /// Sets the code of `address`, creating the account if needed.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        if code.is_empty() {
            account.code_hash = *EMPTY_CODE_HASH;
        } else {
            account.code_hash = keccak256(&code);
            self.db.set(account.code_hash.to_vec(), code.to_vec())?;
        }
        self.put_account(address, &account)
    }

    fn storage_trie(&self, account: &Account) -> SecureTrie {
        SecureTrie::open(self.db.clone(), account.storage_root)
    }

    /// The value of storage slot `key` of `address`, zero for unset slots and missing accounts.
    pub fn get_storage(&self, address: Address, key: U256) -> Result<U256, Error> {
        let Some(account) = self.get_account(address)? else {
            return Ok(U256::ZERO);
        };
        match self.storage_trie(&account).get(&key.to_be_bytes::<32>())? {
            Some(raw) => Ok(decode_word(&mut raw.as_slice())?),
            None => Ok(U256::ZERO),
        }
    }

    /// Sets storage slot `key` of `address`. Writing zero deletes the slot.
    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) -> Result<(), Error> {
        let mut account = self.account_or_default(address)?;
        let mut storage = self.storage_trie(&account);
        if value.is_zero() {
            storage.remove(&key.to_be_bytes::<32>())?;
        } else {
            storage.set(&key.to_be_bytes::<32>(), encode_word(value))?;
        }
        account.storage_root = storage.root_hash();
        self.put_account(address, &account)
    }

    /// The value slot `key` of `address` held when the transaction started.
    ///
    /// The first lookup of a slot in a transaction records its current value, so this must be
    /// called before the slot is first written.
    pub fn get_original_storage(&mut self, address: Address, key: U256) -> Result<U256, Error> {
        if let Some(value) = self.original_storage.get(&(address, key)) {
            return Ok(*value);
        }
        let value = self.get_storage(address, key)?;
        self.original_storage.insert((address, key), value);
        Ok(value)
    }

    /// Every non-zero storage slot of `address`.
    pub fn storage_dictionary(&self, address: Address) -> Result<BTreeMap<U256, U256>, Error> {
        let Some(account) = self.get_account(address)? else {
            return Ok(BTreeMap::new());
        };
        self.storage_trie(&account)
            .to_dictionary()?
            .into_iter()
            .map(|(key, raw)| Ok((U256::from_be_slice(&key), decode_word(&mut raw.as_slice())?)))
            .collect()
    }

    /// Every account in the world state.
    pub fn accounts(&self) -> Result<BTreeMap<Address, Account>, Error> {
        self.world
            .to_dictionary()?
            .into_iter()
            .map(|(key, raw)| {
                if key.len() != Address::len_bytes() {
                    return Err(Error::Internal(format!("world state key of length {}", key.len())));
                }
                Ok((Address::from_slice(&key), Account::decode(&raw)?))
            })
            .collect()
    }

    /// The transient storage slot `key` of `address` (EIP-1153).
    pub fn get_transient(&self, address: Address, key: U256) -> U256 {
        self.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    /// Sets the transient storage slot `key` of `address`.
    pub fn set_transient(&mut self, address: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.transient.remove(&(address, key));
        } else {
            self.transient.insert((address, key), value);
        }
    }

    /// Appends a log, assigning it the next log index.
    pub fn log(&mut self, address: Address, topics: Vec<B256>, data: &[u8]) {
        self.logs.push(Log::new(self.log_index, address, topics, data));
        self.log_index += 1;
    }

    /// The logs emitted so far.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Takes the logs emitted so far.
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Marks `address` for removal at the end of the transaction. Returns true if it was not
    /// marked yet.
    pub fn mark_self_destruct(&mut self, address: Address) -> bool {
        self.self_destructs.insert(address)
    }

    /// Returns true if `address` self-destructed in this transaction.
    pub fn is_self_destructed(&self, address: Address) -> bool {
        self.self_destructs.contains(&address)
    }

    /// Records that `address` was created in this transaction.
    pub fn mark_created(&mut self, address: Address) {
        self.created.insert(address);
    }

    /// Returns true if `address` was created in this transaction.
    pub fn was_created(&self, address: Address) -> bool {
        self.created.contains(&address)
    }

    /// Records that `address` was touched, making it eligible for empty-account removal.
    pub fn touch(&mut self, address: Address) {
        self.touched.insert(address);
    }

    /// Warms `address`. Returns true if it was cold.
    pub fn warm_address(&mut self, address: Address) -> bool {
        self.warm_addresses.insert(address)
    }

    /// Returns true if `address` was accessed in this transaction.
    pub fn is_warm(&self, address: Address) -> bool {
        self.warm_addresses.contains(&address)
    }

    /// Warms storage slot `key` of `address`. Returns true if it was cold.
    pub fn warm_storage(&mut self, address: Address, key: U256) -> bool {
        self.warm_storage.insert((address, key))
    }

    /// Copies every mutable field.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            root: self.world.root_hash(),
            logs: self.logs.clone(),
            log_index: self.log_index,
            self_destructs: self.self_destructs.clone(),
            created: self.created.clone(),
            touched: self.touched.clone(),
            warm_addresses: self.warm_addresses.clone(),
            warm_storage: self.warm_storage.clone(),
            original_storage: self.original_storage.clone(),
            transient: self.transient.clone(),
        }
    }

    /// Restores a snapshot taken from this state.
    pub fn apply(&mut self, snapshot: &StateSnapshot) {
        self.world = SecureTrie::open(self.db.clone(), snapshot.root);
        self.logs = snapshot.logs.clone();
        self.log_index = snapshot.log_index;
        self.self_destructs = snapshot.self_destructs.clone();
        self.created = snapshot.created.clone();
        self.touched = snapshot.touched.clone();
        self.warm_addresses = snapshot.warm_addresses.clone();
        self.warm_storage = snapshot.warm_storage.clone();
        self.original_storage = snapshot.original_storage.clone();
        self.transient = snapshot.transient.clone();
    }

    /// Ends a transaction: removes self-destructed accounts, removes touched empty accounts when
    /// `clear_empty` is set (EIP-161), and resets the per-transaction bookkeeping.
    pub fn finalize_transaction(&mut self, clear_empty: bool) -> Result<(), Error> {
        let self_destructs: Vec<Address> = self.self_destructs.drain().collect();
        for address in self_destructs {
            self.remove_account(address)?;
        }

        let touched: Vec<Address> = self.touched.drain().collect();
        if clear_empty {
            for address in touched {
                if self.get_account(address)?.is_some_and(|account| account.is_empty()) {
                    self.remove_account(address)?;
                }
            }
        }

        self.created.clear();
        self.warm_addresses.clear();
        self.warm_storage.clear();
        self.original_storage.clear();
        self.transient.clear();
        self.log_index = 0;
        Ok(())
    }
}
