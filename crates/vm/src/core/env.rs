use alloy::primitives::{Address, B256, U256};
use hashbrown::HashMap;

use crate::core::constants::BLOCKHASH_WINDOW;

/// The block a transaction executes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEnv {
    /// `NUMBER`
    pub number: u64,
    /// `COINBASE`, the recipient of transaction fees.
    pub coinbase: Address,
    /// `TIMESTAMP`
    pub timestamp: u64,
    /// `DIFFICULTY`, which holds `PREVRANDAO` after the merge.
    pub difficulty: U256,
    /// `GASLIMIT`
    pub gas_limit: u64,
    /// `CHAINID`
    pub chain_id: u64,
    /// `BASEFEE` (London+).
    pub base_fee: U256,
    /// `BLOBBASEFEE` (Cancun+).
    pub blob_base_fee: U256,
    /// Known hashes of previous blocks, by number.
    pub block_hashes: HashMap<u64, B256>,
}

impl Default for BlockEnv {
    fn default() -> Self {
        Self {
            number: 0,
            coinbase: Address::ZERO,
            timestamp: 0,
            difficulty: U256::ZERO,
            gas_limit: 30_000_000,
            chain_id: 1,
            base_fee: U256::ZERO,
            blob_base_fee: U256::ZERO,
            block_hashes: HashMap::new(),
        }
    }
}

impl BlockEnv {
    /// The hash `BLOCKHASH` returns for block `number`: zero for the current block, future
    /// blocks, blocks older than 256 blocks, and unknown blocks.
    ///
    /// ```
    /// use alloy::primitives::B256;
    /// use meridian_vm::core::env::BlockEnv;
    ///
    /// let mut block = BlockEnv { number: 300, ..Default::default() };
    /// block.block_hashes.insert(299, B256::repeat_byte(1));
    /// block.block_hashes.insert(10, B256::repeat_byte(2));
    ///
    /// assert_eq!(block.block_hash(299), B256::repeat_byte(1));
    /// assert_eq!(block.block_hash(10), B256::ZERO);
    /// assert_eq!(block.block_hash(300), B256::ZERO);
    /// ```
    pub fn block_hash(&self, number: u64) -> B256 {
        if number >= self.number || self.number - number > BLOCKHASH_WINDOW {
            return B256::ZERO;
        }
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }
}

/// Transaction-level context shared by every frame of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxEnv {
    /// `ORIGIN`, the externally owned account that signed the transaction.
    pub origin: Address,
    /// `GASPRICE`
    pub gas_price: U256,
    /// Versioned blob hashes read by `BLOBHASH`.
    pub blob_hashes: Vec<B256>,
}
