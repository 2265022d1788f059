use alloy::primitives::{keccak256, B256};
use lazy_static::lazy_static;

/// The maximum number of items on the stack.
pub const MAX_STACK_SIZE: usize = 1024;

/// Message depths range from `0` to `MAX_CALL_DEPTH - 1`.
pub const MAX_CALL_DEPTH: usize = 1024;

/// The maximum size of deployed code (EIP-170).
pub const MAX_CODE_SIZE: usize = 24576;

/// The maximum size of init code (EIP-3860).
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Number of recent blocks whose hashes are visible to `BLOCKHASH`.
pub const BLOCKHASH_WINDOW: u64 = 256;

lazy_static! {
    /// The hash of empty code, `keccak256([])`.
    pub static ref EMPTY_CODE_HASH: B256 = keccak256([]);
}
