use alloy::primitives::U256;
use meridian_common::utils::words::{word_from_address, word_from_hash};

use crate::error::Error;

use super::super::{core::Evm, execution::ExecutionState};

/// BLOCKHASH - Get the hash of one of the 256 most recent complete blocks
pub fn blockhash(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let number = frame.pop()?;
    let hash = u64::try_from(number).map(|number| vm.block.block_hash(number)).unwrap_or_default();
    frame.push(word_from_hash(hash))
}

/// COINBASE - Get the block's beneficiary address
pub fn coinbase(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(word_from_address(vm.block.coinbase))
}

/// TIMESTAMP - Get the block's timestamp
pub fn timestamp(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(vm.block.timestamp))
}

/// NUMBER - Get the block's number
pub fn number(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(vm.block.number))
}

/// DIFFICULTY - Get the block's difficulty, or `PREVRANDAO` after the merge
pub fn difficulty(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(vm.block.difficulty)
}

/// GASLIMIT - Get the block's gas limit
pub fn gaslimit(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(vm.block.gas_limit))
}

/// CHAINID - Get the chain ID
pub fn chainid(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(vm.block.chain_id))
}

/// BASEFEE - Get the block's base fee
pub fn basefee(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(vm.block.base_fee)
}

/// BLOBHASH - Get a versioned hash of the transaction's blobs
pub fn blobhash(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let index = frame.pop()?;
    let hash = usize::try_from(index)
        .ok()
        .and_then(|index| vm.tx.blob_hashes.get(index))
        .copied()
        .unwrap_or_default();
    frame.push(word_from_hash(hash))
}

/// BLOBBASEFEE - Get the block's blob base fee
pub fn blobbasefee(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(vm.block.blob_base_fee)
}
