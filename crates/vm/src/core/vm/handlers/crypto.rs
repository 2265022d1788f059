use alloy::primitives::keccak256;
use meridian_common::utils::words::word_from_hash;

use crate::{
    core::gas::{words, KECCAK256_WORD},
    error::Error,
};

use super::super::{core::Evm, execution::ExecutionState};

/// SHA3 - Compute Keccak-256 hash
pub fn sha3(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, size) = frame.pop_memory_range()?;
    frame.consume_gas(KECCAK256_WORD * words(size))?;
    let hash = keccak256(frame.memory.read(offset, size));
    frame.push(word_from_hash(hash))
}
