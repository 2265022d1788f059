use alloy::primitives::U256;

use crate::{
    core::gas::{words, COPY_WORD},
    error::Error,
};

use super::super::{
    core::Evm,
    execution::{memory_range, ExecutionState},
};

/// MLOAD - Load word from memory
pub fn mload(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, _) = memory_range(frame.pop()?, U256::from(32))?;
    frame.expand_memory(offset, 32)?;
    let value = frame.memory.read_word(offset);
    frame.push(value)
}

/// MSTORE - Save word to memory
pub fn mstore(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, _) = memory_range(frame.pop()?, U256::from(32))?;
    let value = frame.pop()?;
    frame.expand_memory(offset, 32)?;
    frame.memory.store_word(offset, value);
    Ok(())
}

/// MSTORE8 - Save byte to memory
pub fn mstore8(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, _) = memory_range(frame.pop()?, U256::from(1))?;
    let value = frame.pop()?;
    frame.expand_memory(offset, 1)?;
    frame.memory.store_byte(offset, value.byte(0));
    Ok(())
}

/// MSIZE - Get the size of active memory in bytes
pub fn msize(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.memory.size()))
}

/// MCOPY - Copy memory areas
pub fn mcopy(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let destination = frame.pop()?;
    let source = frame.pop()?;
    let size = frame.pop()?;

    let (destination, size) = memory_range(destination, size)?;
    if size == 0 {
        return Ok(());
    }
    let (source, _) = memory_range(source, U256::from(size))?;

    frame.expand_memory(destination.max(source), size)?;
    frame.consume_gas(COPY_WORD * words(size))?;
    frame.memory.copy_within(source, destination, size);
    Ok(())
}
