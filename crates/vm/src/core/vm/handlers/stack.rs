use alloy::primitives::U256;

use crate::error::{Error, ExceptionalHalt};

use super::super::{core::Evm, execution::ExecutionState};

/// POP - Remove item from stack
pub fn pop(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.pop()?;
    Ok(())
}

/// PUSH0 - Push 0 onto stack
pub fn push0(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::ZERO)
}

/// PUSH1-PUSH32 - Push N bytes onto stack
pub fn push_n(_vm: &mut Evm<'_>, frame: &mut ExecutionState, size: u8) -> Result<(), Error> {
    let start = frame.pc + 1;
    let end = start + size as usize;
    let value = frame
        .code
        .get(start..end)
        .map(U256::from_be_slice)
        .ok_or(ExceptionalHalt::CodeOutOfBounds)?;
    frame.push(value)?;

    // skip the immediate; the loop steps over the opcode itself
    frame.pc += size as usize;
    Ok(())
}

/// DUP1-DUP16 - Duplicate Nth stack item
pub fn dup_n(_vm: &mut Evm<'_>, frame: &mut ExecutionState, n: u8) -> Result<(), Error> {
    Ok(frame.stack.dup(n as usize)?)
}

/// SWAP1-SWAP16 - Exchange 1st and Nth stack items
pub fn swap_n(_vm: &mut Evm<'_>, frame: &mut ExecutionState, n: u8) -> Result<(), Error> {
    Ok(frame.stack.swap(n as usize)?)
}
