use alloy::primitives::{Bytes, U256};

use crate::error::{Error, ExceptionalHalt};

use super::super::{
    core::Evm,
    execution::{ExecutionState, StopReason},
};

/// Moves the program counter to `destination`, which must be a `JUMPDEST`.
fn jump_to(frame: &mut ExecutionState, destination: U256) -> Result<(), Error> {
    let destination = usize::try_from(destination).unwrap_or(usize::MAX);
    if !frame.is_valid_jump(destination) {
        return Err(ExceptionalHalt::InvalidJump(destination).into());
    }
    frame.pc = destination;
    frame.jumped = true;
    Ok(())
}

/// STOP - Halts execution
pub fn stop(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.stop(StopReason::Stop, Bytes::new());
    Ok(())
}

/// JUMP - Alter the program counter
pub fn jump(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let destination = frame.pop()?;
    jump_to(frame, destination)
}

/// JUMPI - Conditionally alter the program counter
pub fn jumpi(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let destination = frame.pop()?;
    let condition = frame.pop()?;
    if condition.is_zero() {
        return Ok(());
    }
    jump_to(frame, destination)
}

/// JUMPDEST - Mark a valid destination for jumps (no-op)
pub fn jumpdest(_vm: &mut Evm<'_>, _frame: &mut ExecutionState) -> Result<(), Error> {
    Ok(())
}

/// PC - Get the value of the program counter prior to the increment
pub fn pc(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.pc))
}

/// GAS - Get the amount of available gas
pub fn gas(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.gas.remaining()))
}

/// INVALID - Designated invalid instruction, and every undefined opcode
pub fn invalid(_vm: &mut Evm<'_>, _frame: &mut ExecutionState, opcode: u8) -> Result<(), Error> {
    Err(ExceptionalHalt::InvalidOpcode(opcode).into())
}
