use alloy::primitives::U256;

use crate::error::Error;

use super::super::{core::Evm, execution::ExecutionState};

/// AND - Bitwise AND operation
pub fn and(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a & b)
}

/// OR - Bitwise OR operation
pub fn or(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a | b)
}

/// XOR - Bitwise XOR operation
pub fn xor(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a ^ b)
}

/// NOT - Bitwise NOT operation
pub fn not(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    frame.push(!a)
}

/// BYTE - Retrieve single byte from word
pub fn byte(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let index = frame.pop()?;
    let word = frame.pop()?;

    // index 0 is the most significant byte
    let result = match usize::try_from(index) {
        Ok(index) if index < 32 => U256::from(word.byte(31 - index)),
        _ => U256::ZERO,
    };
    frame.push(result)
}

/// SHL - Shift left operation
pub fn shl(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let shift = frame.pop()?;
    let value = frame.pop()?;
    let result = if shift < U256::from(256) { value << shift.to::<usize>() } else { U256::ZERO };
    frame.push(result)
}

/// SHR - Shift right operation
pub fn shr(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let shift = frame.pop()?;
    let value = frame.pop()?;
    let result = if shift < U256::from(256) { value >> shift.to::<usize>() } else { U256::ZERO };
    frame.push(result)
}

/// SAR - Arithmetic shift right operation
pub fn sar(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let shift = frame.pop()?;
    let value = frame.pop()?;
    let negative = value.bit(255);

    let result = if shift >= U256::from(256) {
        if negative {
            U256::MAX
        } else {
            U256::ZERO
        }
    } else if negative {
        // shift the complement so the vacated high bits fill with ones
        !((!value) >> shift.to::<usize>())
    } else {
        value >> shift.to::<usize>()
    };
    frame.push(result)
}
