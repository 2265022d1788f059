use alloy::primitives::U256;

use crate::error::Error;

use super::super::{core::Evm, execution::ExecutionState};

/// Splits a two's complement word into its sign and magnitude.
fn abs(value: U256) -> (bool, U256) {
    if value.bit(255) {
        (true, value.wrapping_neg())
    } else {
        (false, value)
    }
}

/// ADD - Addition operation
pub fn add(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a.wrapping_add(b))
}

/// MUL - Multiplication operation
pub fn mul(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a.wrapping_mul(b))
}

/// SUB - Subtraction operation
pub fn sub(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push(a.wrapping_sub(b))
}

/// DIV - Integer division operation
pub fn div(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let numerator = frame.pop()?;
    let denominator = frame.pop()?;
    frame.push(numerator.checked_div(denominator).unwrap_or_default())
}

/// SDIV - Signed integer division operation
pub fn sdiv(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let numerator = frame.pop()?;
    let denominator = frame.pop()?;
    if denominator.is_zero() {
        return frame.push(U256::ZERO);
    }

    // truncates toward zero; MIN / -1 wraps back to MIN
    let (numerator_negative, numerator) = abs(numerator);
    let (denominator_negative, denominator) = abs(denominator);
    let quotient = numerator / denominator;
    if numerator_negative != denominator_negative {
        frame.push(quotient.wrapping_neg())
    } else {
        frame.push(quotient)
    }
}

/// MOD - Modulo operation
pub fn modulo(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let modulus = frame.pop()?;
    frame.push(a.checked_rem(modulus).unwrap_or_default())
}

/// SMOD - Signed modulo operation
pub fn smod(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let modulus = frame.pop()?;
    if modulus.is_zero() {
        return frame.push(U256::ZERO);
    }

    // the result takes the sign of the dividend
    let (negative, a) = abs(a);
    let (_, modulus) = abs(modulus);
    let remainder = a % modulus;
    frame.push(if negative { remainder.wrapping_neg() } else { remainder })
}

/// ADDMOD - Addition modulo operation
pub fn addmod(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    let modulus = frame.pop()?;
    let result = if !modulus.is_zero() { a.add_mod(b, modulus) } else { U256::ZERO };
    frame.push(result)
}

/// MULMOD - Multiplication modulo operation
pub fn mulmod(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    let modulus = frame.pop()?;
    let result = if !modulus.is_zero() { a.mul_mod(b, modulus) } else { U256::ZERO };
    frame.push(result)
}

/// EXP - Exponential operation
pub fn exp(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let exponent = frame.pop()?;
    frame.consume_gas(vm.schedule.exp_cost(exponent))?;
    frame.push(a.overflowing_pow(exponent).0)
}

/// SIGNEXTEND - Extend length of two's complement signed integer
pub fn signextend(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let size = frame.pop()?;
    let value = frame.pop()?;
    if size >= U256::from(31u8) {
        return frame.push(value);
    }

    let sign_bit = size.to::<usize>() * 8 + 7;
    let mask = (U256::from(1u8) << (sign_bit + 1)) - U256::from(1u8);
    if value.bit(sign_bit) {
        frame.push(value | !mask)
    } else {
        frame.push(value & mask)
    }
}
