use meridian_common::utils::strings::sign_uint;

use crate::error::Error;

use super::super::{core::Evm, execution::ExecutionState};

/// LT - Less than comparison
pub fn lt(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push_bool(a < b)
}

/// GT - Greater than comparison
pub fn gt(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push_bool(a > b)
}

/// SLT - Signed less than comparison
pub fn slt(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push_bool(sign_uint(a) < sign_uint(b))
}

/// SGT - Signed greater than comparison
pub fn sgt(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push_bool(sign_uint(a) > sign_uint(b))
}

/// EQ - Equality comparison
pub fn eq(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    let b = frame.pop()?;
    frame.push_bool(a == b)
}

/// ISZERO - Check if zero
pub fn iszero(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let a = frame.pop()?;
    frame.push_bool(a.is_zero())
}
