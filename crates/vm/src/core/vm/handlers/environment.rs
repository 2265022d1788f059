use alloy::primitives::{Address, U256};
use meridian_common::utils::words::{
    padded_slice, saturating_usize, word_from_address, word_from_hash,
};

use crate::{
    core::gas::{words, COPY_WORD},
    error::{Error, ExceptionalHalt},
};

use super::super::{
    core::Evm,
    execution::{memory_range, ExecutionState},
};

/// Warms `address` and charges the cold access surcharge if it was cold.
pub(crate) fn access_account(
    vm: &mut Evm<'_>,
    frame: &mut ExecutionState,
    address: Address,
) -> Result<(), Error> {
    let is_cold = vm.state.warm_address(address);
    frame.consume_gas(vm.schedule.account_access_surcharge(is_cold))
}

/// Pops the destination, source offset and size of a copy into memory, then pays for the memory
/// expansion and the copied words.
fn pop_copy_args(frame: &mut ExecutionState) -> Result<(usize, U256, usize), Error> {
    let destination = frame.pop()?;
    let offset = frame.pop()?;
    let size = frame.pop()?;

    let (destination, size) = memory_range(destination, size)?;
    frame.expand_memory(destination, size)?;
    frame.consume_gas(COPY_WORD * words(size))?;
    Ok((destination, offset, size))
}

/// ADDRESS - Get address of currently executing account
pub fn address(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(word_from_address(frame.message.to))
}

/// BALANCE - Get balance of the given account
pub fn balance(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let address = frame.pop_address()?;
    access_account(vm, frame, address)?;
    frame.push(vm.state.get_balance(address)?)
}

/// ORIGIN - Get execution origination address
pub fn origin(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(word_from_address(vm.tx.origin))
}

/// CALLER - Get caller address
pub fn caller(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(word_from_address(frame.message.sender))
}

/// CALLVALUE - Get deposited value by the instruction/transaction responsible for this execution
pub fn callvalue(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(frame.message.value)
}

/// CALLDATALOAD - Get input data of current environment
pub fn calldataload(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let offset = saturating_usize(frame.pop()?);
    let word = padded_slice(&frame.calldata, offset, 32);
    frame.push(U256::from_be_slice(&word))
}

/// CALLDATASIZE - Get size of input data in current environment
pub fn calldatasize(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.calldata.len()))
}

/// CALLDATACOPY - Copy input data in current environment to memory
pub fn calldatacopy(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (destination, offset, size) = pop_copy_args(frame)?;
    let data = padded_slice(&frame.calldata, saturating_usize(offset), size);
    frame.memory.store(destination, &data);
    Ok(())
}

/// CODESIZE - Get size of code running in current environment
pub fn codesize(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.code.len()))
}

/// CODECOPY - Copy code running in current environment to memory
pub fn codecopy(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (destination, offset, size) = pop_copy_args(frame)?;
    let code = padded_slice(&frame.code, saturating_usize(offset), size);
    frame.memory.store(destination, &code);
    Ok(())
}

/// GASPRICE - Get price of gas in current environment
pub fn gasprice(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(vm.tx.gas_price)
}

/// EXTCODESIZE - Get size of an account's code
pub fn extcodesize(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let address = frame.pop_address()?;
    access_account(vm, frame, address)?;
    let size = vm.state.get_code(address)?.len();
    frame.push(U256::from(size))
}

/// EXTCODECOPY - Copy an account's code to memory
pub fn extcodecopy(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let address = frame.pop_address()?;
    let (destination, offset, size) = pop_copy_args(frame)?;
    access_account(vm, frame, address)?;
    let code = vm.state.get_code_segment(address, saturating_usize(offset), size)?;
    frame.memory.store(destination, &code);
    Ok(())
}

/// RETURNDATASIZE - Get size of output data from the previous call
pub fn returndatasize(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(U256::from(frame.last_call_return_data.len()))
}

/// RETURNDATACOPY - Copy output data from the previous call to memory
pub fn returndatacopy(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let destination = frame.pop()?;
    let offset = frame.pop()?;
    let size = frame.pop()?;

    // reading past the end is an error, unlike every other copy
    let end = offset.checked_add(size).ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
    if end > U256::from(frame.last_call_return_data.len()) {
        return Err(ExceptionalHalt::ReturnDataOutOfBounds.into());
    }

    let (destination, size) = memory_range(destination, size)?;
    frame.expand_memory(destination, size)?;
    frame.consume_gas(COPY_WORD * words(size))?;

    let offset = saturating_usize(offset);
    if size > 0 {
        let data = frame.last_call_return_data.slice(offset..offset + size);
        frame.memory.store(destination, &data);
    }
    Ok(())
}

/// EXTCODEHASH - Get hash of an account's code
pub fn extcodehash(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let address = frame.pop_address()?;
    access_account(vm, frame, address)?;
    let hash = if vm.state.is_empty(address)? {
        U256::ZERO
    } else {
        word_from_hash(vm.state.get_code_hash(address)?)
    };
    frame.push(hash)
}

/// SELFBALANCE - Get balance of currently executing account
pub fn selfbalance(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    frame.push(vm.state.get_balance(frame.message.to)?)
}
