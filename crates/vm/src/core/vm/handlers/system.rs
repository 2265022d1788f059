use alloy::primitives::{Address, Bytes, U256};
use meridian_common::utils::words::{saturating_u64, word_from_address};
use tracing::debug;

use crate::{
    core::{
        constants::{MAX_CALL_DEPTH, MAX_INITCODE_SIZE},
        gas::{words, CALL_STIPEND, CALL_VALUE, INIT_CODE_WORD, KECCAK256_WORD, NEW_ACCOUNT},
        hardfork::HardFork,
    },
    error::{Error, ExceptionalHalt},
};

use super::{
    super::{
        core::Evm,
        execution::{memory_range, ExecutionState, StopReason},
    },
    environment::access_account,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

impl CallKind {
    fn takes_value(self) -> bool {
        matches!(self, CallKind::Call | CallKind::CallCode)
    }
}

/// Returns true if a child of `frame` would exceed the call depth limit.
fn depth_exceeded(frame: &ExecutionState) -> bool {
    frame.message.depth + 1 >= MAX_CALL_DEPTH
}

/// The CALL family: pays for the call, runs the child frame and copies its output back.
fn call_with(vm: &mut Evm<'_>, frame: &mut ExecutionState, kind: CallKind) -> Result<(), Error> {
    let requested_gas = frame.pop()?;
    let target = frame.pop_address()?;
    let value = if kind.takes_value() { frame.pop()? } else { U256::ZERO };
    let input_offset = frame.pop()?;
    let input_size = frame.pop()?;
    let output_offset = frame.pop()?;
    let output_size = frame.pop()?;

    if kind == CallKind::Call && frame.message.is_static && !value.is_zero() {
        return Err(ExceptionalHalt::StaticViolation("CALL").into());
    }

    let (input_offset, input_size) = memory_range(input_offset, input_size)?;
    frame.expand_memory(input_offset, input_size)?;
    let (output_offset, output_size) = memory_range(output_offset, output_size)?;
    frame.expand_memory(output_offset, output_size)?;

    access_account(vm, frame, target)?;

    let fork = vm.config.hardfork;
    if !value.is_zero() {
        frame.consume_gas(CALL_VALUE)?;
    }
    if kind == CallKind::Call {
        let creates_account = if fork.is_active(HardFork::SpuriousDragon) {
            !value.is_zero() && vm.state.is_empty(target)?
        } else {
            !vm.state.account_exists(target)?
        };
        if creates_account {
            frame.consume_gas(NEW_ACCOUNT)?;
        }
    }

    let gas = vm.schedule.call_gas(saturating_u64(requested_gas), frame.gas.remaining())?;
    frame.consume_gas(gas)?;
    let child_gas = if value.is_zero() { gas } else { gas + CALL_STIPEND };

    let caller = frame.message.to;
    if depth_exceeded(frame) ||
        (kind.takes_value() && vm.state.get_balance(caller)? < value)
    {
        debug!(depth = frame.message.depth, ?kind, %target, "call rejected");
        frame.gas.return_gas(child_gas);
        frame.last_call_return_data = Bytes::new();
        return frame.push_bool(false);
    }

    let input = Bytes::from(frame.memory.read(input_offset, input_size));
    let message = match kind {
        CallKind::Call => frame.message.nested_call(target, value, child_gas, input),
        CallKind::CallCode => frame.message.nested_callcode(target, value, child_gas, input),
        CallKind::DelegateCall => frame.message.nested_delegatecall(target, child_gas, input),
        CallKind::StaticCall => frame.message.nested_staticcall(target, child_gas, input),
    };
    let result = vm.execute(message)?;

    let copied = output_size.min(result.return_data.len());
    frame.memory.store(output_offset, &result.return_data[..copied]);
    frame.gas.return_gas(result.gas_remaining);
    if result.success {
        frame.gas.absorb_refund(result.gas_refunded, result.refund_debt);
        frame.storage_dirty = true;
    }
    frame.last_call_return_data = result.return_data;
    frame.push_bool(result.success)
}

/// CREATE and CREATE2: pays for the init code, derives the address and runs the child frame.
fn create_with(
    vm: &mut Evm<'_>,
    frame: &mut ExecutionState,
    is_create2: bool,
) -> Result<(), Error> {
    let value = frame.pop()?;
    let (offset, size) = frame.pop_memory_range()?;
    let salt = if is_create2 { Some(frame.pop()?) } else { None };

    let fork = vm.config.hardfork;
    if fork.is_active(HardFork::Shanghai) {
        if size > MAX_INITCODE_SIZE {
            return Err(ExceptionalHalt::OutOfGas.into());
        }
        frame.consume_gas(INIT_CODE_WORD * words(size))?;
    }
    if is_create2 {
        frame.consume_gas(KECCAK256_WORD * words(size))?;
    }

    let creator = frame.message.to;
    frame.last_call_return_data = Bytes::new();
    if depth_exceeded(frame) || vm.state.get_balance(creator)? < value {
        debug!(depth = frame.message.depth, %creator, "create rejected");
        return frame.push(U256::ZERO);
    }

    let init_code = Bytes::from(frame.memory.read(offset, size));
    let nonce = vm.state.get_nonce(creator)?;
    vm.state.increment_nonce(creator)?;
    let address: Address = match salt {
        Some(salt) => creator.create2_from_code(salt.to_be_bytes::<32>(), &init_code),
        None => creator.create(nonce),
    };
    vm.state.warm_address(address);

    let gas = vm.schedule.create_gas(frame.gas.remaining());
    frame.consume_gas(gas)?;
    let message = frame.message.nested_create(address, value, gas, init_code);
    let result = vm.execute(message)?;

    frame.gas.return_gas(result.gas_remaining);
    if result.success {
        frame.gas.absorb_refund(result.gas_refunded, result.refund_debt);
        frame.push(word_from_address(address))
    } else {
        if result.reverted {
            frame.last_call_return_data = result.return_data;
        }
        frame.push(U256::ZERO)
    }
}

/// CREATE - Create a new account with associated code
pub fn create(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    create_with(vm, frame, false)
}

/// CREATE2 - Create a new account with associated code at a predictable address
pub fn create2(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    create_with(vm, frame, true)
}

/// CALL - Message-call into an account
pub fn call(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    call_with(vm, frame, CallKind::Call)
}

/// CALLCODE - Message-call into this account with alternative account's code
pub fn callcode(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    call_with(vm, frame, CallKind::CallCode)
}

/// DELEGATECALL - Message-call into this account with an alternative account's code
pub fn delegatecall(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    call_with(vm, frame, CallKind::DelegateCall)
}

/// STATICCALL - Static message-call into an account
pub fn staticcall(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    call_with(vm, frame, CallKind::StaticCall)
}

/// RETURN - Halt execution returning output data
pub fn op_return(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, size) = frame.pop_memory_range()?;
    let data = Bytes::from(frame.memory.read(offset, size));
    frame.stop(StopReason::Return, data);
    Ok(())
}

/// REVERT - Halt execution reverting state changes
pub fn revert(_vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let (offset, size) = frame.pop_memory_range()?;
    let data = Bytes::from(frame.memory.read(offset, size));
    frame.stop(StopReason::Revert, data);
    Ok(())
}

/// SELFDESTRUCT - Halt execution and register the account for later deletion
pub fn selfdestruct(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let beneficiary = frame.pop_address()?;
    let address = frame.message.to;
    let fork = vm.config.hardfork;

    if vm.schedule.access_lists && vm.state.warm_address(beneficiary) {
        frame.consume_gas(vm.schedule.cold_account_access)?;
    }

    let balance = vm.state.get_balance(address)?;
    if vm.schedule.selfdestruct_new_account {
        let creates_account = if fork.is_active(HardFork::SpuriousDragon) {
            !balance.is_zero() && vm.state.is_empty(beneficiary)?
        } else {
            !vm.state.account_exists(beneficiary)?
        };
        if creates_account {
            frame.consume_gas(NEW_ACCOUNT)?;
        }
    }

    vm.state.sub_balance(address, balance)?;
    vm.state.add_balance(beneficiary, balance)?;

    // from Cancun only accounts created in the same transaction are deleted
    if (!fork.is_active(HardFork::Cancun) || vm.state.was_created(address)) &&
        vm.state.mark_self_destruct(address)
    {
        frame.gas.refund(vm.schedule.selfdestruct_refund);
    }

    debug!(%address, %beneficiary, %balance, "self-destructed");
    frame.stop(StopReason::SelfDestruct, Bytes::new());
    Ok(())
}
