use alloy::primitives::U256;

use crate::{
    core::gas::SSTORE_SENTRY,
    error::{Error, ExceptionalHalt},
};

use super::super::{core::Evm, execution::ExecutionState};

/// SLOAD - Load word from storage
pub fn sload(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let key = frame.pop()?;
    let address = frame.message.to;
    let is_cold = vm.state.warm_storage(address, key);
    frame.consume_gas(vm.schedule.sload_surcharge(is_cold))?;
    frame.push(vm.state.get_storage(address, key)?)
}

/// SSTORE - Save word to storage
pub fn sstore(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let key = frame.pop()?;
    let value = frame.pop()?;
    if vm.schedule.sstore_sentry && frame.gas.remaining() <= SSTORE_SENTRY {
        return Err(ExceptionalHalt::OutOfGas.into());
    }

    let address = frame.message.to;
    let is_cold = vm.state.warm_storage(address, key);
    let original = vm.state.get_original_storage(address, key)?;
    let current = vm.state.get_storage(address, key)?;
    frame.consume_gas(vm.schedule.sstore_cost(original, current, value, is_cold))?;

    if vm.schedule.sstore_net_metering {
        net_metering_refund(vm, frame, original, current, value);
    } else if !current.is_zero() && value.is_zero() {
        frame.gas.refund(vm.schedule.sstore_clear_refund);
    }

    if value != current {
        vm.state.set_storage(address, key, value)?;
        frame.storage_dirty = true;
    }
    Ok(())
}

/// Refund adjustments of EIP-1283 and EIP-2200, with the EIP-3529 clearing refund from London.
fn net_metering_refund(
    vm: &Evm<'_>,
    frame: &mut ExecutionState,
    original: U256,
    current: U256,
    value: U256,
) {
    if value == current {
        return;
    }

    let schedule = &vm.schedule;
    let clear_refund = schedule.sstore_clear_refund;
    if current == original {
        if !original.is_zero() && value.is_zero() {
            frame.gas.refund(clear_refund);
        }
        return;
    }

    if !original.is_zero() {
        if current.is_zero() {
            frame.gas.sub_refund(clear_refund);
        } else if value.is_zero() {
            frame.gas.refund(clear_refund);
        }
    }
    if value == original {
        if original.is_zero() {
            frame.gas.refund(schedule.sstore_set - schedule.sload);
        } else {
            frame.gas.refund(schedule.sstore_reset - schedule.sload);
        }
    }
}

/// TLOAD - Load word from transient storage
pub fn tload(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let key = frame.pop()?;
    frame.push(vm.state.get_transient(frame.message.to, key))
}

/// TSTORE - Save word to transient storage
pub fn tstore(vm: &mut Evm<'_>, frame: &mut ExecutionState) -> Result<(), Error> {
    let key = frame.pop()?;
    let value = frame.pop()?;
    vm.state.set_transient(frame.message.to, key, value);
    Ok(())
}
