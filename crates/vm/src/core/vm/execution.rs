use alloy::primitives::{Address, Bytes, B256, U256};
use meridian_common::utils::words::{address_from_word, bool_word};
use serde::Serialize;

use crate::{
    core::{
        gas::GasState,
        memory::Memory,
        message::Message,
        opcodes::{JUMPDEST, PUSH1, PUSH32},
        stack::Stack,
    },
    error::{Error, ExceptionalHalt},
};

/// [`ExecutionResult`] is the outcome of a single message execution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Output of `RETURN` or `REVERT`. Empty for every other outcome.
    pub return_data: Bytes,

    /// Gas left for the caller. Zero after an exceptional halt.
    pub gas_remaining: u64,

    /// The refund counter accumulated by the frame and its successful children.
    pub gas_refunded: u64,

    /// Refunds the frame withdrew from the counters of the frames that called it.
    pub refund_debt: u64,

    /// True if the execution completed without reverting or halting.
    pub success: bool,

    /// True only for executions that ended in `REVERT`.
    pub reverted: bool,

    /// The exception that halted the execution.
    pub halt: Option<ExceptionalHalt>,

    /// The deployed contract, for successful creations.
    pub created_address: Option<Address>,
}

impl ExecutionResult {
    /// A failed result for an execution stopped by `halt`: all gas is consumed and no data is
    /// returned.
    pub fn halted(halt: ExceptionalHalt) -> Self {
        Self { halt: Some(halt), ..Default::default() }
    }

    /// The [`Error::ExecutionFailed`] reported for this result under `throw_on_fail_result`.
    pub(crate) fn into_error(self) -> Error {
        Error::ExecutionFailed { halt: self.halt, return_data: self.return_data }
    }

    /// A failed result that hands all of its gas back, for messages rejected before any code ran.
    pub(crate) fn rejected(halt: ExceptionalHalt, gas: u64) -> Self {
        Self { halt: Some(halt), gas_remaining: gas, ..Default::default() }
    }
}

/// How a frame stopped before running off the end of its code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `STOP`
    Stop,
    /// `RETURN`
    Return,
    /// `REVERT`
    Revert,
    /// `SELFDESTRUCT`
    SelfDestruct,
}

/// The mutable state of a single call frame.
#[derive(Clone, Debug)]
pub struct ExecutionState {
    /// The message that started the frame.
    pub message: Message,

    /// The code being run.
    pub code: Bytes,

    /// The hash of the code being run.
    pub code_hash: B256,

    /// Input read by the `CALLDATA*` opcodes. Empty in creation frames, whose message data is
    /// the code being run.
    pub calldata: Bytes,

    /// The frame's stack.
    pub stack: Stack,

    /// The frame's memory.
    pub memory: Memory,

    /// The program counter.
    pub pc: usize,

    /// Gas accounting for the frame.
    pub gas: GasState,

    /// Output of the most recent nested call, read by `RETURNDATASIZE` and `RETURNDATACOPY`.
    pub last_call_return_data: Bytes,

    /// Set by a handler that moved the program counter itself.
    pub jumped: bool,

    pub(crate) stopped: Option<StopReason>,
    pub(crate) return_data: Bytes,
    pub(crate) storage_dirty: bool,
    pub(crate) last_traced_memory_change: Option<u64>,
    jumpdests: Vec<bool>,
}

impl ExecutionState {
    /// Creates the state of a frame running `code` for `message`.
    pub fn new(message: Message, code: Bytes, code_hash: B256) -> Self {
        let gas = GasState::new(message.gas);
        let jumpdests = analyze_jumpdests(&code);
        let calldata = if message.is_create() { Bytes::new() } else { message.data.clone() };
        Self {
            message,
            code,
            code_hash,
            calldata,
            stack: Stack::new(),
            memory: Memory::new(),
            pc: 0,
            gas,
            last_call_return_data: Bytes::new(),
            jumped: false,
            stopped: None,
            return_data: Bytes::new(),
            storage_dirty: false,
            last_traced_memory_change: None,
            jumpdests,
        }
    }

    /// How the frame stopped, if it did.
    pub fn stopped(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Pops the top of the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<U256, Error> {
        Ok(self.stack.pop()?)
    }

    /// Pops the top of the stack as an address.
    pub fn pop_address(&mut self) -> Result<Address, Error> {
        Ok(address_from_word(self.stack.pop()?))
    }

    /// Pushes a value onto the stack.
    #[inline]
    pub fn push(&mut self, value: U256) -> Result<(), Error> {
        Ok(self.stack.push(value)?)
    }

    /// Pushes `1` or `0`.
    pub fn push_bool(&mut self, condition: bool) -> Result<(), Error> {
        self.push(bool_word(condition))
    }

    /// Deducts `amount` from the frame's gas.
    #[inline]
    pub fn consume_gas(&mut self, amount: u64) -> Result<(), Error> {
        Ok(self.gas.consume(amount)?)
    }

    /// Charges for and performs the expansion of memory to cover `offset..offset + size`.
    ///
    /// This is the only path that grows memory.
    pub fn expand_memory(&mut self, offset: usize, size: usize) -> Result<(), Error> {
        let cost = self.memory.expansion_cost(offset, size);
        self.gas.consume_wide(cost)?;
        self.memory.extend(offset, size);
        Ok(())
    }

    /// Pops an offset and a size, then expands memory to cover them.
    pub fn pop_memory_range(&mut self) -> Result<(usize, usize), Error> {
        let offset = self.pop()?;
        let size = self.pop()?;
        let (offset, size) = memory_range(offset, size)?;
        self.expand_memory(offset, size)?;
        Ok((offset, size))
    }

    /// Returns true if `destination` is a `JUMPDEST` outside of any `PUSH` immediate.
    pub fn is_valid_jump(&self, destination: usize) -> bool {
        self.jumpdests.get(destination).copied().unwrap_or(false)
    }

    /// Stops the frame, keeping `return_data` as its output.
    pub(crate) fn stop(&mut self, reason: StopReason, return_data: Bytes) {
        self.stopped = Some(reason);
        self.return_data = return_data;
    }
}

/// Converts a memory range taken from the stack into native offsets.
///
/// Empty ranges never touch memory, so their offset is ignored. Ranges that do not fit in a
/// `usize` could never be paid for and fail with [`ExceptionalHalt::OutOfGas`].
pub fn memory_range(offset: U256, size: U256) -> Result<(usize, usize), ExceptionalHalt> {
    if size.is_zero() {
        return Ok((0, 0));
    }
    let offset = usize::try_from(offset).map_err(|_| ExceptionalHalt::OutOfGas)?;
    let size = usize::try_from(size).map_err(|_| ExceptionalHalt::OutOfGas)?;
    if offset.checked_add(size).is_none() {
        return Err(ExceptionalHalt::OutOfGas);
    }
    Ok((offset, size))
}

/// Marks every position of `code` that holds a `JUMPDEST` opcode, skipping `PUSH` immediates.
///
/// ```
/// use meridian_vm::core::vm::analyze_jumpdests;
///
/// // PUSH1 0x5b JUMPDEST
/// let jumpdests = analyze_jumpdests(&[0x60, 0x5b, 0x5b]);
/// assert_eq!(jumpdests, vec![false, false, true]);
/// ```
pub fn analyze_jumpdests(code: &[u8]) -> Vec<bool> {
    let mut jumpdests = vec![false; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        let opcode = code[pc];
        if opcode == JUMPDEST {
            jumpdests[pc] = true;
        } else if (PUSH1..=PUSH32).contains(&opcode) {
            pc += (opcode - PUSH1 + 1) as usize;
        }
        pc += 1;
    }
    jumpdests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_range() {
        assert_eq!(memory_range(U256::MAX, U256::ZERO), Ok((0, 0)));
        assert_eq!(memory_range(U256::from(32), U256::from(64)), Ok((32, 64)));
        assert_eq!(memory_range(U256::MAX, U256::from(1)), Err(ExceptionalHalt::OutOfGas));
    }

    #[test]
    fn test_jumpdests_skip_truncated_push() {
        // JUMPDEST PUSH2 0x5b
        assert_eq!(analyze_jumpdests(&[0x5b, 0x61, 0x5b]), vec![true, false, false]);
    }

    #[test]
    fn test_expand_memory_charges_gas() {
        let message = Message::call(Address::ZERO, Address::ZERO, U256::ZERO, 10, Bytes::new());
        let mut frame = ExecutionState::new(message, Bytes::new(), B256::ZERO);
        frame.expand_memory(0, 64).expect("enough gas");
        assert_eq!(frame.gas.remaining(), 4);
        assert_eq!(frame.memory.size(), 64);

        assert_eq!(
            frame.expand_memory(0, 32 * 10).map_err(|err| err.to_string()),
            Err("out of gas".to_string())
        );
        assert_eq!(frame.memory.size(), 64);
    }
}
