use alloy::primitives::{keccak256, Bytes, U256};
use meridian_trie::EMPTY_ROOT;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "step-tracing")]
use tracing::trace;

use crate::{
    core::{
        constants::{MAX_CODE_SIZE, MAX_STACK_SIZE},
        env::{BlockEnv, TxEnv},
        gas::{GasSchedule, CODE_DEPOSIT_BYTE},
        hardfork::HardFork,
        message::Message,
        opcodes::Instruction,
        state::State,
        trace::{ExecutionTrace, TracePoint},
    },
    error::{Error, ExceptionalHalt},
};

use super::{
    execution::{ExecutionResult, ExecutionState, StopReason},
    handlers,
};

/// Settings of a [`Evm`] instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// The fork whose rules and gas costs apply.
    pub hardfork: HardFork,

    /// Record an [`ExecutionTrace`] for every top-level execution.
    pub tracing: bool,

    /// Return a failed top-level execution as [`Error::ExecutionFailed`] instead of a failed
    /// [`ExecutionResult`].
    pub throw_on_fail_result: bool,
}

impl VmConfig {
    /// A configuration for `hardfork` with tracing disabled.
    pub fn new(hardfork: HardFork) -> Self {
        Self { hardfork, ..Default::default() }
    }
}

/// The [`Evm`] struct runs messages and transactions against a [`State`].
///
/// It holds the block and transaction environment, the gas schedule of the configured fork and
/// the trace of the current transaction. Nested calls run recursively through
/// [`Evm::execute`].
///
/// ```
/// use alloy::primitives::{Address, Bytes, U256};
/// use meridian_vm::core::{
///     env::{BlockEnv, TxEnv},
///     message::Message,
///     state::State,
///     vm::{Evm, VmConfig},
/// };
///
/// let contract = Address::repeat_byte(0xcc);
/// let mut state = State::new();
/// // PUSH1 1 PUSH1 2 ADD PUSH1 0 MSTORE PUSH1 0x20 PUSH1 0 RETURN
/// let code = [0x60, 0x01, 0x60, 0x02, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
/// state.set_code(contract, Bytes::copy_from_slice(&code)).expect("state is consistent");
///
/// let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), VmConfig::default());
/// let message = Message::call(Address::ZERO, contract, U256::ZERO, 100_000, Bytes::new());
/// let result = evm.execute(message).expect("execution failed");
///
/// assert!(result.success);
/// assert_eq!(U256::from_be_slice(&result.return_data), U256::from(3));
/// ```
#[derive(Debug)]
pub struct Evm<'a> {
    /// The world state messages run against.
    pub state: &'a mut State,

    /// The block being built.
    pub block: BlockEnv,

    /// The transaction being run.
    pub tx: TxEnv,

    /// Settings.
    pub config: VmConfig,

    /// Gas costs of the configured fork.
    pub schedule: GasSchedule,

    pub(crate) trace: Option<ExecutionTrace>,
}

impl<'a> Evm<'a> {
    /// Creates a new [`Evm`] over `state`.
    pub fn new(state: &'a mut State, block: BlockEnv, tx: TxEnv, config: VmConfig) -> Self {
        Self {
            state,
            block,
            tx,
            schedule: GasSchedule::for_fork(config.hardfork),
            config,
            trace: None,
        }
    }

    /// The trace recorded so far, if tracing is enabled.
    pub fn trace(&self) -> Option<&ExecutionTrace> {
        self.trace.as_ref()
    }

    /// Takes the recorded trace, leaving none behind.
    pub fn take_trace(&mut self) -> Option<ExecutionTrace> {
        self.trace.take()
    }

    /// Executes `message`, rolling back every state change it made unless it succeeds.
    ///
    /// Exceptional halts are absorbed into a failed [`ExecutionResult`] and recorded in the
    /// trace; only fatal errors (and, with `throw_on_fail_result`, failed top-level executions)
    /// are returned as [`Err`].
    pub fn execute(&mut self, message: Message) -> Result<ExecutionResult, Error> {
        let depth = message.depth;
        let result = self.execute_message(message)?;
        if depth == 0 && !result.success && self.config.throw_on_fail_result {
            return Err(result.into_error());
        }
        Ok(result)
    }

    /// [`Evm::execute`] without the `throw_on_fail_result` conversion. Every top-level
    /// execution starts a fresh trace.
    pub(crate) fn execute_message(&mut self, message: Message) -> Result<ExecutionResult, Error> {
        let depth = message.depth;
        if depth == 0 && self.config.tracing {
            self.trace = Some(ExecutionTrace::new());
        }
        debug!(
            depth,
            kind = ?message.kind,
            sender = %message.sender,
            to = %message.to,
            gas = message.gas,
            "executing message"
        );

        let snapshot = self.state.snapshot();
        let result = match self.run_message(message) {
            Ok(result) => result,
            Err(Error::Halt(halt)) => {
                debug!(depth, %halt, "frame halted");
                if let Some(trace) = self.trace.as_mut() {
                    trace.record_exception(halt.clone());
                }
                ExecutionResult::halted(halt)
            }
            Err(err) => return Err(err),
        };

        if !result.success {
            self.state.apply(&snapshot);
        }
        debug!(
            depth,
            success = result.success,
            reverted = result.reverted,
            gas_remaining = result.gas_remaining,
            "message finished"
        );
        Ok(result)
    }

    /// Prepares the target account, moves the value and runs the frame. Halts are returned as
    /// errors and turned into failed results by [`Evm::execute`].
    fn run_message(&mut self, message: Message) -> Result<ExecutionResult, Error> {
        let fork = self.config.hardfork;

        if message.is_transferring_value &&
            !message.value.is_zero() &&
            self.state.get_balance(message.sender)? < message.value
        {
            return Ok(ExecutionResult::rejected(ExceptionalHalt::InsufficientBalance, message.gas));
        }

        if message.is_create() {
            let target = message.to;
            if self
                .state
                .get_account(target)?
                .is_some_and(|account| {
                    account.has_code() || account.nonce != 0 || account.storage_root != *EMPTY_ROOT
                })
            {
                return Err(ExceptionalHalt::CreateCollision.into());
            }

            // a pre-funded address keeps its balance, anything else it held is reset
            let balance = self.state.get_balance(target)?;
            self.state.remove_account(target)?;
            self.state.set_balance(target, balance)?;
            if fork.is_active(HardFork::SpuriousDragon) {
                self.state.set_nonce(target, 1)?;
            }
            self.state.mark_created(target);
        }

        if message.is_transferring_value {
            if !message.value.is_zero() {
                self.state.transfer(message.sender, message.to, message.value)?;
            } else if fork.is_active(HardFork::SpuriousDragon) {
                self.state.touch(message.to);
            } else {
                self.state.add_balance(message.to, U256::ZERO)?;
            }
        }

        let (code, code_hash) = if message.is_create() {
            (message.data.clone(), keccak256(&message.data))
        } else {
            (
                self.state.get_code(message.code_address)?,
                self.state.get_code_hash(message.code_address)?,
            )
        };

        let mut frame = ExecutionState::new(message, code, code_hash);
        self.run_frame(&mut frame)?;

        if frame.stopped == Some(StopReason::Revert) {
            return Ok(ExecutionResult {
                return_data: frame.return_data,
                gas_remaining: frame.gas.remaining(),
                reverted: true,
                ..Default::default()
            });
        }

        let mut result = ExecutionResult {
            return_data: frame.return_data.clone(),
            gas_remaining: frame.gas.remaining(),
            gas_refunded: frame.gas.refunded(),
            refund_debt: frame.gas.refund_debt(),
            success: true,
            ..Default::default()
        };

        if frame.message.is_create() {
            let code = self.deposit_code(&mut frame)?;
            let address = frame.message.to;
            debug!(%address, size = code.len(), "deployed contract");
            self.state.set_code(address, code)?;
            result.return_data = Bytes::new();
            result.gas_remaining = frame.gas.remaining();
            result.created_address = Some(address);
        }
        Ok(result)
    }

    /// Validates and pays for the code a creation frame returned.
    fn deposit_code(&mut self, frame: &mut ExecutionState) -> Result<Bytes, Error> {
        let fork = self.config.hardfork;
        let code = std::mem::take(&mut frame.return_data);

        if fork.is_active(HardFork::SpuriousDragon) && code.len() > MAX_CODE_SIZE {
            return Err(ExceptionalHalt::CodeSizeExceeded.into());
        }
        if fork.is_active(HardFork::London) && code.first() == Some(&0xef) {
            return Err(ExceptionalHalt::InvalidCodePrefix.into());
        }

        let cost = CODE_DEPOSIT_BYTE.saturating_mul(code.len() as u64);
        match frame.gas.consume(cost) {
            Ok(()) => Ok(code),
            // Frontier keeps the account but leaves it without code
            Err(_) if !fork.is_active(HardFork::Homestead) => Ok(Bytes::new()),
            Err(halt) => Err(halt.into()),
        }
    }

    /// Runs the frame until it stops, halts or runs off the end of its code.
    pub(crate) fn run_frame(&mut self, frame: &mut ExecutionState) -> Result<(), Error> {
        while frame.stopped.is_none() {
            let Some(&opcode) = frame.code.get(frame.pc) else {
                // running off the end of the code is an implicit STOP
                break;
            };
            let instruction = Instruction::decode(opcode);
            let gas_before = frame.gas.remaining();
            let trace_index = self.record_step(frame, instruction)?;

            if !instruction.is_active(self.config.hardfork) {
                return Err(ExceptionalHalt::InvalidOpcode(opcode).into());
            }
            if let Some(info) = instruction.info() {
                let inputs = info.inputs() as usize;
                let outputs = info.outputs() as usize;
                if frame.stack.size() < inputs {
                    return Err(ExceptionalHalt::StackUnderflow.into());
                }
                if frame.stack.size() - inputs + outputs > MAX_STACK_SIZE {
                    return Err(ExceptionalHalt::StackOverflow.into());
                }
                if frame.message.is_static && info.writes_state() {
                    return Err(ExceptionalHalt::StaticViolation(info.name()).into());
                }
            }
            frame.consume_gas(self.schedule.static_cost(instruction))?;

            #[cfg(feature = "step-tracing")]
            trace!(
                depth = frame.message.depth,
                pc = frame.pc,
                opcode = instruction.name(),
                gas = gas_before,
                stack = %frame.stack,
                "executing opcode"
            );

            self.dispatch(frame, instruction)?;

            if let Some(point) = trace_index.and_then(|index| {
                self.trace.as_mut().and_then(|trace| trace.points.get_mut(index))
            }) {
                point.gas_cost = gas_before.saturating_sub(frame.gas.remaining());
            }

            if frame.jumped {
                frame.jumped = false;
            } else {
                frame.pc += 1;
            }
        }
        Ok(())
    }

    /// Appends a trace point for the instruction about to run, when tracing.
    fn record_step(
        &mut self,
        frame: &mut ExecutionState,
        instruction: Instruction,
    ) -> Result<Option<usize>, Error> {
        if self.trace.is_none() {
            return Ok(None);
        }

        let change_count = frame.memory.change_count();
        let memory = if frame.last_traced_memory_change != Some(change_count) {
            frame.last_traced_memory_change = Some(change_count);
            Some(frame.memory.memory.clone())
        } else {
            None
        };
        let storage = if frame.storage_dirty {
            frame.storage_dirty = false;
            Some(self.state.storage_dictionary(frame.message.to)?)
        } else {
            None
        };

        let point = TracePoint {
            code_hash: frame.code_hash,
            contract_address: frame.message.to,
            depth: frame.message.depth,
            opcode: instruction.name(),
            pc: frame.pc,
            gas: frame.gas.remaining(),
            gas_cost: 0,
            stack: frame.stack.snapshot(),
            memory,
            storage,
        };
        Ok(self.trace.as_mut().map(|trace| trace.record(point)))
    }

    fn dispatch(
        &mut self,
        frame: &mut ExecutionState,
        instruction: Instruction,
    ) -> Result<(), Error> {
        use handlers::*;

        match instruction {
            Instruction::Stop => control::stop(self, frame),

            Instruction::Add => arithmetic::add(self, frame),
            Instruction::Mul => arithmetic::mul(self, frame),
            Instruction::Sub => arithmetic::sub(self, frame),
            Instruction::Div => arithmetic::div(self, frame),
            Instruction::SDiv => arithmetic::sdiv(self, frame),
            Instruction::Mod => arithmetic::modulo(self, frame),
            Instruction::SMod => arithmetic::smod(self, frame),
            Instruction::AddMod => arithmetic::addmod(self, frame),
            Instruction::MulMod => arithmetic::mulmod(self, frame),
            Instruction::Exp => arithmetic::exp(self, frame),
            Instruction::SignExtend => arithmetic::signextend(self, frame),

            Instruction::Lt => comparison::lt(self, frame),
            Instruction::Gt => comparison::gt(self, frame),
            Instruction::Slt => comparison::slt(self, frame),
            Instruction::Sgt => comparison::sgt(self, frame),
            Instruction::Eq => comparison::eq(self, frame),
            Instruction::IsZero => comparison::iszero(self, frame),

            Instruction::And => bitwise::and(self, frame),
            Instruction::Or => bitwise::or(self, frame),
            Instruction::Xor => bitwise::xor(self, frame),
            Instruction::Not => bitwise::not(self, frame),
            Instruction::Byte => bitwise::byte(self, frame),
            Instruction::Shl => bitwise::shl(self, frame),
            Instruction::Shr => bitwise::shr(self, frame),
            Instruction::Sar => bitwise::sar(self, frame),

            Instruction::Sha3 => crypto::sha3(self, frame),

            Instruction::Address => environment::address(self, frame),
            Instruction::Balance => environment::balance(self, frame),
            Instruction::Origin => environment::origin(self, frame),
            Instruction::Caller => environment::caller(self, frame),
            Instruction::CallValue => environment::callvalue(self, frame),
            Instruction::CallDataLoad => environment::calldataload(self, frame),
            Instruction::CallDataSize => environment::calldatasize(self, frame),
            Instruction::CallDataCopy => environment::calldatacopy(self, frame),
            Instruction::CodeSize => environment::codesize(self, frame),
            Instruction::CodeCopy => environment::codecopy(self, frame),
            Instruction::GasPrice => environment::gasprice(self, frame),
            Instruction::ExtCodeSize => environment::extcodesize(self, frame),
            Instruction::ExtCodeCopy => environment::extcodecopy(self, frame),
            Instruction::ReturnDataSize => environment::returndatasize(self, frame),
            Instruction::ReturnDataCopy => environment::returndatacopy(self, frame),
            Instruction::ExtCodeHash => environment::extcodehash(self, frame),
            Instruction::SelfBalance => environment::selfbalance(self, frame),

            Instruction::BlockHash => block::blockhash(self, frame),
            Instruction::Coinbase => block::coinbase(self, frame),
            Instruction::Timestamp => block::timestamp(self, frame),
            Instruction::Number => block::number(self, frame),
            Instruction::Difficulty => block::difficulty(self, frame),
            Instruction::GasLimit => block::gaslimit(self, frame),
            Instruction::ChainId => block::chainid(self, frame),
            Instruction::BaseFee => block::basefee(self, frame),
            Instruction::BlobHash => block::blobhash(self, frame),
            Instruction::BlobBaseFee => block::blobbasefee(self, frame),

            Instruction::Pop => stack::pop(self, frame),
            Instruction::Push0 => stack::push0(self, frame),
            Instruction::Push(size) => stack::push_n(self, frame, size),
            Instruction::Dup(n) => stack::dup_n(self, frame, n),
            Instruction::Swap(n) => stack::swap_n(self, frame, n),

            Instruction::MLoad => memory::mload(self, frame),
            Instruction::MStore => memory::mstore(self, frame),
            Instruction::MStore8 => memory::mstore8(self, frame),
            Instruction::MSize => memory::msize(self, frame),
            Instruction::MCopy => memory::mcopy(self, frame),

            Instruction::SLoad => storage::sload(self, frame),
            Instruction::SStore => storage::sstore(self, frame),
            Instruction::TLoad => storage::tload(self, frame),
            Instruction::TStore => storage::tstore(self, frame),

            Instruction::Jump => control::jump(self, frame),
            Instruction::JumpI => control::jumpi(self, frame),
            Instruction::JumpDest => control::jumpdest(self, frame),
            Instruction::Pc => control::pc(self, frame),
            Instruction::Gas => control::gas(self, frame),
            Instruction::Invalid(opcode) => control::invalid(self, frame, opcode),

            Instruction::Log(topics) => logging::log_n(self, frame, topics),

            Instruction::Create => system::create(self, frame),
            Instruction::Create2 => system::create2(self, frame),
            Instruction::Call => system::call(self, frame),
            Instruction::CallCode => system::callcode(self, frame),
            Instruction::DelegateCall => system::delegatecall(self, frame),
            Instruction::StaticCall => system::staticcall(self, frame),
            Instruction::Return => system::op_return(self, frame),
            Instruction::Revert => system::revert(self, frame),
            Instruction::SelfDestruct => system::selfdestruct(self, frame),
        }
    }
}
