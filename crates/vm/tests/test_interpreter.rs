use alloy::primitives::{Address, Bytes, U256};
use meridian_vm::{
    core::{
        env::{BlockEnv, TxEnv},
        hardfork::HardFork,
        message::Message,
        state::State,
        vm::{Evm, ExecutionResult, VmConfig},
    },
    ExceptionalHalt,
};

// PUSH1 0 MSTORE PUSH1 0x20 PUSH1 0 RETURN
const RETURN_TOP: [u8; 8] = [0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

fn contract() -> Address {
    Address::repeat_byte(0xcc)
}

fn execute_with(state: &mut State, fork: HardFork, code: &[u8], gas: u64) -> ExecutionResult {
    state.set_code(contract(), Bytes::copy_from_slice(code)).expect("state is consistent");
    let mut evm = Evm::new(state, BlockEnv::default(), TxEnv::default(), VmConfig::new(fork));
    let message = Message::call(Address::ZERO, contract(), U256::ZERO, gas, Bytes::new());
    evm.execute(message).expect("execution failed")
}

fn execute(code: &[u8]) -> ExecutionResult {
    execute_with(&mut State::new(), HardFork::Cancun, code, 1_000_000)
}

/// Runs `code` followed by a `RETURN` of the word on top of the stack.
fn returned_word(code: &[u8]) -> U256 {
    let result = execute(&[code, &RETURN_TOP].concat());
    assert!(result.success, "execution halted: {:?}", result.halt);
    U256::from_be_slice(&result.return_data)
}

fn push32(word: U256) -> Vec<u8> {
    let mut code = vec![0x7f];
    code.extend_from_slice(&word.to_be_bytes::<32>());
    code
}

#[test]
fn test_add_program_returns_three() {
    // PUSH1 1 PUSH1 2 ADD
    assert_eq!(returned_word(&[0x60, 0x01, 0x60, 0x02, 0x01]), U256::from(3));
}

#[test]
fn test_add_wraps_around() {
    let code = [push32(U256::MAX), vec![0x60, 0x01, 0x01]].concat();
    assert_eq!(returned_word(&code), U256::ZERO);
}

#[test]
fn test_division_by_zero_is_zero() {
    // PUSH1 0 PUSH1 7 DIV
    assert_eq!(returned_word(&[0x60, 0x00, 0x60, 0x07, 0x04]), U256::ZERO);
    // PUSH1 0 PUSH1 7 MOD
    assert_eq!(returned_word(&[0x60, 0x00, 0x60, 0x07, 0x06]), U256::ZERO);
    // PUSH1 0 PUSH1 7 SDIV
    assert_eq!(returned_word(&[0x60, 0x00, 0x60, 0x07, 0x05]), U256::ZERO);
}

#[test]
fn test_sdiv_min_by_minus_one() {
    let min = U256::from(1) << 255;
    let code = [push32(U256::MAX), push32(min), vec![0x05]].concat();
    assert_eq!(returned_word(&code), min);
}

#[test]
fn test_sar_of_negative_value() {
    // PUSH32 -16 PUSH1 2 SAR == -4
    let minus_sixteen = U256::from(16).wrapping_neg();
    let code = [push32(minus_sixteen), vec![0x60, 0x02, 0x1d]].concat();
    assert_eq!(returned_word(&code), U256::from(4).wrapping_neg());

    // PUSH32 -16 PUSH2 0x0100 SAR == -1
    let code = [push32(minus_sixteen), vec![0x61, 0x01, 0x00, 0x1d]].concat();
    assert_eq!(returned_word(&code), U256::MAX);
}

#[test]
fn test_stack_underflow_consumes_all_gas() {
    let result = execute(&[0x01]);
    assert!(!result.success);
    assert_eq!(result.halt, Some(ExceptionalHalt::StackUnderflow));
    assert_eq!(result.gas_remaining, 0);
}

#[test]
fn test_stack_overflow() {
    let code = [0x60, 0x00].repeat(1025);
    let result = execute(&code);
    assert_eq!(result.halt, Some(ExceptionalHalt::StackOverflow));

    let code = [0x60, 0x00].repeat(1024);
    assert!(execute(&code).success);
}

#[test]
fn test_jump_into_push_data_is_invalid() {
    // PUSH1 4 JUMP PUSH1 0x5b
    let result = execute(&[0x60, 0x04, 0x56, 0x60, 0x5b]);
    assert_eq!(result.halt, Some(ExceptionalHalt::InvalidJump(4)));

    // PUSH1 4 JUMP INVALID JUMPDEST STOP
    assert!(execute(&[0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00]).success);
}

#[test]
fn test_truncated_push_fails() {
    let result = execute(&[0x61, 0x01]);
    assert_eq!(result.halt, Some(ExceptionalHalt::CodeOutOfBounds));
}

#[test]
fn test_push0_requires_shanghai() {
    let result = execute_with(&mut State::new(), HardFork::Paris, &[0x5f], 100_000);
    assert_eq!(result.halt, Some(ExceptionalHalt::InvalidOpcode(0x5f)));

    let result = execute_with(&mut State::new(), HardFork::Shanghai, &[0x5f], 100_000);
    assert!(result.success);
    assert_eq!(result.gas_remaining, 100_000 - 2);
}

#[test]
fn test_exp_gas_depends_on_fork() {
    // PUSH2 0x0100 PUSH1 2 EXP STOP
    let code = [0x61, 0x01, 0x00, 0x60, 0x02, 0x0a, 0x00];

    let homestead = execute_with(&mut State::new(), HardFork::Homestead, &code, 1_000);
    assert_eq!(homestead.gas_remaining, 1_000 - (3 + 3 + 10 + 2 * 10));

    let spurious = execute_with(&mut State::new(), HardFork::SpuriousDragon, &code, 1_000);
    assert_eq!(spurious.gas_remaining, 1_000 - (3 + 3 + 10 + 2 * 50));
}

#[test]
fn test_out_of_gas() {
    // PUSH1 1 PUSH1 2 ADD with 8 gas
    let result = execute_with(&mut State::new(), HardFork::Cancun, &[0x60, 1, 0x60, 2, 0x01], 8);
    assert_eq!(result.halt, Some(ExceptionalHalt::OutOfGas));
    assert_eq!(result.gas_remaining, 0);
}

#[test]
fn test_revert_keeps_data_and_rolls_back() {
    // PUSH1 1 PUSH1 0 SSTORE PUSH1 0x2a PUSH1 0 MSTORE PUSH1 0x20 PUSH1 0 REVERT
    let code = [
        0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xfd,
    ];
    let mut state = State::new();
    let result = execute_with(&mut state, HardFork::Cancun, &code, 100_000);

    assert!(!result.success);
    assert!(result.reverted);
    assert_eq!(result.halt, None);
    assert!(result.gas_remaining > 0);
    assert_eq!(U256::from_be_slice(&result.return_data), U256::from(0x2a));
    assert_eq!(state.get_storage(contract(), U256::ZERO).expect("state is consistent"), U256::ZERO);
}

#[test]
fn test_sstore_persists_on_success() {
    // PUSH1 7 PUSH1 1 SSTORE
    let mut state = State::new();
    let code = [0x60, 0x07, 0x60, 0x01, 0x55];
    let result = execute_with(&mut state, HardFork::Cancun, &code, 100_000);
    assert!(result.success);
    assert_eq!(
        state.get_storage(contract(), U256::from(1)).expect("state is consistent"),
        U256::from(7)
    );
}

#[test]
fn test_static_frame_rejects_sstore() {
    let mut state = State::new();
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55]))
        .expect("state is consistent");

    let config = VmConfig::new(HardFork::Cancun);
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let mut message = Message::call(Address::ZERO, contract(), U256::ZERO, 100_000, Bytes::new());
    message.is_static = true;
    let result = evm.execute(message).expect("execution failed");

    assert_eq!(result.halt, Some(ExceptionalHalt::StaticViolation("SSTORE")));
}

#[test]
fn test_tracing_records_single_exception() {
    let mut state = State::new();
    state.set_code(contract(), Bytes::from_static(&[0xfe])).expect("state is consistent");

    let config = VmConfig { tracing: true, ..VmConfig::new(HardFork::Cancun) };
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let message = Message::call(Address::ZERO, contract(), U256::ZERO, 100_000, Bytes::new());
    let result = evm.execute(message).expect("execution failed");
    assert_eq!(result.halt, Some(ExceptionalHalt::InvalidOpcode(0xfe)));

    let trace = evm.take_trace().expect("tracing is enabled");
    assert_eq!(trace.points.len(), 1);
    assert_eq!(trace.points[0].opcode, "INVALID");
    assert_eq!(trace.exceptions.len(), 1);
    assert_eq!(trace.exceptions[0].trace_index, Some(0));
    assert_eq!(trace.exceptions[0].halt, ExceptionalHalt::InvalidOpcode(0xfe));
}

#[test]
fn test_tracing_records_gas_cost_and_storage() {
    // PUSH1 7 PUSH1 1 SSTORE STOP
    let mut state = State::new();
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x07, 0x60, 0x01, 0x55, 0x00]))
        .expect("state is consistent");

    let config = VmConfig { tracing: true, ..VmConfig::new(HardFork::Istanbul) };
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let message = Message::call(Address::ZERO, contract(), U256::ZERO, 100_000, Bytes::new());
    assert!(evm.execute(message).expect("execution failed").success);

    let trace = evm.take_trace().expect("tracing is enabled");
    let opcodes: Vec<_> = trace.points.iter().map(|point| point.opcode).collect();
    assert_eq!(opcodes, vec!["PUSH1", "PUSH1", "SSTORE", "STOP"]);
    assert_eq!(trace.points[0].gas_cost, 3);
    assert_eq!(trace.points[2].gas_cost, 20_000);
    assert_eq!(trace.points[2].stack, vec![U256::from(1), U256::from(7)]);

    let storage = trace.points[3].storage.as_ref().expect("storage changed");
    assert_eq!(storage.get(&U256::from(1)), Some(&U256::from(7)));
    assert!(trace.exceptions.is_empty());
}

#[test]
fn test_tracing_restarts_for_each_execution() {
    let mut state = State::new();
    state.set_code(contract(), Bytes::from_static(&[0xfe])).expect("state is consistent");
    let stopper = Address::repeat_byte(0xdd);
    state.set_code(stopper, Bytes::from_static(&[0x00])).expect("state is consistent");

    let config = VmConfig { tracing: true, ..VmConfig::new(HardFork::Cancun) };
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let message = Message::call(Address::ZERO, contract(), U256::ZERO, 100_000, Bytes::new());
    evm.execute(message).expect("execution failed");
    assert_eq!(evm.trace().expect("tracing is enabled").exceptions.len(), 1);

    let message = Message::call(Address::ZERO, stopper, U256::ZERO, 100_000, Bytes::new());
    evm.execute(message).expect("execution failed");
    let trace = evm.take_trace().expect("tracing is enabled");
    let opcodes: Vec<_> = trace.points.iter().map(|point| point.opcode).collect();
    assert_eq!(opcodes, vec!["STOP"]);
    assert!(trace.exceptions.is_empty());
}

#[test]
fn test_sstore_noop_on_cold_slot() {
    // PUSH1 0 PUSH1 0 SSTORE STOP
    let code = [0x60, 0x00, 0x60, 0x00, 0x55, 0x00];
    for (fork, cost) in [
        (HardFork::Petersburg, 5_000),
        (HardFork::Istanbul, 800),
        (HardFork::Berlin, 2_200),
        (HardFork::Cancun, 2_200),
    ] {
        let result = execute_with(&mut State::new(), fork, &code, 100_000);
        assert!(result.success, "{fork:?} halted: {:?}", result.halt);
        assert_eq!(result.gas_remaining, 100_000 - 6 - cost, "{fork:?}");
        assert_eq!(result.gas_refunded, 0, "{fork:?}");
    }
}

#[test]
fn test_sstore_dirty_slot_is_charged_as_a_read() {
    // PUSH1 1 PUSH1 0 SSTORE PUSH1 2 PUSH1 0 SSTORE
    let code = [0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x02, 0x60, 0x00, 0x55];
    for (fork, cost) in [
        (HardFork::Byzantium, 20_000 + 5_000),
        (HardFork::Constantinople, 20_000 + 200),
        (HardFork::Petersburg, 20_000 + 5_000),
        (HardFork::Istanbul, 20_000 + 800),
        (HardFork::Cancun, 22_100 + 100),
    ] {
        let mut state = State::new();
        let result = execute_with(&mut state, fork, &code, 100_000);
        assert!(result.success, "{fork:?} halted: {:?}", result.halt);
        assert_eq!(result.gas_remaining, 100_000 - 12 - cost, "{fork:?}");
        assert_eq!(
            state.get_storage(contract(), U256::ZERO).expect("state is consistent"),
            U256::from(2)
        );
    }
}

#[test]
fn test_sstore_restoring_original_value_refunds() {
    // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 SSTORE STOP
    let code = [0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0x55, 0x00];
    let result = execute_with(&mut State::new(), HardFork::Cancun, &code, 100_000);
    assert!(result.success);
    assert_eq!(result.gas_remaining, 100_000 - 12 - 22_100 - 100);
    assert_eq!(result.gas_refunded, 20_000 - 100);

    // a slot holding 1 is cleared and written back
    let mut state = State::new();
    state.set_storage(contract(), U256::ZERO, U256::from(1)).expect("state is consistent");
    let code = [0x60, 0x00, 0x60, 0x00, 0x55, 0x60, 0x01, 0x60, 0x00, 0x55, 0x00];
    let result = execute_with(&mut state, HardFork::Cancun, &code, 100_000);
    assert!(result.success);
    assert_eq!(result.gas_remaining, 100_000 - 12 - (2_900 + 2_100) - 100);
    // the clear refund is withdrawn again, leaving the restore refund
    assert_eq!(result.gas_refunded, 2_900 - 100);
}
