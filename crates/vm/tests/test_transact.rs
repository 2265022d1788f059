use alloy::primitives::{Address, Bytes, B256, U256};
use meridian_vm::{
    core::{
        env::{BlockEnv, TxEnv},
        hardfork::HardFork,
        message::Message,
        state::State,
        vm::{Evm, Transaction, TransactionReceipt, VmConfig},
    },
    Error, ExceptionalHalt,
};

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn contract() -> Address {
    Address::repeat_byte(0xcc)
}

fn funded_state() -> State {
    let mut state = State::new();
    state.set_balance(alice(), U256::from(10_000_000u64)).expect("state is consistent");
    state
}

fn transact(
    state: &mut State,
    fork: HardFork,
    block: BlockEnv,
    tx: Transaction,
) -> Result<TransactionReceipt, Error> {
    let mut evm = Evm::new(state, block, TxEnv::default(), VmConfig::new(fork));
    evm.transact(tx)
}

fn call_contract(gas_limit: u64) -> Transaction {
    Transaction { sender: alice(), to: Some(contract()), gas_limit, ..Default::default() }
}

#[test]
fn test_intrinsic_gas_is_required() {
    let mut state = funded_state();
    let tx = call_contract(20_999);
    let err = transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx)
        .expect_err("gas limit below intrinsic gas");

    assert!(matches!(err, Error::InvalidTransaction(_)));
    assert_eq!(state.get_nonce(alice()).expect("state is consistent"), 0);
}

#[test]
fn test_nonce_mismatch_is_rejected() {
    let mut state = funded_state();
    let tx = Transaction { nonce: Some(3), ..call_contract(21_000) };
    let err = transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx)
        .expect_err("nonce does not match");
    assert!(matches!(err, Error::InvalidTransaction(_)));
}

#[test]
fn test_insufficient_funds_are_rejected() {
    let mut state = State::new();
    let tx = Transaction { gas_price: U256::from(1), ..call_contract(21_000) };
    let err = transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx)
        .expect_err("sender can not pay for gas");
    assert!(matches!(err, Error::InvalidTransaction(_)));
}

#[test]
fn test_refund_is_capped() {
    let mut state = funded_state();
    // PUSH1 0 PUSH1 0 SSTORE STOP
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0x55, 0x00]))
        .expect("state is consistent");
    state.set_storage(contract(), U256::ZERO, U256::from(1)).expect("state is consistent");

    let receipt =
        transact(&mut state, HardFork::Istanbul, BlockEnv::default(), call_contract(100_000))
            .expect("valid transaction");

    // 21000 intrinsic, 6 for the pushes and 5000 for the reset, against a 15000 refund
    assert!(receipt.success);
    assert_eq!(receipt.gas_refunded, 26_006 / 2);
    assert_eq!(receipt.gas_used, 26_006 - 26_006 / 2);
    assert_eq!(state.get_storage(contract(), U256::ZERO).expect("state is consistent"), U256::ZERO);
}

#[test]
fn test_fees_are_settled() {
    let mut state = funded_state();
    let coinbase = Address::repeat_byte(0xcb);
    let block = BlockEnv { coinbase, base_fee: U256::from(7), ..Default::default() };
    let tx =
        Transaction { gas_price: U256::from(10), value: U256::from(5), ..call_contract(50_000) };

    let receipt = transact(&mut state, HardFork::London, block, tx).expect("valid transaction");
    assert_eq!(receipt.gas_used, 21_000);
    assert_eq!(
        state.get_balance(alice()).expect("state is consistent"),
        U256::from(10_000_000u64 - 21_000 * 10 - 5)
    );
    assert_eq!(state.get_balance(coinbase).expect("state is consistent"), U256::from(21_000 * 3));
    assert_eq!(state.get_balance(contract()).expect("state is consistent"), U256::from(5));
}

#[test]
fn test_gas_price_below_base_fee_is_rejected() {
    let mut state = funded_state();
    let block = BlockEnv { base_fee: U256::from(7), ..Default::default() };
    let tx = Transaction { gas_price: U256::from(6), ..call_contract(21_000) };
    let err = transact(&mut state, HardFork::London, block, tx).expect_err("price below base fee");
    assert!(matches!(err, Error::InvalidTransaction(_)));
}

#[test]
fn test_reverted_transaction_still_pays() {
    let mut state = funded_state();
    // PUSH1 0 PUSH1 0 REVERT
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0xfd]))
        .expect("state is consistent");

    let tx =
        Transaction { gas_price: U256::from(1), value: U256::from(9), ..call_contract(50_000) };
    let receipt = transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx)
        .expect("valid transaction");

    assert!(!receipt.success);
    assert!(receipt.reverted);
    assert_eq!(receipt.gas_used, 21_000 + 6);
    assert_eq!(state.get_nonce(alice()).expect("state is consistent"), 1);
    assert_eq!(state.get_balance(contract()).expect("state is consistent"), U256::ZERO);
    assert_eq!(
        state.get_balance(alice()).expect("state is consistent"),
        U256::from(10_000_000u64 - 21_006)
    );
}

#[test]
fn test_create_transaction() {
    let mut state = funded_state();
    // PUSH1 0x2a PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 RETURN
    let init_code =
        Bytes::from_static(&[0x60, 0x2a, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3]);
    let tx =
        Transaction { sender: alice(), data: init_code, gas_limit: 200_000, ..Default::default() };

    let receipt = transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx)
        .expect("valid transaction");

    let created = alice().create(0);
    assert!(receipt.success);
    assert_eq!(receipt.created_address, Some(created));
    assert!(receipt.return_data.is_empty());
    assert_eq!(state.get_code(created).expect("state is consistent"), Bytes::from_static(&[0x2a]));
    assert_eq!(state.get_nonce(alice()).expect("state is consistent"), 1);
}

#[test]
fn test_logs_are_collected() {
    let mut state = funded_state();
    // PUSH1 0x99 PUSH1 0 PUSH1 0 LOG1 STOP
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x99, 0x60, 0x00, 0x60, 0x00, 0xa1, 0x00]))
        .expect("state is consistent");

    let receipt =
        transact(&mut state, HardFork::Cancun, BlockEnv::default(), call_contract(100_000))
            .expect("valid transaction");

    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].address, contract());
    assert_eq!(receipt.logs[0].topics, vec![B256::with_last_byte(0x99)]);
    assert!(state.logs().is_empty());
}

#[test]
fn test_snapshot_restores_root() {
    let mut state = funded_state();
    let snapshot = state.snapshot();
    let root = state.root_hash();

    let tx = Transaction { value: U256::from(1), ..call_contract(21_000) };
    let receipt =
        transact(&mut state, HardFork::Cancun, BlockEnv::default(), tx).expect("valid transaction");
    assert_ne!(receipt.state_root, root);
    assert_eq!(receipt.state_root, state.root_hash());

    state.apply(&snapshot);
    assert_eq!(state.root_hash(), root);
    assert_eq!(state.get_nonce(alice()).expect("state is consistent"), 0);
}

#[test]
fn test_throw_on_fail_result() {
    let mut state = State::new();
    state.set_code(contract(), Bytes::from_static(&[0xfe])).expect("state is consistent");

    let config = VmConfig { throw_on_fail_result: true, ..VmConfig::new(HardFork::Cancun) };
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let message = Message::call(alice(), contract(), U256::ZERO, 100_000, Bytes::new());

    match evm.execute(message) {
        Err(Error::ExecutionFailed { halt, .. }) => {
            assert_eq!(halt, Some(ExceptionalHalt::InvalidOpcode(0xfe)))
        }
        other => panic!("expected a failed execution, got {other:?}"),
    }
}

#[test]
fn test_throw_on_fail_result_still_settles_transaction() {
    let mut state = funded_state();
    let coinbase = Address::repeat_byte(0xcb);
    // PUSH1 0 PUSH1 0 REVERT
    state
        .set_code(contract(), Bytes::from_static(&[0x60, 0x00, 0x60, 0x00, 0xfd]))
        .expect("state is consistent");

    let config = VmConfig { throw_on_fail_result: true, ..VmConfig::new(HardFork::Cancun) };
    let block = BlockEnv { coinbase, ..Default::default() };
    let mut evm = Evm::new(&mut state, block, TxEnv::default(), config);
    let tx = Transaction { gas_price: U256::from(1), ..call_contract(50_000) };

    match evm.transact(tx) {
        Err(Error::ExecutionFailed { halt, .. }) => assert_eq!(halt, None),
        other => panic!("expected a failed execution, got {other:?}"),
    }
    assert!(!state.is_warm(contract()));
    assert_eq!(state.get_nonce(alice()).expect("state is consistent"), 1);
    assert_eq!(
        state.get_balance(alice()).expect("state is consistent"),
        U256::from(10_000_000u64 - 21_006)
    );
    assert_eq!(state.get_balance(coinbase).expect("state is consistent"), U256::from(21_006));
}
