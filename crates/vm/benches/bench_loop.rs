//! Benchmarks for the interpreter loop: a tight countdown and a hashing loop.

use alloy::primitives::{Address, Bytes, U256};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use meridian_common::utils::strings::decode_hex;
use meridian_vm::core::{
    env::{BlockEnv, TxEnv},
    hardfork::HardFork,
    message::Message,
    state::State,
    vm::{Evm, VmConfig},
};

// PUSH2 0x2710 JUMPDEST PUSH1 1 SWAP1 SUB DUP1 PUSH1 3 JUMPI STOP
const COUNTDOWN: &str = "0x6127105b600190038060035700";

// PUSH2 0x03e8 JUMPDEST DUP1 PUSH1 0 MSTORE PUSH1 0x20 PUSH1 0 SHA3 POP
// PUSH1 1 SWAP1 SUB DUP1 PUSH1 3 JUMPI STOP
const HASHES: &str = "0x6103e85b80600052602060002050600190038060035700";

fn run(code: &[u8]) -> u64 {
    let contract = Address::repeat_byte(0xcc);
    let mut state = State::new();
    state.set_code(contract, Bytes::copy_from_slice(code)).expect("state is consistent");

    let config = VmConfig::new(HardFork::Cancun);
    let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    let message = Message::call(Address::ZERO, contract, U256::ZERO, 30_000_000, Bytes::new());
    let result = evm.execute(message).expect("evm panic");
    assert!(result.success);
    result.gas_remaining
}

fn test_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("meridian_vm");

    let countdown = decode_hex(COUNTDOWN).expect("invalid bytecode");
    let hashes = decode_hex(HASHES).expect("invalid bytecode");

    group.sample_size(100);
    group.bench_function(BenchmarkId::from_parameter("countdown"), |b| b.iter(|| run(&countdown)));
    group.bench_function(BenchmarkId::from_parameter("hashes"), |b| b.iter(|| run(&hashes)));

    group.finish();
}

criterion_group!(benches, test_loops);
criterion_main!(benches);
