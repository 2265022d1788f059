//! The `exec` subcommand: runs bytecode against a fresh in-memory world state.

use std::{collections::BTreeMap, path::Path};

use alloy::primitives::{address, Address, Bytes, U256};
use clap::Parser;
use meridian_common::utils::{io::file::read_file, strings::decode_hex};
use meridian_config::Configuration;
use meridian_vm::core::{
    env::TxEnv,
    hardfork::HardFork,
    state::State,
    trace::ExecutionTrace,
    vm::{Evm, Transaction, TransactionReceipt},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Error;

/// The externally owned account sending every `exec` transaction.
const SENDER: Address = address!("0x00000000000000000000000000000000000ca11e");

/// Where the bytecode lives when it is run as runtime code.
const CONTRACT: Address = address!("0x000000000000000000000000000000000000c0de");

/// Command line arguments for the exec command
#[derive(Debug, Clone, Parser)]
#[clap(
    about = "Execute EVM bytecode against an empty in-memory state",
    override_usage = "meridian exec <BYTECODE> [OPTIONS]"
)]
pub(crate) struct ExecArgs {
    /// The bytecode to run, as hex or as a path to a file containing hex.
    #[clap(required = true)]
    pub(crate) target: String,

    /// Calldata passed to the bytecode, as hex.
    #[clap(long, short, default_value = "")]
    pub(crate) calldata: String,

    /// The gas limit of the transaction. Defaults to the configured gas limit.
    #[clap(long, short)]
    pub(crate) gas: Option<u64>,

    /// Wei sent along with the transaction.
    #[clap(long, short, default_value = "0")]
    pub(crate) value: U256,

    /// The fork to execute under. Defaults to the configured fork.
    #[clap(long)]
    pub(crate) hardfork: Option<HardFork>,

    /// Record and print a per-instruction execution trace.
    #[clap(long)]
    pub(crate) trace: bool,

    /// Run the bytecode as init code in a contract creation.
    #[clap(long)]
    pub(crate) create: bool,

    /// The output directory to write the result to, or 'print' to print it to the console.
    #[clap(long = "output", short = 'o', default_value = "print", hide_default_value = true)]
    pub(crate) output: String,
}

/// The printed result of an `exec` run.
#[derive(Debug, Serialize)]
pub(crate) struct ExecOutput {
    #[serde(flatten)]
    pub(crate) receipt: TransactionReceipt,

    /// Storage of every account left with code, keyed by account.
    pub(crate) storage: BTreeMap<Address, BTreeMap<U256, U256>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) trace: Option<ExecutionTrace>,
}

/// Reads `target` as hex, or as a file holding hex.
fn read_bytecode(target: &str) -> Result<Vec<u8>, Error> {
    let contents = if Path::new(target).is_file() {
        read_file(target).map_err(|e| Error::Generic(format!("failed to read bytecode: {e}")))?
    } else {
        target.to_string()
    };

    decode_hex(contents.trim()).map_err(|e| Error::Generic(format!("invalid bytecode: {e}")))
}

/// Runs the `exec` command.
pub(crate) fn exec(args: ExecArgs, configuration: &Configuration) -> Result<ExecOutput, Error> {
    let code = read_bytecode(&args.target)?;
    let calldata = decode_hex(&args.calldata)
        .map_err(|e| Error::Generic(format!("invalid calldata: {e}")))?;

    let mut config = configuration.vm_config();
    if let Some(hardfork) = args.hardfork {
        config.hardfork = hardfork;
    }
    config.tracing |= args.trace;
    let gas_limit = args.gas.unwrap_or(configuration.gas_limit);

    let mut state = State::new();
    state.set_balance(SENDER, args.value)?;

    let tx = if args.create {
        Transaction {
            sender: SENDER,
            to: None,
            value: args.value,
            data: Bytes::from(code),
            gas_limit,
            ..Default::default()
        }
    } else {
        state.set_code(CONTRACT, Bytes::from(code))?;
        Transaction {
            sender: SENDER,
            to: Some(CONTRACT),
            value: args.value,
            data: Bytes::from(calldata),
            gas_limit,
            ..Default::default()
        }
    };

    debug!(hardfork = %config.hardfork, gas_limit, create = args.create, "executing bytecode");
    let mut evm = Evm::new(&mut state, configuration.block_env(), TxEnv::default(), config);
    let receipt = evm.transact(tx)?;
    let trace = evm.take_trace();

    let storage = state
        .accounts()?
        .into_iter()
        .filter(|(_, account)| account.has_code())
        .map(|(address, _)| Ok((address, state.storage_dictionary(address)?)))
        .collect::<Result<BTreeMap<_, _>, Error>>()?;

    info!(success = receipt.success, gas_used = receipt.gas_used, "execution finished");
    Ok(ExecOutput { receipt, storage, trace })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(target: &str) -> ExecArgs {
        ExecArgs {
            target: target.to_string(),
            calldata: String::new(),
            gas: Some(100_000),
            value: U256::ZERO,
            hardfork: None,
            trace: false,
            create: false,
            output: "print".to_string(),
        }
    }

    #[test]
    fn test_exec_returns_sum() {
        let output = exec(args("0x600160020160005260206000f3"), &Configuration::default())
            .expect("exec failed");

        assert!(output.receipt.success);
        assert_eq!(U256::from_be_slice(&output.receipt.return_data), U256::from(3));
        assert!(output.trace.is_none());
    }

    #[test]
    fn test_exec_records_trace_and_storage() {
        // PUSH1 7 PUSH1 1 SSTORE
        let mut args = args("0x6007600155");
        args.trace = true;
        args.hardfork = Some(HardFork::Istanbul);

        let output = exec(args, &Configuration::default()).expect("exec failed");
        let trace = output.trace.expect("tracing was requested");
        assert_eq!(trace.points.len(), 3);
        assert_eq!(output.storage[&CONTRACT][&U256::from(1)], U256::from(7));

        let json = serde_json::to_value(&output.receipt).expect("receipt serializes");
        assert_eq!(json["success"], serde_json::Value::Bool(true));
    }

    #[test]
    fn test_exec_create() {
        // init code deploying the single byte 0x2a
        let mut args = args("0x602a60005360016000f3");
        args.create = true;

        let output = exec(args, &Configuration::default()).expect("exec failed");
        assert_eq!(output.receipt.created_address, Some(SENDER.create(0)));
        assert!(output.storage.contains_key(&SENDER.create(0)));
    }

    #[test]
    fn test_exec_rejects_bad_hex() {
        assert!(exec(args("0xzz"), &Configuration::default()).is_err());
    }
}
