use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    core::{
        constants::MAX_INITCODE_SIZE,
        env::TxEnv,
        hardfork::HardFork,
        log::Log,
        message::Message,
    },
    error::{Error, ExceptionalHalt},
};

use super::core::Evm;

/// A transaction to run with [`Evm::transact`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    /// The externally owned account paying for the transaction.
    pub sender: Address,
    /// The called account, or `None` to deploy `data` as init code.
    pub to: Option<Address>,
    /// Wei sent along.
    pub value: U256,
    /// Call data, or init code for creations.
    pub data: Bytes,
    /// The gas bought for the transaction.
    pub gas_limit: u64,
    /// The price paid per unit of gas.
    pub gas_price: U256,
    /// The expected sender nonce. Not checked when `None`.
    pub nonce: Option<u64>,
    /// Versioned hashes of the blobs carried by the transaction.
    pub blob_hashes: Vec<B256>,
}

/// The outcome of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    /// True if the top-level execution succeeded.
    pub success: bool,
    /// True if the top-level execution ended in `REVERT`.
    pub reverted: bool,
    /// The exception that halted the top-level execution.
    pub halt: Option<ExceptionalHalt>,
    /// Gas paid for, after the refund.
    pub gas_used: u64,
    /// Gas refunded to the sender from the refund counter.
    pub gas_refunded: u64,
    /// Output of the top-level execution.
    pub return_data: Bytes,
    /// The deployed contract, for successful creations.
    pub created_address: Option<Address>,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
    /// The world state root after the transaction.
    pub state_root: B256,
}

impl Evm<'_> {
    /// Runs a transaction: validates it, buys its gas, executes it and settles fees and refunds.
    ///
    /// Validation failures are returned as [`Error::InvalidTransaction`] before the state is
    /// touched. A failed execution still produces a receipt, and the sender still pays for the
    /// gas it used. With `throw_on_fail_result` the failure is returned as
    /// [`Error::ExecutionFailed`] once fees are settled and the transaction is finalized.
    ///
    /// ```
    /// use alloy::primitives::{Address, U256};
    /// use meridian_vm::core::{
    ///     env::{BlockEnv, TxEnv},
    ///     state::State,
    ///     vm::{Evm, Transaction, VmConfig},
    /// };
    ///
    /// let alice = Address::repeat_byte(0xa1);
    /// let bob = Address::repeat_byte(0xb0);
    /// let mut state = State::new();
    /// state.set_balance(alice, U256::from(1_000_000)).expect("state is consistent");
    ///
    /// let config = VmConfig::default();
    /// let mut evm = Evm::new(&mut state, BlockEnv::default(), TxEnv::default(), config);
    /// let receipt = evm
    ///     .transact(Transaction {
    ///         sender: alice,
    ///         to: Some(bob),
    ///         value: U256::from(1000),
    ///         gas_limit: 21_000,
    ///         ..Default::default()
    ///     })
    ///     .expect("valid transaction");
    ///
    /// assert!(receipt.success);
    /// assert_eq!(receipt.gas_used, 21_000);
    /// assert_eq!(state.get_balance(bob).expect("state is consistent"), U256::from(1000));
    /// assert_eq!(state.get_nonce(alice).expect("state is consistent"), 1);
    /// ```
    pub fn transact(&mut self, tx: Transaction) -> Result<TransactionReceipt, Error> {
        let fork = self.config.hardfork;
        let is_create = tx.to.is_none();

        let intrinsic_gas = self.schedule.intrinsic_gas(&tx.data, is_create);
        if intrinsic_gas > tx.gas_limit {
            return Err(Error::InvalidTransaction(format!(
                "intrinsic gas {intrinsic_gas} exceeds the gas limit {}",
                tx.gas_limit
            )));
        }
        if is_create && fork.is_active(HardFork::Shanghai) && tx.data.len() > MAX_INITCODE_SIZE {
            return Err(Error::InvalidTransaction(format!(
                "init code of {} bytes exceeds the limit of {MAX_INITCODE_SIZE}",
                tx.data.len()
            )));
        }
        if fork.is_active(HardFork::London) && tx.gas_price < self.block.base_fee {
            return Err(Error::InvalidTransaction(format!(
                "gas price {} is below the base fee {}",
                tx.gas_price, self.block.base_fee
            )));
        }

        let nonce = self.state.get_nonce(tx.sender)?;
        if let Some(expected) = tx.nonce {
            if expected != nonce {
                return Err(Error::InvalidTransaction(format!(
                    "nonce {expected} does not match the sender nonce {nonce}"
                )));
            }
        }

        let gas_cost = U256::from(tx.gas_limit).saturating_mul(tx.gas_price);
        let balance = self.state.get_balance(tx.sender)?;
        if balance < gas_cost.saturating_add(tx.value) {
            return Err(Error::InvalidTransaction(format!(
                "sender balance {balance} does not cover gas and value"
            )));
        }

        debug!(sender = %tx.sender, to = ?tx.to, gas_limit = tx.gas_limit, "running transaction");
        self.tx = TxEnv { origin: tx.sender, gas_price: tx.gas_price, blob_hashes: tx.blob_hashes };
        self.state.sub_balance(tx.sender, gas_cost)?;
        self.state.increment_nonce(tx.sender)?;

        let gas = tx.gas_limit - intrinsic_gas;
        let message = match tx.to {
            Some(to) => Message::call(tx.sender, to, tx.value, gas, tx.data),
            None => {
                let address = tx.sender.create(nonce);
                Message::create(tx.sender, address, tx.value, gas, tx.data)
            }
        };

        if fork.is_active(HardFork::Berlin) {
            self.state.warm_address(tx.sender);
            self.state.warm_address(message.to);
        }
        if fork.is_active(HardFork::Shanghai) {
            self.state.warm_address(self.block.coinbase);
        }
        let result = self.execute_message(message)?;

        let mut gas_used = tx.gas_limit - result.gas_remaining;
        let gas_refunded = if result.success {
            result.gas_refunded.min(gas_used / self.schedule.max_refund_quotient)
        } else {
            0
        };
        gas_used -= gas_refunded;

        let gas_left = tx.gas_limit - gas_used;
        self.state.add_balance(tx.sender, U256::from(gas_left).saturating_mul(tx.gas_price))?;

        let priority_fee = if fork.is_active(HardFork::London) {
            tx.gas_price - self.block.base_fee
        } else {
            tx.gas_price
        };
        self.state
            .add_balance(self.block.coinbase, U256::from(gas_used).saturating_mul(priority_fee))?;

        let logs = self.state.take_logs();
        self.state.finalize_transaction(fork.is_active(HardFork::SpuriousDragon))?;
        let state_root = self.state.root_hash();

        info!(
            success = result.success,
            gas_used,
            gas_refunded,
            logs = logs.len(),
            %state_root,
            "transaction finished"
        );
        if !result.success && self.config.throw_on_fail_result {
            return Err(result.into_error());
        }

        Ok(TransactionReceipt {
            success: result.success,
            reverted: result.reverted,
            halt: result.halt,
            gas_used,
            gas_refunded,
            return_data: result.return_data,
            created_address: result.created_address,
            logs,
            state_root,
        })
    }
}
