//! Fork-dependent gas costs and per-frame gas accounting.
//!
//! Costs that never changed across forks live in the opcode table
//! ([`OpCodeInfo::min_gas`](crate::core::opcodes::OpCodeInfo::min_gas)); everything that was
//! repriced lives in [`GasSchedule`].

use alloy::primitives::U256;

use crate::{
    core::{hardfork::HardFork, opcodes::Instruction},
    error::ExceptionalHalt,
};

/// Base cost of every transaction.
pub const TX_BASE: u64 = 21000;
/// Additional base cost of a contract creation transaction (Homestead+).
pub const TX_CREATE: u64 = 32000;
/// Cost per word of init code (EIP-3860, Shanghai+).
pub const INIT_CODE_WORD: u64 = 2;
/// Surcharge for calls that transfer value.
pub const CALL_VALUE: u64 = 9000;
/// Gas given to the callee for free when value is transferred.
pub const CALL_STIPEND: u64 = 2300;
/// Surcharge for calls and self-destructs that bring a new account into existence.
pub const NEW_ACCOUNT: u64 = 25000;
/// Cost per byte of deployed code.
pub const CODE_DEPOSIT_BYTE: u64 = 200;
/// Cost per word hashed by `SHA3` and `CREATE2`.
pub const KECCAK256_WORD: u64 = 6;
/// Cost per word copied by the copy opcodes.
pub const COPY_WORD: u64 = 3;
/// Cost per byte of log data.
pub const LOG_DATA_BYTE: u64 = 8;
/// `SSTORE` fails when no more than this much gas is left (EIP-2200, Istanbul+).
pub const SSTORE_SENTRY: u64 = 2300;

/// The number of 32-byte words needed to hold `size` bytes.
#[inline]
pub fn words(size: usize) -> u64 {
    (size as u64).div_ceil(32)
}

/// Gas costs that vary by fork.
///
/// Costs that remain constant (like arithmetic operations) come from the opcode table.
///
/// ```
/// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork};
///
/// assert_eq!(GasSchedule::for_fork(HardFork::Frontier).sload, 50);
/// assert_eq!(GasSchedule::for_fork(HardFork::Istanbul).sload, 800);
/// assert_eq!(GasSchedule::for_fork(HardFork::Berlin).sload, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    /// The fork this schedule was built for.
    pub fork: HardFork,

    /// Cost per byte of the `EXP` exponent.
    pub exp_byte: u64,

    /// `SLOAD` base cost (the warm cost once access lists exist).
    pub sload: u64,
    /// Cost of setting a zero slot to a non-zero value.
    pub sstore_set: u64,
    /// Cost of any other storage write.
    pub sstore_reset: u64,
    /// Refund for clearing a storage slot.
    pub sstore_clear_refund: u64,
    /// Whether `SSTORE` requires more than [`SSTORE_SENTRY`] gas left.
    pub sstore_sentry: bool,
    /// Whether `SSTORE` is priced against the slot's value at the start of the transaction
    /// (EIP-1283 in Constantinople, EIP-2200 from Istanbul).
    pub sstore_net_metering: bool,

    /// `BALANCE` base cost.
    pub balance: u64,
    /// `EXTCODESIZE` base cost.
    pub extcodesize: u64,
    /// `EXTCODECOPY` base cost.
    pub extcodecopy: u64,
    /// `EXTCODEHASH` base cost.
    pub extcodehash: u64,
    /// Base cost of every opcode in the `CALL` family.
    pub call: u64,

    /// `SELFDESTRUCT` base cost.
    pub selfdestruct: u64,
    /// Whether `SELFDESTRUCT` pays [`NEW_ACCOUNT`] for a beneficiary that does not exist.
    pub selfdestruct_new_account: bool,
    /// Refund granted for the first self-destruct of an account.
    pub selfdestruct_refund: u64,

    /// Calldata cost per zero byte.
    pub tx_data_zero: u64,
    /// Calldata cost per non-zero byte.
    pub tx_data_non_zero: u64,

    /// Whether warm/cold access tracking applies (EIP-2929).
    pub access_lists: bool,
    /// Cost of a warm account or storage access.
    pub warm_access: u64,
    /// Cost of the first storage access of a slot in a transaction.
    pub cold_sload: u64,
    /// Cost of the first access of an account in a transaction.
    pub cold_account_access: u64,

    /// Whether calls keep 1/64 of the remaining gas back (EIP-150).
    pub all_but_one_64th: bool,
    /// Refunds are capped at `gas_used / max_refund_quotient`.
    pub max_refund_quotient: u64,
}

impl GasSchedule {
    /// Builds the gas schedule for `fork`.
    pub fn for_fork(fork: HardFork) -> Self {
        let fork = fork.effective();
        let mut schedule = Self {
            fork,
            exp_byte: 10,
            sload: 50,
            sstore_set: 20000,
            sstore_reset: 5000,
            sstore_clear_refund: 15000,
            sstore_sentry: false,
            sstore_net_metering: false,
            balance: 20,
            extcodesize: 20,
            extcodecopy: 20,
            extcodehash: 400,
            call: 40,
            selfdestruct: 0,
            selfdestruct_new_account: false,
            selfdestruct_refund: 24000,
            tx_data_zero: 4,
            tx_data_non_zero: 68,
            access_lists: false,
            warm_access: 100,
            cold_sload: 2100,
            cold_account_access: 2600,
            all_but_one_64th: false,
            max_refund_quotient: 2,
        };

        // EIP-150
        if fork.is_active(HardFork::TangerineWhistle) {
            schedule.sload = 200;
            schedule.balance = 400;
            schedule.extcodesize = 700;
            schedule.extcodecopy = 700;
            schedule.call = 700;
            schedule.selfdestruct = 5000;
            schedule.selfdestruct_new_account = true;
            schedule.all_but_one_64th = true;
        }

        // EIP-160
        if fork.is_active(HardFork::SpuriousDragon) {
            schedule.exp_byte = 50;
        }

        // EIP-1283, reverted by Petersburg
        if fork == HardFork::Constantinople {
            schedule.sstore_net_metering = true;
        }

        // EIP-1884, EIP-2028, EIP-2200
        if fork.is_active(HardFork::Istanbul) {
            schedule.sload = 800;
            schedule.balance = 700;
            schedule.extcodehash = 700;
            schedule.tx_data_non_zero = 16;
            schedule.sstore_sentry = true;
            schedule.sstore_net_metering = true;
        }

        // EIP-2929
        if fork.is_active(HardFork::Berlin) {
            schedule.access_lists = true;
            schedule.sload = schedule.warm_access;
            schedule.balance = schedule.warm_access;
            schedule.extcodesize = schedule.warm_access;
            schedule.extcodecopy = schedule.warm_access;
            schedule.extcodehash = schedule.warm_access;
            schedule.call = schedule.warm_access;
            schedule.sstore_reset = 5000 - schedule.cold_sload;
        }

        // EIP-3529
        if fork.is_active(HardFork::London) {
            schedule.sstore_clear_refund = 4800;
            schedule.selfdestruct_refund = 0;
            schedule.max_refund_quotient = 5;
        }

        schedule
    }

    /// The gas charged before `instruction` runs.
    ///
    /// ```
    /// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork, opcodes::Instruction};
    ///
    /// let frontier = GasSchedule::for_fork(HardFork::Frontier);
    /// let tangerine = GasSchedule::for_fork(HardFork::TangerineWhistle);
    /// assert_eq!(frontier.static_cost(Instruction::Call), 40);
    /// assert_eq!(tangerine.static_cost(Instruction::Call), 700);
    /// assert_eq!(tangerine.static_cost(Instruction::Add), 3);
    /// ```
    pub fn static_cost(&self, instruction: Instruction) -> u64 {
        match instruction {
            Instruction::Balance => self.balance,
            Instruction::ExtCodeSize => self.extcodesize,
            Instruction::ExtCodeCopy => self.extcodecopy,
            Instruction::ExtCodeHash => self.extcodehash,
            Instruction::SLoad => self.sload,
            Instruction::Call
            | Instruction::CallCode
            | Instruction::DelegateCall
            | Instruction::StaticCall => self.call,
            Instruction::SelfDestruct => self.selfdestruct,
            other => other.info().map(|info| info.min_gas() as u64).unwrap_or(0),
        }
    }

    /// The dynamic part of `EXP`: a fixed cost per byte of the exponent.
    ///
    /// ```
    /// use alloy::primitives::U256;
    /// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork};
    ///
    /// let homestead = GasSchedule::for_fork(HardFork::Homestead);
    /// let spurious = GasSchedule::for_fork(HardFork::SpuriousDragon);
    /// assert_eq!(homestead.exp_cost(U256::from(0x100)), 20);
    /// assert_eq!(spurious.exp_cost(U256::from(0x100)), 100);
    /// assert_eq!(spurious.exp_cost(U256::ZERO), 0);
    /// ```
    pub fn exp_cost(&self, exponent: U256) -> u64 {
        self.exp_byte * exponent.bit_len().div_ceil(8) as u64
    }

    /// The surcharge for touching an account for the first time in a transaction. Zero before
    /// Berlin, and for warm accounts.
    pub fn account_access_surcharge(&self, is_cold: bool) -> u64 {
        if self.access_lists && is_cold {
            self.cold_account_access - self.warm_access
        } else {
            0
        }
    }

    /// The surcharge for reading a storage slot for the first time in a transaction.
    pub fn sload_surcharge(&self, is_cold: bool) -> u64 {
        if self.access_lists && is_cold {
            self.cold_sload - self.warm_access
        } else {
            0
        }
    }

    /// The cost of an `SSTORE` writing `new` over `current`, where `original` is the slot's value
    /// at the start of the transaction. Includes the cold surcharge from Berlin.
    ///
    /// With net metering, no-op and already-dirty writes cost as much as a warm read.
    ///
    /// ```
    /// use alloy::primitives::U256;
    /// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork};
    ///
    /// let (zero, one) = (U256::ZERO, U256::from(1));
    /// let berlin = GasSchedule::for_fork(HardFork::Berlin);
    /// assert_eq!(berlin.sstore_cost(zero, zero, zero, true), 2200);
    /// assert_eq!(berlin.sstore_cost(zero, zero, one, false), 20000);
    /// assert_eq!(berlin.sstore_cost(one, one, zero, false), 2900);
    /// assert_eq!(berlin.sstore_cost(zero, one, U256::from(2), false), 100);
    ///
    /// let petersburg = GasSchedule::for_fork(HardFork::Petersburg);
    /// assert_eq!(petersburg.sstore_cost(zero, zero, zero, true), 5000);
    /// ```
    pub fn sstore_cost(&self, original: U256, current: U256, new: U256, is_cold: bool) -> u64 {
        let cost = if !self.sstore_net_metering {
            if current.is_zero() && !new.is_zero() {
                self.sstore_set
            } else {
                self.sstore_reset
            }
        } else if new == current || current != original {
            self.sload
        } else if original.is_zero() {
            self.sstore_set
        } else {
            self.sstore_reset
        };

        if self.access_lists && is_cold {
            cost + self.cold_sload
        } else {
            cost
        }
    }

    /// The gas forwarded to a child frame that asked for `requested`, when `available` is left
    /// after every other cost of the call was paid.
    ///
    /// From Tangerine Whistle the child gets at most all but one 64th of the available gas.
    /// Before that, asking for more than available is an out-of-gas error.
    ///
    /// ```
    /// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork};
    ///
    /// let berlin = GasSchedule::for_fork(HardFork::Berlin);
    /// assert_eq!(berlin.call_gas(u64::MAX, 6400), Ok(6300));
    /// assert_eq!(berlin.call_gas(1000, 6400), Ok(1000));
    ///
    /// let frontier = GasSchedule::for_fork(HardFork::Frontier);
    /// assert!(frontier.call_gas(6401, 6400).is_err());
    /// ```
    pub fn call_gas(&self, requested: u64, available: u64) -> Result<u64, ExceptionalHalt> {
        if self.all_but_one_64th {
            Ok(requested.min(max_message_call_gas(available)))
        } else if requested > available {
            Err(ExceptionalHalt::OutOfGas)
        } else {
            Ok(requested)
        }
    }

    /// The gas forwarded to a child `CREATE` frame.
    pub fn create_gas(&self, available: u64) -> u64 {
        if self.all_but_one_64th {
            max_message_call_gas(available)
        } else {
            available
        }
    }

    /// The gas a transaction pays before any code runs.
    ///
    /// ```
    /// use meridian_vm::core::{gas::GasSchedule, hardfork::HardFork};
    ///
    /// let istanbul = GasSchedule::for_fork(HardFork::Istanbul);
    /// assert_eq!(istanbul.intrinsic_gas(&[0, 1, 2], false), 21000 + 4 + 16 + 16);
    ///
    /// let frontier = GasSchedule::for_fork(HardFork::Frontier);
    /// assert_eq!(frontier.intrinsic_gas(&[0, 1], false), 21000 + 4 + 68);
    /// ```
    pub fn intrinsic_gas(&self, data: &[u8], is_create: bool) -> u64 {
        let zero_bytes = data.iter().filter(|byte| **byte == 0).count() as u64;
        let non_zero_bytes = data.len() as u64 - zero_bytes;

        let mut gas =
            TX_BASE + zero_bytes * self.tx_data_zero + non_zero_bytes * self.tx_data_non_zero;
        if is_create {
            if self.fork.is_active(HardFork::Homestead) {
                gas += TX_CREATE;
            }
            if self.fork.is_active(HardFork::Shanghai) {
                gas += INIT_CODE_WORD * words(data.len());
            }
        }
        gas
    }
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self::for_fork(HardFork::default())
    }
}

/// All but one 64th of `gas` (EIP-150).
#[inline]
pub fn max_message_call_gas(gas: u64) -> u64 {
    gas - gas / 64
}

/// Gas accounting for a single call frame.
///
/// Amounts are unsigned, so neither the remaining gas nor the refund counter can go negative.
/// Refunds a frame withdraws beyond what it earned itself are kept as a debt, which the parent
/// settles against its own counter in [`GasState::absorb_refund`].
///
/// ```
/// use meridian_vm::{core::gas::GasState, ExceptionalHalt};
///
/// let mut gas = GasState::new(100);
/// gas.consume(60).expect("enough gas");
/// assert_eq!(gas.remaining(), 40);
/// assert_eq!(gas.consume(41), Err(ExceptionalHalt::OutOfGas));
/// gas.return_gas(10);
/// assert_eq!(gas.used(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasState {
    remaining: u64,
    initial: u64,
    refunded: u64,
    refund_debt: u64,
}

impl GasState {
    /// Creates a gas state holding `gas`.
    pub fn new(gas: u64) -> Self {
        Self { remaining: gas, initial: gas, refunded: 0, refund_debt: 0 }
    }

    /// Gas left in the frame.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas the frame started with.
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// Gas consumed so far.
    pub fn used(&self) -> u64 {
        self.initial - self.remaining
    }

    /// The refund counter.
    pub fn refunded(&self) -> u64 {
        self.refunded
    }

    /// Refunds withdrawn from the counters of enclosing frames.
    pub fn refund_debt(&self) -> u64 {
        self.refund_debt
    }

    /// Deducts `amount`, failing without deducting anything when not enough gas is left.
    #[inline]
    pub fn consume(&mut self, amount: u64) -> Result<(), ExceptionalHalt> {
        self.remaining = self.remaining.checked_sub(amount).ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    /// Deducts a memory expansion cost, which is computed in `u128`.
    pub fn consume_wide(&mut self, amount: u128) -> Result<(), ExceptionalHalt> {
        let amount = u64::try_from(amount).map_err(|_| ExceptionalHalt::OutOfGas)?;
        self.consume(amount)
    }

    /// Credits gas a child frame did not use.
    pub fn return_gas(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_add(amount);
    }

    /// Adds to the refund counter, paying off any debt first.
    pub fn refund(&mut self, amount: u64) {
        let paid = amount.min(self.refund_debt);
        self.refund_debt -= paid;
        self.refunded = self.refunded.saturating_add(amount - paid);
    }

    /// Subtracts from the refund counter. Whatever the counter cannot cover becomes debt.
    pub fn sub_refund(&mut self, amount: u64) {
        let covered = amount.min(self.refunded);
        self.refunded -= covered;
        self.refund_debt = self.refund_debt.saturating_add(amount - covered);
    }

    /// Takes over the refund counter and debt of a child frame that succeeded.
    pub fn absorb_refund(&mut self, refunded: u64, debt: u64) {
        self.sub_refund(debt);
        self.refund(refunded);
    }

    /// Burns all remaining gas.
    pub fn exhaust(&mut self) {
        self.remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_per_fork() {
        let frontier = GasSchedule::for_fork(HardFork::Frontier);
        assert_eq!((frontier.balance, frontier.call, frontier.selfdestruct), (20, 40, 0));
        assert!(!frontier.all_but_one_64th);

        let tangerine = GasSchedule::for_fork(HardFork::TangerineWhistle);
        assert_eq!((tangerine.sload, tangerine.balance, tangerine.extcodesize), (200, 400, 700));
        assert!(tangerine.selfdestruct_new_account);
        assert_eq!(tangerine.exp_byte, 10);

        let istanbul = GasSchedule::for_fork(HardFork::Istanbul);
        assert_eq!((istanbul.sload, istanbul.balance, istanbul.extcodehash), (800, 700, 700));
        assert!(istanbul.sstore_sentry);

        let berlin = GasSchedule::for_fork(HardFork::Berlin);
        assert_eq!(berlin.sstore_reset, 2900);
        assert_eq!(berlin.account_access_surcharge(true), 2500);
        assert_eq!(berlin.account_access_surcharge(false), 0);
        assert_eq!(berlin.sload_surcharge(true), 2000);
        assert_eq!(berlin.max_refund_quotient, 2);

        let london = GasSchedule::for_fork(HardFork::London);
        assert_eq!((london.sstore_clear_refund, london.max_refund_quotient), (4800, 5));
        assert_eq!(london.selfdestruct_refund, 0);

        assert_eq!(GasSchedule::default(), GasSchedule::for_fork(HardFork::Cancun));
    }

    #[test]
    fn test_no_surcharge_before_berlin() {
        let istanbul = GasSchedule::for_fork(HardFork::Istanbul);
        assert_eq!(istanbul.account_access_surcharge(true), 0);
        assert_eq!(istanbul.sload_surcharge(true), 0);
    }

    #[test]
    fn test_static_cost_uses_table() {
        let schedule = GasSchedule::for_fork(HardFork::Cancun);
        assert_eq!(schedule.static_cost(Instruction::Log(2)), 1125);
        assert_eq!(schedule.static_cost(Instruction::Create), 32000);
        assert_eq!(schedule.static_cost(Instruction::SStore), 0);
        assert_eq!(schedule.static_cost(Instruction::Invalid(0x0c)), 0);
    }

    #[test]
    fn test_intrinsic_gas_for_creation() {
        let frontier = GasSchedule::for_fork(HardFork::Frontier);
        assert_eq!(frontier.intrinsic_gas(&[], true), 21000);

        let london = GasSchedule::for_fork(HardFork::London);
        assert_eq!(london.intrinsic_gas(&[], true), 53000);

        let shanghai = GasSchedule::for_fork(HardFork::Shanghai);
        assert_eq!(shanghai.intrinsic_gas(&[1; 33], true), 53000 + 33 * 16 + 2 * 2);
    }

    #[test]
    fn test_wide_consumption() {
        let mut gas = GasState::new(10);
        assert_eq!(gas.consume_wide(u128::MAX), Err(ExceptionalHalt::OutOfGas));
        assert_eq!(gas.remaining(), 10);
        gas.consume_wide(10).expect("exact amount");
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn test_refund_counter() {
        let mut gas = GasState::new(0);
        gas.refund(15000);
        gas.sub_refund(20000);
        assert_eq!((gas.refunded(), gas.refund_debt()), (0, 5000));
        gas.refund(4800);
        assert_eq!((gas.refunded(), gas.refund_debt()), (0, 200));
        gas.refund(300);
        assert_eq!((gas.refunded(), gas.refund_debt()), (100, 0));
    }

    #[test]
    fn test_child_refund_debt_settles_against_parent() {
        // the parent cleared a slot, the child wrote it again
        let mut parent = GasState::new(0);
        parent.refund(4800);
        let mut child = GasState::new(0);
        child.sub_refund(4800);
        child.refund(2800);

        parent.absorb_refund(child.refunded(), child.refund_debt());
        assert_eq!((parent.refunded(), parent.refund_debt()), (2800, 0));
    }

    #[test]
    fn test_sstore_cost_per_fork() {
        let (zero, one, two) = (U256::ZERO, U256::from(1), U256::from(2));

        let frontier = GasSchedule::for_fork(HardFork::Frontier);
        assert_eq!(frontier.sstore_cost(zero, zero, one, false), 20000);
        assert_eq!(frontier.sstore_cost(one, one, one, false), 5000);
        assert_eq!(frontier.sstore_cost(zero, one, two, false), 5000);

        let constantinople = GasSchedule::for_fork(HardFork::Constantinople);
        assert!(constantinople.sstore_net_metering && !constantinople.sstore_sentry);
        assert_eq!(constantinople.sstore_cost(one, one, one, false), 200);
        assert_eq!(constantinople.sstore_cost(zero, one, two, false), 200);

        let petersburg = GasSchedule::for_fork(HardFork::Petersburg);
        assert!(!petersburg.sstore_net_metering);
        assert_eq!(petersburg.sstore_cost(one, one, one, false), 5000);

        let istanbul = GasSchedule::for_fork(HardFork::Istanbul);
        assert_eq!(istanbul.sstore_cost(one, one, one, true), 800);
        assert_eq!(istanbul.sstore_cost(zero, zero, one, true), 20000);
        assert_eq!(istanbul.sstore_cost(one, one, two, true), 5000);
        assert_eq!(istanbul.sstore_cost(zero, one, two, true), 800);

        let cancun = GasSchedule::for_fork(HardFork::Cancun);
        assert_eq!(cancun.sstore_cost(one, one, one, false), 100);
        assert_eq!(cancun.sstore_cost(one, one, one, true), 2200);
        assert_eq!(cancun.sstore_cost(zero, zero, one, true), 22100);
        assert_eq!(cancun.sstore_cost(one, one, two, false), 2900);
        assert_eq!(cancun.sstore_cost(zero, one, two, false), 100);
    }
}
