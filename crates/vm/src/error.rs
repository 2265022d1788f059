//! Error types for the VM

use alloy::primitives::Bytes;
use meridian_trie::TrieError;
use serde::{Serialize, Serializer};

/// Exceptions that terminate the current execution frame.
///
/// A halted frame consumes all of its gas, discards its return data and rolls back its state
/// changes. The parent frame continues with a failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExceptionalHalt {
    /// The frame ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// An instruction needed more stack items than available.
    #[error("stack underflow")]
    StackUnderflow,

    /// The stack grew past its maximum depth.
    #[error("stack overflow")]
    StackOverflow,

    /// A jump landed on something other than a `JUMPDEST`.
    #[error("invalid jump destination: {0}")]
    InvalidJump(usize),

    /// The opcode is undefined, or not active under the configured fork.
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// A state-modifying instruction ran inside a static call.
    #[error("state modification in static context: {0}")]
    StaticViolation(&'static str),

    /// A `PUSH` immediate extends past the end of the code.
    #[error("code out of bounds")]
    CodeOutOfBounds,

    /// `RETURNDATACOPY` read past the end of the last return data.
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// The create target already holds code or has a non-zero nonce.
    #[error("create collision")]
    CreateCollision,

    /// Deployed code exceeds the maximum code size.
    #[error("code size exceeds the limit")]
    CodeSizeExceeded,

    /// Deployed code starts with the reserved `0xef` byte.
    #[error("deployed code starts with 0xef")]
    InvalidCodePrefix,

    /// An account balance does not cover a transfer.
    #[error("insufficient balance")]
    InsufficientBalance,
}

impl Serialize for ExceptionalHalt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors returned by the VM.
///
/// Everything except [`Error::Halt`] is fatal and propagates out of the interpreter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A frame-terminating exception.
    #[error(transparent)]
    Halt(#[from] ExceptionalHalt),

    /// The world state trie failed.
    #[error("trie error: {0}")]
    Trie(#[from] TrieError),

    /// An account or storage value could not be decoded.
    #[error("rlp error: {0}")]
    Rlp(#[from] alloy::rlp::Error),

    /// An invariant of the interpreter was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// A top-level execution failed while `throw_on_fail_result` is set.
    #[error("execution failed: {}", failure_reason(halt))]
    ExecutionFailed {
        /// The exception that halted execution, or `None` for `REVERT`.
        halt: Option<ExceptionalHalt>,
        /// Data returned by a reverting execution.
        return_data: Bytes,
    },

    /// The transaction can not be included.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

fn failure_reason(halt: &Option<ExceptionalHalt>) -> String {
    halt.as_ref().map_or_else(|| "reverted".to_string(), ToString::to_string)
}
