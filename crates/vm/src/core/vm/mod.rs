//! The interpreter: message execution, the frame loop and transaction processing.
//!
//! An [`Evm`] runs a [`Message`](crate::core::message::Message) in a fresh [`ExecutionState`],
//! dispatching every instruction to its handler. Nested calls and creations recurse through
//! [`Evm::execute`], each behind a state snapshot that is restored when the nested frame fails.

mod core;
mod execution;
mod transact;

/// Opcode handlers organized by category.
pub mod handlers;

pub use self::core::{Evm, VmConfig};
pub use execution::{analyze_jumpdests, memory_range, ExecutionResult, ExecutionState, StopReason};
pub use transact::{Transaction, TransactionReceipt};
