//! meridian EVM implementation
//!
//! This crate provides a deterministic Ethereum Virtual Machine interpreter: the stack machine and
//! its instruction set, fork-dependent gas accounting, nested message calls and contract creation,
//! and a world state stored in a Merkle-Patricia trie with snapshot and rollback support.

/// Core VM implementation, including memory, stack, gas, state, and opcodes
pub mod core;

/// Error types for the VM
pub mod error;

pub use error::{Error, ExceptionalHalt};
