/// Constants used throughout the VM implementation
pub mod constants;

/// Block and transaction environment exposed to contracts
pub mod env;

/// Fork-dependent gas schedule and per-frame gas accounting
pub mod gas;

/// Ethereum hard fork definitions
pub mod hardfork;

/// Log implementation for event handling
pub mod log;

/// Memory implementation for VM memory management
pub mod memory;

/// Messages passed between call frames
pub mod message;

/// Opcode definitions and implementations
pub mod opcodes;

/// Stack implementation for the VM
pub mod stack;

/// World state backed by a Merkle-Patricia trie
pub mod state;

/// Optional per-instruction execution traces
pub mod trace;

/// Core virtual machine implementation
pub mod vm;
