use alloy::primitives::{Address, Bytes, B256};
use serde::Serialize;

/// The [`Log`] struct represents a log emitted by a `LOG0-LOG4` opcode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Log {
    /// Position of the log within the transaction.
    pub index: u64,
    /// The contract that emitted the log.
    pub address: Address,
    /// Indexed topics, at most four.
    pub topics: Vec<B256>,
    /// Unindexed log data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new [`Log`] with the given log index, emitter, topics, and data.
    pub fn new(index: u64, address: Address, topics: Vec<B256>, data: &[u8]) -> Log {
        Log { index, address, topics, data: Bytes::copy_from_slice(data) }
    }
}
