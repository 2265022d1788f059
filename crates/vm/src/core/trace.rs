use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

use crate::error::ExceptionalHalt;

/// The context of a single executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TracePoint {
    /// Hash of the code being run.
    pub code_hash: B256,
    /// The account whose storage the frame runs against.
    pub contract_address: Address,
    /// Call depth of the frame.
    pub depth: usize,
    /// Mnemonic of the instruction.
    pub opcode: &'static str,
    /// Position of the instruction in the code.
    pub pc: usize,
    /// Gas left before the instruction ran.
    pub gas: u64,
    /// Gas the instruction consumed, including dynamic costs.
    pub gas_cost: u64,
    /// The stack before the instruction ran, top first.
    pub stack: Vec<U256>,
    /// A copy of memory, present when memory changed since the last recorded copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<u8>>,
    /// The contract's storage, present when it changed since the previous instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<U256, U256>>,
}

/// An exception raised while tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceException {
    /// Index of the trace point that raised it, if any instruction was recorded.
    pub trace_index: Option<usize>,
    /// The exception.
    pub halt: ExceptionalHalt,
}

/// An append-only record of the instructions a transaction ran.
///
/// ```
/// use meridian_vm::{core::trace::ExecutionTrace, ExceptionalHalt};
///
/// let mut trace = ExecutionTrace::new();
/// trace.record_exception(ExceptionalHalt::OutOfGas);
///
/// assert!(trace.is_empty());
/// assert_eq!(trace.exceptions[0].trace_index, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    /// Recorded instructions, in execution order across every frame.
    pub points: Vec<TracePoint>,
    /// Exceptions, keyed by the index of the point that raised them.
    pub exceptions: Vec<TraceException>,
}

impl ExecutionTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trace point, returning its index.
    pub fn record(&mut self, point: TracePoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Records an exception against the most recent trace point.
    pub fn record_exception(&mut self, halt: ExceptionalHalt) {
        let trace_index = self.points.len().checked_sub(1);
        self.exceptions.push(TraceException { trace_index, halt });
    }

    /// The number of recorded trace points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no instruction was recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
