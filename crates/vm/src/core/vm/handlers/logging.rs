use meridian_common::utils::words::hash_from_word;

use crate::{core::gas::LOG_DATA_BYTE, error::Error};

use super::super::{core::Evm, execution::ExecutionState};

/// LOG0-LOG4 - Append log record with N topics
pub fn log_n(vm: &mut Evm<'_>, frame: &mut ExecutionState, topic_count: u8) -> Result<(), Error> {
    let (offset, size) = frame.pop_memory_range()?;
    let topics = frame.stack.pop_n(topic_count as usize)?;
    frame.consume_gas(LOG_DATA_BYTE.saturating_mul(size as u64))?;

    let topics = topics.into_iter().map(hash_from_word).collect();
    let data = frame.memory.read(offset, size);
    vm.state.log(frame.message.to, topics, &data);
    Ok(())
}
