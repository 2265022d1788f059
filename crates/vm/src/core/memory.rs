use alloy::primitives::U256;

/// The [`Memory`] struct represents the memory of an EVM call frame.
///
/// Memory is zero-initialized, byte addressable and grows in whole 32-byte words. Every write or
/// expansion bumps a change counter, which lets tracers skip unchanged snapshots.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Vector storing memory data
    pub memory: Vec<u8>,
    change_count: u64,
}

/// The gas cost of holding `words` words of memory: `3 * w + w^2 / 512`.
fn words_cost(words: u128) -> u128 {
    words.saturating_mul(words).saturating_div(512).saturating_add(words.saturating_mul(3))
}

/// The number of words needed to hold `offset + size` bytes.
fn words_for(offset: usize, size: usize) -> u128 {
    (offset as u128).saturating_add(size as u128).saturating_add(31) / 32
}

impl Memory {
    /// Creates a new, empty [`Memory`]
    pub fn new() -> Memory {
        Memory { memory: Vec::with_capacity(2048), change_count: 0 }
    }

    /// Gets the current size of the memory in bytes.
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let memory = Memory::new();
    /// assert_eq!(memory.size(), 0);
    /// ```
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// The number of writes and expansions performed so far.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// Extends the memory to cover `offset..offset + size`, rounded up to a whole word. Empty
    /// ranges never extend memory.
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.extend(0, 33);
    /// assert_eq!(memory.size(), 64);
    /// memory.extend(1000, 0);
    /// assert_eq!(memory.size(), 64);
    /// ```
    pub fn extend(&mut self, offset: usize, size: usize) {
        if size == 0 {
            return;
        }
        let new_size = offset.saturating_add(size).saturating_add(31) / 32 * 32;
        if new_size > self.memory.len() {
            self.memory.resize(new_size, 0u8);
            self.change_count += 1;
        }
    }

    /// Store the given bytes in the memory at the given offset, extending it if necessary.
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(30, &[0xaa, 0xbb]);
    /// assert_eq!(memory.size(), 32);
    /// assert_eq!(memory.read(30, 2), vec![0xaa, 0xbb]);
    /// ```
    pub fn store(&mut self, offset: usize, value: &[u8]) {
        if value.is_empty() {
            return;
        }
        self.extend(offset, value.len());
        self.memory[offset..offset + value.len()].copy_from_slice(value);
        self.change_count += 1;
    }

    /// Store a big-endian word at the given offset (`MSTORE`).
    pub fn store_word(&mut self, offset: usize, value: U256) {
        self.store(offset, &value.to_be_bytes::<32>());
    }

    /// Store a single byte at the given offset (`MSTORE8`).
    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.store(offset, &[value]);
    }

    /// Read the given number of bytes from the memory at the given offset.
    /// Bytes past the end of memory read as zero.
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, &[0xff]);
    /// assert_eq!(memory.read(31, 2), vec![0x00, 0x00]);
    /// assert_eq!(memory.read(0, 1), vec![0xff]);
    /// ```
    pub fn read(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut value = vec![0u8; size];
        if offset < self.memory.len() {
            let end = offset.saturating_add(size).min(self.memory.len());
            value[..end - offset].copy_from_slice(&self.memory[offset..end]);
        }
        value
    }

    /// Read a big-endian word from the given offset (`MLOAD`).
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    /// use alloy::primitives::U256;
    ///
    /// let mut memory = Memory::new();
    /// memory.store_word(0, U256::from(3));
    /// assert_eq!(memory.read_word(0), U256::from(3));
    /// ```
    pub fn read_word(&self, offset: usize) -> U256 {
        U256::from_be_slice(&self.read(offset, 32))
    }

    /// Copy `size` bytes from `source` to `destination`, handling overlapping ranges (`MCOPY`).
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, &[1, 2, 3, 4]);
    /// memory.copy_within(0, 1, 3);
    /// assert_eq!(memory.read(0, 4), vec![1, 1, 2, 3]);
    /// ```
    pub fn copy_within(&mut self, source: usize, destination: usize, size: usize) {
        if size == 0 {
            return;
        }
        let data = self.read(source, size);
        self.store(destination, &data);
    }

    /// Calculate the current memory cost
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, &[0xff]);
    /// assert_eq!(memory.memory_cost(), 3);
    /// ```
    pub fn memory_cost(&self) -> u128 {
        words_cost(words_for(self.memory.len(), 0))
    }

    /// Calculate the cost of extending the memory to cover `offset..offset + size`.
    ///
    /// ```
    /// use meridian_vm::core::memory::Memory;
    ///
    /// let mut memory = Memory::new();
    /// memory.store(0, &[0xff]);
    /// assert_eq!(memory.expansion_cost(0, 32), 0);
    /// assert_eq!(memory.expansion_cost(0, 64), 3);
    /// assert_eq!(memory.expansion_cost(usize::MAX, 0), 0);
    /// ```
    pub fn expansion_cost(&self, offset: usize, size: usize) -> u128 {
        if size == 0 {
            return 0;
        }
        words_cost(words_for(offset, size)).saturating_sub(self.memory_cost())
    }
}
