use alloy::primitives::{Address, B256, U256};

/// Truncates a 256-bit word to an [`Address`], keeping the low 20 bytes.
///
/// ```
/// use meridian_common::utils::words::address_from_word;
/// use alloy::primitives::{Address, U256};
///
/// let word = U256::MAX;
/// assert_eq!(address_from_word(word), Address::repeat_byte(0xff));
/// ```
pub fn address_from_word(word: U256) -> Address {
    let bytes = word.to_be_bytes::<32>();
    Address::from_slice(&bytes[12..])
}

/// Widens an [`Address`] into a 256-bit word.
///
/// ```
/// use meridian_common::utils::words::{address_from_word, word_from_address};
/// use alloy::primitives::Address;
///
/// let address = Address::repeat_byte(0x11);
/// assert_eq!(address_from_word(word_from_address(address)), address);
/// ```
pub fn word_from_address(address: Address) -> U256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    U256::from_be_bytes(word)
}

/// Interprets a [`B256`] as a big-endian word.
pub fn word_from_hash(hash: B256) -> U256 {
    U256::from_be_bytes(hash.0)
}

/// Converts a word into a big-endian [`B256`].
pub fn hash_from_word(word: U256) -> B256 {
    B256::from(word.to_be_bytes::<32>())
}

/// Converts a boolean into the word `1` or `0`.
pub fn bool_word(condition: bool) -> U256 {
    if condition {
        U256::from(1u8)
    } else {
        U256::ZERO
    }
}

/// Converts a word into a `usize`, saturating at `usize::MAX`.
///
/// ```
/// use meridian_common::utils::words::saturating_usize;
/// use alloy::primitives::U256;
///
/// assert_eq!(saturating_usize(U256::from(7)), 7);
/// assert_eq!(saturating_usize(U256::MAX), usize::MAX);
/// ```
pub fn saturating_usize(word: U256) -> usize {
    word.try_into().unwrap_or(usize::MAX)
}

/// Converts a word into a `u64`, saturating at `u64::MAX`.
pub fn saturating_u64(word: U256) -> u64 {
    word.try_into().unwrap_or(u64::MAX)
}

/// Reads `size` bytes of `source` starting at `offset`, padding with zeros past its end.
///
/// ```
/// use meridian_common::utils::words::padded_slice;
///
/// assert_eq!(padded_slice(&[1, 2, 3], 1, 4), vec![2, 3, 0, 0]);
/// assert_eq!(padded_slice(&[1, 2, 3], 10, 2), vec![0, 0]);
/// ```
pub fn padded_slice(source: &[u8], offset: usize, size: usize) -> Vec<u8> {
    let end_offset = offset.saturating_add(size).min(source.len());
    let mut value = source.get(offset..end_offset).unwrap_or(&[]).to_vec();
    value.resize(size, 0u8);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_word_truncates_high_bytes() {
        let word = (U256::from(0xabu8) << 248) | U256::from(0x01u8);
        let mut expected = [0u8; 20];
        expected[19] = 0x01;
        assert_eq!(address_from_word(word), Address::from(expected));
    }

    #[test]
    fn test_hash_word_conversion() {
        let word = U256::from(0x1234u64);
        assert_eq!(word_from_hash(hash_from_word(word)), word);
        assert_eq!(hash_from_word(word)[31], 0x34);
    }

    #[test]
    fn test_saturating_u64() {
        assert_eq!(saturating_u64(U256::from(u64::MAX) + U256::from(1)), u64::MAX);
    }

    #[test]
    fn test_bool_word() {
        assert_eq!(bool_word(true), U256::from(1));
        assert_eq!(bool_word(false), U256::ZERO);
    }
}
