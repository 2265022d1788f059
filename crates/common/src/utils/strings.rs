use alloy::primitives::{I256, U256};
use eyre::{bail, eyre, Result};

/// Reinterprets an unsigned word as a two's complement signed word.
///
/// ```
/// use meridian_common::utils::strings::sign_uint;
/// use alloy::primitives::{I256, U256};
///
/// assert_eq!(sign_uint(U256::MAX), I256::MINUS_ONE);
/// ```
pub fn sign_uint(unsigned: U256) -> I256 {
    I256::from_raw(unsigned)
}

/// Decodes a hex string into a vector of bytes. A leading `0x` is optional.
///
/// ```
/// use meridian_common::utils::strings::decode_hex;
///
/// let result = decode_hex("0x600160020100").expect("should decode hex");
/// assert_eq!(result, vec![0x60, 0x01, 0x60, 0x02, 0x01, 0x00]);
///
/// assert!(decode_hex("0x123").is_err());
/// ```
pub fn decode_hex(mut s: &str) -> Result<Vec<u8>> {
    // normalize
    s = s.trim();
    s = s.strip_prefix("0x").unwrap_or(s);

    if s.is_empty() {
        return Ok(vec![]);
    }
    if s.len() % 2 != 0 {
        bail!("invalid hex string: odd number of digits in '{}'", s);
    }

    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| eyre!("invalid hex string: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_with_whitespace() {
        assert_eq!(decode_hex("  0xff00\n").expect("should decode"), vec![0xff, 0x00]);
    }

    #[test]
    fn test_decode_hex_rejects_non_hex() {
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn test_decode_hex_empty() {
        assert!(decode_hex("0x").expect("should decode").is_empty());
    }

    #[test]
    fn test_decode_hex_mixed_case() {
        let bytes = decode_hex("0102030A0b0C").expect("should decode");
        assert_eq!(bytes, vec![0x01, 0x02, 0x03, 0x0a, 0x0b, 0x0c]);
    }

    #[test]
    fn test_sign_uint_min() {
        let min = U256::from(1) << 255;
        assert_eq!(sign_uint(min), I256::MIN);
    }
}
