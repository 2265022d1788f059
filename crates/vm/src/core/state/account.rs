use alloy::{
    primitives::{B256, U256},
    rlp::{Decodable, Encodable, Header},
};
use meridian_trie::EMPTY_ROOT;

use crate::core::constants::EMPTY_CODE_HASH;

/// An account as stored in the world state trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Number of transactions sent, or contracts created by a contract account.
    pub nonce: u64,
    /// Balance in wei.
    pub balance: U256,
    /// Root hash of the account's storage trie.
    pub storage_root: B256,
    /// Hash of the account's code.
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            storage_root: *EMPTY_ROOT,
            code_hash: *EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Returns true if the account has no code, a zero nonce and a zero balance (EIP-161).
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == *EMPTY_CODE_HASH
    }

    /// Returns true if the account holds code.
    pub fn has_code(&self) -> bool {
        self.code_hash != *EMPTY_CODE_HASH
    }

    /// Encodes the account as `rlp([nonce, balance, storage_root, code_hash])`.
    ///
    /// ```
    /// use alloy::primitives::U256;
    /// use meridian_vm::core::state::Account;
    ///
    /// let account = Account { nonce: 1, balance: U256::from(1000), ..Default::default() };
    /// let encoded = account.encode();
    /// assert_eq!(Account::decode(&encoded).expect("valid account"), account);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let balance = self.balance.to_be_bytes_trimmed_vec();
        let payload_length = self.nonce.length() +
            balance.as_slice().length() +
            self.storage_root.as_slice().length() +
            self.code_hash.as_slice().length();

        let mut out = Vec::with_capacity(payload_length + 2);
        Header { list: true, payload_length }.encode(&mut out);
        self.nonce.encode(&mut out);
        balance.as_slice().encode(&mut out);
        self.storage_root.as_slice().encode(&mut out);
        self.code_hash.as_slice().encode(&mut out);
        out
    }

    /// Decodes an account encoded with [`Account::encode`].
    pub fn decode(raw: &[u8]) -> Result<Self, alloy::rlp::Error> {
        let mut buf = raw;
        let header = Header::decode(&mut buf)?;
        if !header.list {
            return Err(alloy::rlp::Error::UnexpectedString);
        }

        let nonce = u64::decode(&mut buf)?;
        let balance = decode_word(&mut buf)?;
        let storage_root = B256::from(<[u8; 32]>::decode(&mut buf)?);
        let code_hash = B256::from(<[u8; 32]>::decode(&mut buf)?);

        if !buf.is_empty() {
            return Err(alloy::rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length + buf.len(),
            });
        }

        Ok(Self { nonce, balance, storage_root, code_hash })
    }
}

/// Encodes a word as an RLP string without leading zeros, as storage values are stored.
pub(crate) fn encode_word(value: U256) -> Vec<u8> {
    alloy::rlp::encode(value.to_be_bytes_trimmed_vec().as_slice())
}

/// Decodes a word encoded with [`encode_word`], advancing `buf`.
pub(crate) fn decode_word(buf: &mut &[u8]) -> Result<U256, alloy::rlp::Error> {
    let bytes = Header::decode_bytes(buf, false)?;
    if bytes.len() > 32 {
        return Err(alloy::rlp::Error::Overflow);
    }
    Ok(U256::from_be_slice(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_account_is_empty() {
        let account = Account::default();
        assert!(account.is_empty());
        assert!(!account.has_code());
        assert_eq!(account.storage_root, *EMPTY_ROOT);
    }

    #[test]
    fn test_encoding_layout() {
        let account = Account { nonce: 0, balance: U256::from(0x0102), ..Default::default() };
        let encoded = account.encode();

        // list header, nonce 0 as the empty string, balance as a two byte string
        assert_eq!(&encoded[..5], &[0xf8, 0x46, 0x80, 0x82, 0x01]);
        assert_eq!(encoded.len(), 2 + 1 + 3 + 33 + 33);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Account::decode(&[0x80]).is_err());
        let mut encoded = Account::default().encode();
        encoded.truncate(encoded.len() - 1);
        assert!(Account::decode(&encoded).is_err());
    }

    #[test]
    fn test_word_encoding() {
        assert_eq!(encode_word(U256::from(1)), vec![0x01]);
        assert_eq!(encode_word(U256::from(0x80)), vec![0x81, 0x80]);
        assert_eq!(decode_word(&mut encode_word(U256::MAX).as_slice()), Ok(U256::MAX));
    }
}
