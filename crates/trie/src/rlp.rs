//! Minimal RLP list handling on top of `alloy::rlp` headers.

use alloy::rlp::{Encodable, Header};

use crate::error::TrieError;

/// A single decoded RLP item, borrowing from the input buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RlpItem<'a> {
    pub(crate) list: bool,
    pub(crate) payload: &'a [u8],
    pub(crate) raw: &'a [u8],
}

/// Decodes the next item from `buf`, advancing it past the item.
pub(crate) fn decode_item<'a>(buf: &mut &'a [u8]) -> Result<RlpItem<'a>, TrieError> {
    let start: &'a [u8] = buf;
    let header = Header::decode(buf)?;
    let payload = buf
        .get(..header.payload_length)
        .ok_or(TrieError::InconsistentTree("rlp payload exceeds the input"))?;
    *buf = &buf[header.payload_length..];

    let raw_len = start.len() - buf.len();
    Ok(RlpItem { list: header.list, payload, raw: &start[..raw_len] })
}

/// Decodes `raw` as a single list and returns its items.
pub(crate) fn decode_list(raw: &[u8]) -> Result<Vec<RlpItem<'_>>, TrieError> {
    let mut buf = raw;
    let list = decode_item(&mut buf)?;
    if !list.list || !buf.is_empty() {
        return Err(TrieError::InconsistentTree("expected a single rlp list"));
    }

    let mut payload = list.payload;
    let mut items = Vec::new();
    while !payload.is_empty() {
        items.push(decode_item(&mut payload)?);
    }
    Ok(items)
}

/// Appends the RLP string encoding of `bytes` to `out`.
pub(crate) fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    bytes.encode(out);
}

/// Wraps already-encoded items into an RLP list.
pub(crate) fn encode_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 3);
    Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(payload);
    out
}
