use crate::error::TrieError;

/// Splits every byte of `key` into its high and low nibble.
///
/// ```
/// use meridian_trie::nibbles::bytes_to_nibbles;
///
/// assert_eq!(bytes_to_nibbles(&[0x12, 0xab]), vec![0x1, 0x2, 0xa, 0xb]);
/// ```
pub fn bytes_to_nibbles(key: &[u8]) -> Vec<u8> {
    key.iter().flat_map(|byte| [byte >> 4, byte & 0x0f]).collect()
}

/// Packs an even-length nibble path back into bytes.
pub fn nibbles_to_bytes(nibbles: &[u8]) -> Result<Vec<u8>, TrieError> {
    if nibbles.len() % 2 != 0 {
        return Err(TrieError::InconsistentTree("key path has an odd number of nibbles"));
    }
    Ok(nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

/// Returns the length of the longest common prefix of two nibble paths.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Encodes a nibble path with the hex-prefix encoding used by leaf and extension nodes.
///
/// The first nibble carries the flags: bit 1 marks a leaf, bit 0 an odd-length path.
///
/// ```
/// use meridian_trie::nibbles::encode_compact;
///
/// assert_eq!(encode_compact(&[0x1, 0x2, 0x3], false), vec![0x11, 0x23]);
/// assert_eq!(encode_compact(&[0x1, 0x2], true), vec![0x20, 0x12]);
/// ```
pub fn encode_compact(path: &[u8], is_leaf: bool) -> Vec<u8> {
    let odd = path.len() % 2 == 1;
    let flag = (if is_leaf { 2 } else { 0 }) + u8::from(odd);

    let mut out = Vec::with_capacity(path.len() / 2 + 1);
    let rest = if odd {
        out.push((flag << 4) | path[0]);
        &path[1..]
    } else {
        out.push(flag << 4);
        path
    };
    out.extend(rest.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]));
    out
}

/// Decodes a hex-prefix encoded path, returning the nibbles and whether the path belongs to a leaf.
pub fn decode_compact(encoded: &[u8]) -> Result<(Vec<u8>, bool), TrieError> {
    let first = *encoded.first().ok_or(TrieError::InconsistentTree("empty compact path"))?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(TrieError::InconsistentTree("invalid compact path flag"));
    }

    let mut path = Vec::with_capacity(encoded.len() * 2);
    if flag & 1 == 1 {
        path.push(first & 0x0f);
    }
    path.extend(bytes_to_nibbles(&encoded[1..]));
    Ok((path, flag & 2 == 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_roundtrip_all_flags() {
        for (path, leaf) in [
            (vec![], false),
            (vec![], true),
            (vec![0xf], false),
            (vec![0x0, 0xf, 0x1], true),
            (vec![0x1, 0x2, 0x3, 0x4], true),
        ] {
            let encoded = encode_compact(&path, leaf);
            assert_eq!(decode_compact(&encoded).expect("valid compact path"), (path, leaf));
        }
    }

    #[test]
    fn test_decode_compact_rejects_bad_flag() {
        assert!(decode_compact(&[0x40]).is_err());
        assert!(decode_compact(&[]).is_err());
    }

    #[test]
    fn test_nibbles_to_bytes_odd() {
        assert!(nibbles_to_bytes(&[1, 2, 3]).is_err());
        assert_eq!(nibbles_to_bytes(&[1, 2]).expect("even path"), vec![0x12]);
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len(&[1, 2, 3], &[1, 2, 4]), 2);
        assert_eq!(common_prefix_len(&[], &[1]), 0);
        assert_eq!(common_prefix_len(&[5, 6], &[5, 6]), 2);
    }
}
