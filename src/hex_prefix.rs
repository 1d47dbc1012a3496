//! Hex-prefix (HP) encoding: the byte encoding of a nibble sequence plus a leaf/extension flag,
//! used as the first element of every short (leaf or extension) trie node.

use crate::nibble::NibbleView;
use alloc::vec::Vec;

const LEAF_FLAG: u8 = 0x20;
const ODD_FLAG: u8 = 0x10;

/// Encodes `key`'s nibbles plus the leaf/extension flag into hex-prefix bytes.
pub fn encode(key: NibbleView<'_>, is_leaf: bool) -> Vec<u8> {
    encode_with(key.len(), is_leaf, |i| key.at(i))
}

/// Encodes the concatenation of `head` followed by `tail` as a single hex-prefix key, used
/// during trie deletion to fuse an extension's key with its collapsed child's.
pub(crate) fn encode_concat(head: NibbleView<'_>, tail: NibbleView<'_>, is_leaf: bool) -> Vec<u8> {
    let head_len = head.len();
    encode_with(head_len + tail.len(), is_leaf, |i| {
        if i < head_len {
            head.at(i)
        } else {
            tail.at(i - head_len)
        }
    })
}

/// Encodes only the first `len` nibbles of `key`, ignoring `key.len()`. Used when splitting a
/// short node on a shared-prefix boundary shorter than the node's own key.
pub(crate) fn encode_prefix(key: NibbleView<'_>, len: usize, is_leaf: bool) -> Vec<u8> {
    encode_with(len, is_leaf, |i| key.at(i))
}

/// Encodes a single nibble `nib` followed by `tail`'s nibbles, used when a collapsed branch
/// slot's index becomes the lead nibble of its replacement node's key.
pub(crate) fn encode_prepend(nib: u8, tail: NibbleView<'_>, is_leaf: bool) -> Vec<u8> {
    encode_with(1 + tail.len(), is_leaf, |i| if i == 0 { nib } else { tail.at(i - 1) })
}

/// Encodes a single nibble `nib` with no trailing nibbles, used when a collapsed branch
/// slot's only remaining content is itself a branch (wrapped as a length-1 extension).
pub(crate) fn encode_single(nib: u8, is_leaf: bool) -> Vec<u8> {
    encode_with(1, is_leaf, |_| nib)
}

fn encode_with(len: usize, is_leaf: bool, nibble_at: impl Fn(usize) -> u8) -> Vec<u8> {
    let odd = len % 2 == 1;
    let mut out = Vec::with_capacity(len / 2 + 1);

    let flags = ((is_leaf as u8) * 2 | (odd as u8)) << 4;
    let mut i = 0;
    if odd {
        out.push(flags | nibble_at(0));
        i = 1;
    } else {
        out.push(flags);
    }

    while i < len {
        out.push((nibble_at(i) << 4) | nibble_at(i + 1));
        i += 2;
    }

    out
}

/// Decodes hex-prefix `bytes` into a nibble view over the key and the leaf/extension flag.
///
/// The returned [`NibbleView`] borrows `bytes` directly; no nibbles are copied.
pub fn decode(bytes: &[u8]) -> (NibbleView<'_>, bool) {
    if bytes.is_empty() {
        return (NibbleView::new(bytes), false);
    }

    let is_leaf = bytes[0] & LEAF_FLAG != 0;
    let odd = bytes[0] & ODD_FLAG != 0;
    let offset = if odd { 1 } else { 2 };
    (NibbleView::with_offset(bytes, offset), is_leaf)
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::vec;

    fn roundtrip(nibbles: &[u8], is_leaf: bool) {
        // Pack the raw nibbles into bytes, padding an odd count with a trailing zero nibble
        // that `len` below excludes from the view `encode` actually reads.
        let mut packed = Vec::new();
        let mut it = nibbles.iter().copied();
        while let Some(hi) = it.next() {
            let lo = it.next().unwrap_or(0);
            packed.push((hi << 4) | lo);
        }
        let view = NibbleView::new(&packed);
        let encoded = encode_with(nibbles.len(), is_leaf, |i| view.at(i));
        let (decoded, leaf) = decode(&encoded);
        assert_eq!(leaf, is_leaf);
        assert_eq!(decoded.to_vec(), nibbles);
    }

    #[test]
    fn roundtrip_even_leaf() {
        roundtrip(&[0x1, 0x2, 0x3, 0x4], true);
    }

    #[test]
    fn roundtrip_even_extension() {
        roundtrip(&[0x1, 0x2, 0x3, 0x4], false);
    }

    #[test]
    fn roundtrip_odd_leaf() {
        roundtrip(&[0x1, 0x2, 0x3], true);
    }

    #[test]
    fn roundtrip_odd_extension() {
        roundtrip(&[0x1, 0x2, 0x3], false);
    }

    #[test]
    fn roundtrip_empty() {
        roundtrip(&[], true);
        roundtrip(&[], false);
    }

    #[test]
    fn matches_known_vectors() {
        // Known-answer vectors for the hex-prefix encoding at a few representative lengths/parities.
        assert_eq!(encode_with(5, false, |i| [0, 0, 1, 2, 3, 4, 5][i]), vec![0x00, 0x01, 0x23, 0x45]);
        assert_eq!(encode_with(4, false, |i| [0, 1, 2, 3, 4][i]), vec![0x10, 0x12, 0x34]);
        assert_eq!(encode_with(5, true, |i| [0, 0, 1, 2, 3, 4, 5][i]), vec![0x20, 0x01, 0x23, 0x45]);
        assert_eq!(encode_with(4, true, |i| [1, 2, 3, 4][i]), vec![0x20, 0x12, 0x34]);
    }

    #[test]
    fn concat_matches_manual_concatenation() {
        let a = [0x12, 0x34];
        let b = [0x56, 0x78];
        let head = NibbleView::new(&a);
        let tail = NibbleView::new(&b);
        let concatenated = encode_concat(head, tail, true);
        let (decoded, leaf) = decode(&concatenated);
        assert!(leaf);
        assert_eq!(decoded.to_vec(), vec![0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8]);
    }
}
