//! Trie node taxonomy and canonical, content-addressed serialization.
//!
//! Serialization reuses `alloy_rlp`'s list/string framing (an RLP list of byte-string elements)
//! rather than a bespoke length-prefix scheme — deterministic and canonical by construction,
//! without taking on Ethereum wire compatibility (no RLP-encoded transactions or headers here,
//! just node framing). Every child reference is always a full 32-byte hash, so there is no
//! small-node inlining to represent: the element set collapses to plain byte strings.

use crate::{
    errors::{TrieError, TrieResult},
    hash::{keccak256, H256},
};
use alloc::vec::Vec;
use alloy_primitives::Bytes;
use alloy_rlp::{Decodable, Encodable};

/// A node within the trie, tagged by arity: 0 (empty), 2 (leaf or extension), or 17 (branch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieNode {
    /// Arity 0: absence.
    Empty,
    /// Arity 2 with the leaf flag set: `hp_key`'s remainder nibbles map directly to `value`.
    Leaf {
        /// Hex-prefix encoded key, leaf flag set.
        hp_key: Vec<u8>,
        /// The stored value.
        value: Vec<u8>,
    },
    /// Arity 2 with the leaf flag clear: `hp_key`'s remainder nibbles delegate to `child`.
    Extension {
        /// Hex-prefix encoded key, leaf flag clear.
        hp_key: Vec<u8>,
        /// Address of the child node. Never empty in canonical form.
        child: H256,
    },
    /// Arity 17: 16 child slots plus a terminal value slot.
    Branch {
        /// The 16 child slots, by nibble value. `None` means absent.
        children: [Option<H256>; 16],
        /// The value stored at this depth, if any key terminates here.
        value: Vec<u8>,
    },
}

impl TrieNode {
    /// True if this is a [`TrieNode::Leaf`].
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// The hex-prefix key of a [`TrieNode::Leaf`] or [`TrieNode::Extension`], if `self` is one.
    pub fn hp_key(&self) -> Option<&[u8]> {
        match self {
            Self::Leaf { hp_key, .. } | Self::Extension { hp_key, .. } => Some(hp_key),
            _ => None,
        }
    }

    /// Canonical serialization of this node: an RLP list of its byte-string elements.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Empty => {
                let items: Vec<Bytes> = Vec::new();
                items.encode(&mut out);
            }
            Self::Leaf { hp_key, value } => {
                let items = alloc::vec![Bytes::copy_from_slice(hp_key), Bytes::copy_from_slice(value)];
                items.encode(&mut out);
            }
            Self::Extension { hp_key, child } => {
                let items =
                    alloc::vec![Bytes::copy_from_slice(hp_key), Bytes::copy_from_slice(child.as_slice())];
                items.encode(&mut out);
            }
            Self::Branch { children, value } => {
                let mut items: Vec<Bytes> = children
                    .iter()
                    .map(|c| c.map(|h| Bytes::copy_from_slice(h.as_slice())).unwrap_or_default())
                    .collect();
                items.push(Bytes::copy_from_slice(value));
                items.encode(&mut out);
            }
        }
        out
    }

    /// The content address of this node: `Keccak256(serialize(self))`.
    pub fn hash(&self) -> H256 {
        keccak256(self.serialize())
    }

    /// Parses a node's canonical serialization, as read back from a [`NodeStore`](crate::NodeStore).
    ///
    /// `at` is the hash the bytes were read from, used only to enrich the error on corruption.
    pub fn deserialize(bytes: &[u8], at: H256) -> TrieResult<Self> {
        let mut buf = bytes;
        let items =
            Vec::<Bytes>::decode(&mut buf).map_err(|_| TrieError::CorruptedNode(at))?;

        match items.len() {
            0 => Ok(Self::Empty),
            2 => {
                let hp_key = items[0].to_vec();
                let (_, is_leaf) = crate::hex_prefix::decode(&hp_key);
                if is_leaf {
                    Ok(Self::Leaf { hp_key, value: items[1].to_vec() })
                } else {
                    if items[1].len() != 32 {
                        return Err(TrieError::CorruptedNode(at));
                    }
                    Ok(Self::Extension { hp_key, child: H256::from_slice(&items[1]) })
                }
            }
            17 => {
                let mut children: [Option<H256>; 16] = [None; 16];
                for (i, slot) in children.iter_mut().enumerate() {
                    if !items[i].is_empty() {
                        if items[i].len() != 32 {
                            return Err(TrieError::CorruptedNode(at));
                        }
                        *slot = Some(H256::from_slice(&items[i]));
                    }
                }
                Ok(Self::Branch { children, value: items[16].to_vec() })
            }
            _ => Err(TrieError::CorruptedNode(at)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hex_prefix;
    use crate::nibble::NibbleView;

    #[test]
    fn empty_node_roundtrips() {
        let node = TrieNode::Empty;
        let bytes = node.serialize();
        assert_eq!(TrieNode::deserialize(&bytes, node.hash()).unwrap(), node);
    }

    #[test]
    fn leaf_node_roundtrips() {
        let key = [0x12, 0x34];
        let hp_key = hex_prefix::encode(NibbleView::new(&key), true);
        let node = TrieNode::Leaf { hp_key, value: alloc::vec![1, 2, 3] };
        let bytes = node.serialize();
        assert_eq!(TrieNode::deserialize(&bytes, node.hash()).unwrap(), node);
    }

    #[test]
    fn extension_node_roundtrips() {
        let key = [0xAB];
        let hp_key = hex_prefix::encode(NibbleView::new(&key), false);
        let node = TrieNode::Extension { hp_key, child: keccak256([1, 2, 3]) };
        let bytes = node.serialize();
        assert_eq!(TrieNode::deserialize(&bytes, node.hash()).unwrap(), node);
    }

    #[test]
    fn branch_node_roundtrips() {
        let mut children = [None; 16];
        children[3] = Some(keccak256([9]));
        children[15] = Some(keccak256([10]));
        let node = TrieNode::Branch { children, value: alloc::vec![7, 7] };
        let bytes = node.serialize();
        assert_eq!(TrieNode::deserialize(&bytes, node.hash()).unwrap(), node);
    }

    #[test]
    fn equal_nodes_share_one_address() {
        let a = TrieNode::Leaf { hp_key: alloc::vec![0x20], value: alloc::vec![1] };
        let b = TrieNode::Leaf { hp_key: alloc::vec![0x20], value: alloc::vec![1] };
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn corrupted_arity_is_rejected() {
        let mut out = Vec::new();
        let items: Vec<Bytes> = alloc::vec![Bytes::from_static(&[1]); 3];
        items.encode(&mut out);
        let at = keccak256(&out);
        assert!(matches!(TrieNode::deserialize(&out, at), Err(TrieError::CorruptedNode(h)) if h == at));
    }
}
