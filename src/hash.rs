//! The content-address hash primitive and the trie's uninitialized-root sentinel.

pub use alloy_primitives::keccak256;

/// A 32-byte, big-endian content address. Used both as a trie node's address and, in the
/// account-state facade, as the 160-bit-key superset for account lookups.
///
/// [alloy_primitives::B256] already provides what `H256` needs: total ordering on the
/// underlying bytes, hex I/O (`Display`/`FromStr`), and a size-32 byte array representation, so
/// this crate reuses it directly rather than reimplementing a hash type.
pub type H256 = alloy_primitives::B256;

/// The sentinel "uninitialized trie" root: `Keccak256("")`.
///
/// This is distinct from the root of an *initialized, empty* trie, which is the hash of the
/// serialized empty node (see [`TrieDb::init`](crate::TrieDb::init)). Conflating the two is a
/// known footgun in Merkle-Patricia trie implementations; this crate keeps them apart.
pub fn null_node() -> H256 {
    keccak256([])
}
