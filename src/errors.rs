//! Errors for the trie engine.

use crate::hash::H256;

/// A [Result] type alias where the error is [TrieError].
pub type TrieResult<T> = Result<T, TrieError>;

/// An error type for [`TrieDb`](crate::TrieDb) operations.
#[derive(Debug, derive_more::Display, PartialEq, Eq)]
pub enum TrieError {
    /// The current root is not resolvable in the backing node store.
    #[display("root {_0} is not resolvable in the node store")]
    BadRoot(H256),
    /// A node the trie expected to resolve (a child address read back from a parent it just
    /// wrote) is missing from the store entirely.
    #[display("node at {_0} is missing from the node store")]
    MissingNode(H256),
    /// A node read from the store does not match one of the three arities (0, 2, 17), or its
    /// hex-prefix key is malformed.
    #[display("node at {_0} is corrupted")]
    CorruptedNode(H256),
}

impl core::error::Error for TrieError {}
