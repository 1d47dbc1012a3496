//! The content-addressed node store contract, and an in-memory implementation used by every
//! test in this crate.

use crate::hash::H256;
use alloc::{collections::BTreeMap, vec::Vec};

/// A key-value store keyed by node hash, storing serialized node payloads.
///
/// Implementations need not honor [`NodeStore::erase`] — see
/// [`TrieDb`](crate::TrieDb)'s module docs on `killNode` semantics; correctness never depends on
/// erasure actually happening.
pub trait NodeStore {
    /// Reads the payload stored under `hash`, if any.
    fn read(&self, hash: &H256) -> Option<Vec<u8>>;

    /// Writes `payload` under `hash`. Idempotent: writing the same bytes twice is a no-op.
    fn write(&mut self, hash: H256, payload: Vec<u8>);

    /// Requests removal of the entry at `hash`. May be ignored.
    fn erase(&mut self, hash: &H256);
}

/// A [NodeStore] backed by an in-memory [BTreeMap]. Never actually erases anything, leaning on
/// the "ignore `killNode`, rely on external reachability-based pruning" default this crate
/// permits every store to take.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    nodes: BTreeMap<H256, Vec<u8>>,
}

impl MemoryNodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently retained (including orphans `erase` never dropped).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeStore for MemoryNodeStore {
    fn read(&self, hash: &H256) -> Option<Vec<u8>> {
        self.nodes.get(hash).cloned()
    }

    fn write(&mut self, hash: H256, payload: Vec<u8>) {
        self.nodes.insert(hash, payload);
    }

    fn erase(&mut self, _hash: &H256) {
        // Orphans are retained; see the type's docs.
    }
}
