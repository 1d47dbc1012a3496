//! Property-based tests for the two invariants that depend on sequences of operations rather
//! than a single fixed scenario: insertion-order independence of the final root, and deletion
//! being the exact inverse of insertion.

use ctriedb::{MemoryNodeStore, TrieDb};
use proptest::prelude::*;

fn distinct_kv_pairs() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec((prop::collection::vec(any::<u8>(), 1..6), prop::collection::vec(any::<u8>(), 0..6)), 1..12)
        .prop_map(|mut pairs| {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs.dedup_by(|a, b| a.0 == b.0);
            pairs
        })
}

fn permutation_seed() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<usize>(), 0..32)
}

fn shuffled(len: usize, seed: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    for (i, &s) in seed.iter().enumerate() {
        if i >= len {
            break;
        }
        let j = s % len;
        indices.swap(i % len, j);
    }
    indices
}

proptest! {
    /// Invariant 3: the final root depends only on the set of (key, value) pairs present, not
    /// the order they were inserted in.
    #[test]
    fn insertion_order_does_not_affect_root(pairs in distinct_kv_pairs(), seed in permutation_seed()) {
        let mut a = TrieDb::new(MemoryNodeStore::new());
        for (k, v) in &pairs {
            a.insert(k, v.clone()).unwrap();
        }

        let order = shuffled(pairs.len(), &seed);
        let mut b = TrieDb::new(MemoryNodeStore::new());
        for &i in &order {
            let (k, v) = &pairs[i];
            b.insert(k, v.clone()).unwrap();
        }

        prop_assert_eq!(a.root(), b.root());
    }

    /// Invariant 4: inserting a key and then immediately removing it restores the exact root
    /// that existed beforehand, regardless of what else is already in the trie.
    #[test]
    fn insert_then_delete_is_an_inverse(
        pairs in distinct_kv_pairs(),
        extra_key in prop::collection::vec(any::<u8>(), 1..6),
        extra_value in prop::collection::vec(any::<u8>(), 0..6),
    ) {
        let mut t = TrieDb::new(MemoryNodeStore::new());
        for (k, v) in &pairs {
            t.insert(k, v.clone()).unwrap();
        }
        prop_assume!(!pairs.iter().any(|(k, _)| k == &extra_key));

        let root_before = t.root();
        t.insert(&extra_key, extra_value).unwrap();
        t.remove(&extra_key).unwrap();
        prop_assert_eq!(t.root(), root_before);
    }
}
