//! The trie engine: `get`/`insert`/`remove`/`contains`/`root`/`set_root`/`init` over a pluggable
//! [`NodeStore`], plus the internal split/collapse machinery that keeps every node canonically
//! shaped after a mutation.
//!
//! Grounded on the recursive `mergeAt`/`deleteAt` structure of a from-scratch, C++-style
//! `CTrieDB<DB>`: each mutation walks down from the root, rewrites the path it touches, and
//! leaves every other node untouched (and so, by content addressing, byte-identical to before).

use crate::{
    errors::{TrieError, TrieResult},
    hash::{null_node, H256},
    hex_prefix,
    nibble::NibbleView,
    node::TrieNode,
    store::NodeStore,
};
use alloc::vec::Vec;

/// The outcome of deleting a key from a subtree, distinguishing "nothing changed" (key absent)
/// from an actual structural change, so callers only rewrite and erase nodes on the search path
/// that the deletion actually touched.
enum DeleteOutcome {
    /// The key was not found under this subtree; `node` is returned unchanged.
    Unchanged(TrieNode),
    /// The subtree became empty.
    Removed,
    /// The subtree changed shape; `node` has not yet been written to the store.
    Changed(TrieNode),
}

/// A content-addressed Merkle-Patricia trie over a pluggable [`NodeStore`].
///
/// A freshly constructed `TrieDb` is *uninitialized*: its root is the [`null_node`] sentinel,
/// distinct from the root of an initialized empty trie (see [`Self::init`]). Both read as an
/// empty trie; [`Self::is_empty`] treats them identically.
#[derive(Debug)]
pub struct TrieDb<S: NodeStore> {
    store: S,
    root: H256,
}

impl<S: NodeStore> TrieDb<S> {
    /// Wraps `store` as an uninitialized trie.
    pub fn new(store: S) -> Self {
        Self { store, root: null_node() }
    }

    /// Writes the canonical empty node and points the root at it. Idempotent.
    pub fn init(&mut self) -> H256 {
        let hash = self.write_node(&TrieNode::Empty);
        self.root = hash;
        hash
    }

    /// The current root.
    pub fn root(&self) -> H256 {
        self.root
    }

    /// Points the trie at `root`, which must already resolve in the backing store (or be the
    /// uninitialized sentinel).
    pub fn set_root(&mut self, root: H256) -> TrieResult<()> {
        if root != null_node() && self.store.read(&root).is_none() {
            return Err(TrieError::BadRoot(root));
        }
        self.root = root;
        Ok(())
    }

    /// Whether the trie holds no key-value pairs, initialized or not.
    pub fn is_empty(&self) -> bool {
        self.root == null_node() || self.root == TrieNode::Empty.hash()
    }

    /// A reference to the backing store, for callers that need to inspect it directly (tests,
    /// snapshotting).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether `key` has an associated value.
    pub fn contains(&self, key: &[u8]) -> TrieResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Looks up the value associated with `key`, if any.
    pub fn get(&self, key: &[u8]) -> TrieResult<Option<Vec<u8>>> {
        self.get_at(self.root, NibbleView::new(key))
    }

    fn get_at(&self, hash: H256, key: NibbleView<'_>) -> TrieResult<Option<Vec<u8>>> {
        match self.read_node(hash)? {
            TrieNode::Empty => Ok(None),
            TrieNode::Leaf { hp_key, value } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                Ok((existing == key).then_some(value))
            }
            TrieNode::Extension { hp_key, child } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                if key.contains(&existing) {
                    self.get_at(child, key.mid(existing.len()))
                } else {
                    Ok(None)
                }
            }
            TrieNode::Branch { children, value } => {
                if key.is_empty() {
                    Ok((!value.is_empty()).then_some(value))
                } else {
                    match children[key.at(0) as usize] {
                        Some(child) => self.get_at(child, key.mid(1)),
                        None => Ok(None),
                    }
                }
            }
        }
    }

    /// Inserts `value` under `key`, overwriting any prior value. Implicitly initializes the
    /// trie if it was uninitialized.
    pub fn insert(&mut self, key: &[u8], value: Vec<u8>) -> TrieResult<()> {
        let node = self.read_node(self.root)?;
        let new_node = self.upsert(node, NibbleView::new(key), value)?;
        self.replace_root(self.write_node(&new_node));
        Ok(())
    }

    /// Removes `key`, if present. A no-op if `key` has no value.
    pub fn remove(&mut self, key: &[u8]) -> TrieResult<()> {
        let node = self.read_node(self.root)?;
        match self.delete(node, NibbleView::new(key))? {
            DeleteOutcome::Unchanged(_) => Ok(()),
            DeleteOutcome::Removed => {
                self.erase_root();
                self.root = null_node();
                Ok(())
            }
            DeleteOutcome::Changed(new_node) => {
                let new_hash = self.write_node(&new_node);
                self.replace_root(new_hash);
                Ok(())
            }
        }
    }

    fn replace_root(&mut self, new_hash: H256) {
        if self.root != null_node() && self.root != new_hash {
            self.store.erase(&self.root);
        }
        self.root = new_hash;
    }

    fn erase_root(&mut self) {
        if self.root != null_node() {
            self.store.erase(&self.root);
        }
    }

    fn write_node(&mut self, node: &TrieNode) -> H256 {
        let hash = node.hash();
        self.store.write(hash, node.serialize());
        hash
    }

    fn read_node(&self, hash: H256) -> TrieResult<TrieNode> {
        if hash == null_node() {
            return Ok(TrieNode::Empty);
        }
        match self.store.read(&hash) {
            Some(bytes) => TrieNode::deserialize(&bytes, hash),
            None => Err(TrieError::MissingNode(hash)),
        }
    }

    /// Reads, recursively upserts, and rewrites the child at `child`, erasing its old address if
    /// it moved.
    fn upsert_child(
        &mut self,
        child: Option<H256>,
        key: NibbleView<'_>,
        value: Vec<u8>,
    ) -> TrieResult<H256> {
        let node = match child {
            Some(hash) => self.read_node(hash)?,
            None => TrieNode::Empty,
        };
        let new_node = self.upsert(node, key, value)?;
        let new_hash = self.write_node(&new_node);
        if let Some(old_hash) = child {
            if old_hash != new_hash {
                self.store.erase(&old_hash);
            }
        }
        Ok(new_hash)
    }

    /// Places `value` under `key` within `node`, returning the (unwritten) replacement node.
    fn upsert(&mut self, node: TrieNode, key: NibbleView<'_>, value: Vec<u8>) -> TrieResult<TrieNode> {
        match node {
            TrieNode::Empty => Ok(TrieNode::Leaf { hp_key: hex_prefix::encode(key, true), value }),
            TrieNode::Leaf { hp_key, value: old_value } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                let shared = key.shared(&existing);
                if shared == key.len() && shared == existing.len() {
                    Ok(TrieNode::Leaf { hp_key, value })
                } else {
                    self.split(key, value, existing, ExistingPayload::Leaf(old_value), shared)
                }
            }
            TrieNode::Extension { hp_key, child } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                let shared = key.shared(&existing);
                if shared == existing.len() {
                    let new_child = self.upsert_child(Some(child), key.mid(shared), value)?;
                    Ok(TrieNode::Extension { hp_key, child: new_child })
                } else {
                    self.split(key, value, existing, ExistingPayload::Extension(child), shared)
                }
            }
            TrieNode::Branch { mut children, value: branch_value } => {
                if key.is_empty() {
                    Ok(TrieNode::Branch { children, value })
                } else {
                    let nib = key.at(0) as usize;
                    let new_child = self.upsert_child(children[nib], key.mid(1), value)?;
                    children[nib] = Some(new_child);
                    Ok(TrieNode::Branch { children, value: branch_value })
                }
            }
        }
    }

    /// Splits a short node whose key diverges from `key` after `shared` nibbles into a branch
    /// (wrapped in an extension covering the shared prefix, if any).
    fn split(
        &mut self,
        key: NibbleView<'_>,
        value: Vec<u8>,
        existing_key: NibbleView<'_>,
        existing: ExistingPayload,
        shared: usize,
    ) -> TrieResult<TrieNode> {
        let mut children: [Option<H256>; 16] = [None; 16];
        let mut branch_value = Vec::new();

        let existing_tail = existing_key.mid(shared);
        if existing_tail.is_empty() {
            match existing {
                ExistingPayload::Leaf(v) => branch_value = v,
                ExistingPayload::Extension(_) => {
                    unreachable!("an extension's key is always fully consumed before splitting")
                }
            }
        } else {
            let nib = existing_tail.at(0) as usize;
            let sub_tail = existing_tail.mid(1);
            let child_hash = match existing {
                ExistingPayload::Leaf(v) => {
                    let leaf = TrieNode::Leaf { hp_key: hex_prefix::encode(sub_tail, true), value: v };
                    self.write_node(&leaf)
                }
                ExistingPayload::Extension(child) => {
                    if sub_tail.is_empty() {
                        child
                    } else {
                        let ext =
                            TrieNode::Extension { hp_key: hex_prefix::encode(sub_tail, false), child };
                        self.write_node(&ext)
                    }
                }
            };
            children[nib] = Some(child_hash);
        }

        let new_tail = key.mid(shared);
        if new_tail.is_empty() {
            branch_value = value;
        } else {
            let nib = new_tail.at(0) as usize;
            let sub_tail = new_tail.mid(1);
            let leaf = TrieNode::Leaf { hp_key: hex_prefix::encode(sub_tail, true), value };
            children[nib] = Some(self.write_node(&leaf));
        }

        let branch = TrieNode::Branch { children, value: branch_value };
        if shared == 0 {
            Ok(branch)
        } else {
            let branch_hash = self.write_node(&branch);
            let hp_key = hex_prefix::encode_prefix(key, shared, false);
            Ok(TrieNode::Extension { hp_key, child: branch_hash })
        }
    }

    fn delete(&mut self, node: TrieNode, key: NibbleView<'_>) -> TrieResult<DeleteOutcome> {
        match node {
            TrieNode::Empty => Ok(DeleteOutcome::Unchanged(TrieNode::Empty)),
            TrieNode::Leaf { hp_key, value } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                if existing == key {
                    Ok(DeleteOutcome::Removed)
                } else {
                    Ok(DeleteOutcome::Unchanged(TrieNode::Leaf { hp_key, value }))
                }
            }
            TrieNode::Extension { hp_key, child } => {
                let (existing, _) = hex_prefix::decode(&hp_key);
                if !key.contains(&existing) {
                    return Ok(DeleteOutcome::Unchanged(TrieNode::Extension { hp_key, child }));
                }
                let child_node = self.read_node(child)?;
                match self.delete(child_node, key.mid(existing.len()))? {
                    DeleteOutcome::Unchanged(_) => {
                        Ok(DeleteOutcome::Unchanged(TrieNode::Extension { hp_key, child }))
                    }
                    DeleteOutcome::Removed => {
                        self.store.erase(&child);
                        Ok(DeleteOutcome::Removed)
                    }
                    DeleteOutcome::Changed(new_child) => {
                        self.store.erase(&child);
                        Ok(DeleteOutcome::Changed(self.graft(existing, new_child)))
                    }
                }
            }
            TrieNode::Branch { mut children, value } => {
                if key.is_empty() {
                    if value.is_empty() {
                        return Ok(DeleteOutcome::Unchanged(TrieNode::Branch { children, value }));
                    }
                    return self.collapse_branch(children, Vec::new());
                }
                let nib = key.at(0) as usize;
                let Some(child_hash) = children[nib] else {
                    return Ok(DeleteOutcome::Unchanged(TrieNode::Branch { children, value }));
                };
                let child_node = self.read_node(child_hash)?;
                match self.delete(child_node, key.mid(1))? {
                    DeleteOutcome::Unchanged(_) => {
                        Ok(DeleteOutcome::Unchanged(TrieNode::Branch { children, value }))
                    }
                    DeleteOutcome::Removed => {
                        self.store.erase(&child_hash);
                        children[nib] = None;
                        self.collapse_branch(children, value)
                    }
                    DeleteOutcome::Changed(new_child) => {
                        self.store.erase(&child_hash);
                        children[nib] = Some(self.write_node(&new_child));
                        Ok(DeleteOutcome::Changed(TrieNode::Branch { children, value }))
                    }
                }
            }
        }
    }

    /// Checks whether a branch that just lost a child or its own value still needs to be a
    /// branch at all: with zero slots used it vanishes or becomes a leaf, with exactly one it
    /// collapses into that slot's node (`uniqueInUse`), otherwise it stays a branch.
    fn collapse_branch(
        &mut self,
        children: [Option<H256>; 16],
        value: Vec<u8>,
    ) -> TrieResult<DeleteOutcome> {
        let mut used = children.iter().enumerate().filter_map(|(i, c)| c.map(|h| (i, h)));
        let first = used.next();
        let second = used.next();

        match (first, second, value.is_empty()) {
            (None, None, true) => Ok(DeleteOutcome::Removed),
            (None, None, false) => {
                let hp_key = hex_prefix::encode(NibbleView::new(&[]), true);
                Ok(DeleteOutcome::Changed(TrieNode::Leaf { hp_key, value }))
            }
            (Some((nib, hash)), None, true) => {
                let child_node = self.read_node(hash)?;
                self.store.erase(&hash);
                Ok(DeleteOutcome::Changed(self.graft_nibble(nib as u8, child_node)))
            }
            _ => Ok(DeleteOutcome::Changed(TrieNode::Branch { children, value })),
        }
    }

    /// Fuses an extension's own key with its (already-collapsed) child's key.
    fn graft(&mut self, existing: NibbleView<'_>, new_child: TrieNode) -> TrieNode {
        match new_child {
            TrieNode::Leaf { hp_key, value } => {
                let (tail, _) = hex_prefix::decode(&hp_key);
                TrieNode::Leaf { hp_key: hex_prefix::encode_concat(existing, tail, true), value }
            }
            TrieNode::Extension { hp_key, child } => {
                let (tail, _) = hex_prefix::decode(&hp_key);
                TrieNode::Extension { hp_key: hex_prefix::encode_concat(existing, tail, false), child }
            }
            TrieNode::Branch { .. } => {
                let child = self.write_node(&new_child);
                TrieNode::Extension { hp_key: hex_prefix::encode(existing, false), child }
            }
            TrieNode::Empty => unreachable!("a delete that removes a subtree returns Removed, not Changed(Empty)"),
        }
    }

    /// Prepends the nibble a branch slot lived at onto that slot's (now sole) node.
    fn graft_nibble(&mut self, nib: u8, node: TrieNode) -> TrieNode {
        match node {
            TrieNode::Leaf { hp_key, value } => {
                let (tail, _) = hex_prefix::decode(&hp_key);
                TrieNode::Leaf { hp_key: hex_prefix::encode_prepend(nib, tail, true), value }
            }
            TrieNode::Extension { hp_key, child } => {
                let (tail, _) = hex_prefix::decode(&hp_key);
                TrieNode::Extension { hp_key: hex_prefix::encode_prepend(nib, tail, false), child }
            }
            TrieNode::Branch { .. } => {
                let child = self.write_node(&node);
                TrieNode::Extension { hp_key: hex_prefix::encode_single(nib, false), child }
            }
            TrieNode::Empty => unreachable!("a used branch slot always resolves to a real node"),
        }
    }
}

/// The payload of a short node being split: a leaf's value, or an extension's child address.
enum ExistingPayload {
    Leaf(Vec<u8>),
    Extension(H256),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::MemoryNodeStore;
    use alloc::vec;

    fn trie() -> TrieDb<MemoryNodeStore> {
        TrieDb::new(MemoryNodeStore::new())
    }

    #[test]
    fn uninitialized_trie_reads_as_empty() {
        let t = trie();
        assert!(t.is_empty());
        assert_eq!(t.get(b"anything").unwrap(), None);
    }

    #[test]
    fn init_is_idempotent_in_effect() {
        let mut t = trie();
        let a = t.init();
        let b = t.init();
        assert_eq!(a, b);
        assert!(t.is_empty());
    }

    #[test]
    fn insert_then_get_single_key() {
        let mut t = trie();
        t.insert(b"dog", vec![1, 2, 3]).unwrap();
        assert_eq!(t.get(b"dog").unwrap(), Some(vec![1, 2, 3]));
        assert!(!t.is_empty());
    }

    #[test]
    fn insert_overwrites_existing_value() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.insert(b"dog", vec![2]).unwrap();
        assert_eq!(t.get(b"dog").unwrap(), Some(vec![2]));
    }

    #[test]
    fn diverging_keys_split_into_a_branch() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.insert(b"cat", vec![2]).unwrap();
        assert_eq!(t.get(b"dog").unwrap(), Some(vec![1]));
        assert_eq!(t.get(b"cat").unwrap(), Some(vec![2]));
        assert_eq!(t.get(b"fox").unwrap(), None);
    }

    #[test]
    fn shared_prefix_keys_share_an_extension() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.insert(b"doge", vec![2]).unwrap();
        t.insert(b"dogecoin", vec![3]).unwrap();
        assert_eq!(t.get(b"dog").unwrap(), Some(vec![1]));
        assert_eq!(t.get(b"doge").unwrap(), Some(vec![2]));
        assert_eq!(t.get(b"dogecoin").unwrap(), Some(vec![3]));
    }

    #[test]
    fn remove_missing_key_is_a_noop() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        let root_before = t.root();
        t.remove(b"cat").unwrap();
        assert_eq!(t.root(), root_before);
    }

    #[test]
    fn remove_last_key_empties_the_trie() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.remove(b"dog").unwrap();
        assert!(t.is_empty());
        assert_eq!(t.get(b"dog").unwrap(), None);
    }

    #[test]
    fn remove_restores_sibling_leaf_reachability() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.insert(b"cat", vec![2]).unwrap();
        t.remove(b"dog").unwrap();
        assert_eq!(t.get(b"dog").unwrap(), None);
        assert_eq!(t.get(b"cat").unwrap(), Some(vec![2]));
    }

    #[test]
    fn insert_then_delete_of_one_key_restores_root() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.insert(b"cat", vec![2]).unwrap();
        let root_with_two = t.root();
        t.insert(b"fox", vec![3]).unwrap();
        t.remove(b"fox").unwrap();
        assert_eq!(t.root(), root_with_two);
    }

    #[test]
    fn insertion_order_does_not_affect_final_root() {
        let mut a = trie();
        a.insert(b"dog", vec![1]).unwrap();
        a.insert(b"cat", vec![2]).unwrap();
        a.insert(b"doge", vec![3]).unwrap();

        let mut b = trie();
        b.insert(b"doge", vec![3]).unwrap();
        b.insert(b"cat", vec![2]).unwrap();
        b.insert(b"dog", vec![1]).unwrap();

        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn set_root_rejects_unresolvable_hash() {
        let mut t = trie();
        let bogus = crate::hash::keccak256(b"not in the store");
        assert_eq!(t.set_root(bogus), Err(TrieError::BadRoot(bogus)));
    }

    #[test]
    fn set_root_accepts_uninitialized_sentinel() {
        let mut t = trie();
        t.insert(b"dog", vec![1]).unwrap();
        t.set_root(null_node()).unwrap();
        assert!(t.is_empty());
    }
}
