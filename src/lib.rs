#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![no_std]

extern crate alloc;

mod hash;
pub use hash::{keccak256, null_node, H256};

mod nibble;
pub use nibble::NibbleView;

mod hex_prefix;
pub use hex_prefix::{decode as hex_prefix_decode, encode as hex_prefix_encode};

mod node;
pub use node::TrieNode;

mod errors;
pub use errors::{TrieError, TrieResult};

mod store;
pub use store::{MemoryNodeStore, NodeStore};

mod trie;
pub use trie::TrieDb;

mod account;
pub use account::{
    address_of, Account, AccountError, AccountState, Address, NoopTransactionVerifier,
    Transaction, TransactionVerifier,
};
