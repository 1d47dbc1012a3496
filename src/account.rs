//! The account-state facade over a [`TrieDb`]: an `Address -> Account` view with balance and
//! sequence-number bookkeeping, transaction application, and a batched commit over an
//! insertion-ordered write-back cache.

use crate::{
    errors::TrieResult,
    hash::{keccak256, H256},
    store::NodeStore,
    trie::TrieDb,
};
use alloc::vec::Vec;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// An address: the key domain of the account trie. An address is simply a 32-byte
/// content-addressed key here (see module docs on scope); no key-derivation scheme is implied.
pub type Address = H256;

/// An account record: balance, sequence number (nonce), storage root, and code.
///
/// Serializes as VARINT-encoded balance and sequence followed by the raw storage root and code
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    balance: u64,
    sequence: u64,
    storage_root: H256,
    code: Vec<u8>,
}

impl Account {
    /// A fresh, zeroed account with empty code and no storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's current balance.
    pub const fn balance(&self) -> u64 {
        self.balance
    }

    /// The account's current sequence number (nonce).
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The root of the account's storage trie.
    pub const fn storage_root(&self) -> H256 {
        self.storage_root
    }

    /// The account's code.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Sets the account's code.
    pub fn set_code(&mut self, code: Vec<u8>) {
        self.code = code;
    }

    /// Sets the account's storage root.
    pub fn set_storage_root(&mut self, root: H256) {
        self.storage_root = root;
    }

    /// Credits `amount` to the balance. Saturates rather than overflows.
    pub fn add_balance(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Debits `amount` from the balance.
    ///
    /// # Errors
    /// Returns [`AccountError::InsufficientBalance`] if `amount` exceeds the current balance.
    pub fn sub_balance(&mut self, amount: u64) -> Result<(), AccountError> {
        self.balance = self.balance.checked_sub(amount).ok_or(AccountError::InsufficientBalance)?;
        Ok(())
    }

    /// Increments the sequence number by one, as every applied transaction must.
    pub fn inc_sequence(&mut self) {
        self.sequence = self.sequence.saturating_add(1);
    }

    /// VARINT-encodes this account: `balance`, `sequence`, then `storage_root` and `code` as
    /// raw bytes. Each VARINT group is low-order first, 7 payload bits per byte, continuation
    /// flagged by the high bit.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, self.balance);
        write_varint(&mut out, self.sequence);
        out.extend_from_slice(self.storage_root.as_slice());
        out.extend_from_slice(&self.code);
        out
    }

    /// Decodes an account previously produced by [`Self::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, AccountError> {
        let mut cursor = bytes;
        let balance = read_varint(&mut cursor)?;
        let sequence = read_varint(&mut cursor)?;
        if cursor.len() < 32 {
            return Err(AccountError::Truncated);
        }
        let (root_bytes, code) = cursor.split_at(32);
        Ok(Self {
            balance,
            sequence,
            storage_root: H256::from_slice(root_bytes),
            code: code.to_vec(),
        })
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn read_varint(cursor: &mut &[u8]) -> Result<u64, AccountError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        let &byte = cursor.first().ok_or(AccountError::Truncated)?;
        *cursor = &cursor[1..];
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(AccountError::VarintOverflow);
        }
    }
}

/// Errors raised by account operations.
#[derive(Debug, derive_more::Display, PartialEq, Eq)]
pub enum AccountError {
    /// A debit exceeded the account's balance.
    #[display("insufficient balance")]
    InsufficientBalance,
    /// A serialized account's bytes ended before a field was fully read.
    #[display("truncated account record")]
    Truncated,
    /// A VARINT field did not terminate within 64 bits.
    #[display("varint exceeds 64 bits")]
    VarintOverflow,
}

impl core::error::Error for AccountError {}

/// A minimal value transfer: `amount` moves from `sender` to `recipient`, guarded by `sequence`
/// matching the sender's current account sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// The paying account.
    pub sender: Address,
    /// The receiving account.
    pub recipient: Address,
    /// The amount to move.
    pub amount: u64,
    /// The sender's claimed current sequence number; must match for the transaction to apply.
    pub sequence: u64,
}

/// An external collaborator that recovers a transaction's authorizing address.
///
/// Mirrors the `TrieProvider`/`TrieHinter` seam the trie layer leaves to its host: signature
/// recovery (secp256k1 ECDSA or equivalent) is out of scope for this crate (see module docs),
/// so callers plug in their own. [`AccountState::apply_transaction`] rejects the transaction
/// whenever the recovered address doesn't match the transaction's claimed sender.
pub trait TransactionVerifier {
    /// Recovers the address that actually authorized `tx`, if any.
    fn recover_sender(&self, tx: &Transaction) -> Option<Address>;
}

/// A [`TransactionVerifier`] that trusts every transaction's claimed sender outright, for tests
/// and for hosts that verify signatures upstream of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransactionVerifier;

impl TransactionVerifier for NoopTransactionVerifier {
    fn recover_sender(&self, tx: &Transaction) -> Option<Address> {
        Some(tx.sender)
    }
}

/// The account-state facade: a trie of [`Account`] records keyed by [`Address`], with a
/// write-back cache that preserves first-write order so [`Self::commit`] applies changes
/// deterministically regardless of which accounts were touched in what order afterward.
#[derive(Debug)]
pub struct AccountState<S: NodeStore, V: TransactionVerifier> {
    trie: TrieDb<S>,
    cache: IndexMap<Address, Account>,
    verifier: V,
}

impl<S: NodeStore> AccountState<S, NoopTransactionVerifier> {
    /// Wraps `trie` with a [`NoopTransactionVerifier`].
    pub fn new(trie: TrieDb<S>) -> Self {
        Self::with_verifier(trie, NoopTransactionVerifier)
    }
}

impl<S: NodeStore, V: TransactionVerifier> AccountState<S, V> {
    /// Wraps `trie`, verifying every applied transaction with `verifier`.
    pub fn with_verifier(trie: TrieDb<S>, verifier: V) -> Self {
        Self { trie, cache: IndexMap::new(), verifier }
    }

    /// Whether `address` has an account: either cached, or resolvable in the trie.
    pub fn is_address_in_use(&self, address: Address) -> TrieResult<bool> {
        if self.cache.contains_key(&address) {
            return Ok(true);
        }
        self.trie.contains(address.as_slice())
    }

    /// Reads `address`'s account, from the cache if present, else from the trie, else a fresh
    /// default account.
    pub fn get_account(&mut self, address: Address) -> TrieResult<Account> {
        if let Some(account) = self.cache.get(&address) {
            return Ok(account.clone());
        }
        let account = match self.trie.get(address.as_slice())? {
            Some(bytes) => Account::deserialize(&bytes).unwrap_or_default(),
            None => Account::default(),
        };
        self.cache.insert(address, account.clone());
        Ok(account)
    }

    /// Stages `account` under `address` in the write-back cache. Not visible in the trie's root
    /// until [`Self::commit`].
    pub fn set_account(&mut self, address: Address, account: Account) {
        self.cache.insert(address, account);
    }

    /// Applies a value transfer: recovers and checks `tx`'s sender, checks its sequence number
    /// and balance, then stages both accounts' updates in the cache.
    ///
    /// Rejections (unrecovered or mismatched sender, wrong sequence, insufficient balance) are
    /// not surfaced as a typed error — they return `Ok(false)` with a `tracing` event logged at
    /// the rejection site. Only a trie read failure is an `Err`.
    pub fn apply_transaction(&mut self, tx: &Transaction) -> TrieResult<bool> {
        if self.verifier.recover_sender(tx) != Some(tx.sender) {
            debug!(sender = %tx.sender, "rejected transaction: sender does not verify");
            return Ok(false);
        }

        let mut sender = self.get_account(tx.sender)?;
        if sender.sequence() != tx.sequence {
            debug!(
                sender = %tx.sender,
                expected = sender.sequence(),
                got = tx.sequence,
                "rejected transaction: sequence mismatch"
            );
            return Ok(false);
        }
        if sender.sub_balance(tx.amount).is_err() {
            debug!(sender = %tx.sender, amount = tx.amount, "rejected transaction: insufficient balance");
            return Ok(false);
        }
        sender.inc_sequence();

        let mut recipient = self.get_account(tx.recipient)?;
        recipient.add_balance(tx.amount);

        trace!(sender = %tx.sender, recipient = %tx.recipient, amount = tx.amount, "applied transaction");
        self.set_account(tx.sender, sender);
        self.set_account(tx.recipient, recipient);
        Ok(true)
    }

    /// Applies a batch of transactions in order, skipping (not aborting on) any that
    /// [`Self::apply_transaction`] rejects. Returns the number actually applied.
    pub fn advance_state(&mut self, transactions: &[Transaction]) -> TrieResult<usize> {
        let mut applied = 0;
        for tx in transactions {
            if self.apply_transaction(tx)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Writes every cached account into the trie, in the order each address was first touched,
    /// and returns the new root. Clears the cache.
    pub fn commit(&mut self) -> TrieResult<H256> {
        for (address, account) in self.cache.drain(..) {
            debug!(address = %address, "committing account");
            self.trie.insert(address.as_slice(), account.serialize())?;
        }
        Ok(self.trie.root())
    }

    /// The trie's current root, not reflecting any uncommitted cache entries.
    pub fn root(&self) -> H256 {
        self.trie.root()
    }

    /// A reference to the underlying trie.
    pub fn trie(&self) -> &TrieDb<S> {
        &self.trie
    }
}

/// An address suitable for use as a deterministic test fixture or a content-derived identifier:
/// `Keccak256(label)`.
pub fn address_of(label: &[u8]) -> Address {
    keccak256(label)
}
