use std::collections::{BTreeMap, BTreeSet};

use embervm_runtime::{Backend, Log};
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

/// Account record of the in-memory backend.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryAccount {
	pub nonce: u64,
	pub balance: U256,
	pub storage: BTreeMap<H256, H256>,
	pub code: Vec<u8>,
}

/// One reversible write. `revert_to` walks these back in reverse order.
#[derive(Clone, Debug)]
enum JournalEntry {
	AccountCreated { address: H160 },
	BalanceChanged { address: H160, prev: U256 },
	NonceChanged { address: H160, prev: u64 },
	StorageChanged { address: H160, key: H256, prev: H256 },
	CodeChanged { address: H160, prev: Vec<u8> },
	RefundChanged { prev: u64 },
	DeleteMarked { address: H160 },
	AddressWarmed { address: H160 },
	SlotWarmed { address: H160, key: H256 },
	LogAdded,
}

/// In-memory journaled state, the reference `Backend` implementation. All
/// writes append an undo record, so any suffix of the history can be walked
/// back when a call frame reverts or errors.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
	accounts: BTreeMap<H160, MemoryAccount>,
	logs: Vec<Log>,
	refund: u64,
	deleted: BTreeSet<H160>,
	warm_addresses: BTreeSet<H160>,
	warm_slots: BTreeSet<(H160, H256)>,
	/// First-write originals of slots touched this transaction.
	tx_originals: BTreeMap<(H160, H256), H256>,
	journal: Vec<JournalEntry>,
	/// Number of the block being executed, for the `BLOCKHASH` window.
	pub block_number: U256,
	/// Hashes of the most recent blocks, newest first.
	pub block_hashes: Vec<H256>,
}

impl MemoryBackend {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed an account, bypassing the journal. Setup only.
	pub fn insert(&mut self, address: H160, account: MemoryAccount) {
		self.accounts.insert(address, account);
	}

	#[must_use]
	pub fn account(&self, address: H160) -> Option<&MemoryAccount> {
		self.accounts.get(&address)
	}

	#[must_use]
	pub fn logs(&self) -> &[Log] {
		&self.logs
	}

	/// Addresses flagged by `SELFDESTRUCT` and not reverted; the embedder
	/// removes them when the transaction's effects are made final.
	#[must_use]
	pub fn deleted_accounts(&self) -> impl Iterator<Item = H160> + '_ {
		self.deleted.iter().copied()
	}

	fn account_mut(&mut self, address: H160) -> &mut MemoryAccount {
		self.accounts.entry(address).or_default()
	}
}

impl Backend for MemoryBackend {
	fn balance(&self, address: H160) -> U256 {
		self.accounts
			.get(&address)
			.map(|a| a.balance)
			.unwrap_or_default()
	}

	fn nonce(&self, address: H160) -> u64 {
		self.accounts
			.get(&address)
			.map(|a| a.nonce)
			.unwrap_or_default()
	}

	fn code(&self, address: H160) -> Vec<u8> {
		self.accounts
			.get(&address)
			.map(|a| a.code.clone())
			.unwrap_or_default()
	}

	fn code_hash(&self, address: H160) -> H256 {
		match self.accounts.get(&address) {
			Some(account) => H256::from_slice(&Keccak256::digest(&account.code)),
			None => H256::zero(),
		}
	}

	fn storage(&self, address: H160, key: H256) -> H256 {
		self.accounts
			.get(&address)
			.and_then(|a| a.storage.get(&key).copied())
			.unwrap_or_default()
	}

	fn committed_storage(&self, address: H160, key: H256) -> H256 {
		self.tx_originals
			.get(&(address, key))
			.copied()
			.unwrap_or_else(|| self.storage(address, key))
	}

	fn exists(&self, address: H160) -> bool {
		self.accounts.contains_key(&address)
	}

	fn is_empty(&self, address: H160) -> bool {
		match self.accounts.get(&address) {
			Some(account) => {
				account.nonce == 0 && account.balance.is_zero() && account.code.is_empty()
			}
			None => true,
		}
	}

	fn create_account(&mut self, address: H160) {
		if !self.accounts.contains_key(&address) {
			self.accounts.insert(address, MemoryAccount::default());
			self.journal.push(JournalEntry::AccountCreated { address });
		}
	}

	fn add_balance(&mut self, address: H160, value: U256) {
		if !self.accounts.contains_key(&address) {
			self.accounts.insert(address, MemoryAccount::default());
			self.journal.push(JournalEntry::AccountCreated { address });
		}
		let account = self.account_mut(address);
		let prev = account.balance;
		account.balance = prev.saturating_add(value);
		self.journal.push(JournalEntry::BalanceChanged { address, prev });
	}

	fn sub_balance(&mut self, address: H160, value: U256) {
		let account = self.account_mut(address);
		let prev = account.balance;
		account.balance = prev.saturating_sub(value);
		self.journal.push(JournalEntry::BalanceChanged { address, prev });
	}

	fn set_nonce(&mut self, address: H160, nonce: u64) {
		let account = self.account_mut(address);
		let prev = account.nonce;
		account.nonce = nonce;
		self.journal.push(JournalEntry::NonceChanged { address, prev });
	}

	fn set_code(&mut self, address: H160, code: Vec<u8>) {
		let account = self.account_mut(address);
		let prev = core::mem::replace(&mut account.code, code);
		self.journal.push(JournalEntry::CodeChanged { address, prev });
	}

	fn set_storage(&mut self, address: H160, key: H256, value: H256) {
		let prev = self.storage(address, key);
		self.tx_originals.entry((address, key)).or_insert(prev);
		self.account_mut(address).storage.insert(key, value);
		self.journal
			.push(JournalEntry::StorageChanged { address, key, prev });
	}

	fn add_refund(&mut self, gas: u64) {
		self.journal
			.push(JournalEntry::RefundChanged { prev: self.refund });
		self.refund += gas;
	}

	fn sub_refund(&mut self, gas: u64) {
		self.journal
			.push(JournalEntry::RefundChanged { prev: self.refund });
		self.refund = match self.refund.checked_sub(gas) {
			Some(refund) => refund,
			// The refund schedules never take back more than they granted.
			None => panic!("refund counter below zero"),
		};
	}

	fn refund(&self) -> u64 {
		self.refund
	}

	fn mark_delete(&mut self, address: H160) {
		let prev = self.balance(address);
		if !prev.is_zero() {
			let account = self.account_mut(address);
			account.balance = U256::zero();
			self.journal.push(JournalEntry::BalanceChanged { address, prev });
		}
		if self.deleted.insert(address) {
			self.journal.push(JournalEntry::DeleteMarked { address });
		}
	}

	fn deleted(&self, address: H160) -> bool {
		self.deleted.contains(&address)
	}

	fn is_cold(&self, address: H160, key: Option<H256>) -> bool {
		match key {
			Some(key) => !self.warm_slots.contains(&(address, key)),
			None => !self.warm_addresses.contains(&address),
		}
	}

	fn mark_hot(&mut self, address: H160, key: Option<H256>) {
		match key {
			Some(key) => {
				if self.warm_slots.insert((address, key)) {
					self.journal.push(JournalEntry::SlotWarmed { address, key });
				}
			}
			None => {
				if self.warm_addresses.insert(address) {
					self.journal.push(JournalEntry::AddressWarmed { address });
				}
			}
		}
	}

	fn log(&mut self, log: Log) {
		self.logs.push(log);
		self.journal.push(JournalEntry::LogAdded);
	}

	fn snapshot(&mut self) -> usize {
		self.journal.len()
	}

	fn revert_to(&mut self, snapshot: usize) {
		while self.journal.len() > snapshot {
			let Some(entry) = self.journal.pop() else { break };
			match entry {
				JournalEntry::AccountCreated { address } => {
					self.accounts.remove(&address);
				}
				JournalEntry::BalanceChanged { address, prev } => {
					self.account_mut(address).balance = prev;
				}
				JournalEntry::NonceChanged { address, prev } => {
					self.account_mut(address).nonce = prev;
				}
				JournalEntry::StorageChanged { address, key, prev } => {
					self.account_mut(address).storage.insert(key, prev);
				}
				JournalEntry::CodeChanged { address, prev } => {
					self.account_mut(address).code = prev;
				}
				JournalEntry::RefundChanged { prev } => {
					self.refund = prev;
				}
				JournalEntry::DeleteMarked { address } => {
					self.deleted.remove(&address);
				}
				JournalEntry::AddressWarmed { address } => {
					self.warm_addresses.remove(&address);
				}
				JournalEntry::SlotWarmed { address, key } => {
					self.warm_slots.remove(&(address, key));
				}
				JournalEntry::LogAdded => {
					self.logs.pop();
				}
			}
		}
	}

	fn block_hash(&self, number: U256) -> H256 {
		if number >= self.block_number
			|| self.block_number - number > U256::from(self.block_hashes.len())
		{
			return H256::zero();
		}
		let index = (self.block_number - number - U256::one()).as_usize();
		self.block_hashes.get(index).copied().unwrap_or_default()
	}

	fn prepare(&mut self) {
		self.refund = 0;
		self.warm_addresses.clear();
		self.warm_slots.clear();
		self.tx_originals.clear();
		self.journal.clear();
	}
}
