use primitive_types::{H160, H256, U256};

/// An event emitted by a `LOG` opcode.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Log {
	pub address: H160,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
}

/// Abstract accessor over account state. The engine never persists anything
/// itself; every read and write goes through this trait, so the same engine
/// runs against any storage backend.
///
/// Mutations must be journaled: `snapshot` marks a point and `revert_to`
/// undoes everything after it, which is how a failing call frame's writes
/// are unwound while the caller's own effects stay.
#[auto_impl::auto_impl(&mut, Box)]
pub trait Backend {
	fn balance(&self, address: H160) -> U256;
	fn nonce(&self, address: H160) -> u64;
	fn code(&self, address: H160) -> Vec<u8>;
	fn code_hash(&self, address: H160) -> H256;
	fn storage(&self, address: H160, key: H256) -> H256;
	/// Value of the slot as of the start of the current transaction.
	fn committed_storage(&self, address: H160, key: H256) -> H256;
	fn exists(&self, address: H160) -> bool;
	/// No code, zero nonce, zero balance.
	fn is_empty(&self, address: H160) -> bool;

	fn create_account(&mut self, address: H160);
	fn add_balance(&mut self, address: H160, value: U256);
	fn sub_balance(&mut self, address: H160, value: U256);
	fn set_nonce(&mut self, address: H160, nonce: u64);
	fn set_code(&mut self, address: H160, code: Vec<u8>);
	fn set_storage(&mut self, address: H160, key: H256, value: H256);

	fn add_refund(&mut self, gas: u64);
	fn sub_refund(&mut self, gas: u64);
	fn refund(&self) -> u64;

	/// Flag the account for deletion at the end of the transaction and zero
	/// its balance.
	fn mark_delete(&mut self, address: H160);
	fn deleted(&self, address: H160) -> bool;

	/// Whether the account (or one of its storage slots) has not been
	/// accessed yet in this transaction.
	fn is_cold(&self, address: H160, key: Option<H256>) -> bool;
	fn mark_hot(&mut self, address: H160, key: Option<H256>);

	fn log(&mut self, log: Log);

	fn snapshot(&mut self) -> usize;
	fn revert_to(&mut self, snapshot: usize);

	/// Hash of a past block, zero outside the visible window.
	fn block_hash(&self, number: U256) -> H256;

	/// Reset per-transaction tracking: the refund counter, access warmth
	/// and the committed view of storage. Called once before each message.
	fn prepare(&mut self);
}
