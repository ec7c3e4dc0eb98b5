use primitive_types::{H160, U256};

/// Block-level execution context, fixed for every message in the block.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockContext {
	pub number: U256,
	pub timestamp: U256,
	pub coinbase: H160,
	pub difficulty: U256,
	pub gas_limit: u64,
	pub chain_id: U256,
}

/// Transaction-level context visible to opcodes.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxContext {
	pub origin: H160,
	pub gas_price: U256,
}
