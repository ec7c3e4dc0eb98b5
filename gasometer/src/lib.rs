//! The gas schedule of the embervm engine and the pure cost functions over
//! it. Everything here is arithmetic on values the caller has already read;
//! probing state and composing the pieces per opcode happens in the runtime
//! crate's gas table.

pub mod consts;
mod costs;

pub use crate::costs::{
	call_gas, exp_cost, log_cost, memory_gas_cost, sha3_word_cost, sstore_eip2200_cost,
	sstore_eip2929_cost, sstore_legacy_cost, sstore_net_cost, to_word_size, word_copy_cost,
};
