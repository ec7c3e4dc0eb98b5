//! embervm: the contract execution engine of an embervm full node.
//!
//! The engine is a library with a purely programmatic boundary: feed it a
//! block context, a state accessor and a sequence of messages, and it hands
//! back gas usage and results. Networking, consensus and persistent storage
//! live elsewhere.
//!
//! Layout follows the member crates: `embervm-core` holds the machine-local
//! primitives, `embervm-gasometer` the gas schedule, `embervm-runtime` the
//! instruction sets, interpreter and call engine. This crate adds the
//! journaled in-memory state backend, the per-block gas pool and the state
//! transition that turns a message into settled balances.

pub use embervm_core::*;
pub use embervm_gasometer as gasometer;
pub use embervm_runtime::*;

mod backend;
mod pool;
mod transact;

pub mod run;

pub use crate::backend::{MemoryAccount, MemoryBackend};
pub use crate::pool::GasPool;
pub use crate::transact::{
	apply_message, intrinsic_gas, Error, ExecutionResult, Message, StateTransition,
};
