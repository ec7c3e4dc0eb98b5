//! Self-contained execution harness: run a code blob against a temporary
//! in-memory state with everything defaulted. Handy for tests and tools
//! that want the engine without assembling a node around it.

use embervm_core::ExitReason;
use embervm_runtime::{Backend, BlockContext, Evm, TxContext, Upgrade};
use primitive_types::{H160, U256};

use crate::backend::{MemoryAccount, MemoryBackend};

/// Harness configuration; `Default` gives the newest rules, an unbounded
/// gas allowance and zeroed context.
#[derive(Clone, Debug)]
pub struct Config {
	pub upgrade: Upgrade,
	pub origin: H160,
	pub coinbase: H160,
	pub block_number: U256,
	pub time: U256,
	pub difficulty: U256,
	pub gas_limit: u64,
	pub gas_price: U256,
	pub value: U256,
	pub chain_id: U256,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			upgrade: Upgrade::Berlin,
			origin: H160::zero(),
			coinbase: H160::zero(),
			block_number: U256::zero(),
			time: U256::zero(),
			difficulty: U256::zero(),
			gas_limit: u64::MAX,
			gas_price: U256::zero(),
			value: U256::zero(),
			chain_id: U256::one(),
		}
	}
}

fn environment<'a>(cfg: &Config, state: &'a mut MemoryBackend) -> Evm<'a> {
	let block = BlockContext {
		number: cfg.block_number,
		timestamp: cfg.time,
		coinbase: cfg.coinbase,
		difficulty: cfg.difficulty,
		gas_limit: cfg.gas_limit,
		chain_id: cfg.chain_id,
	};
	let tx = TxContext {
		origin: cfg.origin,
		gas_price: cfg.gas_price,
	};
	Evm::new(block, tx, cfg.upgrade, state)
}

/// Address the ad-hoc contract is installed at.
#[must_use]
pub fn contract_address() -> H160 {
	let mut raw = [0u8; 20];
	raw[12..].copy_from_slice(b"contract");
	H160::from(raw)
}

/// Install `code` at a fixed address in a fresh state and call it with
/// `input`. Returns the outcome, the output and the state afterwards.
pub fn execute(code: Vec<u8>, input: Vec<u8>, cfg: &Config) -> (ExitReason, Vec<u8>, MemoryBackend) {
	let mut state = MemoryBackend::new();
	let address = contract_address();
	state.insert(
		address,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	state.insert(cfg.origin, MemoryAccount::default());

	let mut evm = environment(cfg, &mut state);
	if cfg.upgrade.is_berlin() {
		evm.state.mark_hot(cfg.origin, None);
		evm.state.mark_hot(address, None);
	}
	let (reason, output, _) = evm.call(cfg.origin, address, input, cfg.gas_limit, cfg.value);
	(reason, output, state)
}

/// Run `init_code` as a contract creation in a fresh state.
pub fn create(init_code: Vec<u8>, cfg: &Config) -> (ExitReason, Vec<u8>, H160, MemoryBackend) {
	let mut state = MemoryBackend::new();
	state.insert(cfg.origin, MemoryAccount::default());

	let mut evm = environment(cfg, &mut state);
	if cfg.upgrade.is_berlin() {
		evm.state.mark_hot(cfg.origin, None);
	}
	let (reason, output, address, _) =
		evm.create(cfg.origin, init_code, cfg.gas_limit, cfg.value);
	(reason, output, address, state)
}

/// Call a contract already present in `state`. Returns the outcome, the
/// output and the leftover gas.
pub fn call(
	address: H160,
	input: Vec<u8>,
	cfg: &Config,
	state: &mut MemoryBackend,
) -> (ExitReason, Vec<u8>, u64) {
	let mut evm = environment(cfg, state);
	if cfg.upgrade.is_berlin() {
		evm.state.mark_hot(cfg.origin, None);
		evm.state.mark_hot(address, None);
	}
	evm.call(cfg.origin, address, input, cfg.gas_limit, cfg.value)
}
