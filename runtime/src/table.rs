use std::sync::OnceLock;

use embervm_core::{ExitError, Opcode, Stack, STACK_LIMIT};
use embervm_gasometer::consts::*;

use crate::eval::{arithmetic, bitwise, environment, flow, misc, system};
use crate::evm::Evm;
use crate::frame::Frame;
use crate::gas;
use crate::interpreter::Control;
use crate::{eips, Upgrade};

/// Execution function of one operation.
pub type ExecutionFn = fn(&mut Evm<'_>, &mut Frame, usize) -> Control;

/// Dynamic gas function: run against the machine state after the constant
/// cost is charged, with the requested memory size already computed.
pub type DynamicGasFn = fn(&mut Evm<'_>, &mut Frame, u64) -> Result<u64, ExitError>;

/// Memory-size function: the highest byte the operation will touch.
pub type MemorySizeFn = fn(&Stack) -> Result<u64, ExitError>;

/// Immutable descriptor of one opcode in one instruction set.
#[derive(Clone, Copy)]
pub struct Operation {
	pub execute: ExecutionFn,
	pub constant_gas: u64,
	pub dynamic_gas: Option<DynamicGasFn>,
	/// Fewest stack items that must be present.
	pub min_stack: usize,
	/// Most stack items that may be present without overflowing.
	pub max_stack: usize,
	pub memory_size: Option<MemorySizeFn>,
	/// Ends the frame successfully.
	pub halts: bool,
	/// Sets the program counter itself.
	pub jumps: bool,
	/// Mutates state; forbidden inside static calls.
	pub writes: bool,
	/// Ends the frame unsuccessfully but keeps return data.
	pub reverts: bool,
	/// Updates the caller-visible return data buffer.
	pub returns: bool,
}

impl Operation {
	pub(crate) fn new(execute: ExecutionFn, constant_gas: u64, pops: usize, pushes: usize) -> Self {
		Self {
			execute,
			constant_gas,
			dynamic_gas: None,
			min_stack: pops,
			max_stack: STACK_LIMIT + pops - pushes,
			memory_size: None,
			halts: false,
			jumps: false,
			writes: false,
			reverts: false,
			returns: false,
		}
	}
}

/// One instruction set: 256 slots, each a defined operation or explicitly
/// nothing. Built once per upgrade by layering deltas over the oldest rule
/// set, then cached; never mutated after that.
pub struct JumpTable([Option<Operation>; 256]);

impl JumpTable {
	/// Table for `upgrade`, built on first use and shared afterwards.
	pub fn for_upgrade(upgrade: Upgrade) -> &'static JumpTable {
		const EMPTY: OnceLock<JumpTable> = OnceLock::new();
		static TABLES: [OnceLock<JumpTable>; 9] = [EMPTY; 9];
		TABLES[upgrade.index()].get_or_init(|| JumpTable::new(upgrade))
	}

	/// Freshly built table for `upgrade`. Prefer `for_upgrade`.
	#[must_use]
	pub fn new(upgrade: Upgrade) -> JumpTable {
		match upgrade {
			Upgrade::Frontier => Self::frontier(),
			Upgrade::Homestead => Self::homestead(),
			Upgrade::TangerineWhistle => Self::tangerine_whistle(),
			Upgrade::SpuriousDragon => Self::spurious_dragon(),
			Upgrade::Byzantium => Self::byzantium(),
			Upgrade::Constantinople => Self::constantinople(),
			Upgrade::Petersburg => Self::petersburg(),
			Upgrade::Istanbul => Self::istanbul(),
			Upgrade::Berlin => Self::berlin(),
		}
	}

	#[inline]
	#[must_use]
	pub fn get(&self, opcode: Opcode) -> Option<&Operation> {
		self.0[opcode.as_usize()].as_ref()
	}

	#[must_use]
	pub fn is_defined(&self, opcode: Opcode) -> bool {
		self.0[opcode.as_usize()].is_some()
	}

	pub(crate) fn get_mut(&mut self, opcode: Opcode) -> Option<&mut Operation> {
		self.0[opcode.as_usize()].as_mut()
	}

	pub(crate) fn insert(&mut self, opcode: Opcode, operation: Operation) {
		self.0[opcode.as_usize()] = Some(operation);
	}

	/// The oldest rule set.
	#[must_use]
	pub fn frontier() -> JumpTable {
		let mut table = JumpTable([None; 256]);

		table.insert(Opcode::STOP, Operation {
			halts: true,
			..Operation::new(flow::stop, G_ZERO, 0, 0)
		});
		table.insert(Opcode::ADD, Operation::new(arithmetic::add, G_VERYLOW, 2, 1));
		table.insert(Opcode::MUL, Operation::new(arithmetic::mul, G_LOW, 2, 1));
		table.insert(Opcode::SUB, Operation::new(arithmetic::sub, G_VERYLOW, 2, 1));
		table.insert(Opcode::DIV, Operation::new(arithmetic::div, G_LOW, 2, 1));
		table.insert(Opcode::SDIV, Operation::new(arithmetic::sdiv, G_LOW, 2, 1));
		table.insert(Opcode::MOD, Operation::new(arithmetic::rem, G_LOW, 2, 1));
		table.insert(Opcode::SMOD, Operation::new(arithmetic::srem, G_LOW, 2, 1));
		table.insert(Opcode::ADDMOD, Operation::new(arithmetic::addmod, G_MID, 3, 1));
		table.insert(Opcode::MULMOD, Operation::new(arithmetic::mulmod, G_MID, 3, 1));
		table.insert(Opcode::EXP, Operation {
			dynamic_gas: Some(gas::gas_exp_frontier),
			..Operation::new(arithmetic::exp, G_ZERO, 2, 1)
		});
		table.insert(
			Opcode::SIGNEXTEND,
			Operation::new(arithmetic::signextend, G_LOW, 2, 1),
		);

		table.insert(Opcode::LT, Operation::new(bitwise::lt, G_VERYLOW, 2, 1));
		table.insert(Opcode::GT, Operation::new(bitwise::gt, G_VERYLOW, 2, 1));
		table.insert(Opcode::SLT, Operation::new(bitwise::slt, G_VERYLOW, 2, 1));
		table.insert(Opcode::SGT, Operation::new(bitwise::sgt, G_VERYLOW, 2, 1));
		table.insert(Opcode::EQ, Operation::new(bitwise::eq, G_VERYLOW, 2, 1));
		table.insert(Opcode::ISZERO, Operation::new(bitwise::iszero, G_VERYLOW, 1, 1));
		table.insert(Opcode::AND, Operation::new(bitwise::and, G_VERYLOW, 2, 1));
		table.insert(Opcode::OR, Operation::new(bitwise::or, G_VERYLOW, 2, 1));
		table.insert(Opcode::XOR, Operation::new(bitwise::xor, G_VERYLOW, 2, 1));
		table.insert(Opcode::NOT, Operation::new(bitwise::not, G_VERYLOW, 1, 1));
		table.insert(Opcode::BYTE, Operation::new(bitwise::byte, G_VERYLOW, 2, 1));

		table.insert(Opcode::SHA3, Operation {
			dynamic_gas: Some(gas::gas_sha3),
			memory_size: Some(gas::memory_sha3),
			..Operation::new(environment::sha3, G_SHA3, 2, 1)
		});

		table.insert(Opcode::ADDRESS, Operation::new(environment::address, G_BASE, 0, 1));
		table.insert(
			Opcode::BALANCE,
			Operation::new(environment::balance, G_BALANCE_FRONTIER, 1, 1),
		);
		table.insert(Opcode::ORIGIN, Operation::new(environment::origin, G_BASE, 0, 1));
		table.insert(Opcode::CALLER, Operation::new(environment::caller, G_BASE, 0, 1));
		table.insert(
			Opcode::CALLVALUE,
			Operation::new(environment::callvalue, G_BASE, 0, 1),
		);
		table.insert(
			Opcode::CALLDATALOAD,
			Operation::new(environment::calldataload, G_VERYLOW, 1, 1),
		);
		table.insert(
			Opcode::CALLDATASIZE,
			Operation::new(environment::calldatasize, G_BASE, 0, 1),
		);
		table.insert(Opcode::CALLDATACOPY, Operation {
			dynamic_gas: Some(gas::gas_copy),
			memory_size: Some(gas::memory_copy),
			..Operation::new(environment::calldatacopy, G_VERYLOW, 3, 0)
		});
		table.insert(
			Opcode::CODESIZE,
			Operation::new(environment::codesize, G_BASE, 0, 1),
		);
		table.insert(Opcode::CODECOPY, Operation {
			dynamic_gas: Some(gas::gas_copy),
			memory_size: Some(gas::memory_copy),
			..Operation::new(environment::codecopy, G_VERYLOW, 3, 0)
		});
		table.insert(
			Opcode::GASPRICE,
			Operation::new(environment::gasprice, G_BASE, 0, 1),
		);
		table.insert(
			Opcode::EXTCODESIZE,
			Operation::new(environment::extcodesize, G_EXTCODESIZE_FRONTIER, 1, 1),
		);
		table.insert(Opcode::EXTCODECOPY, Operation {
			dynamic_gas: Some(gas::gas_ext_code_copy),
			memory_size: Some(gas::memory_ext_code_copy),
			..Operation::new(environment::extcodecopy, G_EXTCODECOPY_FRONTIER, 4, 0)
		});

		table.insert(
			Opcode::BLOCKHASH,
			Operation::new(environment::blockhash, G_BLOCKHASH, 1, 1),
		);
		table.insert(
			Opcode::COINBASE,
			Operation::new(environment::coinbase, G_BASE, 0, 1),
		);
		table.insert(
			Opcode::TIMESTAMP,
			Operation::new(environment::timestamp, G_BASE, 0, 1),
		);
		table.insert(Opcode::NUMBER, Operation::new(environment::number, G_BASE, 0, 1));
		table.insert(
			Opcode::DIFFICULTY,
			Operation::new(environment::difficulty, G_BASE, 0, 1),
		);
		table.insert(
			Opcode::GASLIMIT,
			Operation::new(environment::gaslimit, G_BASE, 0, 1),
		);

		table.insert(Opcode::POP, Operation::new(misc::pop, G_BASE, 1, 0));
		table.insert(Opcode::MLOAD, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_mload),
			..Operation::new(misc::mload, G_VERYLOW, 1, 1)
		});
		table.insert(Opcode::MSTORE, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_mstore),
			..Operation::new(misc::mstore, G_VERYLOW, 2, 0)
		});
		table.insert(Opcode::MSTORE8, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_mstore8),
			..Operation::new(misc::mstore8, G_VERYLOW, 2, 0)
		});
		table.insert(
			Opcode::SLOAD,
			Operation::new(system::sload, G_SLOAD_FRONTIER, 1, 1),
		);
		table.insert(Opcode::SSTORE, Operation {
			dynamic_gas: Some(gas::gas_sstore_legacy),
			writes: true,
			..Operation::new(system::sstore, G_ZERO, 2, 0)
		});
		table.insert(Opcode::JUMP, Operation {
			jumps: true,
			..Operation::new(flow::jump, G_MID, 1, 0)
		});
		table.insert(Opcode::JUMPI, Operation {
			jumps: true,
			..Operation::new(flow::jumpi, G_HIGH, 2, 0)
		});
		table.insert(Opcode::PC, Operation::new(flow::pc, G_BASE, 0, 1));
		table.insert(Opcode::MSIZE, Operation::new(misc::msize, G_BASE, 0, 1));
		table.insert(Opcode::GAS, Operation::new(misc::gas, G_BASE, 0, 1));
		table.insert(Opcode::JUMPDEST, Operation::new(flow::jumpdest, G_JUMPDEST, 0, 0));

		for n in 0..32 {
			table.0[Opcode::PUSH1.as_usize() + n] =
				Some(Operation::new(misc::push, G_VERYLOW, 0, 1));
		}
		for n in 0..16 {
			// DUPn needs n items and adds one on top of them.
			table.0[Opcode::DUP1.as_usize() + n] =
				Some(Operation::new(misc::dup, G_VERYLOW, n + 1, n + 2));
		}
		for n in 0..16 {
			// SWAPn touches n+1 items and leaves the count unchanged.
			table.0[Opcode::SWAP1.as_usize() + n] =
				Some(Operation::new(misc::swap, G_VERYLOW, n + 2, n + 2));
		}

		let log_gas: [DynamicGasFn; 5] = [
			gas::gas_log0,
			gas::gas_log1,
			gas::gas_log2,
			gas::gas_log3,
			gas::gas_log4,
		];
		for (n, log_gas_fn) in log_gas.iter().enumerate() {
			table.0[Opcode::LOG0.as_usize() + n] = Some(Operation {
				dynamic_gas: Some(*log_gas_fn),
				memory_size: Some(gas::memory_log),
				writes: true,
				..Operation::new(system::log, G_ZERO, n + 2, 0)
			});
		}

		table.insert(Opcode::CREATE, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_create),
			writes: true,
			returns: true,
			..Operation::new(system::create, G_CREATE, 3, 1)
		});
		table.insert(Opcode::CALL, Operation {
			dynamic_gas: Some(gas::gas_call),
			memory_size: Some(gas::memory_call),
			returns: true,
			..Operation::new(system::call, G_CALL_FRONTIER, 7, 1)
		});
		table.insert(Opcode::CALLCODE, Operation {
			dynamic_gas: Some(gas::gas_call_code),
			memory_size: Some(gas::memory_call),
			returns: true,
			..Operation::new(system::callcode, G_CALL_FRONTIER, 7, 1)
		});
		table.insert(Opcode::RETURN, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_return),
			halts: true,
			..Operation::new(system::ret, G_ZERO, 2, 0)
		});
		table.insert(Opcode::SELFDESTRUCT, Operation {
			dynamic_gas: Some(gas::gas_selfdestruct),
			halts: true,
			writes: true,
			..Operation::new(system::selfdestruct, G_ZERO, 1, 0)
		});

		table
	}

	/// Frontier plus `DELEGATECALL`.
	#[must_use]
	pub fn homestead() -> JumpTable {
		let mut table = Self::frontier();
		table.insert(Opcode::DELEGATECALL, Operation {
			dynamic_gas: Some(gas::gas_delegate_call),
			memory_size: Some(gas::memory_delegate_call),
			returns: true,
			..Operation::new(system::delegatecall, G_CALL_FRONTIER, 6, 1)
		});
		table
	}

	/// The state-access repricing upgrade.
	#[must_use]
	pub fn tangerine_whistle() -> JumpTable {
		let mut table = Self::homestead();
		if let Some(op) = table.get_mut(Opcode::BALANCE) {
			op.constant_gas = G_BALANCE_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::EXTCODESIZE) {
			op.constant_gas = G_EXTCODESIZE_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::SLOAD) {
			op.constant_gas = G_SLOAD_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::EXTCODECOPY) {
			op.constant_gas = G_EXTCODECOPY_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::CALL) {
			op.constant_gas = G_CALL_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::CALLCODE) {
			op.constant_gas = G_CALL_EIP150;
		}
		if let Some(op) = table.get_mut(Opcode::DELEGATECALL) {
			op.constant_gas = G_CALL_EIP150;
		}
		table
	}

	/// Repriced `EXP`.
	#[must_use]
	pub fn spurious_dragon() -> JumpTable {
		let mut table = Self::tangerine_whistle();
		if let Some(op) = table.get_mut(Opcode::EXP) {
			op.dynamic_gas = Some(gas::gas_exp_eip160);
		}
		table
	}

	/// Adds `STATICCALL`, the return-data opcodes and `REVERT`.
	#[must_use]
	pub fn byzantium() -> JumpTable {
		let mut table = Self::spurious_dragon();
		table.insert(Opcode::STATICCALL, Operation {
			dynamic_gas: Some(gas::gas_static_call),
			memory_size: Some(gas::memory_static_call),
			returns: true,
			..Operation::new(system::staticcall, G_CALL_EIP150, 6, 1)
		});
		table.insert(
			Opcode::RETURNDATASIZE,
			Operation::new(environment::returndatasize, G_BASE, 0, 1),
		);
		table.insert(Opcode::RETURNDATACOPY, Operation {
			dynamic_gas: Some(gas::gas_copy),
			memory_size: Some(gas::memory_copy),
			..Operation::new(environment::returndatacopy, G_VERYLOW, 3, 0)
		});
		table.insert(Opcode::REVERT, Operation {
			dynamic_gas: Some(gas::gas_memory_only),
			memory_size: Some(gas::memory_revert),
			reverts: true,
			returns: true,
			..Operation::new(system::revert, G_ZERO, 2, 0)
		});
		table
	}

	/// Adds the shift opcodes, `EXTCODEHASH` and `CREATE2`, and switches
	/// `SSTORE` to net metering.
	#[must_use]
	pub fn constantinople() -> JumpTable {
		let mut table = Self::byzantium();
		table.insert(Opcode::SHL, Operation::new(bitwise::shl, G_VERYLOW, 2, 1));
		table.insert(Opcode::SHR, Operation::new(bitwise::shr, G_VERYLOW, 2, 1));
		table.insert(Opcode::SAR, Operation::new(bitwise::sar, G_VERYLOW, 2, 1));
		table.insert(
			Opcode::EXTCODEHASH,
			Operation::new(environment::extcodehash, G_EXTCODEHASH_CONSTANTINOPLE, 1, 1),
		);
		table.insert(Opcode::CREATE2, Operation {
			dynamic_gas: Some(gas::gas_create2),
			memory_size: Some(gas::memory_create2),
			writes: true,
			returns: true,
			..Operation::new(system::create2, G_CREATE, 4, 1)
		});
		if let Some(op) = table.get_mut(Opcode::SSTORE) {
			op.dynamic_gas = Some(gas::gas_sstore_net);
		}
		table
	}

	/// Constantinople with net metering retracted: the legacy `SSTORE`
	/// schedule again. The regime is fixed here, at build time.
	#[must_use]
	pub fn petersburg() -> JumpTable {
		let mut table = Self::constantinople();
		if let Some(op) = table.get_mut(Opcode::SSTORE) {
			op.dynamic_gas = Some(gas::gas_sstore_legacy);
		}
		table
	}

	/// `CHAINID`, reader repricing with `SELFBALANCE`, and rebalanced net
	/// metering.
	#[must_use]
	pub fn istanbul() -> JumpTable {
		let mut table = Self::petersburg();
		eips::enable_1344(&mut table);
		eips::enable_1884(&mut table);
		eips::enable_2200(&mut table);
		table
	}

	/// Subroutines and warm/cold access accounting.
	#[must_use]
	pub fn berlin() -> JumpTable {
		let mut table = Self::istanbul();
		eips::enable_2315(&mut table);
		eips::enable_2929(&mut table);
		table
	}
}
