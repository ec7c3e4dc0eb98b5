//! Named per-EIP deltas over an instruction set. The istanbul and berlin
//! table builders apply these; `enable_eip` exposes them for assembling
//! experimental rule sets. All of them write in place, so callers must only
//! ever patch tables they own, never a shared one.

use core::fmt;

use embervm_core::Opcode;
use embervm_gasometer::consts::*;

use crate::eval::{environment, flow};
use crate::gas;
use crate::table::{JumpTable, Operation};

/// Activation was requested for an EIP this engine does not know.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnknownEip(pub u64);

impl fmt::Display for UnknownEip {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "undefined eip {}", self.0)
	}
}

impl std::error::Error for UnknownEip {}

/// Apply one named delta to `table` in place.
pub fn enable_eip(eip: u64, table: &mut JumpTable) -> Result<(), UnknownEip> {
	match eip {
		1344 => enable_1344(table),
		1884 => enable_1884(table),
		2200 => enable_2200(table),
		2315 => enable_2315(table),
		2929 => enable_2929(table),
		other => return Err(UnknownEip(other)),
	}
	Ok(())
}

/// Whether `enable_eip` knows the given number.
#[must_use]
pub fn valid_eip(eip: u64) -> bool {
	matches!(eip, 1344 | 1884 | 2200 | 2315 | 2929)
}

/// EIP-1344: the `CHAINID` opcode.
pub(crate) fn enable_1344(table: &mut JumpTable) {
	table.insert(
		Opcode::CHAINID,
		Operation::new(environment::chainid, G_BASE, 0, 1),
	);
}

/// EIP-1884: reprice the trie readers, add `SELFBALANCE`.
pub(crate) fn enable_1884(table: &mut JumpTable) {
	if let Some(op) = table.get_mut(Opcode::SLOAD) {
		op.constant_gas = G_SLOAD_EIP1884;
	}
	if let Some(op) = table.get_mut(Opcode::BALANCE) {
		op.constant_gas = G_BALANCE_EIP1884;
	}
	if let Some(op) = table.get_mut(Opcode::EXTCODEHASH) {
		op.constant_gas = G_EXTCODEHASH_EIP1884;
	}
	table.insert(
		Opcode::SELFBALANCE,
		Operation::new(environment::selfbalance, G_LOW, 0, 1),
	);
}

/// EIP-2200: rebalanced net-metered `SSTORE`.
pub(crate) fn enable_2200(table: &mut JumpTable) {
	if let Some(op) = table.get_mut(Opcode::SLOAD) {
		op.constant_gas = SLOAD_EIP2200;
	}
	if let Some(op) = table.get_mut(Opcode::SSTORE) {
		op.dynamic_gas = Some(gas::gas_sstore_eip2200);
	}
}

/// EIP-2315: simple subroutines.
pub(crate) fn enable_2315(table: &mut JumpTable) {
	table.insert(Opcode::BEGINSUB, Operation::new(flow::beginsub, G_BASE, 0, 0));
	let mut jumpsub = Operation::new(flow::jumpsub, G_HIGH, 1, 0);
	jumpsub.jumps = true;
	table.insert(Opcode::JUMPSUB, jumpsub);
	let mut returnsub = Operation::new(flow::returnsub, G_LOW, 0, 0);
	returnsub.jumps = true;
	table.insert(Opcode::RETURNSUB, returnsub);
}

/// EIP-2929: warm/cold pricing for every state-access opcode. The warm read
/// cost becomes the constant; the dynamic functions add the cold remainder.
pub(crate) fn enable_2929(table: &mut JumpTable) {
	if let Some(op) = table.get_mut(Opcode::SSTORE) {
		op.dynamic_gas = Some(gas::gas_sstore_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::SLOAD) {
		op.constant_gas = G_ZERO;
		op.dynamic_gas = Some(gas::gas_sload_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::EXTCODECOPY) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_ext_code_copy_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::EXTCODESIZE) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_account_access_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::EXTCODEHASH) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_account_access_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::BALANCE) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_account_access_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::CALL) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_call_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::CALLCODE) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_call_code_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::STATICCALL) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_static_call_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::DELEGATECALL) {
		op.constant_gas = WARM_STORAGE_READ_EIP2929;
		op.dynamic_gas = Some(gas::gas_delegate_call_eip2929);
	}
	if let Some(op) = table.get_mut(Opcode::SELFDESTRUCT) {
		op.constant_gas = G_SELFDESTRUCT_EIP150;
		op.dynamic_gas = Some(gas::gas_selfdestruct_eip2929);
	}
}
