//! Dynamic gas and memory-size functions referenced by the jump tables.
//! These read stack operands and probe state, then defer the arithmetic to
//! the gasometer crate. Every one of them runs before its operation
//! executes, with the memory size already computed.

use embervm_core::{ExitError, Stack};
use embervm_gasometer::consts::*;
use embervm_gasometer::{
	call_gas, exp_cost, log_cost, memory_gas_cost, sha3_word_cost, sstore_eip2200_cost,
	sstore_eip2929_cost, sstore_legacy_cost, sstore_net_cost, word_copy_cost,
};
use primitive_types::{H160, U256};

use crate::evm::Evm;
use crate::frame::Frame;

#[inline]
fn safe_add(a: u64, b: u64) -> Result<u64, ExitError> {
	a.checked_add(b).ok_or(ExitError::GasUintOverflow)
}

fn apply_refund(evm: &mut Evm<'_>, refund: i64) {
	if refund >= 0 {
		evm.state.add_refund(refund as u64);
	} else {
		evm.state.sub_refund((-refund) as u64);
	}
}

/// Memory expansion only: `MLOAD`, `MSTORE`, `MSTORE8`, `RETURN`, `REVERT`
/// and `CREATE` have no other dynamic component.
pub fn gas_memory_only(
	_evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	memory_gas_cost(&mut frame.memory, memory_size)
}

fn copy_gas(frame: &mut Frame, len_pos: usize, memory_size: u64) -> Result<u64, ExitError> {
	let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
	let words = word_copy_cost(frame.stack.peek_u64(len_pos)?)?;
	safe_add(gas, words)
}

/// `CALLDATACOPY`, `CODECOPY` and `RETURNDATACOPY`: length at stack slot 2.
pub fn gas_copy(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> Result<u64, ExitError> {
	copy_gas(frame, 2, memory_size)
}

/// `EXTCODECOPY`: length at stack slot 3.
pub fn gas_ext_code_copy(
	_evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	copy_gas(frame, 3, memory_size)
}

pub fn gas_sha3(_evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> Result<u64, ExitError> {
	let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
	let words = sha3_word_cost(frame.stack.peek_u64(1)?)?;
	safe_add(gas, words)
}

pub fn gas_create2(
	_evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
	let words = sha3_word_cost(frame.stack.peek_u64(2)?)?;
	safe_add(gas, words)
}

fn exp_byte_len(stack: &Stack) -> Result<u64, ExitError> {
	let power = stack.peek(1)?;
	Ok(((power.bits() + 7) / 8) as u64)
}

pub fn gas_exp_frontier(
	_evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	exp_cost(exp_byte_len(&frame.stack)?, G_EXPBYTE_FRONTIER)
}

pub fn gas_exp_eip160(
	_evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	exp_cost(exp_byte_len(&frame.stack)?, G_EXPBYTE_EIP160)
}

fn log_gas(topics: u64, frame: &mut Frame, memory_size: u64) -> Result<u64, ExitError> {
	let data_len = frame.stack.peek_u64(1)?;
	let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
	safe_add(gas, log_cost(topics, data_len)?)
}

macro_rules! log_gas_fn {
	($name:ident, $topics:expr) => {
		pub fn $name(
			_evm: &mut Evm<'_>,
			frame: &mut Frame,
			memory_size: u64,
		) -> Result<u64, ExitError> {
			log_gas($topics, frame, memory_size)
		}
	};
}

log_gas_fn!(gas_log0, 0);
log_gas_fn!(gas_log1, 1);
log_gas_fn!(gas_log2, 2);
log_gas_fn!(gas_log3, 3);
log_gas_fn!(gas_log4, 4);

pub fn gas_sstore_legacy(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let key = frame.stack.peek_h256(0)?;
	let new = frame.stack.peek_h256(1)?;
	let current = evm.state.storage(frame.address, key);
	let (cost, refund) = sstore_legacy_cost(current, new);
	apply_refund(evm, refund);
	Ok(cost)
}

pub fn gas_sstore_net(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let key = frame.stack.peek_h256(0)?;
	let new = frame.stack.peek_h256(1)?;
	let current = evm.state.storage(frame.address, key);
	let original = evm.state.committed_storage(frame.address, key);
	let (cost, refund) = sstore_net_cost(original, current, new);
	apply_refund(evm, refund);
	Ok(cost)
}

pub fn gas_sstore_eip2200(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let key = frame.stack.peek_h256(0)?;
	let new = frame.stack.peek_h256(1)?;
	let current = evm.state.storage(frame.address, key);
	let original = evm.state.committed_storage(frame.address, key);
	let (cost, refund) = sstore_eip2200_cost(original, current, new, frame.gas)?;
	apply_refund(evm, refund);
	Ok(cost)
}

pub fn gas_sstore_eip2929(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let key = frame.stack.peek_h256(0)?;
	let new = frame.stack.peek_h256(1)?;
	let cold = evm.state.is_cold(frame.address, Some(key));
	if cold {
		evm.state.mark_hot(frame.address, Some(key));
	}
	let current = evm.state.storage(frame.address, key);
	let original = evm.state.committed_storage(frame.address, key);
	let (cost, refund) = sstore_eip2929_cost(original, current, new, frame.gas, cold)?;
	apply_refund(evm, refund);
	Ok(cost)
}

pub fn gas_sload_eip2929(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let key = frame.stack.peek_h256(0)?;
	if evm.state.is_cold(frame.address, Some(key)) {
		evm.state.mark_hot(frame.address, Some(key));
		Ok(COLD_SLOAD_EIP2929)
	} else {
		Ok(WARM_STORAGE_READ_EIP2929)
	}
}

/// `BALANCE`, `EXTCODESIZE` and `EXTCODEHASH` under warm/cold accounting:
/// the warm cost is the operation's constant, this adds the cold remainder.
pub fn gas_account_access_eip2929(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let address = H160::from(frame.stack.peek_h256(0)?);
	if evm.state.is_cold(address, None) {
		evm.state.mark_hot(address, None);
		Ok(COLD_ACCOUNT_ACCESS_EIP2929 - WARM_STORAGE_READ_EIP2929)
	} else {
		Ok(0)
	}
}

pub fn gas_ext_code_copy_eip2929(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	let gas = copy_gas(frame, 3, memory_size)?;
	let address = H160::from(frame.stack.peek_h256(0)?);
	if evm.state.is_cold(address, None) {
		evm.state.mark_hot(address, None);
		safe_add(gas, COLD_ACCOUNT_ACCESS_EIP2929 - WARM_STORAGE_READ_EIP2929)
	} else {
		Ok(gas)
	}
}

pub fn gas_call(evm: &mut Evm<'_>, frame: &mut Frame, memory_size: u64) -> Result<u64, ExitError> {
	let transfers_value = !frame.stack.peek(2)?.is_zero();
	let address = H160::from(frame.stack.peek_h256(1)?);

	let mut gas = 0u64;
	if evm.upgrade.is_spurious_dragon() {
		if transfers_value && evm.state.is_empty(address) {
			gas += G_NEWACCOUNT;
		}
	} else if !evm.state.exists(address) {
		gas += G_NEWACCOUNT;
	}
	if transfers_value {
		gas += G_CALLVALUE;
	}
	gas = safe_add(gas, memory_gas_cost(&mut frame.memory, memory_size)?)?;

	let forwarded = call_gas(
		evm.upgrade.is_tangerine_whistle(),
		frame.gas,
		gas,
		frame.stack.peek(0)?,
	)?;
	evm.call_gas_temp = forwarded;
	safe_add(gas, forwarded)
}

pub fn gas_call_code(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	let mut gas = 0u64;
	if !frame.stack.peek(2)?.is_zero() {
		gas += G_CALLVALUE;
	}
	gas = safe_add(gas, memory_gas_cost(&mut frame.memory, memory_size)?)?;

	let forwarded = call_gas(
		evm.upgrade.is_tangerine_whistle(),
		frame.gas,
		gas,
		frame.stack.peek(0)?,
	)?;
	evm.call_gas_temp = forwarded;
	safe_add(gas, forwarded)
}

pub fn gas_delegate_call(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	let gas = memory_gas_cost(&mut frame.memory, memory_size)?;
	let forwarded = call_gas(
		evm.upgrade.is_tangerine_whistle(),
		frame.gas,
		gas,
		frame.stack.peek(0)?,
	)?;
	evm.call_gas_temp = forwarded;
	safe_add(gas, forwarded)
}

pub fn gas_static_call(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	memory_size: u64,
) -> Result<u64, ExitError> {
	gas_delegate_call(evm, frame, memory_size)
}

pub fn gas_selfdestruct(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let mut gas = 0u64;
	if evm.upgrade.is_tangerine_whistle() {
		gas = G_SELFDESTRUCT_EIP150;
		let beneficiary = H160::from(frame.stack.peek_h256(0)?);
		if evm.upgrade.is_spurious_dragon() {
			if evm.state.is_empty(beneficiary) && !evm.state.balance(frame.address).is_zero() {
				gas += G_NEWACCOUNT;
			}
		} else if !evm.state.exists(beneficiary) {
			gas += G_NEWACCOUNT;
		}
	}
	if !evm.state.deleted(frame.address) {
		evm.state.add_refund(R_SELFDESTRUCT);
	}
	Ok(gas)
}

pub fn gas_selfdestruct_eip2929(
	evm: &mut Evm<'_>,
	frame: &mut Frame,
	_memory_size: u64,
) -> Result<u64, ExitError> {
	let beneficiary = H160::from(frame.stack.peek_h256(0)?);
	let mut gas = 0u64;
	if evm.state.is_cold(beneficiary, None) {
		evm.state.mark_hot(beneficiary, None);
		gas = COLD_ACCOUNT_ACCESS_EIP2929;
	}
	if evm.state.is_empty(beneficiary) && !evm.state.balance(frame.address).is_zero() {
		gas += G_NEWACCOUNT;
	}
	if !evm.state.deleted(frame.address) {
		evm.state.add_refund(R_SELFDESTRUCT);
	}
	Ok(gas)
}

// The warm access cost is charged as the operation's constant; a cold target
// pays the remainder here, deducted from the frame up front so the 63/64
// computation sees the reduced budget, then re-added to be charged as part
// of the returned dynamic cost.
macro_rules! call_variant_eip2929 {
	($name:ident, $inner:ident, $target_pos:expr) => {
		pub fn $name(
			evm: &mut Evm<'_>,
			frame: &mut Frame,
			memory_size: u64,
		) -> Result<u64, ExitError> {
			let address = H160::from(frame.stack.peek_h256($target_pos)?);
			let warm = !evm.state.is_cold(address, None);
			let cold_cost = COLD_ACCOUNT_ACCESS_EIP2929 - WARM_STORAGE_READ_EIP2929;
			if !warm {
				evm.state.mark_hot(address, None);
				if !frame.use_gas(cold_cost) {
					return Err(ExitError::OutOfGas);
				}
			}
			let gas = $inner(evm, frame, memory_size)?;
			if warm {
				return Ok(gas);
			}
			frame.gas += cold_cost;
			safe_add(gas, cold_cost)
		}
	};
}

call_variant_eip2929!(gas_call_eip2929, gas_call, 1);
call_variant_eip2929!(gas_call_code_eip2929, gas_call_code, 1);
call_variant_eip2929!(gas_delegate_call_eip2929, gas_delegate_call, 1);
call_variant_eip2929!(gas_static_call_eip2929, gas_static_call, 1);

// Memory-size functions. Each reports the highest byte the operation will
// touch; the interpreter word-aligns the result and the dynamic-gas
// function prices it.

fn calc_mem_size(stack: &Stack, offset_pos: usize, len_pos: usize) -> Result<u64, ExitError> {
	let len = stack.peek(len_pos)?;
	// A zero length never touches memory, whatever the offset says.
	if len.is_zero() {
		return Ok(0);
	}
	if len > U256::from(u64::MAX) {
		return Err(ExitError::GasUintOverflow);
	}
	let offset = stack.peek(offset_pos)?;
	if offset > U256::from(u64::MAX) {
		return Err(ExitError::GasUintOverflow);
	}
	offset
		.as_u64()
		.checked_add(len.as_u64())
		.ok_or(ExitError::GasUintOverflow)
}

fn fixed_width(stack: &Stack, width: u64) -> Result<u64, ExitError> {
	let offset = stack.peek(0)?;
	if offset > U256::from(u64::MAX) {
		return Err(ExitError::GasUintOverflow);
	}
	offset
		.as_u64()
		.checked_add(width)
		.ok_or(ExitError::GasUintOverflow)
}

pub fn memory_sha3(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 0, 1)
}

pub fn memory_copy(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 0, 2)
}

pub fn memory_ext_code_copy(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 1, 3)
}

pub fn memory_mload(stack: &Stack) -> Result<u64, ExitError> {
	fixed_width(stack, 32)
}

pub fn memory_mstore(stack: &Stack) -> Result<u64, ExitError> {
	fixed_width(stack, 32)
}

pub fn memory_mstore8(stack: &Stack) -> Result<u64, ExitError> {
	fixed_width(stack, 1)
}

pub fn memory_create(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 1, 2)
}

pub fn memory_create2(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 1, 2)
}

pub fn memory_call(stack: &Stack) -> Result<u64, ExitError> {
	let ret = calc_mem_size(stack, 5, 6)?;
	let args = calc_mem_size(stack, 3, 4)?;
	Ok(core::cmp::max(ret, args))
}

pub fn memory_delegate_call(stack: &Stack) -> Result<u64, ExitError> {
	let ret = calc_mem_size(stack, 4, 5)?;
	let args = calc_mem_size(stack, 2, 3)?;
	Ok(core::cmp::max(ret, args))
}

pub fn memory_static_call(stack: &Stack) -> Result<u64, ExitError> {
	memory_delegate_call(stack)
}

pub fn memory_return(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 0, 1)
}

pub fn memory_revert(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 0, 1)
}

pub fn memory_log(stack: &Stack) -> Result<u64, ExitError> {
	calc_mem_size(stack, 0, 1)
}
