use embervm_core::{ExitError, Memory};
use primitive_types::{H256, U256};

use crate::consts::*;

/// Number of 32-byte words needed to hold `size` bytes.
#[inline]
#[must_use]
pub fn to_word_size(size: u64) -> u64 {
	if size > u64::MAX - 31 {
		return u64::MAX / 32 + 1;
	}
	(size + 31) / 32
}

#[inline]
fn safe_add(a: u64, b: u64) -> Result<u64, ExitError> {
	a.checked_add(b).ok_or(ExitError::GasUintOverflow)
}

#[inline]
fn safe_mul(a: u64, b: u64) -> Result<u64, ExitError> {
	a.checked_mul(b).ok_or(ExitError::GasUintOverflow)
}

/// Quadratic expansion cost for growing `memory` to `new_size` bytes,
/// charged only for the delta against what the frame already paid for.
/// `cost(w) = G_MEMORY * w + w * w / QUAD_COEFF_DIV` on the word count `w`.
pub fn memory_gas_cost(memory: &mut Memory, new_size: u64) -> Result<u64, ExitError> {
	if new_size == 0 {
		return Ok(0);
	}
	// The highest size whose word count still squares inside a u64 gas
	// computation. Anything beyond cannot be paid for anyway.
	if new_size > 0x1FFFFFFFE0 {
		return Err(ExitError::GasUintOverflow);
	}
	let words = to_word_size(new_size);
	let aligned = words * 32;

	if aligned > memory.len() as u64 {
		let lin_coef = words * G_MEMORY;
		let quad_coef = words * words / QUAD_COEFF_DIV;
		let new_total = lin_coef + quad_coef;

		let fee = new_total - memory.last_gas_cost();
		memory.set_last_gas_cost(new_total);
		return Ok(fee);
	}
	Ok(0)
}

/// Per-word cost of the copy opcodes for `len` copied bytes.
pub fn word_copy_cost(len: u64) -> Result<u64, ExitError> {
	safe_mul(to_word_size(len), G_COPY)
}

/// Per-word hashing cost of `SHA3` and `CREATE2` for `len` hashed bytes.
pub fn sha3_word_cost(len: u64) -> Result<u64, ExitError> {
	safe_mul(to_word_size(len), G_SHA3WORD)
}

/// `LOGn` cost for `topics` indexed topics over `data_len` bytes, on top of
/// memory expansion.
pub fn log_cost(topics: u64, data_len: u64) -> Result<u64, ExitError> {
	let mut gas = safe_add(G_LOG, safe_mul(topics, G_LOGTOPIC)?)?;
	gas = safe_add(gas, safe_mul(data_len, G_LOGDATA)?)?;
	Ok(gas)
}

/// `EXP` cost for an exponent occupying `byte_len` bytes, at the active
/// per-byte price.
pub fn exp_cost(byte_len: u64, expbyte: u64) -> Result<u64, ExitError> {
	// byte_len is at most 32, so the multiplication cannot overflow.
	safe_add(byte_len * expbyte, G_EXP)
}

/// Gas actually forwarded to a callee. With the 63/64 rule active the
/// forwarded amount is capped at `available - base` less one 64th; a larger
/// request is clamped to the cap instead of failing.
pub fn call_gas(
	apply_l64: bool,
	available_gas: u64,
	base: u64,
	requested: U256,
) -> Result<u64, ExitError> {
	if apply_l64 {
		// Surcharges already exceeding the frame's gas cannot forward
		// anything; the operation is out of gas whatever was requested.
		let available = available_gas
			.checked_sub(base)
			.ok_or(ExitError::OutOfGas)?;
		let gas = available - available / 64;
		// A request wider than u64 is necessarily larger than the cap.
		if requested > U256::from(u64::MAX) || gas < requested.as_u64() {
			return Ok(gas);
		}
	}
	if requested > U256::from(u64::MAX) {
		return Err(ExitError::GasUintOverflow);
	}
	Ok(requested.as_u64())
}

/// Legacy `SSTORE` schedule: priced on the current value alone.
#[must_use]
pub fn sstore_legacy_cost(current: H256, new: H256) -> (u64, i64) {
	if current == H256::zero() && new != H256::zero() {
		// 0 => non 0
		(G_SSTORE_SET, 0)
	} else if current != H256::zero() && new == H256::zero() {
		// non 0 => 0
		(G_SSTORE_RESET, R_SSTORE_CLEAR as i64)
	} else {
		// non 0 => non 0, or 0 => 0
		(G_SSTORE_RESET, 0)
	}
}

/// Net-metered `SSTORE` schedule: priced on the transition between the
/// committed (pre-transaction) value, the current value and the new value.
#[must_use]
pub fn sstore_net_cost(original: H256, current: H256, new: H256) -> (u64, i64) {
	if current == new {
		return (NET_SSTORE_NOOP, 0);
	}
	if original == current {
		if original == H256::zero() {
			return (NET_SSTORE_INIT, 0);
		}
		if new == H256::zero() {
			return (NET_SSTORE_CLEAN, NET_SSTORE_CLEAR_REFUND as i64);
		}
		return (NET_SSTORE_CLEAN, 0);
	}
	let mut refund = 0i64;
	if original != H256::zero() {
		if current == H256::zero() {
			// Recreating a slot this transaction already cleared takes the
			// clearing refund back.
			refund -= NET_SSTORE_CLEAR_REFUND as i64;
		} else if new == H256::zero() {
			refund += NET_SSTORE_CLEAR_REFUND as i64;
		}
	}
	if original == new {
		if original == H256::zero() {
			refund += NET_SSTORE_RESET_CLEAR_REFUND as i64;
		} else {
			refund += NET_SSTORE_RESET_REFUND as i64;
		}
	}
	(NET_SSTORE_DIRTY, refund)
}

/// Rebalanced net-metered `SSTORE` schedule. Fails outright when the frame
/// holds no more than the reentrancy sentry.
pub fn sstore_eip2200_cost(
	original: H256,
	current: H256,
	new: H256,
	gas_left: u64,
) -> Result<(u64, i64), ExitError> {
	if gas_left <= SSTORE_SENTRY_EIP2200 {
		return Err(ExitError::OutOfGas);
	}
	if current == new {
		return Ok((SLOAD_EIP2200, 0));
	}
	if original == current {
		if original == H256::zero() {
			return Ok((SSTORE_SET_EIP2200, 0));
		}
		if new == H256::zero() {
			return Ok((
				SSTORE_RESET_EIP2200,
				SSTORE_CLEARS_REFUND_EIP2200 as i64,
			));
		}
		return Ok((SSTORE_RESET_EIP2200, 0));
	}
	let mut refund = 0i64;
	if original != H256::zero() {
		if current == H256::zero() {
			refund -= SSTORE_CLEARS_REFUND_EIP2200 as i64;
		} else if new == H256::zero() {
			refund += SSTORE_CLEARS_REFUND_EIP2200 as i64;
		}
	}
	if original == new {
		if original == H256::zero() {
			refund += (SSTORE_SET_EIP2200 - SLOAD_EIP2200) as i64;
		} else {
			refund += (SSTORE_RESET_EIP2200 - SLOAD_EIP2200) as i64;
		}
	}
	Ok((SLOAD_EIP2200, refund))
}

/// Warm/cold `SSTORE` schedule. The cold-slot surcharge is folded into the
/// cost; the caller marks the slot warm. Keeps the 2200 sentry and refund
/// schedule, with the warm read cost as the cheap tier.
pub fn sstore_eip2929_cost(
	original: H256,
	current: H256,
	new: H256,
	gas_left: u64,
	slot_is_cold: bool,
) -> Result<(u64, i64), ExitError> {
	if gas_left <= SSTORE_SENTRY_EIP2200 {
		return Err(ExitError::OutOfGas);
	}
	let cold = if slot_is_cold { COLD_SLOAD_EIP2929 } else { 0 };

	if current == new {
		return Ok((cold + WARM_STORAGE_READ_EIP2929, 0));
	}
	if original == current {
		if original == H256::zero() {
			return Ok((cold + SSTORE_SET_EIP2200, 0));
		}
		let cost = cold + (SSTORE_RESET_EIP2200 - COLD_SLOAD_EIP2929);
		if new == H256::zero() {
			return Ok((cost, SSTORE_CLEARS_REFUND_EIP2200 as i64));
		}
		return Ok((cost, 0));
	}
	let mut refund = 0i64;
	if original != H256::zero() {
		if current == H256::zero() {
			refund -= SSTORE_CLEARS_REFUND_EIP2200 as i64;
		} else if new == H256::zero() {
			refund += SSTORE_CLEARS_REFUND_EIP2200 as i64;
		}
	}
	if original == new {
		if original == H256::zero() {
			refund += (SSTORE_SET_EIP2200 - WARM_STORAGE_READ_EIP2929) as i64;
		} else {
			refund += (SSTORE_RESET_EIP2200 - COLD_SLOAD_EIP2929 - WARM_STORAGE_READ_EIP2929)
				as i64;
		}
	}
	Ok((cold + WARM_STORAGE_READ_EIP2929, refund))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn h(n: u64) -> H256 {
		H256::from_low_u64_be(n)
	}

	#[test]
	fn memory_cost_charges_the_delta() {
		// Growing to A then to B costs the same in total as growing
		// straight to B.
		let mut stepped = Memory::new();
		let a = memory_gas_cost(&mut stepped, 64).unwrap();
		stepped.resize(64);
		let b = memory_gas_cost(&mut stepped, 4096).unwrap();

		let mut direct = Memory::new();
		let whole = memory_gas_cost(&mut direct, 4096).unwrap();

		assert_eq!(a + b, whole);
	}

	#[test]
	fn memory_cost_is_quadratic() {
		let mut memory = Memory::new();
		// 1024 words: 3 * 1024 + 1024^2 / 512 = 5120.
		assert_eq!(memory_gas_cost(&mut memory, 32768).unwrap(), 5120);
	}

	#[test]
	fn memory_cost_rejects_unpayable_sizes() {
		let mut memory = Memory::new();
		assert_eq!(
			memory_gas_cost(&mut memory, 0x1FFFFFFFE0 + 1),
			Err(ExitError::GasUintOverflow)
		);
		// The bound itself is still priceable.
		assert!(memory_gas_cost(&mut memory, 0x1FFFFFFFE0).is_ok());
	}

	#[test]
	fn memory_cost_within_charged_size_is_free() {
		let mut memory = Memory::new();
		memory_gas_cost(&mut memory, 64).unwrap();
		memory.resize(64);
		assert_eq!(memory_gas_cost(&mut memory, 32).unwrap(), 0);
	}

	#[test]
	fn call_gas_caps_at_63_64ths() {
		// available 6400 after base: cap = 6400 - 100 = 6300.
		let forwarded = call_gas(true, 6500, 100, U256::MAX).unwrap();
		assert_eq!(forwarded, 6300);

		// A smaller explicit request is honored exactly.
		let forwarded = call_gas(true, 6500, 100, U256::from(1000)).unwrap();
		assert_eq!(forwarded, 1000);
	}

	#[test]
	fn call_gas_without_l64_requires_u64_request() {
		assert_eq!(
			call_gas(false, 6500, 100, U256::MAX),
			Err(ExitError::GasUintOverflow)
		);
		assert_eq!(call_gas(false, 6500, 100, U256::from(42)), Ok(42));
	}

	#[test]
	fn exp_cost_per_byte_rates() {
		assert_eq!(exp_cost(3, G_EXPBYTE_FRONTIER).unwrap(), 10 + 30);
		assert_eq!(exp_cost(3, G_EXPBYTE_EIP160).unwrap(), 10 + 150);
	}

	#[test]
	fn log_cost_schedule() {
		assert_eq!(log_cost(2, 10).unwrap(), 375 + 2 * 375 + 10 * 8);
	}

	#[test]
	fn log_cost_overflow_is_flagged() {
		assert_eq!(log_cost(2, u64::MAX / 4), Err(ExitError::GasUintOverflow));
	}

	#[test]
	fn legacy_sstore_transitions() {
		assert_eq!(sstore_legacy_cost(h(0), h(1)), (20000, 0));
		assert_eq!(sstore_legacy_cost(h(1), h(0)), (5000, 15000));
		assert_eq!(sstore_legacy_cost(h(1), h(2)), (5000, 0));
		assert_eq!(sstore_legacy_cost(h(0), h(0)), (5000, 0));
	}

	#[test]
	fn net_sstore_transitions() {
		// No-op.
		assert_eq!(sstore_net_cost(h(1), h(1), h(1)), (200, 0));
		// Fresh slot.
		assert_eq!(sstore_net_cost(h(0), h(0), h(1)), (20000, 0));
		// Clean delete earns the clearing refund.
		assert_eq!(sstore_net_cost(h(1), h(1), h(0)), (5000, 15000));
		// Dirty recreate takes the refund back.
		assert_eq!(sstore_net_cost(h(1), h(0), h(2)), (200, -15000));
		// Reset to original existing value.
		assert_eq!(sstore_net_cost(h(1), h(2), h(1)), (200, 4800));
		// Reset to original empty value.
		assert_eq!(sstore_net_cost(h(0), h(2), h(0)), (200, 19800));
	}

	#[test]
	fn eip2200_sentry_fails_low_gas() {
		assert_eq!(
			sstore_eip2200_cost(h(0), h(0), h(1), 2300),
			Err(ExitError::OutOfGas)
		);
		assert_eq!(
			sstore_eip2200_cost(h(0), h(0), h(1), 2301),
			Ok((20000, 0))
		);
	}

	#[test]
	fn eip2200_dirty_reset_refunds() {
		assert_eq!(
			sstore_eip2200_cost(h(1), h(2), h(1), 100000),
			Ok((800, (5000 - 800) as i64))
		);
	}

	#[test]
	fn eip2929_cold_slot_surcharge() {
		let (cost, _) = sstore_eip2929_cost(h(1), h(1), h(2), 100000, true).unwrap();
		assert_eq!(cost, 2100 + (5000 - 2100));
		let (cost, _) = sstore_eip2929_cost(h(1), h(1), h(2), 100000, false).unwrap();
		assert_eq!(cost, 5000 - 2100);
	}
}
