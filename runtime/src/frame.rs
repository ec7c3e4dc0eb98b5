use std::rc::Rc;

use embervm_core::{Analysis, Memory, Opcode, Stack};
use primitive_types::{H160, U256};

/// Return-stack depth bound for subroutines.
pub(crate) const RETURN_STACK_LIMIT: usize = 1023;

/// One call frame: the code being run, who is running it, and the frame's
/// own stack, memory and gas allowance. A child frame's gas is carved out of
/// the parent's and handed back when the child exits.
pub struct Frame {
	/// Address that invoked this frame (as seen by `CALLER`).
	pub caller: H160,
	/// Address whose storage and balance this frame operates on.
	pub address: H160,
	/// Apparent value of the invocation (as seen by `CALLVALUE`).
	pub value: U256,
	/// Remaining gas.
	pub gas: u64,
	/// Call input data.
	pub input: Vec<u8>,
	/// Whether any state mutation is forbidden.
	pub is_static: bool,
	pub stack: Stack,
	pub memory: Memory,
	pub(crate) return_stack: Vec<usize>,
	code: Rc<Vec<u8>>,
	analysis: Analysis,
}

impl Frame {
	pub fn new(
		caller: H160,
		address: H160,
		value: U256,
		gas: u64,
		input: Vec<u8>,
		code: Rc<Vec<u8>>,
		is_static: bool,
	) -> Self {
		let analysis = Analysis::new(&code);
		Self {
			caller,
			address,
			value,
			gas,
			input,
			is_static,
			stack: Stack::new(),
			memory: Memory::new(),
			return_stack: Vec::new(),
			code,
			analysis,
		}
	}

	#[inline]
	#[must_use]
	pub fn code(&self) -> &[u8] {
		&self.code
	}

	/// Deduct `amount` from the remaining gas, reporting whether it fit.
	#[inline]
	pub fn use_gas(&mut self, amount: u64) -> bool {
		if self.gas < amount {
			return false;
		}
		self.gas -= amount;
		true
	}

	/// Whether `target` is a `JUMPDEST` on an instruction boundary.
	#[must_use]
	pub fn valid_jumpdest(&self, target: U256) -> bool {
		if target >= U256::from(self.code.len()) {
			return false;
		}
		let target = target.as_usize();
		self.code[target] == Opcode::JUMPDEST.as_u8() && self.analysis.is_code(target)
	}

	/// Whether `target` is a `BEGINSUB` on an instruction boundary.
	#[must_use]
	pub fn valid_subroutine_entry(&self, target: U256) -> bool {
		if target >= U256::from(self.code.len()) {
			return false;
		}
		let target = target.as_usize();
		self.code[target] == Opcode::BEGINSUB.as_u8() && self.analysis.is_code(target)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn frame_with_code(code: Vec<u8>) -> Frame {
		Frame::new(
			H160::zero(),
			H160::zero(),
			U256::zero(),
			100_000,
			Vec::new(),
			Rc::new(code),
			false,
		)
	}

	#[test]
	fn use_gas_stops_at_zero() {
		let mut frame = frame_with_code(vec![]);
		assert!(frame.use_gas(100_000));
		assert!(!frame.use_gas(1));
	}

	#[test]
	fn jumpdest_inside_push_data_is_invalid() {
		// PUSH1 0x5b JUMPDEST
		let frame = frame_with_code(vec![0x60, 0x5b, 0x5b]);
		assert!(!frame.valid_jumpdest(U256::from(1)));
		assert!(frame.valid_jumpdest(U256::from(2)));
		assert!(!frame.valid_jumpdest(U256::from(3)));
	}
}
