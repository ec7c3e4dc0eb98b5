use embervm_core::{ExitError, ExitReason, ExitSucceed, Opcode};
use embervm_gasometer::to_word_size;

use crate::evm::Evm;
use crate::frame::Frame;

/// What an execution function decided. The interpreter loop pattern-matches
/// on this instead of comparing sentinel errors: halting, reverting and
/// failing are structurally distinct.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Control {
	/// Advance the program counter by `n` bytes.
	Continue(usize),
	/// Set the program counter to an already-validated target.
	Jump(usize),
	/// End the frame successfully with the produced return data.
	Halt(ExitSucceed, Vec<u8>),
	/// End the frame unsuccessfully, keeping the return data and the
	/// remaining gas.
	Revert(Vec<u8>),
	/// End the frame with an error; return data and remaining gas are
	/// forfeit.
	Fail(ExitError),
}

/// Run one frame to completion: fetch, decode, meter, execute.
///
/// Gas discipline per step: the memory-size function runs first so the
/// dynamic-gas function can price the growth, the constant cost is charged,
/// then the dynamic cost, and only then does memory actually grow. A frame
/// that fails burns everything it still held; this is a consensus rule,
/// failed execution is not free.
pub(crate) fn run_frame(evm: &mut Evm<'_>, frame: &mut Frame) -> (ExitReason, Vec<u8>) {
	let table = evm.table();
	let mut pc = 0usize;

	loop {
		// Running off the end of the code is a normal stop.
		let opcode = match frame.code().get(pc) {
			Some(byte) => Opcode(*byte),
			None => return (ExitSucceed::Stopped.into(), Vec::new()),
		};

		let operation = match table.get(opcode) {
			Some(operation) => operation,
			None => return fail(frame, ExitError::InvalidOpcode(opcode)),
		};

		let stack_len = frame.stack.len();
		if stack_len < operation.min_stack {
			return fail(frame, ExitError::StackUnderflow);
		}
		if stack_len > operation.max_stack {
			return fail(frame, ExitError::StackOverflow);
		}

		if frame.is_static {
			// A CALL that moves value mutates balances even though the
			// opcode itself is not flagged as writing.
			let call_with_value = opcode == Opcode::CALL
				&& frame.stack.peek(2).map(|v| !v.is_zero()).unwrap_or(false);
			if operation.writes || call_with_value {
				return fail(frame, ExitError::WriteProtection);
			}
		}

		let mut memory_size = 0u64;
		if let Some(memory_size_fn) = operation.memory_size {
			let requested = match memory_size_fn(&frame.stack) {
				Ok(requested) => requested,
				Err(error) => return fail(frame, error),
			};
			memory_size = match to_word_size(requested).checked_mul(32) {
				Some(size) => size,
				None => return fail(frame, ExitError::GasUintOverflow),
			};
		}

		if !frame.use_gas(operation.constant_gas) {
			return fail(frame, ExitError::OutOfGas);
		}
		if let Some(dynamic_gas) = operation.dynamic_gas {
			// Any failure on the dynamic path, overflow included, is
			// charged as out-of-gas.
			match dynamic_gas(evm, frame, memory_size) {
				Ok(cost) => {
					if !frame.use_gas(cost) {
						return fail(frame, ExitError::OutOfGas);
					}
				}
				Err(_) => return fail(frame, ExitError::OutOfGas),
			}
		}
		if memory_size > 0 {
			frame.memory.resize(memory_size);
		}

		match (operation.execute)(evm, frame, pc) {
			Control::Continue(bytes) => pc += bytes,
			Control::Jump(target) => pc = target,
			Control::Halt(succeed, data) => return (ExitReason::Succeed(succeed), data),
			Control::Revert(data) => return (ExitReason::Revert, data),
			Control::Fail(error) => return fail(frame, error),
		}
	}
}

#[inline]
fn fail(frame: &mut Frame, error: ExitError) -> (ExitReason, Vec<u8>) {
	frame.gas = 0;
	(ExitReason::Error(error), Vec::new())
}
