use primitive_types::U256;

use super::try_frame;
use crate::evm::Evm;
use crate::frame::Frame;
use crate::interpreter::Control;

/// Memory offsets reaching an execution function have already been charged
/// for, so a conversion failure can only mean the frame is out of gas.
#[inline]
fn as_offset(value: U256) -> Result<usize, embervm_core::ExitError> {
	if value > U256::from(usize::MAX) {
		return Err(embervm_core::ExitError::OutOfGas);
	}
	Ok(value.as_usize())
}

pub fn pop(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.pop());
	Control::Continue(1)
}

/// All 32 `PUSHn` variants: the width is recovered from the opcode byte and
/// missing immediate bytes at the end of the code read as zero.
pub fn push(_evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	let n = (frame.code()[pc] - 0x5f) as usize;
	let mut raw = [0u8; 32];
	let start = pc + 1;
	let end = core::cmp::min(start + n, frame.code().len());
	if start < end {
		raw[32 - n..32 - n + (end - start)].copy_from_slice(&frame.code()[start..end]);
	}
	try_frame!(frame.stack.push(U256::from_big_endian(&raw)));
	Control::Continue(1 + n)
}

/// All 16 `DUPn` variants.
pub fn dup(_evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	let n = (frame.code()[pc] - 0x7f) as usize;
	try_frame!(frame.stack.dup(n - 1));
	Control::Continue(1)
}

/// All 16 `SWAPn` variants.
pub fn swap(_evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	let n = (frame.code()[pc] - 0x8f) as usize;
	try_frame!(frame.stack.swap(n));
	Control::Continue(1)
}

pub fn mload(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(as_offset(try_frame!(frame.stack.pop())));
	let word = frame.memory.get_copy(offset as u64, 32);
	try_frame!(frame.stack.push(U256::from_big_endian(&word)));
	Control::Continue(1)
}

pub fn mstore(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(as_offset(try_frame!(frame.stack.pop())));
	let value = try_frame!(frame.stack.pop());
	frame.memory.set_word(offset, value);
	Control::Continue(1)
}

pub fn mstore8(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(as_offset(try_frame!(frame.stack.pop())));
	let value = try_frame!(frame.stack.pop());
	frame.memory.set(offset, &[value.byte(0)], None);
	Control::Continue(1)
}

pub fn msize(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(U256::from(frame.memory.len())));
	Control::Continue(1)
}

pub fn gas(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(U256::from(frame.gas)));
	Control::Continue(1)
}
