use embervm_core::{ExitError, ExitSucceed};
use primitive_types::U256;

use super::try_frame;
use crate::evm::Evm;
use crate::frame::{Frame, RETURN_STACK_LIMIT};
use crate::interpreter::Control;

pub fn stop(_evm: &mut Evm<'_>, _frame: &mut Frame, _pc: usize) -> Control {
	Control::Halt(ExitSucceed::Stopped, Vec::new())
}

pub fn jump(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let target = try_frame!(frame.stack.pop());
	if !frame.valid_jumpdest(target) {
		return Control::Fail(ExitError::InvalidJump);
	}
	Control::Jump(target.as_usize())
}

pub fn jumpi(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let target = try_frame!(frame.stack.pop());
	let condition = try_frame!(frame.stack.pop());
	if condition.is_zero() {
		return Control::Continue(1);
	}
	if !frame.valid_jumpdest(target) {
		return Control::Fail(ExitError::InvalidJump);
	}
	Control::Jump(target.as_usize())
}

pub fn pc(_evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	try_frame!(frame.stack.push(U256::from(pc)));
	Control::Continue(1)
}

pub fn jumpdest(_evm: &mut Evm<'_>, _frame: &mut Frame, _pc: usize) -> Control {
	Control::Continue(1)
}

/// `BEGINSUB` marks a subroutine entry; flowing into one is an error.
pub fn beginsub(_evm: &mut Evm<'_>, _frame: &mut Frame, _pc: usize) -> Control {
	Control::Fail(ExitError::InvalidSubroutineEntry)
}

pub fn jumpsub(_evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	if frame.return_stack.len() >= RETURN_STACK_LIMIT {
		return Control::Fail(ExitError::ReturnStackExceeded);
	}
	let target = try_frame!(frame.stack.pop());
	if !frame.valid_subroutine_entry(target) {
		return Control::Fail(ExitError::InvalidJump);
	}
	frame.return_stack.push(pc);
	// Resume just past the BEGINSUB marker.
	Control::Jump(target.as_usize() + 1)
}

pub fn returnsub(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	match frame.return_stack.pop() {
		Some(return_pc) => Control::Jump(return_pc + 1),
		None => Control::Fail(ExitError::InvalidRetsub),
	}
}
