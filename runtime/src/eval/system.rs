use embervm_core::{ExitError, ExitSucceed};
use primitive_types::U256;

use super::{try_frame, u256_to_address, u256_to_h256};
use crate::backend::Log;
use crate::evm::Evm;
use crate::frame::Frame;
use crate::interpreter::Control;

#[inline]
fn as_offset(value: U256) -> Result<usize, ExitError> {
	if value > U256::from(usize::MAX) {
		return Err(ExitError::OutOfGas);
	}
	Ok(value.as_usize())
}

pub fn sload(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let key = u256_to_h256(try_frame!(frame.stack.pop()));
	let value = evm.state.storage(frame.address, key);
	try_frame!(frame.stack.push(U256::from_big_endian(value.as_bytes())));
	Control::Continue(1)
}

pub fn sstore(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let key = u256_to_h256(try_frame!(frame.stack.pop()));
	let value = u256_to_h256(try_frame!(frame.stack.pop()));
	evm.state.set_storage(frame.address, key, value);
	Control::Continue(1)
}

/// All five `LOGn` variants; the topic count is recovered from the opcode.
pub fn log(evm: &mut Evm<'_>, frame: &mut Frame, pc: usize) -> Control {
	let topic_count = (frame.code()[pc] - 0xa0) as usize;
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let mut topics = Vec::with_capacity(topic_count);
	for _ in 0..topic_count {
		topics.push(u256_to_h256(try_frame!(frame.stack.pop())));
	}
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = try_frame!(as_offset(offset));
		let len = try_frame!(as_offset(len));
		frame.memory.get_copy(offset as u64, len as u64)
	};
	evm.state.log(Log {
		address: frame.address,
		topics,
		data,
	});
	Control::Continue(1)
}

fn init_code(frame: &mut Frame, offset: U256, len: U256) -> Result<Vec<u8>, ExitError> {
	if len.is_zero() {
		return Ok(Vec::new());
	}
	let offset = as_offset(offset)?;
	let len = as_offset(len)?;
	Ok(frame.memory.get_copy(offset as u64, len as u64))
}

/// Gas granted to a nested create: everything the frame has left, less one
/// 64th once the forwarding rule is active.
fn create_gas(evm: &Evm<'_>, frame: &mut Frame) -> u64 {
	let mut gas = frame.gas;
	if evm.upgrade.is_tangerine_whistle() {
		gas -= gas / 64;
	}
	frame.use_gas(gas);
	gas
}

pub fn create(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let value = try_frame!(frame.stack.pop());
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let init = try_frame!(init_code(frame, offset, len));
	let gas = create_gas(evm, frame);

	evm.return_data.clear();
	let (reason, output, address, gas_left) = evm.create(frame.address, init, gas, value);
	frame.gas += gas_left;

	if reason.is_succeed() {
		try_frame!(frame.stack.push(super::address_to_u256(address)));
	} else {
		try_frame!(frame.stack.push(U256::zero()));
		if reason.is_revert() {
			evm.return_data = output;
		}
	}
	Control::Continue(1)
}

pub fn create2(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let value = try_frame!(frame.stack.pop());
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let salt = u256_to_h256(try_frame!(frame.stack.pop()));
	let init = try_frame!(init_code(frame, offset, len));
	let gas = create_gas(evm, frame);

	evm.return_data.clear();
	let (reason, output, address, gas_left) = evm.create2(frame.address, init, salt, gas, value);
	frame.gas += gas_left;

	if reason.is_succeed() {
		try_frame!(frame.stack.push(super::address_to_u256(address)));
	} else {
		try_frame!(frame.stack.push(U256::zero()));
		if reason.is_revert() {
			evm.return_data = output;
		}
	}
	Control::Continue(1)
}

struct CallArgs {
	target: primitive_types::H160,
	value: U256,
	args: Vec<u8>,
	out_offset: usize,
	out_len: usize,
}

fn pop_call_args(frame: &mut Frame, with_value: bool) -> Result<CallArgs, ExitError> {
	// The requested gas was consumed by the dynamic gas computation.
	let _requested = frame.stack.pop()?;
	let target = u256_to_address(frame.stack.pop()?);
	let value = if with_value {
		frame.stack.pop()?
	} else {
		U256::zero()
	};
	let in_offset = frame.stack.pop()?;
	let in_len = frame.stack.pop()?;
	let out_offset = frame.stack.pop()?;
	let out_len = frame.stack.pop()?;

	let args = if in_len.is_zero() {
		Vec::new()
	} else {
		let in_offset = as_offset(in_offset)?;
		let in_len = as_offset(in_len)?;
		frame.memory.get_copy(in_offset as u64, in_len as u64)
	};
	let (out_offset, out_len) = if out_len.is_zero() {
		(0, 0)
	} else {
		(as_offset(out_offset)?, as_offset(out_len)?)
	};

	Ok(CallArgs {
		target,
		value,
		args,
		out_offset,
		out_len,
	})
}

fn finish_call(
	frame: &mut Frame,
	evm: &mut Evm<'_>,
	reason: embervm_core::ExitReason,
	output: Vec<u8>,
	gas_left: u64,
	out_offset: usize,
	out_len: usize,
) -> Control {
	if reason.is_succeed() || reason.is_revert() {
		let n = core::cmp::min(out_len, output.len());
		frame.memory.set(out_offset, &output[..n], None);
	}
	try_frame!(frame.stack.push(if reason.is_succeed() {
		U256::one()
	} else {
		U256::zero()
	}));
	frame.gas += gas_left;
	evm.return_data = output;
	Control::Continue(1)
}

pub fn call(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let args = try_frame!(pop_call_args(frame, true));
	let mut gas = evm.call_gas_temp;
	if !args.value.is_zero() {
		gas += embervm_gasometer::consts::G_CALLSTIPEND;
	}
	let (reason, output, gas_left) = evm.call_with_static(
		frame.address,
		args.target,
		args.args,
		gas,
		args.value,
		frame.is_static,
	);
	finish_call(frame, evm, reason, output, gas_left, args.out_offset, args.out_len)
}

pub fn callcode(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let args = try_frame!(pop_call_args(frame, true));
	let mut gas = evm.call_gas_temp;
	if !args.value.is_zero() {
		gas += embervm_gasometer::consts::G_CALLSTIPEND;
	}
	let (reason, output, gas_left) = evm.call_code(
		frame.address,
		args.target,
		args.args,
		gas,
		args.value,
		frame.is_static,
	);
	finish_call(frame, evm, reason, output, gas_left, args.out_offset, args.out_len)
}

pub fn delegatecall(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let args = try_frame!(pop_call_args(frame, false));
	let gas = evm.call_gas_temp;
	let (reason, output, gas_left) = evm.delegate_call(
		frame.caller,
		frame.address,
		frame.value,
		args.target,
		args.args,
		gas,
		frame.is_static,
	);
	finish_call(frame, evm, reason, output, gas_left, args.out_offset, args.out_len)
}

pub fn staticcall(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let args = try_frame!(pop_call_args(frame, false));
	let gas = evm.call_gas_temp;
	let (reason, output, gas_left) =
		evm.static_call(frame.address, args.target, args.args, gas);
	finish_call(frame, evm, reason, output, gas_left, args.out_offset, args.out_len)
}

pub fn ret(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = try_frame!(as_offset(offset));
		let len = try_frame!(as_offset(len));
		frame.memory.get_copy(offset as u64, len as u64)
	};
	Control::Halt(ExitSucceed::Returned, data)
}

pub fn revert(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = try_frame!(as_offset(offset));
		let len = try_frame!(as_offset(len));
		frame.memory.get_copy(offset as u64, len as u64)
	};
	Control::Revert(data)
}

pub fn selfdestruct(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let beneficiary = u256_to_address(try_frame!(frame.stack.pop()));
	let balance = evm.state.balance(frame.address);
	evm.state.add_balance(beneficiary, balance);
	evm.state.mark_delete(frame.address);
	Control::Halt(ExitSucceed::SelfDestructed, Vec::new())
}
