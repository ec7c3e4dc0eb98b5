use embervm_core::ExitError;
use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

use super::{address_to_u256, get_data, try_frame, u256_to_address};
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

pub fn address(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(address_to_u256(frame.address)));
	Control::Continue(1)
}

pub fn balance(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let address = u256_to_address(try_frame!(frame.stack.pop()));
	try_frame!(frame.stack.push(evm.state.balance(address)));
	Control::Continue(1)
}

pub fn selfbalance(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let balance = evm.state.balance(frame.address);
	try_frame!(frame.stack.push(balance));
	Control::Continue(1)
}

pub fn origin(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(address_to_u256(evm.tx.origin)));
	Control::Continue(1)
}

pub fn caller(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(address_to_u256(frame.caller)));
	Control::Continue(1)
}

pub fn callvalue(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let value = frame.value;
	try_frame!(frame.stack.push(value));
	Control::Continue(1)
}

pub fn calldataload(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(frame.stack.pop());
	let word = get_data(&frame.input, offset, 32);
	try_frame!(frame.stack.push(U256::from_big_endian(&word)));
	Control::Continue(1)
}

pub fn calldatasize(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(U256::from(frame.input.len())));
	Control::Continue(1)
}

pub fn calldatacopy(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let memory_offset = try_frame!(frame.stack.pop());
	let data_offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = try_frame!(as_offset(memory_offset));
	let len = try_frame!(as_offset(len));
	let data = get_data(&frame.input, data_offset, len);
	frame.memory.set(memory_offset, &data, Some(len));
	Control::Continue(1)
}

pub fn codesize(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	try_frame!(frame.stack.push(U256::from(frame.code().len())));
	Control::Continue(1)
}

pub fn codecopy(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let memory_offset = try_frame!(frame.stack.pop());
	let code_offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = try_frame!(as_offset(memory_offset));
	let len = try_frame!(as_offset(len));
	let data = get_data(frame.code(), code_offset, len);
	frame.memory.set(memory_offset, &data, Some(len));
	Control::Continue(1)
}

pub fn gasprice(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let price = evm.tx.gas_price;
	try_frame!(frame.stack.push(price));
	Control::Continue(1)
}

pub fn extcodesize(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let address = u256_to_address(try_frame!(frame.stack.pop()));
	let size = evm.state.code(address).len();
	try_frame!(frame.stack.push(U256::from(size)));
	Control::Continue(1)
}

pub fn extcodecopy(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let address = u256_to_address(try_frame!(frame.stack.pop()));
	let memory_offset = try_frame!(frame.stack.pop());
	let code_offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = try_frame!(as_offset(memory_offset));
	let len = try_frame!(as_offset(len));
	let code = evm.state.code(address);
	let data = get_data(&code, code_offset, len);
	frame.memory.set(memory_offset, &data, Some(len));
	Control::Continue(1)
}

pub fn extcodehash(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let address = u256_to_address(try_frame!(frame.stack.pop()));
	let hash = if evm.state.is_empty(address) {
		H256::zero()
	} else {
		evm.state.code_hash(address)
	};
	try_frame!(frame.stack.push(U256::from_big_endian(hash.as_bytes())));
	Control::Continue(1)
}

pub fn returndatasize(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let size = evm.return_data.len();
	try_frame!(frame.stack.push(U256::from(size)));
	Control::Continue(1)
}

pub fn returndatacopy(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let memory_offset = try_frame!(frame.stack.pop());
	let data_offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());

	// Unlike the other copies, reading past the end of the return buffer is
	// a hard failure rather than zero fill.
	let end = match data_offset.checked_add(len) {
		Some(end) if end <= U256::from(evm.return_data.len()) => end,
		_ => return Control::Fail(ExitError::ReturnDataOutOfBounds),
	};
	if len.is_zero() {
		return Control::Continue(1);
	}
	let memory_offset = try_frame!(as_offset(memory_offset));
	let data = evm.return_data[data_offset.as_usize()..end.as_usize()].to_vec();
	frame.memory.set(memory_offset, &data, None);
	Control::Continue(1)
}

pub fn sha3(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let offset = try_frame!(frame.stack.pop());
	let len = try_frame!(frame.stack.pop());
	let data = if len.is_zero() {
		Vec::new()
	} else {
		let offset = try_frame!(as_offset(offset));
		let len = try_frame!(as_offset(len));
		frame.memory.get_copy(offset as u64, len as u64)
	};
	let hash = Keccak256::digest(&data);
	try_frame!(frame.stack.push(U256::from_big_endian(&hash)));
	Control::Continue(1)
}

pub fn blockhash(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let number = try_frame!(frame.stack.pop());
	let hash = evm.state.block_hash(number);
	try_frame!(frame.stack.push(U256::from_big_endian(hash.as_bytes())));
	Control::Continue(1)
}

pub fn coinbase(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let coinbase = evm.block.coinbase;
	try_frame!(frame.stack.push(address_to_u256(coinbase)));
	Control::Continue(1)
}

pub fn timestamp(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let timestamp = evm.block.timestamp;
	try_frame!(frame.stack.push(timestamp));
	Control::Continue(1)
}

pub fn number(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let number = evm.block.number;
	try_frame!(frame.stack.push(number));
	Control::Continue(1)
}

pub fn difficulty(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let difficulty = evm.block.difficulty;
	try_frame!(frame.stack.push(difficulty));
	Control::Continue(1)
}

pub fn gaslimit(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let limit = evm.block.gas_limit;
	try_frame!(frame.stack.push(U256::from(limit)));
	Control::Continue(1)
}

pub fn chainid(evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let chain_id = evm.block.chain_id;
	try_frame!(frame.stack.push(chain_id));
	Control::Continue(1)
}
