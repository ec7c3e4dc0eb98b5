use std::rc::Rc;

use embervm_core::{ExitError, ExitReason, ExitSucceed};
use embervm_gasometer::consts::{G_CODEDEPOSIT, MAX_CODE_SIZE};
use log::{debug, trace};
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use crate::backend::Backend;
use crate::context::{BlockContext, TxContext};
use crate::fork::Upgrade;
use crate::frame::Frame;
use crate::interpreter::run_frame;
use crate::table::JumpTable;

/// Depth bound of the frame stack.
pub const CALL_STACK_LIMIT: usize = 1024;

/// The call engine: owns the block and transaction context, the active
/// instruction set, and the frame-depth counter, and drives nested
/// call/create invocations synchronously to completion against the state
/// accessor. One `Evm` applies one message; reuse across messages is fine as
/// long as the backend's per-transaction tracking is reset in between.
pub struct Evm<'a> {
	pub block: BlockContext,
	pub tx: TxContext,
	pub state: &'a mut dyn Backend,
	pub upgrade: Upgrade,
	table: &'static JumpTable,
	depth: usize,
	/// Gas forwarded to the next callee, staged by the call-family dynamic
	/// gas functions.
	pub(crate) call_gas_temp: u64,
	/// Output of the most recent completed sub-call.
	pub(crate) return_data: Vec<u8>,
}

impl<'a> Evm<'a> {
	pub fn new(
		block: BlockContext,
		tx: TxContext,
		upgrade: Upgrade,
		state: &'a mut dyn Backend,
	) -> Self {
		Self {
			block,
			tx,
			state,
			upgrade,
			table: JumpTable::for_upgrade(upgrade),
			depth: 0,
			call_gas_temp: 0,
			return_data: Vec::new(),
		}
	}

	#[inline]
	pub(crate) fn table(&self) -> &'static JumpTable {
		self.table
	}

	fn can_transfer(&self, from: H160, value: U256) -> bool {
		self.state.balance(from) >= value
	}

	fn transfer(&mut self, from: H160, to: H160, value: U256) {
		self.state.sub_balance(from, value);
		self.state.add_balance(to, value);
	}

	/// Run a constructed frame and settle its state effects: a reverting or
	/// erroring frame has all its writes unwound, and an erroring frame has
	/// already burned its gas.
	fn execute(&mut self, mut frame: Frame, snapshot: usize) -> (ExitReason, Vec<u8>, u64) {
		self.depth += 1;
		let (reason, output) = run_frame(self, &mut frame);
		self.depth -= 1;

		match reason {
			ExitReason::Succeed(_) => (reason, output, frame.gas),
			ExitReason::Revert => {
				self.state.revert_to(snapshot);
				(reason, output, frame.gas)
			}
			ExitReason::Error(error) => {
				debug!(target: "evm", "frame at {:?} failed: {}", frame.address, error);
				self.state.revert_to(snapshot);
				(reason, Vec::new(), 0)
			}
		}
	}

	/// Message call into `address`, transferring `value`.
	pub fn call(
		&mut self,
		caller: H160,
		address: H160,
		input: Vec<u8>,
		gas: u64,
		value: U256,
	) -> (ExitReason, Vec<u8>, u64) {
		self.call_with_static(caller, address, input, gas, value, false)
	}

	pub(crate) fn call_with_static(
		&mut self,
		caller: H160,
		address: H160,
		input: Vec<u8>,
		gas: u64,
		value: U256,
		is_static: bool,
	) -> (ExitReason, Vec<u8>, u64) {
		trace!(target: "evm", "call depth {} {:?} -> {:?} gas {} value {}",
			self.depth, caller, address, gas, value);
		if self.depth >= CALL_STACK_LIMIT {
			return (ExitError::CallDepthExceeded.into(), Vec::new(), gas);
		}
		if !value.is_zero() && !self.can_transfer(caller, value) {
			return (ExitError::InsufficientBalance.into(), Vec::new(), gas);
		}

		let snapshot = self.state.snapshot();
		if !self.state.exists(address) {
			// Calling a nonexistent account without value conjures nothing
			// once empty accounts are gone from the protocol.
			if self.upgrade.is_spurious_dragon() && value.is_zero() {
				return (ExitSucceed::Stopped.into(), Vec::new(), gas);
			}
			self.state.create_account(address);
		}
		self.transfer(caller, address, value);

		let code = self.state.code(address);
		if code.is_empty() {
			return (ExitSucceed::Stopped.into(), Vec::new(), gas);
		}

		let frame = Frame::new(caller, address, value, gas, input, Rc::new(code), is_static);
		self.execute(frame, snapshot)
	}

	/// Run `target`'s code against the caller's own storage.
	pub(crate) fn call_code(
		&mut self,
		address: H160,
		target: H160,
		input: Vec<u8>,
		gas: u64,
		value: U256,
		is_static: bool,
	) -> (ExitReason, Vec<u8>, u64) {
		if self.depth >= CALL_STACK_LIMIT {
			return (ExitError::CallDepthExceeded.into(), Vec::new(), gas);
		}
		if !value.is_zero() && !self.can_transfer(address, value) {
			return (ExitError::InsufficientBalance.into(), Vec::new(), gas);
		}

		let snapshot = self.state.snapshot();
		let code = self.state.code(target);
		if code.is_empty() {
			return (ExitSucceed::Stopped.into(), Vec::new(), gas);
		}

		let frame = Frame::new(address, address, value, gas, input, Rc::new(code), is_static);
		self.execute(frame, snapshot)
	}

	/// Run `target`'s code in the caller's context, keeping the original
	/// caller and value visible.
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn delegate_call(
		&mut self,
		original_caller: H160,
		address: H160,
		apparent_value: U256,
		target: H160,
		input: Vec<u8>,
		gas: u64,
		is_static: bool,
	) -> (ExitReason, Vec<u8>, u64) {
		if self.depth >= CALL_STACK_LIMIT {
			return (ExitError::CallDepthExceeded.into(), Vec::new(), gas);
		}

		let snapshot = self.state.snapshot();
		let code = self.state.code(target);
		if code.is_empty() {
			return (ExitSucceed::Stopped.into(), Vec::new(), gas);
		}

		let frame = Frame::new(
			original_caller,
			address,
			apparent_value,
			gas,
			input,
			Rc::new(code),
			is_static,
		);
		self.execute(frame, snapshot)
	}

	/// Message call with all state mutation forbidden for its duration.
	pub(crate) fn static_call(
		&mut self,
		caller: H160,
		address: H160,
		input: Vec<u8>,
		gas: u64,
	) -> (ExitReason, Vec<u8>, u64) {
		if self.depth >= CALL_STACK_LIMIT {
			return (ExitError::CallDepthExceeded.into(), Vec::new(), gas);
		}

		let snapshot = self.state.snapshot();
		let code = self.state.code(address);
		if code.is_empty() {
			return (ExitSucceed::Stopped.into(), Vec::new(), gas);
		}

		let frame = Frame::new(caller, address, U256::zero(), gas, input, Rc::new(code), true);
		self.execute(frame, snapshot)
	}

	/// Contract creation at the address derived from the caller's nonce.
	pub fn create(
		&mut self,
		caller: H160,
		init_code: Vec<u8>,
		gas: u64,
		value: U256,
	) -> (ExitReason, Vec<u8>, H160, u64) {
		let address = create_address(caller, self.state.nonce(caller));
		self.create_at(caller, init_code, gas, value, address)
	}

	/// Contract creation at the address derived from the salt and the init
	/// code hash.
	pub fn create2(
		&mut self,
		caller: H160,
		init_code: Vec<u8>,
		salt: H256,
		gas: u64,
		value: U256,
	) -> (ExitReason, Vec<u8>, H160, u64) {
		let address = create2_address(caller, salt, &init_code);
		self.create_at(caller, init_code, gas, value, address)
	}

	fn create_at(
		&mut self,
		caller: H160,
		init_code: Vec<u8>,
		gas: u64,
		value: U256,
		address: H160,
	) -> (ExitReason, Vec<u8>, H160, u64) {
		trace!(target: "evm", "create depth {} {:?} -> {:?} gas {}",
			self.depth, caller, address, gas);
		if self.depth >= CALL_STACK_LIMIT {
			return (ExitError::CallDepthExceeded.into(), Vec::new(), address, gas);
		}
		if !value.is_zero() && !self.can_transfer(caller, value) {
			return (
				ExitError::InsufficientBalance.into(),
				Vec::new(),
				address,
				gas,
			);
		}

		let nonce = self.state.nonce(caller);
		self.state.set_nonce(caller, nonce + 1);
		if self.upgrade.is_berlin() {
			self.state.mark_hot(address, None);
		}

		// An address with code or a spent nonce cannot be created over.
		if self.state.nonce(address) != 0 || !self.state.code(address).is_empty() {
			return (
				ExitError::ContractAddressCollision.into(),
				Vec::new(),
				address,
				0,
			);
		}

		let snapshot = self.state.snapshot();
		self.state.create_account(address);
		if self.upgrade.is_spurious_dragon() {
			self.state.set_nonce(address, 1);
		}
		self.transfer(caller, address, value);

		let frame = Frame::new(
			caller,
			address,
			value,
			gas,
			Vec::new(),
			Rc::new(init_code),
			false,
		);
		let (reason, output, gas_left) = self.execute(frame, snapshot);
		if !reason.is_succeed() {
			return (reason, output, address, gas_left);
		}

		self.finish_create(address, output, gas_left, snapshot)
	}

	/// Code-deposit step of a successful create frame.
	fn finish_create(
		&mut self,
		address: H160,
		code: Vec<u8>,
		mut gas_left: u64,
		snapshot: usize,
	) -> (ExitReason, Vec<u8>, H160, u64) {
		if self.upgrade.is_spurious_dragon() && code.len() > MAX_CODE_SIZE {
			self.state.revert_to(snapshot);
			return (
				ExitError::MaxCodeSizeExceeded.into(),
				Vec::new(),
				address,
				0,
			);
		}

		let deposit = code.len() as u64 * G_CODEDEPOSIT;
		if gas_left >= deposit {
			gas_left -= deposit;
			self.state.set_code(address, code.clone());
			debug!(target: "evm", "created contract at {:?}, {} bytes", address, code.len());
			(ExitSucceed::Returned.into(), code, address, gas_left)
		} else if self.upgrade.is_homestead() {
			self.state.revert_to(snapshot);
			(ExitError::CodeStoreOutOfGas.into(), Vec::new(), address, 0)
		} else {
			// Before the create out-of-gas rule, a deposit the frame cannot
			// afford leaves the account codeless instead of failing.
			(ExitSucceed::Returned.into(), code, address, gas_left)
		}
	}
}

/// Address of a contract created by `caller` at `nonce`.
#[must_use]
pub fn create_address(caller: H160, nonce: u64) -> H160 {
	let mut stream = rlp::RlpStream::new_list(2);
	stream.append(&caller);
	stream.append(&nonce);
	let hash = Keccak256::digest(stream.as_raw());
	H160::from_slice(&hash[12..])
}

/// Address of a contract created through the salted scheme.
#[must_use]
pub fn create2_address(caller: H160, salt: H256, init_code: &[u8]) -> H160 {
	let code_hash = Keccak256::digest(init_code);
	let mut hasher = Keccak256::new();
	hasher.update([0xff]);
	hasher.update(caller.as_bytes());
	hasher.update(salt.as_bytes());
	hasher.update(code_hash);
	H160::from_slice(&hasher.finalize()[12..])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn create_address_depends_on_nonce() {
		let caller = H160::repeat_byte(0x11);
		let a = create_address(caller, 0);
		let b = create_address(caller, 1);
		assert_ne!(a, b);
		assert_eq!(a, create_address(caller, 0));
	}

	#[test]
	fn create2_address_depends_on_salt_and_code() {
		let caller = H160::repeat_byte(0x22);
		let base = create2_address(caller, H256::zero(), &[0x00]);
		assert_ne!(base, create2_address(caller, H256::repeat_byte(1), &[0x00]));
		assert_ne!(base, create2_address(caller, H256::zero(), &[0x01]));
		assert_eq!(base, create2_address(caller, H256::zero(), &[0x00]));
	}
}
