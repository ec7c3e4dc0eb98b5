use core::fmt;

use embervm_core::ExitReason;
use embervm_gasometer::consts::{
	G_TRANSACTION, G_TRANSACTION_CREATE, G_TXDATA_NONZERO_EIP2028, G_TXDATA_NONZERO_FRONTIER,
	G_TXDATA_ZERO,
};
use embervm_runtime::{Backend, Evm};
use log::{debug, trace};
use primitive_types::{H160, U256};

use crate::pool::GasPool;

/// Reasons a message is rejected before execution. A rejected message is
/// never included in a block: no gas is charged and no state changes.
/// Everything that goes wrong after dispatch is an execution failure
/// instead, reported through [`ExecutionResult`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
	/// Message nonce is above the sender's next nonce.
	NonceTooHigh,
	/// Message nonce is below the sender's next nonce.
	NonceTooLow,
	/// Sender cannot pay `gas_limit * gas_price`.
	InsufficientFunds,
	/// Sender cannot cover the transferred value at the top level.
	InsufficientFundsForTransfer,
	/// The block's gas pool cannot fit the message's gas limit.
	GasLimitReached,
	/// Purchased gas does not cover the intrinsic cost.
	IntrinsicGas,
	/// Intrinsic gas computation overflowed.
	GasUintOverflow,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::NonceTooHigh => write!(f, "nonce too high"),
			Error::NonceTooLow => write!(f, "nonce too low"),
			Error::InsufficientFunds => write!(f, "insufficient funds for gas * price"),
			Error::InsufficientFundsForTransfer => {
				write!(f, "insufficient funds for transfer")
			}
			Error::GasLimitReached => write!(f, "gas limit reached"),
			Error::IntrinsicGas => write!(f, "intrinsic gas too low"),
			Error::GasUintOverflow => write!(f, "gas uint64 overflow"),
		}
	}
}

impl std::error::Error for Error {}

/// One message to apply against state: a transaction stripped of its
/// signature plumbing.
#[derive(Clone, Debug)]
pub struct Message {
	pub from: H160,
	/// `None` requests contract creation.
	pub to: Option<H160>,
	pub nonce: u64,
	pub value: U256,
	pub gas_limit: u64,
	pub gas_price: U256,
	pub data: Vec<u8>,
	/// Mining and validation check the nonce; some simulation callers
	/// deliberately do not.
	pub check_nonce: bool,
}

/// Outcome of an applied (included) message. `exit` distinguishes success,
/// revert and failure; gas in `used_gas` has been charged in every case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
	pub used_gas: u64,
	pub exit: ExitReason,
	pub return_data: Vec<u8>,
}

impl ExecutionResult {
	#[must_use]
	pub fn failed(&self) -> bool {
		!self.exit.is_succeed()
	}

	/// Return data of a successful execution, empty otherwise.
	#[must_use]
	pub fn return_value(&self) -> &[u8] {
		if self.exit.is_succeed() {
			&self.return_data
		} else {
			&[]
		}
	}

	/// Revert payload, present only when execution ended in a revert.
	#[must_use]
	pub fn revert_reason(&self) -> Option<&[u8]> {
		if self.exit.is_revert() {
			Some(&self.return_data)
		} else {
			None
		}
	}
}

/// Fixed minimum cost of including a message, independent of execution.
pub fn intrinsic_gas(
	data: &[u8],
	contract_creation: bool,
	is_homestead: bool,
	is_istanbul: bool,
) -> Result<u64, Error> {
	let mut gas = if contract_creation && is_homestead {
		G_TRANSACTION_CREATE
	} else {
		G_TRANSACTION
	};

	if !data.is_empty() {
		let nonzero = data.iter().filter(|byte| **byte != 0).count() as u64;
		let nonzero_gas = if is_istanbul {
			G_TXDATA_NONZERO_EIP2028
		} else {
			G_TXDATA_NONZERO_FRONTIER
		};
		if (u64::MAX - gas) / nonzero_gas < nonzero {
			return Err(Error::GasUintOverflow);
		}
		gas += nonzero * nonzero_gas;

		let zero = data.len() as u64 - nonzero;
		if (u64::MAX - gas) / G_TXDATA_ZERO < zero {
			return Err(Error::GasUintOverflow);
		}
		gas += zero * G_TXDATA_ZERO;
	}
	Ok(gas)
}

/// Applies one message end to end: pre-checks, gas purchase, intrinsic gas,
/// dispatch into the interpreter, refund settlement and fee payment.
pub struct StateTransition<'a, 'b> {
	evm: &'a mut Evm<'b>,
	msg: &'a Message,
	pool: &'a mut GasPool,
	gas: u64,
	initial_gas: u64,
}

/// Apply `msg` against the state behind `evm`, drawing the gas limit from
/// `pool`. `Err` means the message was rejected outright and must not be
/// included in a block; `Ok` carries the execution outcome with gas fully
/// accounted either way.
pub fn apply_message(
	evm: &mut Evm<'_>,
	msg: &Message,
	pool: &mut GasPool,
) -> Result<ExecutionResult, Error> {
	StateTransition::new(evm, msg, pool).transition()
}

impl<'a, 'b> StateTransition<'a, 'b> {
	pub fn new(evm: &'a mut Evm<'b>, msg: &'a Message, pool: &'a mut GasPool) -> Self {
		Self {
			evm,
			msg,
			pool,
			gas: 0,
			initial_gas: 0,
		}
	}

	fn gas_used(&self) -> u64 {
		self.initial_gas - self.gas
	}

	fn buy_gas(&mut self) -> Result<(), Error> {
		let cost = U256::from(self.msg.gas_limit)
			.checked_mul(self.msg.gas_price)
			.ok_or(Error::GasUintOverflow)?;
		if self.evm.state.balance(self.msg.from) < cost {
			return Err(Error::InsufficientFunds);
		}
		self.pool.sub_gas(self.msg.gas_limit)?;
		self.gas = self.msg.gas_limit;
		self.initial_gas = self.msg.gas_limit;
		self.evm.state.sub_balance(self.msg.from, cost);
		Ok(())
	}

	fn pre_check(&mut self) -> Result<(), Error> {
		if self.msg.check_nonce {
			let state_nonce = self.evm.state.nonce(self.msg.from);
			if state_nonce < self.msg.nonce {
				return Err(Error::NonceTooHigh);
			} else if state_nonce > self.msg.nonce {
				return Err(Error::NonceTooLow);
			}
		}
		self.buy_gas()
	}

	/// Pre-checks plus intrinsic gas and the top-level value check: the four
	/// steps that may still reject the message.
	fn check_and_buy(&mut self) -> Result<(), Error> {
		self.pre_check()?;

		let contract_creation = self.msg.to.is_none();
		let upgrade = self.evm.upgrade;

		let intrinsic = intrinsic_gas(
			&self.msg.data,
			contract_creation,
			upgrade.is_homestead(),
			upgrade.is_istanbul(),
		)?;
		if self.gas < intrinsic {
			return Err(Error::IntrinsicGas);
		}
		self.gas -= intrinsic;

		if !self.msg.value.is_zero() && self.evm.state.balance(self.msg.from) < self.msg.value {
			return Err(Error::InsufficientFundsForTransfer);
		}
		Ok(())
	}

	/// The transition itself. Rejection can only happen before dispatch;
	/// once the interpreter runs, the transaction is included whatever
	/// happens inside it.
	pub fn transition(mut self) -> Result<ExecutionResult, Error> {
		self.evm.state.prepare();
		let checkpoint = self.evm.state.snapshot();

		match self.check_and_buy() {
			Ok(()) => {}
			Err(error) => {
				// A rejected message leaves no trace: undo the gas purchase
				// and give the reservation back to the block.
				self.evm.state.revert_to(checkpoint);
				self.pool.add_gas(self.initial_gas);
				debug!(target: "evm", "message from {:?} rejected: {}", self.msg.from, error);
				return Err(error);
			}
		}

		let contract_creation = self.msg.to.is_none();
		let upgrade = self.evm.upgrade;

		// Everything the access-list pricing considers reachable up front.
		if upgrade.is_berlin() {
			self.evm.state.mark_hot(self.msg.from, None);
			if let Some(to) = self.msg.to {
				self.evm.state.mark_hot(to, None);
			}
		}

		trace!(target: "evm", "applying message from {:?} gas {}", self.msg.from, self.gas);
		let (exit, return_data) = if contract_creation {
			let (exit, output, _, gas_left) = self.evm.create(
				self.msg.from,
				self.msg.data.clone(),
				self.gas,
				self.msg.value,
			);
			self.gas = gas_left;
			(exit, output)
		} else {
			let to = self.msg.to.unwrap_or_default();
			let next_nonce = self.evm.state.nonce(self.msg.from) + 1;
			self.evm.state.set_nonce(self.msg.from, next_nonce);
			let (exit, output, gas_left) = self.evm.call(
				self.msg.from,
				to,
				self.msg.data.clone(),
				self.gas,
				self.msg.value,
			);
			self.gas = gas_left;
			(exit, output)
		};

		self.refund_gas();
		let fee = U256::from(self.gas_used()) * self.msg.gas_price;
		let coinbase = self.evm.block.coinbase;
		self.evm.state.add_balance(coinbase, fee);

		Ok(ExecutionResult {
			used_gas: self.gas_used(),
			exit,
			return_data,
		})
	}

	/// Apply the refund counter, capped to half the gas used, then hand the
	/// remaining gas back to the sender and the block pool.
	fn refund_gas(&mut self) {
		let refund = core::cmp::min(self.gas_used() / 2, self.evm.state.refund());
		self.gas += refund;

		let remaining = U256::from(self.gas) * self.msg.gas_price;
		self.evm.state.add_balance(self.msg.from, remaining);

		self.pool.add_gas(self.gas);
	}
}
