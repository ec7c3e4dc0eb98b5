use core::fmt;

use crate::Opcode;

/// How a call frame finished. `Revert` is distinct from `Error`: a reverting
/// frame keeps its return data and refunds its remaining gas to the caller,
/// an erroring frame forfeits both.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
	Succeed(ExitSucceed),
	Revert,
	Error(ExitError),
}

impl ExitReason {
	#[inline]
	pub fn is_succeed(&self) -> bool {
		matches!(self, ExitReason::Succeed(_))
	}

	#[inline]
	pub fn is_revert(&self) -> bool {
		matches!(self, ExitReason::Revert)
	}

	#[inline]
	pub fn is_error(&self) -> bool {
		matches!(self, ExitReason::Error(_))
	}
}

/// Successful halting conditions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitSucceed {
	/// Execution ran off the end of the code or hit `STOP`.
	Stopped,
	/// `RETURN` was executed.
	Returned,
	/// `SELFDESTRUCT` was executed.
	SelfDestructed,
}

impl From<ExitSucceed> for ExitReason {
	fn from(succeed: ExitSucceed) -> ExitReason {
		ExitReason::Succeed(succeed)
	}
}

/// Execution errors local to one call frame. Each maps to exactly one kind
/// so gas accounting stays deterministic across implementations; overflow
/// while computing a dynamic gas cost is its own kind and is charged as
/// out-of-gas.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitError {
	OutOfGas,
	/// A dynamic gas computation overflowed `u64`.
	GasUintOverflow,
	StackUnderflow,
	StackOverflow,
	/// Jump target is not a `JUMPDEST` on an instruction boundary.
	InvalidJump,
	/// The opcode is not defined in the active instruction set.
	InvalidOpcode(Opcode),
	CallDepthExceeded,
	/// Value transfer with insufficient caller balance.
	InsufficientBalance,
	/// State mutation attempted inside a static call.
	WriteProtection,
	ReturnDataOutOfBounds,
	/// `CREATE`/`CREATE2` target address already has code or a nonce.
	ContractAddressCollision,
	/// Deployed code exceeds the per-contract size cap.
	MaxCodeSizeExceeded,
	/// Not enough gas to pay the code deposit at the end of a create.
	CodeStoreOutOfGas,
	/// `BEGINSUB` reached by sequential execution.
	InvalidSubroutineEntry,
	/// `RETURNSUB` with an empty return stack.
	InvalidRetsub,
	ReturnStackExceeded,
}

impl From<ExitError> for ExitReason {
	fn from(error: ExitError) -> ExitReason {
		ExitReason::Error(error)
	}
}

impl fmt::Display for ExitError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ExitError::OutOfGas => write!(f, "out of gas"),
			ExitError::GasUintOverflow => write!(f, "gas uint64 overflow"),
			ExitError::StackUnderflow => write!(f, "stack underflow"),
			ExitError::StackOverflow => write!(f, "stack limit reached 1024"),
			ExitError::InvalidJump => write!(f, "invalid jump destination"),
			ExitError::InvalidOpcode(opcode) => write!(f, "invalid opcode {}", opcode),
			ExitError::CallDepthExceeded => write!(f, "max call depth exceeded"),
			ExitError::InsufficientBalance => write!(f, "insufficient balance for transfer"),
			ExitError::WriteProtection => write!(f, "write protection"),
			ExitError::ReturnDataOutOfBounds => write!(f, "return data out of bounds"),
			ExitError::ContractAddressCollision => write!(f, "contract address collision"),
			ExitError::MaxCodeSizeExceeded => write!(f, "max code size exceeded"),
			ExitError::CodeStoreOutOfGas => write!(f, "contract creation code storage out of gas"),
			ExitError::InvalidSubroutineEntry => write!(f, "invalid subroutine entry"),
			ExitError::InvalidRetsub => write!(f, "invalid retsub"),
			ExitError::ReturnStackExceeded => write!(f, "return stack limit reached"),
		}
	}
}
