//! Instruction sets, the interpreter loop and the call engine of embervm.
//!
//! The pieces fit together the way the data flows: a [`JumpTable`] built for
//! one [`Upgrade`] maps opcode bytes to [`Operation`] descriptors; the
//! interpreter walks a [`Frame`]'s code consulting the table and the gas
//! functions; the [`Evm`] engine spins up nested frames for the call/create
//! family against a [`Backend`] state accessor.

mod backend;
mod context;
mod eips;
mod eval;
mod evm;
mod fork;
mod frame;
mod gas;
mod interpreter;
mod table;

pub use crate::backend::{Backend, Log};
pub use crate::context::{BlockContext, TxContext};
pub use crate::eips::{enable_eip, valid_eip, UnknownEip};
pub use crate::evm::{create2_address, create_address, Evm, CALL_STACK_LIMIT};
pub use crate::fork::Upgrade;
pub use crate::frame::Frame;
pub use crate::interpreter::Control;
pub use crate::table::{DynamicGasFn, ExecutionFn, JumpTable, MemorySizeFn, Operation};
