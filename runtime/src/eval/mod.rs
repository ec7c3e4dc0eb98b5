//! Execution functions for every opcode, grouped by family. Each has the
//! uniform `ExecutionFn` signature and returns a `Control` describing what
//! the interpreter loop should do next. Gas and memory growth have already
//! been settled by the time any of these run.

pub mod arithmetic;
pub mod bitwise;
pub mod environment;
pub mod flow;
pub mod misc;
pub mod system;

use primitive_types::{H160, H256, U256};

/// Unwrap a stack operation inside an execution function, converting its
/// error into a frame failure.
macro_rules! try_frame {
	($e:expr) => {
		match $e {
			Ok(value) => value,
			Err(error) => return $crate::interpreter::Control::Fail(error),
		}
	};
}

pub(crate) use try_frame;

pub(crate) fn u256_to_h256(value: U256) -> H256 {
	let mut raw = H256::zero();
	value.to_big_endian(&mut raw.0);
	raw
}

pub(crate) fn u256_to_address(value: U256) -> H160 {
	H160::from(u256_to_h256(value))
}

pub(crate) fn address_to_u256(address: H160) -> U256 {
	U256::from_big_endian(address.as_bytes())
}

/// `size` bytes of `data` starting at `offset`, zero-padded past the end.
/// Offsets beyond the data read as all zeros.
pub(crate) fn get_data(data: &[u8], offset: U256, size: usize) -> Vec<u8> {
	let mut ret = vec![0u8; size];
	if size == 0 || offset > U256::from(usize::MAX) {
		return ret;
	}
	let offset = offset.as_usize();
	if offset >= data.len() {
		return ret;
	}
	let end = core::cmp::min(offset + size, data.len());
	ret[..end - offset].copy_from_slice(&data[offset..end]);
	ret
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn get_data_clamps_and_pads() {
		let data = [1u8, 2, 3, 4];
		assert_eq!(get_data(&data, U256::from(2), 4), vec![3, 4, 0, 0]);
		assert_eq!(get_data(&data, U256::from(10), 2), vec![0, 0]);
		assert_eq!(get_data(&data, U256::MAX, 2), vec![0, 0]);
	}

	#[test]
	fn address_word_round_trip() {
		let address = H160::repeat_byte(0xab);
		assert_eq!(u256_to_address(address_to_u256(address)), address);
	}
}
