use core::fmt;

use crate::transact::Error;

/// Remaining gas budget of one block. Created with the block's gas limit,
/// drawn down by each transaction's gas limit before it runs, and topped
/// back up with whatever the transaction did not use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GasPool(u64);

impl GasPool {
	#[must_use]
	pub fn new(gas: u64) -> Self {
		Self(gas)
	}

	/// Return gas to the pool.
	///
	/// # Panics
	/// Overflowing the counter means gas accounting is already corrupt, so
	/// this panics rather than continuing.
	pub fn add_gas(&mut self, amount: u64) -> &mut Self {
		self.0 = match self.0.checked_add(amount) {
			Some(total) => total,
			None => panic!("gas pool pushed above u64"),
		};
		self
	}

	/// Reserve gas from the pool; `GasLimitReached` when the block cannot
	/// fit the request.
	pub fn sub_gas(&mut self, amount: u64) -> Result<(), Error> {
		if self.0 < amount {
			return Err(Error::GasLimitReached);
		}
		self.0 -= amount;
		Ok(())
	}

	#[must_use]
	pub fn gas(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for GasPool {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sub_gas_never_goes_negative() {
		let mut pool = GasPool::new(100);
		assert!(pool.sub_gas(60).is_ok());
		assert_eq!(pool.sub_gas(50), Err(Error::GasLimitReached));
		assert_eq!(pool.gas(), 40);
	}

	#[test]
	fn returned_gas_is_available_again() {
		let mut pool = GasPool::new(100);
		pool.sub_gas(100).unwrap();
		pool.add_gas(30);
		assert!(pool.sub_gas(30).is_ok());
	}

	#[test]
	#[should_panic(expected = "gas pool pushed above u64")]
	fn overflowing_the_pool_panics() {
		let mut pool = GasPool::new(u64::MAX);
		pool.add_gas(1);
	}
}
