use primitive_types::{U256, U512};

use super::try_frame;
use crate::evm::Evm;
use crate::frame::Frame;
use crate::interpreter::Control;

#[inline]
fn is_negative(value: U256) -> bool {
	value.bit(255)
}

#[inline]
fn twos_complement(value: U256) -> U256 {
	(!value).overflowing_add(U256::one()).0
}

fn sdiv_values(a: U256, b: U256) -> U256 {
	if b.is_zero() {
		return U256::zero();
	}
	let negative = is_negative(a) != is_negative(b);
	let a_abs = if is_negative(a) { twos_complement(a) } else { a };
	let b_abs = if is_negative(b) { twos_complement(b) } else { b };
	let quotient = a_abs / b_abs;
	if negative {
		twos_complement(quotient)
	} else {
		quotient
	}
}

fn srem_values(a: U256, b: U256) -> U256 {
	if b.is_zero() {
		return U256::zero();
	}
	let a_abs = if is_negative(a) { twos_complement(a) } else { a };
	let b_abs = if is_negative(b) { twos_complement(b) } else { b };
	let remainder = a_abs % b_abs;
	// The result takes the sign of the dividend.
	if is_negative(a) {
		twos_complement(remainder)
	} else {
		remainder
	}
}

fn signextend_values(ext: U256, value: U256) -> U256 {
	if ext >= U256::from(32) {
		return value;
	}
	let bit_index = (ext.low_u64() * 8 + 7) as usize;
	let mask = (U256::one() << bit_index) - U256::one();
	if value.bit(bit_index) {
		value | !mask
	} else {
		value & mask
	}
}

macro_rules! op2 {
	($name:ident, |$a:ident, $b:ident| $body:expr) => {
		pub fn $name(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
			let $a = try_frame!(frame.stack.pop());
			let $b = try_frame!(frame.stack.pop());
			try_frame!(frame.stack.push($body));
			Control::Continue(1)
		}
	};
}

op2!(add, |a, b| a.overflowing_add(b).0);
op2!(mul, |a, b| a.overflowing_mul(b).0);
op2!(sub, |a, b| a.overflowing_sub(b).0);
op2!(div, |a, b| if b.is_zero() { U256::zero() } else { a / b });
op2!(sdiv, |a, b| sdiv_values(a, b));
op2!(rem, |a, b| if b.is_zero() { U256::zero() } else { a % b });
op2!(srem, |a, b| srem_values(a, b));
op2!(exp, |base, power| base.overflowing_pow(power).0);
op2!(signextend, |ext, value| signextend_values(ext, value));

pub fn addmod(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let a = try_frame!(frame.stack.pop());
	let b = try_frame!(frame.stack.pop());
	let modulus = try_frame!(frame.stack.pop());
	let result = if modulus.is_zero() {
		U256::zero()
	} else {
		let sum = U512::from(a) + U512::from(b);
		let rem = sum % U512::from(modulus);
		U256::try_from(rem).unwrap_or_default()
	};
	try_frame!(frame.stack.push(result));
	Control::Continue(1)
}

pub fn mulmod(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
	let a = try_frame!(frame.stack.pop());
	let b = try_frame!(frame.stack.pop());
	let modulus = try_frame!(frame.stack.pop());
	let result = if modulus.is_zero() {
		U256::zero()
	} else {
		let product = a.full_mul(b);
		let rem = product % U512::from(modulus);
		U256::try_from(rem).unwrap_or_default()
	};
	try_frame!(frame.stack.push(result));
	Control::Continue(1)
}
