use primitive_types::U256;

use super::try_frame;
use crate::evm::Evm;
use crate::frame::Frame;
use crate::interpreter::Control;

const SIGN_BIT: usize = 255;

#[inline]
fn is_negative(value: U256) -> bool {
	value.bit(SIGN_BIT)
}

fn bool_word(value: bool) -> U256 {
	if value {
		U256::one()
	} else {
		U256::zero()
	}
}

fn slt_values(a: U256, b: U256) -> bool {
	// Flipping the sign bit turns signed comparison into unsigned.
	let flip = U256::one() << SIGN_BIT;
	(a ^ flip) < (b ^ flip)
}

fn sar_values(shift: U256, value: U256) -> U256 {
	if shift >= U256::from(256) {
		return if is_negative(value) { U256::MAX } else { U256::zero() };
	}
	let shift = shift.as_u32() as usize;
	let shifted = value >> shift;
	if is_negative(value) && shift > 0 {
		// Fill the vacated high bits with ones.
		shifted | !(U256::MAX >> shift)
	} else {
		shifted
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

macro_rules! op1 {
	($name:ident, |$a:ident| $body:expr) => {
		pub fn $name(_evm: &mut Evm<'_>, frame: &mut Frame, _pc: usize) -> Control {
			let $a = try_frame!(frame.stack.pop());
			try_frame!(frame.stack.push($body));
			Control::Continue(1)
		}
	};
}

op2!(lt, |a, b| bool_word(a < b));
op2!(gt, |a, b| bool_word(a > b));
op2!(slt, |a, b| bool_word(slt_values(a, b)));
op2!(sgt, |a, b| bool_word(slt_values(b, a)));
op2!(eq, |a, b| bool_word(a == b));
op1!(iszero, |a| bool_word(a.is_zero()));
op2!(and, |a, b| a & b);
op2!(or, |a, b| a | b);
op2!(xor, |a, b| a ^ b);
op1!(not, |a| !a);

op2!(byte, |index, value| {
	if index >= U256::from(32) {
		U256::zero()
	} else {
		// Byte 0 is the most significant.
		U256::from(value.byte(31 - index.as_usize()))
	}
});

op2!(shl, |shift, value| {
	if shift >= U256::from(256) {
		U256::zero()
	} else {
		value << shift.as_u32() as usize
	}
});

op2!(shr, |shift, value| {
	if shift >= U256::from(256) {
		U256::zero()
	} else {
		value >> shift.as_u32() as usize
	}
});

op2!(sar, |shift, value| sar_values(shift, value));

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slt_orders_signed_values() {
		let minus_one = U256::MAX;
		assert!(slt_values(minus_one, U256::zero()));
		assert!(!slt_values(U256::zero(), minus_one));
		assert!(slt_values(U256::zero(), U256::one()));
	}

	#[test]
	fn sar_keeps_the_sign() {
		let minus_eight = (!U256::from(8u64)).overflowing_add(U256::one()).0;
		let minus_one = U256::MAX;
		assert_eq!(sar_values(U256::from(3), minus_eight), minus_one);
		assert_eq!(sar_values(U256::from(300), minus_eight), minus_one);
		assert_eq!(sar_values(U256::from(3), U256::from(16)), U256::from(2));
		assert_eq!(sar_values(U256::from(300), U256::from(16)), U256::zero());
	}
}
