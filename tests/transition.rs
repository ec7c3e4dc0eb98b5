//! State-transition behavior: the rejection conditions, gas purchase and
//! settlement, refunds, and the failure containment rules.

use embervm::gasometer::consts::{G_TRANSACTION, G_TRANSACTION_CREATE};
use embervm::{
	apply_message, create_address, intrinsic_gas, Backend, BlockContext, Error, Evm, ExitError,
	ExitReason, GasPool, MemoryAccount, MemoryBackend, Message, TxContext, Upgrade,
};
use primitive_types::{H160, H256, U256};

fn addr(n: u8) -> H160 {
	H160::repeat_byte(n)
}

fn coinbase() -> H160 {
	addr(0xc0)
}

fn block() -> BlockContext {
	BlockContext {
		number: U256::from(100),
		timestamp: U256::from(1_600_000_000u64),
		coinbase: coinbase(),
		difficulty: U256::from(1_000_000),
		gas_limit: 8_000_000,
		chain_id: U256::one(),
	}
}

fn message(to: Option<H160>, value: u64, gas_limit: u64, data: Vec<u8>) -> Message {
	Message {
		from: addr(0x01),
		to,
		nonce: 0,
		value: U256::from(value),
		gas_limit,
		gas_price: U256::one(),
		data,
		check_nonce: true,
	}
}

fn funded_state(balance: u64) -> MemoryBackend {
	let mut state = MemoryBackend::new();
	state.insert(
		addr(0x01),
		MemoryAccount {
			balance: U256::from(balance),
			..Default::default()
		},
	);
	state
}

fn apply(
	state: &mut MemoryBackend,
	upgrade: Upgrade,
	msg: &Message,
	pool: &mut GasPool,
) -> Result<embervm::ExecutionResult, Error> {
	let tx = TxContext {
		origin: msg.from,
		gas_price: msg.gas_price,
	};
	let mut evm = Evm::new(block(), tx, upgrade, state);
	apply_message(&mut evm, msg, pool)
}

#[test]
fn plain_transfer_settles_every_party() {
	let mut state = funded_state(1_000_000);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 1_000, 50_000, Vec::new());

	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert!(!result.failed());
	assert_eq!(result.used_gas, G_TRANSACTION);

	assert_eq!(
		Backend::balance(&state, addr(0x01)),
		U256::from(1_000_000 - 1_000 - 21_000)
	);
	assert_eq!(Backend::balance(&state, addr(0x02)), U256::from(1_000));
	assert_eq!(Backend::balance(&state, coinbase()), U256::from(21_000));
	assert_eq!(Backend::nonce(&state, addr(0x01)), 1);
	assert_eq!(pool.gas(), 8_000_000 - 21_000);
}

#[test]
fn nonce_mismatch_rejects_without_any_charge() {
	let mut state = funded_state(1_000_000);
	let mut pool = GasPool::new(8_000_000);

	let mut msg = message(Some(addr(0x02)), 0, 50_000, Vec::new());
	msg.nonce = 5;
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::NonceTooHigh)
	);

	let mut state2 = funded_state(1_000_000);
	state2.insert(
		addr(0x01),
		MemoryAccount {
			balance: U256::from(1_000_000),
			nonce: 9,
			..Default::default()
		},
	);
	let msg = message(Some(addr(0x02)), 0, 50_000, Vec::new());
	assert_eq!(
		apply(&mut state2, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::NonceTooLow)
	);

	// Round trip: balance, nonce and the pool are untouched.
	assert_eq!(Backend::balance(&state, addr(0x01)), U256::from(1_000_000));
	assert_eq!(Backend::nonce(&state, addr(0x01)), 0);
	assert_eq!(pool.gas(), 8_000_000);
}

#[test]
fn unpayable_gas_rejects() {
	let mut state = funded_state(100);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 0, 21_000, Vec::new());
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::InsufficientFunds)
	);
	assert_eq!(Backend::balance(&state, addr(0x01)), U256::from(100));
}

#[test]
fn intrinsic_gas_above_limit_rejects_and_refunds_the_purchase() {
	let mut state = funded_state(1_000_000);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 0, 20_000, Vec::new());
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::IntrinsicGas)
	);
	// The gas purchase was unwound along with the pool reservation.
	assert_eq!(Backend::balance(&state, addr(0x01)), U256::from(1_000_000));
	assert_eq!(pool.gas(), 8_000_000);
	assert_eq!(Backend::nonce(&state, addr(0x01)), 0);
}

#[test]
fn value_beyond_balance_rejects_after_gas_purchase() {
	// Balance covers gas but not gas plus value; the purchase must be
	// rolled back in full.
	let mut state = funded_state(30_000);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 20_000, 21_000, Vec::new());
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::InsufficientFundsForTransfer)
	);
	assert_eq!(Backend::balance(&state, addr(0x01)), U256::from(30_000));
	assert_eq!(Backend::balance(&state, addr(0x02)), U256::zero());
	assert_eq!(pool.gas(), 8_000_000);
}

#[test]
fn block_pool_exhaustion_rejects() {
	let mut state = funded_state(1_000_000);
	let mut pool = GasPool::new(10_000);
	let msg = message(Some(addr(0x02)), 0, 21_000, Vec::new());
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg, &mut pool),
		Err(Error::GasLimitReached)
	);
	assert_eq!(pool.gas(), 10_000);
}

#[test]
fn pool_is_shared_across_a_block() {
	let mut state = funded_state(10_000_000);
	let mut pool = GasPool::new(50_000);

	let msg = message(Some(addr(0x02)), 0, 21_000, Vec::new());
	apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert_eq!(pool.gas(), 50_000 - 21_000);

	let mut msg2 = message(Some(addr(0x02)), 0, 21_000, Vec::new());
	msg2.nonce = 1;
	apply(&mut state, Upgrade::Istanbul, &msg2, &mut pool).unwrap();
	assert_eq!(pool.gas(), 50_000 - 42_000);

	let mut msg3 = message(Some(addr(0x02)), 0, 21_000, Vec::new());
	msg3.nonce = 2;
	assert_eq!(
		apply(&mut state, Upgrade::Istanbul, &msg3, &mut pool),
		Err(Error::GasLimitReached)
	);
}

#[test]
fn intrinsic_gas_schedule() {
	// A plain transfer with no data, oldest rules: the base constant and
	// nothing else.
	assert_eq!(intrinsic_gas(&[], false, false, false), Ok(G_TRANSACTION));
	// Creation costs more only from the create-pricing upgrade on.
	assert_eq!(intrinsic_gas(&[], true, false, false), Ok(G_TRANSACTION));
	assert_eq!(
		intrinsic_gas(&[], true, true, false),
		Ok(G_TRANSACTION_CREATE)
	);
	// Zero bytes are cheaper than nonzero bytes, and the nonzero rate
	// drops with the calldata repricing.
	assert_eq!(
		intrinsic_gas(&[0, 1, 2], false, true, false),
		Ok(G_TRANSACTION + 4 + 68 * 2)
	);
	assert_eq!(
		intrinsic_gas(&[0, 1, 2], false, true, true),
		Ok(G_TRANSACTION + 4 + 16 * 2)
	);
}

#[test]
fn refund_is_capped_at_half_the_gas_used() {
	// Clearing a live slot earns a 15000 refund under the rebalanced
	// schedule, more than half of what this tiny transaction burns.
	let mut state = funded_state(1_000_000);
	state.insert(
		addr(0x02),
		MemoryAccount {
			// PUSH1 0 (value), PUSH1 1 (key), SSTORE, STOP
			code: vec![0x60, 0x00, 0x60, 0x01, 0x55, 0x00],
			storage: [(H256::from_low_u64_be(1), H256::from_low_u64_be(5))]
				.into_iter()
				.collect(),
			..Default::default()
		},
	);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 0, 100_000, Vec::new());

	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert!(!result.failed());

	// 21000 intrinsic + two pushes + the 5000 clearing write, then half
	// of it back: the refund cap binds, not the 15000 counter.
	let burned = 21_000 + 3 + 3 + 5_000;
	assert_eq!(result.used_gas, burned - burned / 2);
	assert_eq!(
		Backend::storage(&state, addr(0x02), H256::from_low_u64_be(1)),
		H256::zero()
	);
}

#[test]
fn revert_unwinds_writes_but_charges_gas_and_nonce() {
	let mut state = funded_state(1_000_000);
	state.insert(
		addr(0x02),
		MemoryAccount {
			// slot1 = 1, slot2 = 2, then REVERT with empty payload.
			code: vec![
				0x60, 0x01, 0x60, 0x01, 0x55, // SSTORE slot1
				0x60, 0x02, 0x60, 0x02, 0x55, // SSTORE slot2
				0x60, 0x00, 0x60, 0x00, 0xfd, // REVERT
			],
			..Default::default()
		},
	);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 0, 100_000, Vec::new());

	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert_eq!(result.exit, ExitReason::Revert);
	assert!(result.failed());
	assert_eq!(result.revert_reason(), Some(&[] as &[u8]));

	// Both slots back at their pre-call values.
	assert_eq!(
		Backend::storage(&state, addr(0x02), H256::from_low_u64_be(1)),
		H256::zero()
	);
	assert_eq!(
		Backend::storage(&state, addr(0x02), H256::from_low_u64_be(2)),
		H256::zero()
	);
	// The nonce advanced and the gas spent up to the revert is charged.
	assert_eq!(Backend::nonce(&state, addr(0x01)), 1);
	let executed = (3 + 3 + 20_000) * 2 + 3 + 3;
	assert_eq!(result.used_gas, 21_000 + executed);
	assert_eq!(
		Backend::balance(&state, addr(0x01)),
		U256::from(1_000_000 - 21_000 - executed)
	);
}

#[test]
fn execution_failure_consumes_the_whole_gas_limit() {
	let mut state = funded_state(1_000_000);
	state.insert(
		addr(0x02),
		MemoryAccount {
			code: vec![0xfe],
			..Default::default()
		},
	);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 0, 60_000, Vec::new());

	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert_eq!(
		result.exit,
		ExitReason::Error(ExitError::InvalidOpcode(embervm::Opcode(0xfe)))
	);
	assert_eq!(result.used_gas, 60_000);
	assert_eq!(Backend::balance(&state, coinbase()), U256::from(60_000));
	assert_eq!(
		Backend::balance(&state, addr(0x01)),
		U256::from(1_000_000 - 60_000)
	);
}

#[test]
fn create_message_deploys_at_the_derived_address() {
	let mut state = funded_state(1_000_000);
	let mut pool = GasPool::new(8_000_000);
	// Init code that deploys the single byte 0xfe.
	let init = vec![
		0x60, 0xfe, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3,
	];
	let msg = Message {
		to: None,
		data: init,
		..message(None, 0, 200_000, Vec::new())
	};

	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert!(!result.failed());

	let deployed = create_address(addr(0x01), 0);
	assert_eq!(Backend::code(&state, deployed), vec![0xfe]);
	assert_eq!(Backend::nonce(&state, addr(0x01)), 1);
	// Creation intrinsic gas plus execution and the code deposit.
	assert!(result.used_gas > G_TRANSACTION_CREATE);
}

#[test]
fn value_transfer_happens_inside_the_call() {
	let mut state = funded_state(100_000);
	let mut pool = GasPool::new(8_000_000);
	let msg = message(Some(addr(0x02)), 40_000, 30_000, Vec::new());

	// Balance covers value plus fees here, so the transfer goes through.
	let result = apply(&mut state, Upgrade::Istanbul, &msg, &mut pool).unwrap();
	assert!(!result.failed());
	assert_eq!(Backend::balance(&state, addr(0x02)), U256::from(40_000));
	assert_eq!(
		Backend::balance(&state, addr(0x01)),
		U256::from(100_000 - 40_000 - result.used_gas)
	);
}

#[test]
fn legacy_and_net_metered_sstore_price_the_same_write_differently() {
	// The same storage write costs 20000 under Petersburg's legacy rules
	// and 20000 under net metering too when the slot is fresh, but a
	// no-op write diverges: 5000 legacy vs 200 net-metered.
	let code = vec![0x60, 0x00, 0x60, 0x01, 0x55, 0x00]; // write 0 to empty slot 1

	for (upgrade, sstore_cost) in [
		(Upgrade::Petersburg, 5_000u64),
		(Upgrade::Constantinople, 200),
	] {
		let mut state = funded_state(1_000_000);
		state.insert(
			addr(0x02),
			MemoryAccount {
				code: code.clone(),
				..Default::default()
			},
		);
		let mut pool = GasPool::new(8_000_000);
		let msg = message(Some(addr(0x02)), 0, 100_000, Vec::new());
		let result = apply(&mut state, upgrade, &msg, &mut pool).unwrap();
		assert_eq!(
			result.used_gas,
			21_000 + 3 + 3 + sstore_cost,
			"{:?}",
			upgrade
		);
	}
}
