//! End-to-end interpreter behavior over small hand-assembled programs.

use embervm::run::{self, Config};
use embervm::{
	BlockContext, Evm, ExitError, ExitReason, ExitSucceed, MemoryAccount, MemoryBackend, Opcode,
	TxContext, Upgrade,
};
use primitive_types::{H160, H256, U256};

fn addr(n: u8) -> H160 {
	H160::repeat_byte(n)
}

fn word(n: u64) -> Vec<u8> {
	let mut raw = [0u8; 32];
	U256::from(n).to_big_endian(&mut raw);
	raw.to_vec()
}

/// gas, target, value, in 0/0, out 0/0 -> CALL, then return the 32-byte
/// word at memory 0 (the pushed success bit is stored first).
fn call_and_return_flag(target: H160, gas: u16, value: u8) -> Vec<u8> {
	let mut code = vec![
		0x60, 0x00, // retSize
		0x60, 0x00, // retOffset
		0x60, 0x00, // inSize
		0x60, 0x00, // inOffset
		0x60, value, // value
		0x73, // PUSH20 target
	];
	code.extend_from_slice(target.as_bytes());
	code.extend_from_slice(&[
		0x61,
		(gas >> 8) as u8,
		(gas & 0xff) as u8, // PUSH2 gas
		0xf1, // CALL
		0x60, 0x00, 0x52, // MSTORE flag at 0
		0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN mem[0..32]
	]);
	code
}

#[test]
fn add_and_return() {
	// PUSH1 2, PUSH1 3, ADD, MSTORE at 0, RETURN 32 bytes.
	let code = hex::decode("600260030160005260206000f3").unwrap();
	let (reason, output, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(output, word(5));
}

#[test]
fn jump_to_jumpdest_succeeds() {
	// PUSH1 4, JUMP, INVALID, JUMPDEST, STOP
	let code = vec![0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00];
	let (reason, _, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Stopped));
}

#[test]
fn jump_to_non_jumpdest_fails() {
	// PUSH1 3, JUMP, STOP
	let code = vec![0x60, 0x03, 0x56, 0x00];
	let (reason, output, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::InvalidJump));
	assert!(output.is_empty());
}

#[test]
fn jumpdest_inside_push_data_is_rejected() {
	// PUSH1 4, JUMP, PUSH1 0x5b: byte 4 looks like JUMPDEST but is data.
	let code = vec![0x60, 0x04, 0x56, 0x60, 0x5b];
	let (reason, _, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::InvalidJump));
}

#[test]
fn undefined_opcode_is_a_deterministic_error() {
	for byte in [0xef_u8, 0xfe, 0x21] {
		let (reason, _, _) = run::execute(vec![byte], Vec::new(), &Config::default());
		assert_eq!(
			reason,
			ExitReason::Error(ExitError::InvalidOpcode(Opcode(byte)))
		);
	}
}

#[test]
fn stack_underflow_halts_the_frame() {
	// ADD on an empty stack.
	let (reason, _, _) = run::execute(vec![0x01], Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::StackUnderflow));
}

#[test]
fn out_of_gas_on_first_opcode() {
	let cfg = Config {
		gas_limit: 2,
		..Config::default()
	};
	let (reason, _, _) = run::execute(vec![0x60, 0x01], Vec::new(), &cfg);
	assert_eq!(reason, ExitReason::Error(ExitError::OutOfGas));
}

#[test]
fn revert_keeps_its_payload() {
	// PUSH1 0x42, MSTORE at 0, REVERT 32 bytes.
	let code = hex::decode("604260005260206000fd").unwrap();
	let (reason, output, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Revert);
	assert_eq!(output, word(0x42));
}

#[test]
fn callee_receives_exactly_the_requested_gas() {
	// Callee stores GAS and returns it; with 5000 requested it observes
	// 5000 less the 2 the GAS opcode itself costs.
	let callee = vec![
		0x5a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3,
	];
	let target = addr(0xbb);
	let mut state = MemoryBackend::new();
	state.insert(
		target,
		MemoryAccount {
			code: callee,
			..Default::default()
		},
	);
	state.insert(
		run::contract_address(),
		MemoryAccount {
			code: {
				let mut code = vec![
					0x60, 0x20, // retSize
					0x60, 0x00, // retOffset
					0x60, 0x00, // inSize
					0x60, 0x00, // inOffset
					0x60, 0x00, // value
					0x73, // PUSH20
				];
				code.extend_from_slice(target.as_bytes());
				code.extend_from_slice(&[
					0x61, 0x13, 0x88, // PUSH2 5000
					0xf1, // CALL
					0x50, // POP the flag
					0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN mem[0..32]
				]);
				code
			},
			..Default::default()
		},
	);

	let cfg = Config {
		gas_limit: 1_000_000,
		..Config::default()
	};
	let (reason, output, _) = run::call(run::contract_address(), Vec::new(), &cfg, &mut state);
	assert!(reason.is_succeed());
	assert_eq!(output, word(5000 - 2));
}

#[test]
fn static_call_blocks_writes_in_the_callee() {
	// Callee tries SSTORE; caller STATICCALLs it and returns the flag.
	let writer = vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00];
	let target = addr(0xcc);

	let mut caller_code = vec![
		0x60, 0x00, // retSize
		0x60, 0x00, // retOffset
		0x60, 0x00, // inSize
		0x60, 0x00, // inOffset
		0x73, // PUSH20 target
	];
	caller_code.extend_from_slice(target.as_bytes());
	caller_code.extend_from_slice(&[
		0x62, 0x0f, 0x42, 0x40, // PUSH3 1_000_000
		0xfa, // STATICCALL
		0x60, 0x00, 0x52, // store flag
		0x60, 0x20, 0x60, 0x00, 0xf3,
	]);

	let mut state = MemoryBackend::new();
	state.insert(
		target,
		MemoryAccount {
			code: writer,
			..Default::default()
		},
	);
	state.insert(
		run::contract_address(),
		MemoryAccount {
			code: caller_code,
			..Default::default()
		},
	);

	let cfg = Config {
		gas_limit: 5_000_000,
		..Config::default()
	};
	let (reason, output, _) = run::call(run::contract_address(), Vec::new(), &cfg, &mut state);
	// The outer call succeeds; the inner one failed with write protection.
	assert!(reason.is_succeed());
	assert_eq!(output, word(0));
	assert_eq!(
		embervm::Backend::storage(&state, target, H256::zero()),
		H256::zero()
	);
}

#[test]
fn plain_call_writes_and_reports_success() {
	let writer = vec![0x60, 0x01, 0x60, 0x00, 0x55, 0x00];
	let target = addr(0xcd);
	let mut state = MemoryBackend::new();
	state.insert(
		target,
		MemoryAccount {
			code: writer,
			..Default::default()
		},
	);
	state.insert(
		run::contract_address(),
		MemoryAccount {
			code: call_and_return_flag(target, 0xffff, 0),
			..Default::default()
		},
	);

	let cfg = Config {
		gas_limit: 5_000_000,
		..Config::default()
	};
	let (reason, output, _) = run::call(run::contract_address(), Vec::new(), &cfg, &mut state);
	assert!(reason.is_succeed());
	assert_eq!(output, word(1));
	assert_eq!(
		embervm::Backend::storage(&state, target, H256::zero()),
		H256::from_low_u64_be(1)
	);
}

#[test]
fn returndatacopy_past_the_buffer_fails() {
	// No call made, so the return buffer is empty; copying one byte is out
	// of bounds.
	let code = vec![0x60, 0x01, 0x60, 0x00, 0x60, 0x00, 0x3e];
	let (reason, _, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::ReturnDataOutOfBounds));
}

#[test]
fn create_deploys_returned_code() {
	// Init code deploys the single byte 0xfe.
	let init = vec![
		0x60, 0xfe, 0x60, 0x00, 0x53, // MSTORE8 at 0
		0x60, 0x01, 0x60, 0x00, 0xf3, // RETURN 1 byte
	];
	let (reason, output, address, state) = run::create(init, &Config::default());
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(output, vec![0xfe]);
	assert_eq!(state.account(address).map(|a| a.code.clone()), Some(vec![0xfe]));
}

#[test]
fn subroutine_round_trip() {
	// PUSH1 4, JUMPSUB, STOP, BEGINSUB, RETURNSUB
	let code = vec![0x60, 0x04, 0x5e, 0x00, 0x5c, 0x5d];
	let (reason, _, _) = run::execute(code, Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Stopped));
}

#[test]
fn walking_into_beginsub_fails() {
	let (reason, _, _) = run::execute(vec![0x5c], Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::InvalidSubroutineEntry));
}

#[test]
fn returnsub_without_jumpsub_fails() {
	let (reason, _, _) = run::execute(vec![0x5d], Vec::new(), &Config::default());
	assert_eq!(reason, ExitReason::Error(ExitError::InvalidRetsub));
}

#[test]
fn subroutines_are_not_available_before_their_fork() {
	let cfg = Config {
		upgrade: Upgrade::Istanbul,
		..Config::default()
	};
	let (reason, _, _) = run::execute(vec![0x5c], Vec::new(), &cfg);
	assert_eq!(
		reason,
		ExitReason::Error(ExitError::InvalidOpcode(Opcode::BEGINSUB))
	);
}

/// Call `target` with an explicit gas allowance, then store the success
/// flag into storage slot 0 and stop.
fn call_and_store_flag(target: H160, gas: u32) -> Vec<u8> {
	let mut code = vec![
		0x60, 0x00, // retSize
		0x60, 0x00, // retOffset
		0x60, 0x00, // inSize
		0x60, 0x00, // inOffset
		0x60, 0x00, // value
		0x73, // PUSH20 target
	];
	code.extend_from_slice(target.as_bytes());
	code.push(0x63); // PUSH4 gas
	code.extend_from_slice(&gas.to_be_bytes());
	code.extend_from_slice(&[
		0xf1, // CALL
		0x60, 0x00, 0x55, // SSTORE flag into slot 0
		0x00, // STOP
	]);
	code
}

#[test]
fn out_of_gas_at_depth_five_is_contained() {
	// Contracts 1..=4 each call the next with a decreasing allowance so
	// every caller keeps enough to finish its own work; contract 5 spins
	// until its carve-out runs dry. The failure burns exactly depth 5's
	// grant, depth 4 records the failed flag, and nothing escapes upward.
	let mut state = MemoryBackend::new();

	// JUMPDEST, PUSH1 0, JUMP: spins forever.
	state.insert(
		addr(5),
		MemoryAccount {
			code: vec![0x5b, 0x60, 0x00, 0x56],
			..Default::default()
		},
	);
	let grants = [200_000u32, 150_000, 100_000, 50_000];
	for n in 1..=4u8 {
		state.insert(
			addr(n),
			MemoryAccount {
				code: call_and_store_flag(addr(n + 1), grants[n as usize - 1]),
				..Default::default()
			},
		);
	}

	let cfg = Config {
		gas_limit: 400_000,
		..Config::default()
	};
	let (reason, _, gas_left) = run::call(addr(1), Vec::new(), &cfg, &mut state);
	assert!(reason.is_succeed());
	// Depths 1..=3 saw success, depth 4 saw the failure.
	for n in 1..=3u8 {
		assert_eq!(
			embervm::Backend::storage(&state, addr(n), H256::zero()),
			H256::from_low_u64_be(1)
		);
	}
	assert_eq!(
		embervm::Backend::storage(&state, addr(4), H256::zero()),
		H256::zero()
	);
	// Depth 5's whole grant was consumed even though nothing succeeded.
	assert!(cfg.gas_limit - gas_left > 50_000);
}

#[test]
fn call_depth_limit_fails_the_nested_call_only() {
	// A self-recursive contract forwarding a large fixed allowance only
	// stops because of the frame-depth bound; the outermost call still
	// succeeds. Runs on its own thread since a 1024-deep interpreter
	// recursion outgrows the default test stack.
	let handle = std::thread::Builder::new()
		.stack_size(32 * 1024 * 1024)
		.spawn(|| {
			let target = run::contract_address();
			// Like call_and_return_flag but with an 8-byte gas request so
			// the forwarded amount stays high all the way down.
			let mut code = vec![
				0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // ret/in regions
				0x60, 0x00, // value
				0x73, // PUSH20 target
			];
			code.extend_from_slice(target.as_bytes());
			code.push(0x67); // PUSH8 gas
			code.extend_from_slice(&0x0000_0002_0000_0000u64.to_be_bytes());
			code.extend_from_slice(&[
				0xf1, // CALL
				0x60, 0x00, 0x52, // MSTORE flag
				0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN
			]);
			let mut state = MemoryBackend::new();
			state.insert(
				target,
				MemoryAccount {
					code,
					..Default::default()
				},
			);

			let cfg = Config {
				gas_limit: u64::MAX / 2,
				..Config::default()
			};
			let (reason, _, _) = run::call(target, Vec::new(), &cfg, &mut state);
			assert!(reason.is_succeed());
		})
		.unwrap();
	handle.join().unwrap();
}

#[test]
fn memory_charge_is_for_the_delta() {
	// Touch memory at 32 words, then at 4096 words, and compare against a
	// single straight expansion to 4096 words; identical gas must remain.
	fn spent(code: Vec<u8>) -> u64 {
		let mut state = MemoryBackend::new();
		state.insert(
			run::contract_address(),
			MemoryAccount {
				code,
				..Default::default()
			},
		);
		let cfg = Config {
			gas_limit: 1_000_000,
			..Config::default()
		};
		let (reason, _, gas_left) =
			run::call(run::contract_address(), Vec::new(), &cfg, &mut state);
		assert!(reason.is_succeed());
		cfg.gas_limit - gas_left
	}

	// MLOAD at byte 992 (32 words), then MLOAD at byte 131040 (4096 words).
	let stepped = spent(vec![
		0x61, 0x03, 0xe0, 0x51, 0x50, // MLOAD 992, POP
		0x62, 0x01, 0xff, 0xe0, 0x51, 0x50, // MLOAD 131040, POP
	]);
	// Same again with an extra pair of cheap ops to equalize the static
	// costs: MLOAD 131040 twice.
	let direct = spent(vec![
		0x62, 0x01, 0xff, 0xe0, 0x51, 0x50, // MLOAD 131040, POP
		0x62, 0x01, 0xff, 0xe0, 0x51, 0x50, // MLOAD 131040, POP
	]);
	// The stepped run pays PUSH2 vs PUSH3 once (same 3 gas) and the same
	// total expansion; only the first program pays for 32 words it later
	// grows past.
	assert_eq!(stepped, direct);
}

#[test]
fn evm_runs_against_any_backend_reference() {
	// The engine takes its backend as a trait object; driving it directly
	// (without the harness) exercises the same path the node does.
	let mut state = MemoryBackend::new();
	state.insert(
		addr(0xaa),
		MemoryAccount {
			code: vec![0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3],
			..Default::default()
		},
	);
	let block = BlockContext {
		number: U256::from(1),
		timestamp: U256::from(1_600_000_000u64),
		coinbase: addr(0xc0),
		difficulty: U256::from(1000),
		gas_limit: 10_000_000,
		chain_id: U256::one(),
	};
	let tx = TxContext {
		origin: addr(0x01),
		gas_price: U256::one(),
	};
	let mut evm = Evm::new(block, tx, Upgrade::Istanbul, &mut state);
	let (reason, output, gas_left) =
		evm.call(addr(0x01), addr(0xaa), Vec::new(), 100_000, U256::zero());
	assert!(reason.is_succeed());
	assert_eq!(output, word(42));
	assert!(gas_left < 100_000);
}
