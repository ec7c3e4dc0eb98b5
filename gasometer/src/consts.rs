//! Gas schedule constants. Per-upgrade variants carry the upgrade in their
//! name; the jump-table builders pick the right one at construction time so
//! no cost is ever selected at run time.

/// `STOP`, and anything else that is free.
pub const G_ZERO: u64 = 0;
/// Quick-step operations (`ADDRESS`, `PC`, ...).
pub const G_BASE: u64 = 2;
/// Fastest-step operations (`ADD`, `LT`, `PUSH`, ...).
pub const G_VERYLOW: u64 = 3;
/// Fast-step operations (`MUL`, `DIV`, ...).
pub const G_LOW: u64 = 5;
/// Mid-step operations (`ADDMOD`, `JUMP`, ...).
pub const G_MID: u64 = 8;
/// Slow-step operations (`JUMPI`).
pub const G_HIGH: u64 = 10;
/// `JUMPDEST` marker.
pub const G_JUMPDEST: u64 = 1;
/// `BLOCKHASH`.
pub const G_BLOCKHASH: u64 = 20;

/// `SHA3` base.
pub const G_SHA3: u64 = 30;
/// `SHA3` and `CREATE2` per 32-byte word of hashed data.
pub const G_SHA3WORD: u64 = 6;
/// Copy opcodes, per 32-byte word copied.
pub const G_COPY: u64 = 3;

/// Linear coefficient of the memory expansion cost.
pub const G_MEMORY: u64 = 3;
/// Divisor of the quadratic coefficient of the memory expansion cost.
pub const QUAD_COEFF_DIV: u64 = 512;

/// `LOGn` flat cost.
pub const G_LOG: u64 = 375;
/// `LOGn` per-topic cost.
pub const G_LOGTOPIC: u64 = 375;
/// `LOGn` per-byte cost of logged data.
pub const G_LOGDATA: u64 = 8;

/// `EXP` base.
pub const G_EXP: u64 = 10;
/// `EXP` per exponent byte, until Spurious Dragon.
pub const G_EXPBYTE_FRONTIER: u64 = 10;
/// `EXP` per exponent byte, from Spurious Dragon.
pub const G_EXPBYTE_EIP160: u64 = 50;

pub const G_BALANCE_FRONTIER: u64 = 20;
pub const G_BALANCE_EIP150: u64 = 400;
pub const G_BALANCE_EIP1884: u64 = 700;

pub const G_EXTCODESIZE_FRONTIER: u64 = 20;
pub const G_EXTCODESIZE_EIP150: u64 = 700;

pub const G_EXTCODECOPY_FRONTIER: u64 = 20;
pub const G_EXTCODECOPY_EIP150: u64 = 700;

pub const G_EXTCODEHASH_CONSTANTINOPLE: u64 = 400;
pub const G_EXTCODEHASH_EIP1884: u64 = 700;

pub const G_SLOAD_FRONTIER: u64 = 50;
pub const G_SLOAD_EIP150: u64 = 200;
pub const G_SLOAD_EIP1884: u64 = 800;

pub const G_CALL_FRONTIER: u64 = 40;
pub const G_CALL_EIP150: u64 = 700;
/// Surcharge when a call transfers value.
pub const G_CALLVALUE: u64 = 9000;
/// Gas granted on top of the forwarded amount to a value-bearing callee.
pub const G_CALLSTIPEND: u64 = 2300;
/// Surcharge when a call or selfdestruct conjures a new account.
pub const G_NEWACCOUNT: u64 = 25000;

/// `SELFDESTRUCT` base cost, from Tangerine Whistle.
pub const G_SELFDESTRUCT_EIP150: u64 = 5000;
/// Refund for the first `SELFDESTRUCT` of an account in a transaction.
pub const R_SELFDESTRUCT: u64 = 24000;

/// `CREATE` base cost.
pub const G_CREATE: u64 = 32000;
/// Per-byte cost of storing deployed code.
pub const G_CODEDEPOSIT: u64 = 200;
/// Deployed-code size cap, from Spurious Dragon.
pub const MAX_CODE_SIZE: usize = 24576;

// Legacy SSTORE schedule.
pub const G_SSTORE_SET: u64 = 20000;
pub const G_SSTORE_RESET: u64 = 5000;
pub const R_SSTORE_CLEAR: u64 = 15000;

// Net-metered SSTORE schedule (Constantinople).
pub const NET_SSTORE_NOOP: u64 = 200;
pub const NET_SSTORE_INIT: u64 = 20000;
pub const NET_SSTORE_CLEAN: u64 = 5000;
pub const NET_SSTORE_DIRTY: u64 = 200;
pub const NET_SSTORE_CLEAR_REFUND: u64 = 15000;
pub const NET_SSTORE_RESET_REFUND: u64 = 4800;
pub const NET_SSTORE_RESET_CLEAR_REFUND: u64 = 19800;

// Rebalanced net-metered SSTORE schedule (Istanbul).
pub const SSTORE_SENTRY_EIP2200: u64 = 2300;
pub const SSTORE_SET_EIP2200: u64 = 20000;
pub const SSTORE_RESET_EIP2200: u64 = 5000;
pub const SLOAD_EIP2200: u64 = 800;
pub const SSTORE_CLEARS_REFUND_EIP2200: u64 = 15000;

// Warm/cold access schedule (Berlin).
pub const COLD_ACCOUNT_ACCESS_EIP2929: u64 = 2600;
pub const COLD_SLOAD_EIP2929: u64 = 2100;
pub const WARM_STORAGE_READ_EIP2929: u64 = 100;

// Intrinsic transaction costs.
pub const G_TRANSACTION: u64 = 21000;
pub const G_TRANSACTION_CREATE: u64 = 53000;
pub const G_TXDATA_ZERO: u64 = 4;
pub const G_TXDATA_NONZERO_FRONTIER: u64 = 68;
pub const G_TXDATA_NONZERO_EIP2028: u64 = 16;
