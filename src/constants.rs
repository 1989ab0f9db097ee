//! Constants and precision values for the PARYS SDK

use alloy::primitives::U256;

/// All native tokens use 18 decimals
pub const NATIVE_DECIMALS: u8 = 18;

/// Fixidity values (spreads, oracle medians) use 24 decimals
pub const FIXIDITY_DECIMALS: u8 = 24;

/// One whole token in wei (10^18)
pub const WEI_PER_UNIT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Fixidity representation of 1.0 (10^24)
pub const FIXIDITY_ONE: U256 = U256::from_limbs([2_003_764_205_206_896_640, 54_210, 0, 0]);

/// Amounts closer than this many whole tokens are treated as equal (rounding dust)
pub const MIN_DISPLAY_VALUE: &str = "0.001";

/// Smallest lock/relock/unlock item worth sending: 0.01 tokens
pub const MIN_LOCK_AMOUNT: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// Smallest vote/revoke/activate amount: 0.01 tokens
pub const MIN_VOTE_AMOUNT: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// Accounts must have more than this locked to vote: 0.01 tokens
pub const MIN_LOCKED_TO_VOTE: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// Maximum accepted exchange spread (10%)
pub const MAX_EXCHANGE_SPREAD: &str = "0.1";

/// Sanity ceiling for gas price: 20 gwei
pub const MAX_GAS_PRICE: U256 = U256::from_limbs([20_000_000_000, 0, 0, 0]);

/// Sanity ceiling for gas limit
pub const MAX_GAS_LIMIT: u64 = 10_000_000;

/// Sanity ceiling for a single fee: 1 token
pub const MAX_FEE_SIZE: U256 = WEI_PER_UNIT;

/// Gas price = network minimum × this
pub const GAS_PRICE_MULTIPLIER: u64 = 2;

/// Live estimates for fees paid in the native token are inflated by this factor
pub const NATIVE_GAS_MULTIPLIER: u64 = 2;

/// Estimates for fees paid in a stable token are inflated by this factor,
/// since paying in a non-native token adds internal transfer gas
pub const STABLE_TOKEN_GAS_MULTIPLIER: u64 = 5;

/// Exchange rates older than this must be refetched (ms)
pub const EXCHANGE_RATE_STALE_TIME: u64 = 15_000;

/// Balances older than this are refetched before planning (ms)
pub const BALANCE_STALE_TIME: u64 = 15_000;

/// Registration status older than this is refetched (ms)
pub const ACCOUNT_STATUS_STALE_TIME: u64 = 10 * 60 * 1000;

/// Default bound for waiting on a transaction receipt
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Receipt polling interval
pub const RECEIPT_POLL_INTERVAL_SECS: u64 = 2;

/// Minimum supported version of the PARYS Ledger app
pub const LEDGER_APP_MIN_VERSION: &str = "1.0.3";

/// Default BIP-44 derivation path for the first account
pub const DEFAULT_DERIVATION_PATH: &str = "44'/52752'/0'/0/0";

/// Attempts for a device call when the transport reports it is locked
pub const LEDGER_MAX_ATTEMPTS: usize = 3;

/// Pause between locked-device retries (ms)
pub const LEDGER_RETRY_DELAY_MS: u64 = 1_000;

/// Pause between historical log requests to the block explorer (ms)
pub const PAUSE_BETWEEN_FETCH_REQUESTS_MS: u64 = 250;

/// Approximate block time (seconds)
pub const BLOCK_TIME_SECS: u64 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limb_constants() {
        assert_eq!(WEI_PER_UNIT, U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(FIXIDITY_ONE, U256::from(10u64).pow(U256::from(24u64)));
        assert_eq!(MIN_LOCK_AMOUNT, WEI_PER_UNIT / U256::from(100u64));
        assert_eq!(MAX_GAS_PRICE, U256::from(20u64) * U256::from(1_000_000_000u64));
    }
}
