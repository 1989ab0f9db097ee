//! Wallet balances

use crate::amount::u256_decimal;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Locked token sub-balances of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedBalances {
    /// Currently locked (voting and non-voting)
    #[serde(with = "u256_decimal")]
    pub locked: U256,
    /// Pending withdrawals that have not matured yet
    #[serde(with = "u256_decimal")]
    pub pending_blocked: U256,
    /// Pending withdrawals that can be withdrawn now
    #[serde(with = "u256_decimal")]
    pub pending_free: U256,
}

impl LockedBalances {
    /// Sum of all pending withdrawals
    pub fn total_pending(&self) -> U256 {
        self.pending_blocked + self.pending_free
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_blocked.is_zero() || !self.pending_free.is_zero()
    }

    /// Locked plus pending
    pub fn total(&self) -> U256 {
        self.locked + self.total_pending()
    }
}

/// Token balances of an account, keyed by token address, plus locked sub-balances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balances {
    token_values: BTreeMap<Address, String>,
    pub locked: LockedBalances,
    /// Unix milliseconds of the last fetch, 0 when never fetched
    pub last_updated: u64,
}

impl Balances {
    /// Balances holding only locked funds, as tracked for a vote signer's main account
    pub fn with_locked(locked: LockedBalances, last_updated: u64) -> Self {
        Self {
            token_values: BTreeMap::new(),
            locked,
            last_updated,
        }
    }

    /// Balance of a token, zero when unknown
    pub fn token_balance(&self, token: Address) -> U256 {
        self.token_values
            .get(&token)
            .and_then(|v| U256::from_str_radix(v, 10).ok())
            .unwrap_or_default()
    }

    pub fn set_token_balance(&mut self, token: Address, value: U256) {
        self.token_values.insert(token, value.to_string());
    }

    /// Whether no balance has ever been recorded
    pub fn is_empty(&self) -> bool {
        self.token_values.is_empty() && self.last_updated == 0
    }

    pub fn tokens(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.token_values
            .keys()
            .map(|addr| (*addr, self.token_balance(*addr)))
    }

    /// Liquid native balance plus all pending withdrawals
    pub fn total_unlocked(&self, native: Address) -> U256 {
        self.token_balance(native) + self.locked.total_pending()
    }

    /// Liquid, locked and pending native balance
    pub fn total_native(&self, native: Address) -> U256 {
        self.token_balance(native) + self.locked.total()
    }
}
