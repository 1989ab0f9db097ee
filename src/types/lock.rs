//! Locking types for user-facing API

use crate::amount::u256_decimal;
use crate::fees::FeeEstimate;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// An unlock request awaiting its maturity delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWithdrawal {
    /// Position in the on-chain pending withdrawal array
    pub index: u64,
    #[serde(with = "u256_decimal")]
    pub value: U256,
    /// Unix milliseconds after which the value can be withdrawn
    pub timestamp: u64,
}

impl PendingWithdrawal {
    pub fn is_mature(&self, now_ms: u64) -> bool {
        self.timestamp <= now_ms
    }
}

/// Lock-family user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockActionType {
    Lock,
    Unlock,
    Withdraw,
}

/// Parameters for a lock, unlock or withdraw request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTokenParams {
    pub action: LockActionType,
    /// Requested amount in wei
    pub amount: U256,
    /// One estimate per planned transaction
    pub fee_estimates: Option<Vec<FeeEstimate>>,
}

impl LockTokenParams {
    pub fn new(action: LockActionType, amount: U256) -> Self {
        Self {
            action,
            amount,
            fee_estimates: None,
        }
    }

    /// Lock `amount` wei, relocking pending withdrawals first
    pub fn lock(amount: U256) -> Self {
        Self::new(LockActionType::Lock, amount)
    }

    pub fn unlock(amount: U256) -> Self {
        Self::new(LockActionType::Unlock, amount)
    }

    pub fn withdraw(amount: U256) -> Self {
        Self::new(LockActionType::Withdraw, amount)
    }

    /// Attach fee estimates (one per plan item)
    pub fn with_fee_estimates(mut self, fee_estimates: Vec<FeeEstimate>) -> Self {
        self.fee_estimates = Some(fee_estimates);
        self
    }
}
