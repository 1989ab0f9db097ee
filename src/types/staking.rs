//! Validator staking types

use crate::amount::u256_decimal;
use crate::fees::FeeEstimate;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Votes cast by one account for one validator group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVote {
    #[serde(with = "u256_decimal")]
    pub pending: U256,
    #[serde(with = "u256_decimal")]
    pub active: U256,
}

impl GroupVote {
    pub fn total(&self) -> U256 {
        self.pending + self.active
    }
}

/// Votes by group address
pub type GroupVotes = BTreeMap<Address, GroupVote>;

/// Eligible group and its total received votes, as returned by the election contract
/// (sorted by votes, descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibleGroupVotes {
    pub group: Address,
    pub votes: U256,
}

/// A validator group known to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorGroup {
    pub address: Address,
    pub name: String,
    #[serde(with = "u256_decimal")]
    pub votes: U256,
}

/// Staking user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeActionType {
    Vote,
    Activate,
    Revoke,
}

/// Parameters for a vote, activate or revoke request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeTokenParams {
    pub action: StakeActionType,
    /// Requested amount in wei
    pub amount: U256,
    pub group_address: Address,
    pub fee_estimates: Option<Vec<FeeEstimate>>,
}

impl StakeTokenParams {
    pub fn new(action: StakeActionType, amount: U256, group_address: Address) -> Self {
        Self {
            action,
            amount,
            group_address,
            fee_estimates: None,
        }
    }

    pub fn vote(amount: U256, group_address: Address) -> Self {
        Self::new(StakeActionType::Vote, amount, group_address)
    }

    pub fn activate(amount: U256, group_address: Address) -> Self {
        Self::new(StakeActionType::Activate, amount, group_address)
    }

    pub fn revoke(amount: U256, group_address: Address) -> Self {
        Self::new(StakeActionType::Revoke, amount, group_address)
    }

    pub fn with_fee_estimates(mut self, fee_estimates: Vec<FeeEstimate>) -> Self {
        self.fee_estimates = Some(fee_estimates);
        self
    }
}

/// Sum of all votes (pending and active) across groups
pub fn total_votes(votes: &GroupVotes) -> U256 {
    votes.values().fold(U256::ZERO, |acc, v| acc + v.total())
}
