//! Transaction plans for multi-step actions
//!
//! Planning is pure: given balances, pending withdrawals, registration status
//! and votes, each builder returns the ordered list of transactions an action
//! needs. Validation runs before planning; [`build`] turns items into drafts.

pub mod build;
pub mod governance;
pub mod lock;
pub mod stake;

pub use build::{build_item_tx, eligible_group_votes, find_lesser_and_greater};
pub use governance::{governance_vote_plan, validate_governance_vote};
pub use lock::{lock_plan, validate_lock};
pub use stake::{stake_plan, staking_max_amount, total_nonvoting_locked, validate_stake};

use crate::feed::{PlaceholderDetails, TransactionType};
use crate::types::{PendingWithdrawal, VoteValue};
use alloy::primitives::{Address, U256};

/// One on-chain transaction within an action's plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanItem {
    RegisterAccount,
    Lock {
        amount: U256,
    },
    Relock {
        pending: PendingWithdrawal,
        amount: U256,
    },
    Unlock {
        amount: U256,
    },
    Withdraw {
        pending: PendingWithdrawal,
    },
    Vote {
        group: Address,
        voter: Address,
        amount: U256,
    },
    Activate {
        group: Address,
        voter: Address,
        amount: U256,
    },
    RevokePending {
        group: Address,
        voter: Address,
        amount: U256,
    },
    RevokeActive {
        group: Address,
        voter: Address,
        amount: U256,
    },
    GovernanceVote {
        proposal_id: u64,
        value: VoteValue,
    },
}

impl PlanItem {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            Self::RegisterAccount => TransactionType::AccountRegistration,
            Self::Lock { .. } => TransactionType::LockParys,
            Self::Relock { .. } => TransactionType::RelockParys,
            Self::Unlock { .. } => TransactionType::UnlockParys,
            Self::Withdraw { .. } => TransactionType::WithdrawLockedParys,
            Self::Vote { .. } => TransactionType::ValidatorVoteParys,
            Self::Activate { .. } => TransactionType::ValidatorActivateParys,
            Self::RevokePending { .. } => TransactionType::ValidatorRevokePendingParys,
            Self::RevokeActive { .. } => TransactionType::ValidatorRevokeActiveParys,
            Self::GovernanceVote { .. } => TransactionType::GovernanceVote,
        }
    }

    /// Native token amount the item moves, zero for registration and governance votes
    pub fn amount(&self) -> U256 {
        match self {
            Self::RegisterAccount | Self::GovernanceVote { .. } => U256::ZERO,
            Self::Withdraw { pending } => pending.value,
            Self::Lock { amount }
            | Self::Relock { amount, .. }
            | Self::Unlock { amount }
            | Self::Vote { amount, .. }
            | Self::Activate { amount, .. }
            | Self::RevokePending { amount, .. }
            | Self::RevokeActive { amount, .. } => *amount,
        }
    }

    /// Kind-specific fields for the placeholder feed record
    pub fn details(&self) -> PlaceholderDetails {
        match self {
            Self::Vote { group, .. }
            | Self::Activate { group, .. }
            | Self::RevokePending { group, .. }
            | Self::RevokeActive { group, .. } => PlaceholderDetails::Stake {
                group_address: *group,
            },
            Self::GovernanceVote { proposal_id, value } => PlaceholderDetails::GovernanceVote {
                proposal_id: *proposal_id,
                vote: *value,
            },
            _ => PlaceholderDetails::None,
        }
    }
}

/// Sum of item amounts
pub fn plan_total(plan: &[PlanItem]) -> U256 {
    plan.iter().fold(U256::ZERO, |acc, item| acc + item.amount())
}
