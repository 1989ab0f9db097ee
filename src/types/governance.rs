//! Governance types

use crate::fees::FeeEstimate;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A referendum vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteValue {
    None,
    Abstain,
    No,
    Yes,
}

impl VoteValue {
    /// Choices in the order of the governance contract's vote enum
    pub const ORDERED: [VoteValue; 4] = [Self::None, Self::Abstain, Self::No, Self::Yes];

    /// Contract-side numeric value
    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Abstain => 1,
            Self::No => 2,
            Self::Yes => 3,
        }
    }

    /// Whether this is a castable choice
    pub fn is_castable(self) -> bool {
        self != Self::None
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle stage of a governance proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStage {
    None,
    Queued,
    Approval,
    Referendum,
    Execution,
    Expiration,
}

impl ProposalStage {
    /// Stage from the governance contract's enum value
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::Queued,
            2 => Self::Approval,
            3 => Self::Referendum,
            4 => Self::Execution,
            5 => Self::Expiration,
            _ => return None,
        })
    }
}

/// A governance proposal known to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: u64,
    pub stage: ProposalStage,
}

/// Parameters for a governance vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceVoteParams {
    pub proposal_id: u64,
    pub value: VoteValue,
    pub fee_estimate: Option<FeeEstimate>,
}

impl GovernanceVoteParams {
    pub fn new(proposal_id: u64, value: VoteValue) -> Self {
        Self {
            proposal_id,
            value,
            fee_estimate: None,
        }
    }

    pub fn with_fee_estimate(mut self, fee_estimate: FeeEstimate) -> Self {
        self.fee_estimate = Some(fee_estimate);
        self
    }

    pub fn proposal_id_u256(&self) -> U256 {
        U256::from(self.proposal_id)
    }
}
