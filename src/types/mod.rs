//! Account state and user-facing action parameter types

pub mod account;
pub mod balances;
pub mod governance;
pub mod lock;
pub mod staking;

pub use account::AccountStatus;
pub use balances::{Balances, LockedBalances};
pub use governance::{GovernanceVoteParams, Proposal, ProposalStage, VoteValue};
pub use lock::{LockActionType, LockTokenParams, PendingWithdrawal};
pub use staking::{
    total_votes, EligibleGroupVotes, GroupVote, GroupVotes, StakeActionType, StakeTokenParams,
    ValidatorGroup,
};
