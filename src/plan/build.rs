//! Plan items to unsigned transaction drafts

use super::PlanItem;
use crate::chain::ChainGateway;
use crate::config::ContractId;
use crate::contracts::{ContractRegistry, IAccounts, IElection, IGovernance, ILockedGold};
use crate::error::{ParysError, Result};
use crate::transaction::TxDraft;
use crate::types::EligibleGroupVotes;
use alloy::primitives::{Address, U256};

/// Neighbours `(lesser, greater)` of `target` in the eligible list once its
/// total moves by `weight` (added for votes, subtracted for revokes).
///
/// `eligible` must be sorted by votes descending. Missing neighbours are the
/// zero address.
pub fn find_lesser_and_greater(
    eligible: &[EligibleGroupVotes],
    target: Address,
    weight: U256,
    add: bool,
) -> (Address, Address) {
    let current = eligible
        .iter()
        .find(|g| g.group == target)
        .map(|g| g.votes)
        .unwrap_or_default();
    let total = if add {
        current + weight
    } else {
        current.saturating_sub(weight)
    };

    let mut lesser = Address::ZERO;
    let mut greater = Address::ZERO;
    for entry in eligible.iter().filter(|g| g.group != target) {
        if entry.votes <= total {
            lesser = entry.group;
            break;
        }
        greater = entry.group;
    }
    (lesser, greater)
}

/// Eligible groups with their total votes, sorted by votes descending
pub async fn eligible_group_votes<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
) -> Result<Vec<EligibleGroupVotes>> {
    let totals = contracts
        .get(ContractId::Election)
        .call(chain, &IElection::getTotalVotesForEligibleValidatorGroupsCall {})
        .await?;
    if totals.groups.len() != totals.values.len() {
        return Err(ParysError::ChainQuery(
            "Eligible groups and votes size mismatch".into(),
        ));
    }
    let mut eligible: Vec<EligibleGroupVotes> = totals
        .groups
        .into_iter()
        .zip(totals.values)
        .map(|(group, votes)| EligibleGroupVotes { group, votes })
        .collect();
    eligible.sort_by(|a, b| b.votes.cmp(&a.votes));
    Ok(eligible)
}

async fn voted_group_index<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    voter: Address,
    group: Address,
) -> Result<U256> {
    let groups = contracts
        .get(ContractId::Election)
        .call(chain, &IElection::getGroupsVotedForByAccountCall { account: voter })
        .await?;
    groups
        .iter()
        .position(|g| *g == group)
        .map(U256::from)
        .ok_or_else(|| ParysError::ChainQuery(format!("Account has not voted for group {group}")))
}

async fn dequeue_index<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    proposal_id: u64,
) -> Result<U256> {
    let dequeue = contracts
        .get(ContractId::Governance)
        .call(chain, &IGovernance::getDequeueCall {})
        .await?;
    let id = U256::from(proposal_id);
    dequeue
        .iter()
        .position(|p| *p == id)
        .map(U256::from)
        .ok_or_else(|| ParysError::ChainQuery("Proposal not found in dequeued list".into()))
}

/// Build the unsigned draft for one plan item.
///
/// Chain reads happen here rather than at planning time so that ordering
/// hints reflect the state left by the previous confirmed item.
pub async fn build_item_tx<C: ChainGateway>(
    item: &PlanItem,
    chain: &C,
    contracts: &ContractRegistry,
) -> Result<TxDraft> {
    let locked_gold = contracts.get(ContractId::LockedGold);
    let election = contracts.get(ContractId::Election);

    let draft = match item {
        PlanItem::RegisterAccount => contracts
            .get(ContractId::Accounts)
            .populate(&IAccounts::createAccountCall {}),
        PlanItem::Lock { amount } => locked_gold
            .populate(&ILockedGold::lockCall {})
            .with_value(*amount),
        PlanItem::Relock { pending, amount } => locked_gold.populate(&ILockedGold::relockCall {
            index: U256::from(pending.index),
            value: *amount,
        }),
        PlanItem::Unlock { amount } => {
            locked_gold.populate(&ILockedGold::unlockCall { value: *amount })
        }
        PlanItem::Withdraw { pending } => locked_gold.populate(&ILockedGold::withdrawCall {
            index: U256::from(pending.index),
        }),
        PlanItem::Vote { group, amount, .. } => {
            let eligible = eligible_group_votes(chain, contracts).await?;
            let (lesser, greater) = find_lesser_and_greater(&eligible, *group, *amount, true);
            election.populate(&IElection::voteCall {
                group: *group,
                value: *amount,
                lesser,
                greater,
            })
        }
        PlanItem::Activate { group, .. } => {
            election.populate(&IElection::activateCall { group: *group })
        }
        PlanItem::RevokePending {
            group,
            voter,
            amount,
        }
        | PlanItem::RevokeActive {
            group,
            voter,
            amount,
        } => {
            let (eligible, index) = tokio::try_join!(
                eligible_group_votes(chain, contracts),
                voted_group_index(chain, contracts, *voter, *group),
            )?;
            let (lesser, greater) = find_lesser_and_greater(&eligible, *group, *amount, false);
            if matches!(item, PlanItem::RevokePending { .. }) {
                election.populate(&IElection::revokePendingCall {
                    group: *group,
                    value: *amount,
                    lesser,
                    greater,
                    index,
                })
            } else {
                election.populate(&IElection::revokeActiveCall {
                    group: *group,
                    value: *amount,
                    lesser,
                    greater,
                    index,
                })
            }
        }
        PlanItem::GovernanceVote { proposal_id, value } => {
            let index = dequeue_index(chain, contracts, *proposal_id).await?;
            contracts
                .get(ContractId::Governance)
                .populate(&IGovernance::voteCall {
                    proposalId: U256::from(*proposal_id),
                    index,
                    value: value.as_u8(),
                })
        }
    };

    tracing::debug!(tx_type = ?item.tx_type(), to = ?draft.to, "Built plan item draft");
    Ok(draft)
}
