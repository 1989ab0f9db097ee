//! Validator staking planning: vote, activate, revoke

use super::PlanItem;
use crate::amount::{adjusted_amount, are_amounts_nearly_equal, validate_amount, validate_amount_with_fees};
use crate::constants::{MIN_LOCKED_TO_VOTE, MIN_VOTE_AMOUNT};
use crate::error::{eyre, ParysError, Result, ValidationErrors};
use crate::fees::validate_fee_estimates;
use crate::tokens::{Token, TokenRegistry};
use crate::types::{
    total_votes, Balances, GroupVotes, StakeActionType, StakeTokenParams, ValidatorGroup,
};
use alloy::primitives::{Address, U256};

/// Locked balance not currently committed to any group
pub fn total_nonvoting_locked(balances: &Balances, votes: &GroupVotes) -> U256 {
    balances.locked.locked.saturating_sub(total_votes(votes))
}

/// Largest amount a staking action can apply to `group`
pub fn staking_max_amount(
    action: StakeActionType,
    voter_balances: &Balances,
    votes: &GroupVotes,
    group: Address,
) -> U256 {
    let group_votes = votes.get(&group).copied().unwrap_or_default();
    match action {
        StakeActionType::Vote => total_nonvoting_locked(voter_balances, votes),
        StakeActionType::Activate => group_votes.pending,
        StakeActionType::Revoke => group_votes.total(),
    }
}

/// Validate a staking request.
///
/// `balances` belong to the signer (who pays fees); `voter_balances` belong to
/// the account whose locked balance votes, which differ for vote signers.
pub fn validate_stake(
    params: &StakeTokenParams,
    balances: &Balances,
    voter_balances: &Balances,
    groups: &[ValidatorGroup],
    votes: &GroupVotes,
    tokens: &TokenRegistry,
    validate_fee: bool,
) -> ValidationErrors {
    let native = tokens.native();
    let mut errors = ValidationErrors::new();

    if params.group_address == Address::ZERO {
        errors.add("groupAddress", "Validator Group Required");
    } else if params.action != StakeActionType::Revoke
        && !groups.iter().any(|g| g.address == params.group_address)
    {
        errors.add("groupAddress", "Invalid Validator Group");
    }

    if params.amount.is_zero() {
        errors.add("amount", "Amount Missing");
    } else {
        let max_amount = staking_max_amount(params.action, voter_balances, votes, params.group_address);
        errors.merge(validate_amount(
            params.amount,
            native,
            None,
            Some(max_amount),
            Some(MIN_VOTE_AMOUNT),
        ));
    }

    if params.action == StakeActionType::Vote && voter_balances.locked.locked <= MIN_LOCKED_TO_VOTE {
        errors.add("lockedPARYS", "Insufficient locked PARYS");
    }

    if validate_fee {
        let estimates = params.fee_estimates.as_deref();
        errors.merge(validate_fee_estimates(estimates, tokens));
        errors.merge(validate_amount_with_fees(U256::ZERO, native, balances, estimates));
    }

    errors
}

/// Ordered transactions for a staking request.
///
/// Revokes consume pending votes before active ones. Asking for more than
/// pending plus active is an error; validation rejects it first.
pub fn stake_plan(
    params: &StakeTokenParams,
    voter: Address,
    voter_balances: &Balances,
    votes: &GroupVotes,
    native: &Token,
) -> Result<Vec<PlanItem>> {
    let group = params.group_address;
    match params.action {
        StakeActionType::Vote => {
            let max_amount = staking_max_amount(params.action, voter_balances, votes, group);
            Ok(vec![PlanItem::Vote {
                group,
                voter,
                amount: adjusted_amount(params.amount, max_amount, native),
            }])
        }
        // Activation always moves the group's whole pending amount
        StakeActionType::Activate => Ok(vec![PlanItem::Activate {
            group,
            voter,
            amount: staking_max_amount(params.action, voter_balances, votes, group),
        }]),
        StakeActionType::Revoke => {
            let group_votes = votes.get(&group).copied().unwrap_or_default();
            let mut items = Vec::new();
            let mut remaining = params.amount;

            let pending_to_revoke = if are_amounts_nearly_equal(group_votes.pending, remaining, native) {
                group_votes.pending
            } else {
                group_votes.pending.min(remaining)
            };
            if !pending_to_revoke.is_zero() {
                items.push(PlanItem::RevokePending {
                    group,
                    voter,
                    amount: pending_to_revoke,
                });
                remaining = remaining.saturating_sub(pending_to_revoke);
            }

            if remaining < MIN_VOTE_AMOUNT {
                return Ok(items);
            }

            let active_to_revoke = if are_amounts_nearly_equal(group_votes.active, remaining, native) {
                group_votes.active
            } else if remaining < group_votes.active {
                remaining
            } else {
                return Err(ParysError::Internal(eyre!(
                    "Cannot revoke more votes than active + pending"
                )));
            };
            if !active_to_revoke.is_zero() {
                items.push(PlanItem::RevokeActive {
                    group,
                    voter,
                    amount: active_to_revoke,
                });
            }
            Ok(items)
        }
    }
}
