//! Lock, unlock and withdraw planning

use super::stake::total_nonvoting_locked;
use super::PlanItem;
use crate::amount::{adjusted_amount, are_amounts_nearly_equal, validate_amount, validate_amount_with_fees};
use crate::constants::MIN_LOCK_AMOUNT;
use crate::error::ValidationErrors;
use crate::fees::validate_fee_estimates;
use crate::tokens::{Token, TokenRegistry};
use crate::types::{Balances, GroupVotes, LockActionType, LockTokenParams, PendingWithdrawal};
use alloy::primitives::U256;

/// Validate a lock-family request against current balances.
///
/// With `validate_fee`, the attached estimates are checked too and must be
/// covered by the liquid balance together with whatever part of a lock is not
/// served by pending withdrawals.
pub fn validate_lock(
    params: &LockTokenParams,
    balances: &Balances,
    group_votes: &GroupVotes,
    tokens: &TokenRegistry,
    validate_fee: bool,
) -> ValidationErrors {
    let native = tokens.native();
    let amount = params.amount;
    if amount.is_zero() {
        return ValidationErrors::invalid("amount", "Amount Missing");
    }

    let locked = &balances.locked;
    let max_amount = match params.action {
        LockActionType::Lock => balances.total_unlocked(native.address),
        LockActionType::Unlock => locked.locked,
        LockActionType::Withdraw => locked.pending_free,
    };
    let mut errors = validate_amount(amount, native, None, Some(max_amount), Some(MIN_LOCK_AMOUNT));

    if params.action == LockActionType::Withdraw && locked.pending_free.is_zero() {
        errors.add("amount", "No pending available to withdraw");
    }

    if params.action == LockActionType::Lock && !errors.contains("amount") {
        let remaining_after_pending = amount
            .saturating_sub(locked.pending_free)
            .saturating_sub(locked.pending_blocked);
        let balance = balances.token_balance(native.address);
        if !remaining_after_pending.is_zero()
            && (remaining_after_pending >= balance
                || are_amounts_nearly_equal(remaining_after_pending, balance, native))
        {
            errors.add("amount", "Locking whole balance is not allowed");
        }
    }

    if validate_fee {
        let affecting_balance = match params.action {
            LockActionType::Lock => amount.saturating_sub(locked.total_pending()),
            _ => U256::ZERO,
        };
        let estimates = params.fee_estimates.as_deref();
        errors.merge(validate_fee_estimates(estimates, tokens));
        errors.merge(validate_amount_with_fees(affecting_balance, native, balances, estimates));
    }

    if params.action == LockActionType::Unlock {
        let nonvoting = total_nonvoting_locked(balances, group_votes);
        if nonvoting < amount && !are_amounts_nearly_equal(nonvoting, amount, native) {
            errors.add("stakedPARYS", "Locked funds in use for staking");
        }
    }

    errors
}

/// Ordered transactions for a lock-family request.
///
/// Locks relock pending withdrawals first, highest index first, since the
/// contract removes relocked entries by swapping in the last element. Withdraw
/// includes every pending withdrawal mature at `now_ms`.
pub fn lock_plan(
    params: &LockTokenParams,
    pending_withdrawals: &[PendingWithdrawal],
    balances: &Balances,
    is_registered: bool,
    native: &Token,
    now_ms: u64,
) -> Vec<PlanItem> {
    match params.action {
        LockActionType::Unlock => vec![PlanItem::Unlock {
            amount: adjusted_amount(params.amount, balances.locked.locked, native),
        }],
        LockActionType::Lock => {
            let mut items = Vec::new();
            if !is_registered {
                items.push(PlanItem::RegisterAccount);
            }

            let mut sorted = pending_withdrawals.to_vec();
            sorted.sort_by(|a, b| b.index.cmp(&a.index));

            let mut remaining = params.amount;
            for pending in sorted {
                if remaining < MIN_LOCK_AMOUNT {
                    break;
                }
                let amount = adjusted_amount(remaining.min(pending.value), pending.value, native);
                items.push(PlanItem::Relock { pending, amount });
                remaining = remaining.saturating_sub(amount);
            }

            if remaining >= MIN_LOCK_AMOUNT {
                items.push(PlanItem::Lock { amount: remaining });
            }
            items
        }
        LockActionType::Withdraw => pending_withdrawals
            .iter()
            .filter(|p| p.is_mature(now_ms))
            .map(|p| PlanItem::Withdraw { pending: *p })
            .collect(),
    }
}
