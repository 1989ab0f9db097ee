//! Governance referendum votes

use super::PlanItem;
use crate::amount::validate_amount_with_fees;
use crate::constants::MIN_LOCKED_TO_VOTE;
use crate::error::ValidationErrors;
use crate::fees::validate_fee_estimate;
use crate::tokens::TokenRegistry;
use crate::types::{Balances, GovernanceVoteParams, Proposal, ProposalStage, VoteValue};
use alloy::primitives::U256;

/// Validate a governance vote. Only proposals in the referendum stage accept votes.
pub fn validate_governance_vote(
    params: &GovernanceVoteParams,
    balances: &Balances,
    voter_balances: &Balances,
    proposals: &[Proposal],
    tokens: &TokenRegistry,
    validate_fee: bool,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if params.proposal_id == 0 {
        errors.add("proposalId", "No proposal selected");
    } else {
        let in_referendum = proposals
            .iter()
            .find(|p| p.id == params.proposal_id)
            .is_some_and(|p| p.stage == ProposalStage::Referendum);
        if !in_referendum {
            errors.add("proposalId", "Invalid Proposal Selection");
        }
    }

    if params.value == VoteValue::None {
        errors.add("value", "Invalid vote value");
    }

    if voter_balances.locked.locked <= MIN_LOCKED_TO_VOTE {
        errors.add("lockedPARYS", "Insufficient locked PARYS");
    }

    if validate_fee {
        let estimate = params.fee_estimate.as_ref();
        errors.merge(validate_fee_estimate(estimate, tokens));
        let estimates = estimate.map(std::slice::from_ref);
        errors.merge(validate_amount_with_fees(U256::ZERO, tokens.native(), balances, estimates));
    }

    errors
}

/// A governance vote is always a single transaction
pub fn governance_vote_plan(params: &GovernanceVoteParams) -> Vec<PlanItem> {
    vec![PlanItem::GovernanceVote {
        proposal_id: params.proposal_id,
        value: params.value,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::constants::WEI_PER_UNIT;
    use crate::fees::FeeEstimate;
    use crate::types::LockedBalances;

    fn voter(locked: U256) -> Balances {
        Balances::with_locked(
            LockedBalances {
                locked,
                ..Default::default()
            },
            0,
        )
    }

    fn proposals() -> Vec<Proposal> {
        vec![
            Proposal {
                id: 7,
                stage: ProposalStage::Referendum,
            },
            Proposal {
                id: 8,
                stage: ProposalStage::Approval,
            },
        ]
    }

    #[test]
    fn test_validate_proposal_selection() {
        let tokens = TokenRegistry::new(&NetworkConfig::alfajores());
        let voter = voter(WEI_PER_UNIT);
        let b = Balances::default();

        let ok = GovernanceVoteParams::new(7, VoteValue::Yes);
        assert!(validate_governance_vote(&ok, &b, &voter, &proposals(), &tokens, false).is_valid());

        let none = GovernanceVoteParams::new(0, VoteValue::Yes);
        let errors = validate_governance_vote(&none, &b, &voter, &proposals(), &tokens, false);
        assert_eq!(errors.get("proposalId"), Some("No proposal selected"));

        for id in [8, 9] {
            let params = GovernanceVoteParams::new(id, VoteValue::No);
            let errors = validate_governance_vote(&params, &b, &voter, &proposals(), &tokens, false);
            assert_eq!(errors.get("proposalId"), Some("Invalid Proposal Selection"));
        }

        let abstain_none = GovernanceVoteParams::new(7, VoteValue::None);
        let errors = validate_governance_vote(&abstain_none, &b, &voter, &proposals(), &tokens, false);
        assert_eq!(errors.get("value"), Some("Invalid vote value"));
    }

    #[test]
    fn test_validate_locked_and_fee() {
        let config = NetworkConfig::alfajores();
        let tokens = TokenRegistry::new(&config);
        let params = GovernanceVoteParams::new(7, VoteValue::Abstain);

        let errors = validate_governance_vote(
            &params,
            &Balances::default(),
            &voter(MIN_LOCKED_TO_VOTE),
            &proposals(),
            &tokens,
            true,
        );
        assert_eq!(errors.get("lockedPARYS"), Some("Insufficient locked PARYS"));
        assert_eq!(errors.get("fee"), Some("No fee set"));

        let estimate = FeeEstimate::new(U256::from(10_000_000_000u64), 1_000_000, tokens.native().address);
        let params = params.with_fee_estimate(estimate);
        let errors = validate_governance_vote(
            &params,
            &Balances::default(),
            &voter(WEI_PER_UNIT),
            &proposals(),
            &tokens,
            true,
        );
        assert_eq!(errors.get("amount"), Some("Amount plus fees exceeds balance"));
    }

    #[test]
    fn test_plan_is_single_item() {
        let plan = governance_vote_plan(&GovernanceVoteParams::new(7, VoteValue::Yes));
        assert_eq!(
            plan,
            vec![PlanItem::GovernanceVote {
                proposal_id: 7,
                value: VoteValue::Yes
            }]
        );
    }
}
