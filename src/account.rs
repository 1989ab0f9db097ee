//! Account state reads: balances, locked funds, registration and votes
//!
//! All reads are plain async functions over a [`ChainGateway`]. [`AccountState`]
//! caches their results with the staleness thresholds from `constants`.

use crate::chain::ChainGateway;
use crate::config::ContractId;
use crate::constants::{ACCOUNT_STATUS_STALE_TIME, BALANCE_STALE_TIME};
use crate::contracts::{ContractHandle, ContractRegistry, IAccounts, IElection, IGovernance, ILockedGold, IERC20};
use crate::error::{ParysError, Result, ValidationErrors};
use crate::tokens::{Token, TokenRegistry};
use crate::types::{AccountStatus, Balances, GroupVote, GroupVotes, LockedBalances, PendingWithdrawal};
use crate::utils::{is_stale, now_millis};
use alloy::primitives::{Address, U256};
use futures::future::try_join_all;

async fn token_balance<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    token: &Token,
    native: Address,
    account: Address,
) -> Result<U256> {
    if token.address == native {
        return chain.native_balance(account).await;
    }
    ContractHandle::new(token.address, contracts.signer())
        .call(chain, &IERC20::balanceOfCall { account })
        .await
}

/// Pending withdrawals of `account`, indexed by their on-chain position
pub async fn fetch_pending_withdrawals<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    account: Address,
) -> Result<Vec<PendingWithdrawal>> {
    let pending = contracts
        .get(ContractId::LockedGold)
        .call(chain, &ILockedGold::getPendingWithdrawalsCall { account })
        .await?;
    if pending.values.len() != pending.timestamps.len() {
        return Err(ParysError::ChainQuery(
            "Pending withdrawal values / timestamps size mismatch".into(),
        ));
    }
    pending
        .values
        .into_iter()
        .zip(pending.timestamps)
        .enumerate()
        .map(|(index, (value, timestamp))| {
            let seconds: u64 = timestamp.try_into().map_err(|_| {
                ParysError::ChainQuery(format!("Pending withdrawal timestamp out of range: {timestamp}"))
            })?;
            Ok(PendingWithdrawal {
                index: index as u64,
                value,
                timestamp: seconds.saturating_mul(1000),
            })
        })
        .collect()
}

/// Split pending withdrawals into those mature at `now_ms` and those still blocked
pub fn split_pending(pending: &[PendingWithdrawal], now_ms: u64) -> (U256, U256) {
    pending.iter().fold((U256::ZERO, U256::ZERO), |(free, blocked), p| {
        if p.is_mature(now_ms) {
            (free + p.value, blocked)
        } else {
            (free, blocked + p.value)
        }
    })
}

/// Locked total and pending split for `account`, along with the raw pending list
pub async fn fetch_locked_balances<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    account: Address,
) -> Result<(LockedBalances, Vec<PendingWithdrawal>)> {
    let total_locked = ILockedGold::getAccountTotalLockedGoldCall { account };
    let locked_gold = contracts.get(ContractId::LockedGold);
    let (locked, pending) = tokio::try_join!(
        locked_gold.call(chain, &total_locked),
        fetch_pending_withdrawals(chain, contracts, account),
    )?;
    let (pending_free, pending_blocked) = split_pending(&pending, now_millis());
    Ok((
        LockedBalances {
            locked,
            pending_blocked,
            pending_free,
        },
        pending,
    ))
}

/// Token and locked balances of `account`. Token reads fan out concurrently.
pub async fn fetch_balances<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    tokens: &TokenRegistry,
    account: Address,
) -> Result<(Balances, Vec<PendingWithdrawal>)> {
    let native = tokens.native().address;
    let all = tokens.all();
    let (values, (locked, pending)) = tokio::try_join!(
        try_join_all(
            all.iter()
                .map(|token| token_balance(chain, contracts, token, native, account))
        ),
        fetch_locked_balances(chain, contracts, account),
    )?;

    let mut balances = Balances::default();
    for (token, value) in all.iter().zip(values) {
        balances.set_token_balance(token.address, value);
    }
    balances.locked = locked;
    balances.last_updated = now_millis();
    tracing::debug!(%account, tokens = all.len(), "Fetched balances");
    Ok((balances, pending))
}

/// Registration flag and vote-signer authorization of `address`
pub async fn fetch_account_status<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    address: Address,
) -> Result<AccountStatus> {
    let accounts = contracts.get(ContractId::Accounts);
    let is_registered = accounts
        .call(chain, &IAccounts::isAccountCall { account: address })
        .await?;

    // Reverts for addresses that are neither accounts nor authorized signers
    let vote_signer_for = match accounts
        .call(chain, &IAccounts::voteSignerToAccountCall { signer: address })
        .await
    {
        Ok(account) if account != address && account != Address::ZERO => Some(account),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(%address, error = %e, "No vote signer authorization");
            None
        }
    };

    Ok(AccountStatus {
        is_registered,
        vote_signer_for,
        last_updated: now_millis(),
    })
}

/// Pending and active votes of `voter` per group
pub async fn fetch_group_votes<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    voter: Address,
) -> Result<GroupVotes> {
    let election = contracts.get(ContractId::Election);
    let groups = election
        .call(chain, &IElection::getGroupsVotedForByAccountCall { account: voter })
        .await?;

    let votes = try_join_all(groups.iter().map(|group| async move {
        let pending = IElection::getPendingVotesForGroupByAccountCall {
            group: *group,
            account: voter,
        };
        let active = IElection::getActiveVotesForGroupByAccountCall {
            group: *group,
            account: voter,
        };
        tokio::try_join!(election.call(chain, &pending), election.call(chain, &active))
    }))
    .await?;

    if votes.len() != groups.len() {
        return Err(ParysError::ChainQuery("Groups list / votes size mismatch".into()));
    }
    Ok(groups
        .into_iter()
        .zip(votes)
        .map(|(group, (pending, active))| (group, GroupVote { pending, active }))
        .collect())
}

/// Groups whose pending votes from `voter` can be activated now
pub async fn fetch_activatable_groups<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    voter: Address,
    votes: &GroupVotes,
) -> Result<Vec<Address>> {
    let election = contracts.get(ContractId::Election);
    let candidates: Vec<Address> = votes
        .iter()
        .filter(|(_, v)| !v.pending.is_zero())
        .map(|(group, _)| *group)
        .collect();
    let flags = try_join_all(candidates.iter().map(|group| async move {
        let call = IElection::hasActivatablePendingVotesCall {
            account: voter,
            group: *group,
        };
        election.call(chain, &call).await
    }))
    .await?;
    Ok(candidates
        .into_iter()
        .zip(flags)
        .filter_map(|(group, activatable)| activatable.then_some(group))
        .collect())
}

/// Reject an unlock while the account has an open governance vote
pub async fn ensure_not_governance_voting<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    account: Address,
) -> Result<()> {
    let is_voting = contracts
        .get(ContractId::Governance)
        .call(chain, &IGovernance::isVotingCall { account })
        .await?;
    if is_voting {
        return Err(ValidationErrors::invalid(
            "governance",
            "Account has voted for an active governance proposal. You must wait until the proposal is done.",
        )
        .into());
    }
    Ok(())
}

/// Cached account state for one signer
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub balances: Balances,
    pub pending_withdrawals: Vec<PendingWithdrawal>,
    pub status: AccountStatus,
    /// Locked balances of the voter when the signer is a vote signer
    pub voter_balances: Option<Balances>,
    pub group_votes: GroupVotes,
    pub group_votes_last_updated: u64,
}

impl AccountState {
    pub async fn balances_if_stale<C: ChainGateway>(
        &mut self,
        chain: &C,
        contracts: &ContractRegistry,
        tokens: &TokenRegistry,
        account: Address,
        force: bool,
    ) -> Result<&Balances> {
        if force || is_stale(self.balances.last_updated, BALANCE_STALE_TIME) {
            let (balances, pending) = fetch_balances(chain, contracts, tokens, account).await?;
            self.balances = balances;
            self.pending_withdrawals = pending;
        }
        Ok(&self.balances)
    }

    pub async fn status_if_stale<C: ChainGateway>(
        &mut self,
        chain: &C,
        contracts: &ContractRegistry,
        account: Address,
        force: bool,
    ) -> Result<AccountStatus> {
        if force || is_stale(self.status.last_updated, ACCOUNT_STATUS_STALE_TIME) {
            self.status = fetch_account_status(chain, contracts, account).await?;
        }
        Ok(self.status)
    }

    /// Votes and locked balances of the voting account (the signer itself, or
    /// the account it signs votes for)
    pub async fn voter_state_if_stale<C: ChainGateway>(
        &mut self,
        chain: &C,
        contracts: &ContractRegistry,
        account: Address,
        force: bool,
    ) -> Result<(Balances, GroupVotes)> {
        let status = self.status_if_stale(chain, contracts, account, force).await?;
        let voter = status.voter_address(account);
        if force || is_stale(self.group_votes_last_updated, BALANCE_STALE_TIME) {
            self.group_votes = fetch_group_votes(chain, contracts, voter).await?;
            self.voter_balances = if voter == account {
                None
            } else {
                let (locked, _) = fetch_locked_balances(chain, contracts, voter).await?;
                Some(Balances::with_locked(locked, now_millis()))
            };
            self.group_votes_last_updated = now_millis();
        }
        let voter_balances = self
            .voter_balances
            .clone()
            .unwrap_or_else(|| self.balances.clone());
        Ok((voter_balances, self.group_votes.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::config::NetworkConfig;
    use alloy::sol_types::{SolCall, SolValue};

    const ACCOUNT: Address = Address::repeat_byte(0x21);
    const GROUP_A: Address = Address::repeat_byte(0xa);
    const GROUP_B: Address = Address::repeat_byte(0xb);

    fn setup() -> (MockChain, ContractRegistry, TokenRegistry) {
        let config = NetworkConfig::alfajores();
        let chain = MockChain::new();
        chain
            .balances
            .lock()
            .unwrap()
            .insert(ACCOUNT, U256::from(1_000u64));

        let now_secs = now_millis() / 1000;
        chain.on_call(move |_, data| {
            if data.starts_with(&IERC20::balanceOfCall::SELECTOR) {
                Some(U256::from(7u64).abi_encode().into())
            } else if data.starts_with(&ILockedGold::getAccountTotalLockedGoldCall::SELECTOR) {
                Some(U256::from(500u64).abi_encode().into())
            } else if data.starts_with(&ILockedGold::getPendingWithdrawalsCall::SELECTOR) {
                let values = vec![U256::from(30u64), U256::from(40u64)];
                let timestamps = vec![U256::from(now_secs - 60), U256::from(now_secs + 3_600)];
                Some((values, timestamps).abi_encode_params().into())
            } else if data.starts_with(&IElection::getGroupsVotedForByAccountCall::SELECTOR) {
                Some(vec![GROUP_A, GROUP_B].abi_encode().into())
            } else if data.starts_with(&IElection::getPendingVotesForGroupByAccountCall::SELECTOR) {
                let call = IElection::getPendingVotesForGroupByAccountCall::abi_decode(data).ok()?;
                let pending = if call.group == GROUP_A { 5u64 } else { 0 };
                Some(U256::from(pending).abi_encode().into())
            } else if data.starts_with(&IElection::getActiveVotesForGroupByAccountCall::SELECTOR) {
                Some(U256::from(11u64).abi_encode().into())
            } else if data.starts_with(&IElection::hasActivatablePendingVotesCall::SELECTOR) {
                Some(true.abi_encode().into())
            } else if data.starts_with(&IAccounts::isAccountCall::SELECTOR) {
                Some(true.abi_encode().into())
            } else if data.starts_with(&IGovernance::isVotingCall::SELECTOR) {
                Some(true.abi_encode().into())
            } else {
                None
            }
        });
        let config_contracts = ContractRegistry::new(&config, ACCOUNT);
        (chain, config_contracts, TokenRegistry::new(&config))
    }

    #[tokio::test]
    async fn test_fetch_balances_and_pending_split() {
        let (chain, contracts, tokens) = setup();
        let (balances, pending) = fetch_balances(&chain, &contracts, &tokens, ACCOUNT)
            .await
            .unwrap();

        assert_eq!(balances.token_balance(tokens.native().address), U256::from(1_000u64));
        for stable in tokens.stable_tokens() {
            assert_eq!(balances.token_balance(stable.address), U256::from(7u64));
        }
        assert_eq!(balances.locked.locked, U256::from(500u64));
        assert_eq!(balances.locked.pending_free, U256::from(30u64));
        assert_eq!(balances.locked.pending_blocked, U256::from(40u64));
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].index, 1);
        assert_eq!(pending[0].timestamp % 1000, 0);
        assert!(balances.last_updated > 0);
    }

    #[tokio::test]
    async fn test_group_votes_and_activatable() {
        let (chain, contracts, _) = setup();
        let votes = fetch_group_votes(&chain, &contracts, ACCOUNT).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[&GROUP_A].pending, U256::from(5u64));
        assert_eq!(votes[&GROUP_B].active, U256::from(11u64));

        let activatable = fetch_activatable_groups(&chain, &contracts, ACCOUNT, &votes)
            .await
            .unwrap();
        assert_eq!(activatable, vec![GROUP_A]);
    }

    #[tokio::test]
    async fn test_status_without_vote_signer() {
        let (chain, contracts, _) = setup();
        let status = fetch_account_status(&chain, &contracts, ACCOUNT).await.unwrap();
        assert!(status.is_registered);
        assert_eq!(status.vote_signer_for, None);
        assert_eq!(status.voter_address(ACCOUNT), ACCOUNT);
    }

    #[tokio::test]
    async fn test_governance_voting_blocks_unlock() {
        let (chain, contracts, _) = setup();
        let err = ensure_not_governance_voting(&chain, &contracts, ACCOUNT)
            .await
            .unwrap_err();
        match err {
            ParysError::Validation(errors) => assert!(errors.contains("governance")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_vote_signer_uses_main_account_locked_balance() {
        let (chain, contracts, _) = setup();
        let main = Address::repeat_byte(0x31);
        chain.on_call(move |_, data| {
            data.starts_with(&IAccounts::voteSignerToAccountCall::SELECTOR)
                .then(|| main.abi_encode().into())
        });

        let mut state = AccountState::default();
        let (voter_balances, votes) = state
            .voter_state_if_stale(&chain, &contracts, ACCOUNT, false)
            .await
            .unwrap();
        assert_eq!(state.status.vote_signer_for, Some(main));
        assert_eq!(voter_balances.locked.locked, U256::from(500u64));
        assert_eq!(voter_balances.locked.pending_free, U256::from(30u64));
        assert_eq!(voter_balances.tokens().count(), 0);
        assert!(voter_balances.last_updated > 0);
        assert_eq!(votes.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_reuses_fresh_balances() {
        let (chain, contracts, tokens) = setup();
        let mut state = AccountState::default();
        state
            .balances_if_stale(&chain, &contracts, &tokens, ACCOUNT, false)
            .await
            .unwrap();
        let first = state.balances.last_updated;

        chain.balances.lock().unwrap().insert(ACCOUNT, U256::from(1u64));
        let cached = state
            .balances_if_stale(&chain, &contracts, &tokens, ACCOUNT, false)
            .await
            .unwrap();
        assert_eq!(cached.token_balance(tokens.native().address), U256::from(1_000u64));
        assert_eq!(cached.last_updated, first);

        let forced = state
            .balances_if_stale(&chain, &contracts, &tokens, ACCOUNT, true)
            .await
            .unwrap();
        assert_eq!(forced.token_balance(tokens.native().address), U256::from(1u64));
    }
}
