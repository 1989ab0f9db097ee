//! ParysClient - main entry point for the SDK

use crate::account::{ensure_not_governance_voting, fetch_activatable_groups, AccountState};
use crate::blockscout::BlockscoutClient;
use crate::chain::{ChainGateway, RpcChain};
use crate::config::{ContractId, NetworkConfig};
use crate::contracts::{ContractRegistry, IGovernance};
use crate::error::{ParysError, Result, ValidationErrors};
use crate::exchange::{self, ToNativeRates};
use crate::executor::{drop_stale_registration, PlanExecutor, ProgressEvent};
use crate::feed::PlaceholderTransaction;
use crate::fees::{FeeEstimate, FeeEstimator};
use crate::plan::{
    eligible_group_votes, governance_vote_plan, lock_plan, stake_plan, validate_governance_vote,
    validate_lock, validate_stake, PlanItem,
};
use crate::price_history::{fetch_price_history, PriceHistory};
use crate::signer::TransactionSigner;
use crate::tokens::TokenRegistry;
use crate::types::{
    AccountStatus, Balances, GovernanceVoteParams, LockActionType, LockTokenParams, Proposal,
    ProposalStage, StakeTokenParams, ValidatorGroup,
};
use crate::utils::now_millis;
use alloy::primitives::{Address, U256};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Cached state owned by one signer session
#[derive(Debug, Default)]
struct SessionState {
    account: AccountState,
    exchange_rates: ToNativeRates,
    price_history: Option<PriceHistory>,
}

/// Per-action execution options
#[derive(Debug, Default, Clone)]
pub struct ExecuteOptions {
    pub progress: Option<UnboundedSender<ProgressEvent>>,
    pub cancel: Option<CancellationToken>,
}

/// Main client for interacting with the PARYS network
pub struct ParysClient<S: TransactionSigner, C: ChainGateway> {
    signer: S,
    chain: C,
    config: NetworkConfig,
    tokens: TokenRegistry,
    contracts: ContractRegistry,
    explorer: BlockscoutClient,
    state: RwLock<SessionState>,
}

impl<S: TransactionSigner> ParysClient<S, RpcChain> {
    /// Create a client talking to the network's primary RPC endpoint
    pub fn connect(signer: S, config: NetworkConfig) -> Result<Self> {
        let chain = RpcChain::from_config(&config)?;
        Self::new(signer, chain, config)
    }
}

impl<S: TransactionSigner, C: ChainGateway> ParysClient<S, C> {
    /// Create a new ParysClient
    pub fn new(signer: S, chain: C, config: NetworkConfig) -> Result<Self> {
        if signer.chain_id() != config.chain_id {
            return Err(ParysError::Config(format!(
                "Signer chain id {} does not match network {}",
                signer.chain_id(),
                config.chain_id
            )));
        }
        let explorer = BlockscoutClient::new(config.blockscout_url.clone())?;
        Ok(Self {
            contracts: ContractRegistry::new(&config, signer.address()),
            tokens: TokenRegistry::new(&config),
            signer,
            chain,
            config,
            explorer,
            state: RwLock::new(SessionState::default()),
        })
    }

    /// Get the signer's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Replace the session signer. Contract handles and every cached value
    /// belong to the old signer and are dropped.
    pub async fn set_signer(&mut self, signer: S) -> Result<()> {
        if signer.chain_id() != self.config.chain_id {
            return Err(ParysError::Config("Signer is for a different chain".into()));
        }
        tracing::info!(old = %self.signer.address(), new = %signer.address(), "Switching signer");
        self.contracts.reset(signer.address());
        self.signer = signer;
        *self.state.write().await = SessionState::default();
        Ok(())
    }

    // ========== Account State ==========

    /// Token and locked balances, refetched when stale
    pub async fn balances(&self, force: bool) -> Result<Balances> {
        let mut state = self.state.write().await;
        let balances = state
            .account
            .balances_if_stale(&self.chain, &self.contracts, &self.tokens, self.address(), force)
            .await?;
        Ok(balances.clone())
    }

    /// Registration status, refetched when stale
    pub async fn account_status(&self, force: bool) -> Result<AccountStatus> {
        let mut state = self.state.write().await;
        state
            .account
            .status_if_stale(&self.chain, &self.contracts, self.address(), force)
            .await
    }

    /// Eligible validator groups, sorted by total votes descending
    pub async fn validator_groups(&self) -> Result<Vec<ValidatorGroup>> {
        let eligible = eligible_group_votes(&self.chain, &self.contracts).await?;
        Ok(eligible
            .into_iter()
            .map(|g| ValidatorGroup {
                address: g.group,
                name: g.group.to_string(),
                votes: g.votes,
            })
            .collect())
    }

    /// Groups whose pending votes from the voting account can be activated now
    pub async fn activatable_groups(&self) -> Result<Vec<Address>> {
        let mut state = self.state.write().await;
        let address = self.address();
        let status = state
            .account
            .status_if_stale(&self.chain, &self.contracts, address, false)
            .await?;
        let (_, votes) = state
            .account
            .voter_state_if_stale(&self.chain, &self.contracts, address, false)
            .await?;
        fetch_activatable_groups(&self.chain, &self.contracts, status.voter_address(address), &votes).await
    }

    async fn proposal(&self, proposal_id: u64) -> Result<Proposal> {
        let call = IGovernance::getProposalStageCall {
            proposalId: U256::from(proposal_id),
        };
        let stage = self
            .contracts
            .get(ContractId::Governance)
            .call(&self.chain, &call)
            .await?;
        Ok(Proposal {
            id: proposal_id,
            stage: ProposalStage::from_u8(stage).unwrap_or(ProposalStage::None),
        })
    }

    async fn invalidate_balances(&self) {
        let mut state = self.state.write().await;
        state.account.balances.last_updated = 0;
        state.account.group_votes_last_updated = 0;
    }

    // ========== Exchange Rates & Prices ==========

    /// Native rates of every stable token, refetched when stale
    pub async fn refresh_exchange_rates(&self, force: bool) -> Result<ToNativeRates> {
        let mut state = self.state.write().await;
        exchange::refresh_exchange_rates(
            &mut state.exchange_rates,
            force,
            &self.chain,
            &self.contracts,
            &self.tokens,
        )
        .await
    }

    /// Native/stable price history for the last `num_days` days
    pub async fn price_history(&self, num_days: u64) -> Result<PriceHistory> {
        let mut state = self.state.write().await;
        let fetched = fetch_price_history(
            &self.chain,
            &self.explorer,
            &self.contracts,
            self.tokens.stable_tokens(),
            num_days,
            state.price_history.as_ref(),
        )
        .await?;
        if let Some(history) = fetched {
            state.price_history = Some(history);
        }
        Ok(state.price_history.clone().unwrap_or_default())
    }

    // ========== Fees ==========

    pub fn fee_estimator(&self) -> FeeEstimator<'_, S, C> {
        FeeEstimator::new(
            &self.signer,
            &self.chain,
            &self.contracts,
            &self.tokens,
            &self.config,
        )
    }

    /// One fee estimate per plan item, paid in `fee_token` (native when `None`)
    pub async fn estimate_plan_fees(
        &self,
        plan: &[PlanItem],
        fee_token: Option<Address>,
    ) -> Result<Vec<FeeEstimate>> {
        self.fee_estimator().estimate_plan_fees(plan, fee_token).await
    }

    // ========== Planning ==========

    /// Plan a lock-family action against current state, without fees.
    ///
    /// Used for previews and fee estimation; the returned plan is what
    /// [`Self::lock_token`] executes for the same inputs.
    pub async fn plan_lock(&self, params: &LockTokenParams) -> Result<Vec<PlanItem>> {
        let mut state = self.state.write().await;
        let address = self.address();
        let status = state
            .account
            .status_if_stale(&self.chain, &self.contracts, address, false)
            .await?;
        let balances = state
            .account
            .balances_if_stale(&self.chain, &self.contracts, &self.tokens, address, false)
            .await?
            .clone();
        let (_, votes) = state
            .account
            .voter_state_if_stale(&self.chain, &self.contracts, address, false)
            .await?;

        validate_lock(params, &balances, &votes, &self.tokens, false).into_result()?;
        Ok(lock_plan(
            params,
            &state.account.pending_withdrawals,
            &balances,
            status.is_registered,
            self.tokens.native(),
            now_millis(),
        ))
    }

    /// Plan a staking action against current state, without fees
    pub async fn plan_stake(&self, params: &StakeTokenParams) -> Result<Vec<PlanItem>> {
        let (plan, _) = self.validated_stake_plan(params, false).await?;
        Ok(plan)
    }

    async fn validated_stake_plan(
        &self,
        params: &StakeTokenParams,
        validate_fee: bool,
    ) -> Result<(Vec<PlanItem>, Address)> {
        let groups = self.validator_groups().await?;
        let mut state = self.state.write().await;
        let address = self.address();
        let balances = state
            .account
            .balances_if_stale(&self.chain, &self.contracts, &self.tokens, address, false)
            .await?
            .clone();
        let status = state
            .account
            .status_if_stale(&self.chain, &self.contracts, address, false)
            .await?;
        let voter = status.voter_address(address);
        let (voter_balances, votes) = state
            .account
            .voter_state_if_stale(&self.chain, &self.contracts, address, false)
            .await?;

        validate_stake(
            params,
            &balances,
            &voter_balances,
            &groups,
            &votes,
            &self.tokens,
            validate_fee,
        )
        .into_result()?;
        let plan = stake_plan(params, voter, &voter_balances, &votes, self.tokens.native())?;
        Ok((plan, voter))
    }

    // ========== Actions ==========

    async fn execute(
        &self,
        mut plan: Vec<PlanItem>,
        mut fees: Vec<FeeEstimate>,
        options: ExecuteOptions,
    ) -> Result<Vec<PlaceholderTransaction>> {
        drop_stale_registration(&self.chain, &self.contracts, self.address(), &mut plan, &mut fees)
            .await?;

        let mut executor = PlanExecutor::new(
            &self.signer,
            &self.chain,
            &self.contracts,
            self.tokens.native().address,
        );
        if let Some(progress) = options.progress {
            executor = executor.with_progress(progress);
        }
        if let Some(cancel) = options.cancel {
            executor = executor.with_cancellation(cancel);
        }

        let result = executor.execute(&plan, &fees).await;
        // Confirmed items changed balances whether or not the plan completed
        self.invalidate_balances().await;
        if plan.first() == Some(&PlanItem::RegisterAccount) {
            self.state.write().await.account.status.last_updated = 0;
        }
        result.map_err(|failure| {
            tracing::error!(
                index = failure.index,
                action = ?failure.tx_type,
                confirmed = failure.confirmed,
                error = %failure.source,
                "Plan execution failed"
            );
            ParysError::from(failure)
        })
    }

    /// Lock, unlock or withdraw.
    ///
    /// `params.fee_estimates` must hold one estimate per item of
    /// [`Self::plan_lock`]'s plan for the same request.
    pub async fn lock_token(
        &self,
        params: &LockTokenParams,
        options: ExecuteOptions,
    ) -> Result<Vec<PlaceholderTransaction>> {
        let address = self.address();
        let (plan, fees) = {
            let mut state = self.state.write().await;
            let status = state
                .account
                .status_if_stale(&self.chain, &self.contracts, address, false)
                .await?;
            let balances = state
                .account
                .balances_if_stale(&self.chain, &self.contracts, &self.tokens, address, false)
                .await?
                .clone();
            let (_, votes) = state
                .account
                .voter_state_if_stale(&self.chain, &self.contracts, address, false)
                .await?;

            validate_lock(params, &balances, &votes, &self.tokens, true).into_result()?;
            if params.action == LockActionType::Unlock {
                ensure_not_governance_voting(&self.chain, &self.contracts, address).await?;
            }

            let plan = lock_plan(
                params,
                &state.account.pending_withdrawals,
                &balances,
                status.is_registered,
                self.tokens.native(),
                now_millis(),
            );
            (plan, params.fee_estimates.clone().unwrap_or_default())
        };

        tracing::info!(action = ?params.action, amount = %params.amount, items = plan.len(), "Locking tokens");
        self.execute(plan, fees, options).await
    }

    /// Vote for, activate or revoke votes on a validator group
    pub async fn stake_token(
        &self,
        params: &StakeTokenParams,
        options: ExecuteOptions,
    ) -> Result<Vec<PlaceholderTransaction>> {
        let (plan, voter) = self.validated_stake_plan(params, true).await?;
        let fees = params.fee_estimates.clone().unwrap_or_default();
        tracing::info!(action = ?params.action, group = %params.group_address, %voter, items = plan.len(), "Staking tokens");
        self.execute(plan, fees, options).await
    }

    /// Cast a referendum vote on a governance proposal
    pub async fn governance_vote(
        &self,
        params: &GovernanceVoteParams,
        options: ExecuteOptions,
    ) -> Result<Vec<PlaceholderTransaction>> {
        if params.proposal_id == 0 {
            return Err(ValidationErrors::invalid("proposalId", "No proposal selected").into());
        }
        let proposal = self.proposal(params.proposal_id).await?;
        let address = self.address();
        {
            let mut state = self.state.write().await;
            let balances = state
                .account
                .balances_if_stale(&self.chain, &self.contracts, &self.tokens, address, false)
                .await?
                .clone();
            let (voter_balances, _) = state
                .account
                .voter_state_if_stale(&self.chain, &self.contracts, address, false)
                .await?;
            validate_governance_vote(
                params,
                &balances,
                &voter_balances,
                std::slice::from_ref(&proposal),
                &self.tokens,
                true,
            )
            .into_result()?;
        }

        let plan = governance_vote_plan(params);
        let fees = params.fee_estimate.clone().into_iter().collect();
        tracing::info!(proposal_id = params.proposal_id, vote = %params.value, "Voting on proposal");
        self.execute(plan, fees, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::constants::WEI_PER_UNIT;
    use crate::contracts::{IAccounts, IElection, IGasPriceMinimum, ILockedGold, IERC20};
    use crate::feed::TransactionType;
    use crate::signer::mock::MockSigner;
    use crate::types::VoteValue;
    use alloy::sol_types::{SolCall, SolValue};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const GROUP: Address = Address::repeat_byte(0x61);

    fn units(n: u64) -> U256 {
        U256::from(n) * WEI_PER_UNIT
    }

    /// Chain with an unregistered account holding 10 liquid tokens and nothing locked
    fn client() -> (ParysClient<MockSigner, MockChain>, Arc<AtomicBool>) {
        let config = NetworkConfig::alfajores();
        let signer = MockSigner::new(config.chain_id);
        let chain = MockChain::new();
        chain.balances.lock().unwrap().insert(signer.address(), units(10));

        let registered = Arc::new(AtomicBool::new(false));
        let flag = registered.clone();
        chain.on_call(move |_, data| {
            let selector = data.get(..4)?;
            let encoded = if selector == IERC20::balanceOfCall::SELECTOR
                || selector == ILockedGold::getAccountTotalLockedGoldCall::SELECTOR
            {
                U256::ZERO.abi_encode()
            } else if selector == ILockedGold::getPendingWithdrawalsCall::SELECTOR {
                (Vec::<U256>::new(), Vec::<U256>::new()).abi_encode_params()
            } else if selector == IAccounts::isAccountCall::SELECTOR {
                flag.load(Ordering::SeqCst).abi_encode()
            } else if selector == IElection::getGroupsVotedForByAccountCall::SELECTOR {
                Vec::<Address>::new().abi_encode()
            } else if selector == IElection::getTotalVotesForEligibleValidatorGroupsCall::SELECTOR {
                (vec![GROUP], vec![units(100)]).abi_encode_params()
            } else if selector == IGasPriceMinimum::getGasPriceMinimumCall::SELECTOR {
                U256::from(500_000_000u64).abi_encode()
            } else if selector == IGovernance::getProposalStageCall::SELECTOR {
                U256::from(3u8).abi_encode()
            } else {
                return None;
            };
            Some(encoded.into())
        });

        let client = ParysClient::new(signer, chain, config).unwrap();
        (client, registered)
    }

    #[tokio::test]
    async fn test_lock_flow_registers_then_locks() {
        let (client, _) = client();
        let params = LockTokenParams::lock(units(2));
        let plan = client.plan_lock(&params).await.unwrap();
        assert_eq!(
            plan,
            vec![PlanItem::RegisterAccount, PlanItem::Lock { amount: units(2) }]
        );

        let fees = client.estimate_plan_fees(&plan, None).await.unwrap();
        assert_eq!(fees.len(), 2);
        let params = params.with_fee_estimates(fees);
        let placeholders = client
            .lock_token(&params, ExecuteOptions::default())
            .await
            .unwrap();
        let types: Vec<TransactionType> = placeholders.iter().map(|p| p.tx_type).collect();
        assert_eq!(types, vec![TransactionType::AccountRegistration, TransactionType::LockParys]);
        assert_eq!(client.signer().signed_nonces(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_registration_dropped_when_already_registered() {
        let (client, registered) = client();
        let params = LockTokenParams::lock(units(2));
        let plan = client.plan_lock(&params).await.unwrap();
        let fees = client.estimate_plan_fees(&plan, None).await.unwrap();

        // Registered elsewhere after planning
        registered.store(true, Ordering::SeqCst);
        let placeholders = client
            .lock_token(&params.with_fee_estimates(fees), ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].tx_type, TransactionType::LockParys);
    }

    #[tokio::test]
    async fn test_lock_rejects_missing_fee() {
        let (client, _) = client();
        let err = client
            .lock_token(&LockTokenParams::lock(units(2)), ExecuteOptions::default())
            .await
            .unwrap_err();
        match err {
            ParysError::Validation(errors) => assert_eq!(errors.get("fee"), Some("No fee set")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.chain.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_stake_requires_locked_balance() {
        let (client, _) = client();
        let err = client
            .plan_stake(&StakeTokenParams::vote(units(1), GROUP))
            .await
            .unwrap_err();
        match err {
            ParysError::Validation(errors) => {
                assert_eq!(errors.get("lockedPARYS"), Some("Insufficient locked PARYS"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_governance_vote_requires_locked_balance() {
        let (client, _) = client();
        let err = client
            .governance_vote(&GovernanceVoteParams::new(4, VoteValue::Yes), ExecuteOptions::default())
            .await
            .unwrap_err();
        let ParysError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        // proposal 4 decodes as a referendum, so only the locked balance fails
        assert_eq!(errors.get("proposalId"), None);
        assert_eq!(errors.get("lockedPARYS"), Some("Insufficient locked PARYS"));
    }

    #[tokio::test]
    async fn test_set_signer_resets_session() {
        let (mut client, _) = client();
        tokio_test::assert_ok!(client.balances(false).await);
        let next = MockSigner::new(client.config().chain_id);
        let next_address = next.address();
        client.set_signer(next).await.unwrap();
        assert_eq!(client.address(), next_address);
        assert_eq!(client.contracts.signer(), next_address);
        assert_eq!(client.state.read().await.account.balances.last_updated, 0);

        let wrong_chain = MockSigner::new(1);
        tokio_test::assert_err!(client.set_signer(wrong_chain).await);
    }
}
