//! Gas limit and fee estimation

use super::FeeEstimate;
use crate::chain::ChainGateway;
use crate::config::{ContractId, NetworkConfig};
use crate::constants::{GAS_PRICE_MULTIPLIER, NATIVE_GAS_MULTIPLIER, STABLE_TOKEN_GAS_MULTIPLIER};
use crate::contracts::{ContractRegistry, IGasPriceMinimum};
use crate::error::{ParysError, Result};
use crate::feed::TransactionType;
use crate::plan::PlanItem;
use crate::signer::TransactionSigner;
use crate::tokens::TokenRegistry;
use crate::transaction::TxDraft;
use alloy::primitives::{Address, U256};

/// Measured gas limits for transaction types with stable gas usage
pub fn precomputed_gas_limit(tx_type: TransactionType) -> Option<u64> {
    use TransactionType::*;
    let gas = match tx_type {
        StableTokenTransfer => 95_000,
        StableTokenTransferWithComment => 115_000,
        StableTokenApprove => 95_000,
        ParysTokenTransfer => 95_000,
        ParysTokenTransferWithComment => 100_000,
        ParysTokenApprove => 95_000,
        ParysNativeTransfer => 40_000,
        TokenExchange => 350_000,
        AccountRegistration => 100_000,
        LockParys => 95_000,
        RelockParys => 150_000,
        UnlockParys => 260_000,
        WithdrawLockedParys => 210_000,
        ValidatorVoteParys => 480_000,
        ValidatorRevokeActiveParys => 310_000,
        ValidatorRevokePendingParys => 320_000,
        ValidatorActivateParys => 210_000,
        GovernanceVote => 550_000,
        OtherTokenTransfer | OtherTokenApprove | EscrowTransfer | EscrowWithdraw | Other
        | NftTransfer => return None,
    };
    Some(gas)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeeTokenKind {
    Native,
    Stable,
}

fn fee_token_kind(tokens: &TokenRegistry, fee_token: Option<Address>) -> Result<FeeTokenKind> {
    match fee_token {
        None => Ok(FeeTokenKind::Native),
        Some(addr) if addr == tokens.native().address => Ok(FeeTokenKind::Native),
        Some(addr) if tokens.is_stable_token(addr) => Ok(FeeTokenKind::Stable),
        Some(addr) => Err(ParysError::Config(format!("Unsupported fee currency {addr}"))),
    }
}

/// Resolve a gas limit for a transaction type.
///
/// Uses the precomputed table unless `force` is set or the type has no entry, in
/// which case the draft is estimated live through the signer. Paying in a stable
/// token inflates the limit by [`STABLE_TOKEN_GAS_MULTIPLIER`]; live estimates paid
/// in the native token are inflated by [`NATIVE_GAS_MULTIPLIER`].
pub async fn estimate_gas_limit<S: TransactionSigner>(
    signer: &S,
    tokens: &TokenRegistry,
    tx_type: TransactionType,
    tx: Option<&TxDraft>,
    fee_token: Option<Address>,
    force: bool,
) -> Result<u64> {
    let kind = fee_token_kind(tokens, fee_token)?;

    match precomputed_gas_limit(tx_type) {
        Some(gas_limit) if !force => {
            tracing::debug!(?tx_type, gas_limit, ?kind, "Using precomputed gas");
            Ok(match kind {
                FeeTokenKind::Native => gas_limit,
                FeeTokenKind::Stable => gas_limit * STABLE_TOKEN_GAS_MULTIPLIER,
            })
        }
        _ => {
            let tx = tx.ok_or_else(|| {
                ParysError::GasEstimation(
                    "Tx must be provided when forcing gas estimation".to_string(),
                )
            })?;
            tracing::debug!(?tx_type, "Manually computing gas estimate");
            let gas_limit = signer.estimate_gas(tx).await?;
            Ok(match kind {
                FeeTokenKind::Native => gas_limit * NATIVE_GAS_MULTIPLIER,
                FeeTokenKind::Stable => gas_limit * STABLE_TOKEN_GAS_MULTIPLIER,
            })
        }
    }
}

/// Produces [`FeeEstimate`]s for pending actions
pub struct FeeEstimator<'a, S, C> {
    signer: &'a S,
    chain: &'a C,
    contracts: &'a ContractRegistry,
    tokens: &'a TokenRegistry,
    config: &'a NetworkConfig,
}

impl<'a, S: TransactionSigner, C: ChainGateway> FeeEstimator<'a, S, C> {
    pub fn new(
        signer: &'a S,
        chain: &'a C,
        contracts: &'a ContractRegistry,
        tokens: &'a TokenRegistry,
        config: &'a NetworkConfig,
    ) -> Self {
        Self {
            signer,
            chain,
            contracts,
            tokens,
            config,
        }
    }

    /// Gas price in `fee_token`: network minimum × [`GAS_PRICE_MULTIPLIER`]
    pub async fn gas_price(&self, fee_token: Address) -> Result<U256> {
        let minimum = self
            .contracts
            .get(ContractId::GasPriceMinimum)
            .call(
                self.chain,
                &IGasPriceMinimum::getGasPriceMinimumCall {
                    tokenAddress: fee_token,
                },
            )
            .await?;
        Ok(minimum * U256::from(GAS_PRICE_MULTIPLIER))
    }

    fn fee_token_or_native(&self, fee_token: Option<Address>) -> Address {
        fee_token.unwrap_or_else(|| self.tokens.native().address)
    }

    fn finish(&self, gas_price: U256, gas_limit: u64, fee_token: Address) -> FeeEstimate {
        let estimate = FeeEstimate::new(gas_price, gas_limit, fee_token);
        match self.config.gateway_fee_recipient {
            Some(recipient) if !self.config.gateway_fee.is_zero() => {
                estimate.with_gateway_fee(recipient, self.config.gateway_fee)
            }
            _ => estimate,
        }
    }

    /// Full fee estimate for one transaction
    pub async fn estimate_fee(
        &self,
        tx_type: TransactionType,
        tx: Option<&TxDraft>,
        fee_token: Option<Address>,
        force: bool,
    ) -> Result<FeeEstimate> {
        let token = self.fee_token_or_native(fee_token);
        let gas_limit =
            estimate_gas_limit(self.signer, self.tokens, tx_type, tx, Some(token), force).await?;
        let gas_price = self.gas_price(token).await?;
        Ok(self.finish(gas_price, gas_limit, token))
    }

    /// One estimate per plan item, in plan order, sharing a single gas price lookup
    pub async fn estimate_plan_fees(
        &self,
        plan: &[PlanItem],
        fee_token: Option<Address>,
    ) -> Result<Vec<FeeEstimate>> {
        let token = self.fee_token_or_native(fee_token);
        let gas_price = self.gas_price(token).await?;

        let mut estimates = Vec::with_capacity(plan.len());
        for item in plan {
            let gas_limit = estimate_gas_limit(
                self.signer,
                self.tokens,
                item.tx_type(),
                None,
                Some(token),
                false,
            )
            .await?;
            estimates.push(self.finish(gas_price, gas_limit, token));
        }
        tracing::debug!(items = plan.len(), %gas_price, "Estimated plan fees");
        Ok(estimates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::signer::mock::MockSigner;
    use alloy::sol_types::SolValue;

    fn tokens() -> TokenRegistry {
        TokenRegistry::new(&NetworkConfig::alfajores())
    }

    #[tokio::test]
    async fn test_precomputed_multipliers() {
        let tokens = tokens();
        let signer = MockSigner::new(44787);
        let native = tokens.native().address;
        let pusd = tokens.stable_tokens()[0].address;

        let gas = estimate_gas_limit(&signer, &tokens, TransactionType::LockParys, None, None, false)
            .await
            .unwrap();
        assert_eq!(gas, 95_000);
        let gas = estimate_gas_limit(
            &signer,
            &tokens,
            TransactionType::LockParys,
            None,
            Some(native),
            false,
        )
        .await
        .unwrap();
        assert_eq!(gas, 95_000);
        let gas = estimate_gas_limit(
            &signer,
            &tokens,
            TransactionType::RelockParys,
            None,
            Some(pusd),
            false,
        )
        .await
        .unwrap();
        assert_eq!(gas, 150_000 * 5);
    }

    #[tokio::test]
    async fn test_live_estimation() {
        let tokens = tokens();
        let signer = MockSigner::new(44787).with_gas_estimate(50_000);
        let pusd = tokens.stable_tokens()[0].address;
        let draft = TxDraft::new(Address::repeat_byte(1), vec![]);

        let gas = estimate_gas_limit(
            &signer,
            &tokens,
            TransactionType::LockParys,
            Some(&draft),
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(gas, 100_000);
        let gas =
            estimate_gas_limit(&signer, &tokens, TransactionType::Other, Some(&draft), Some(pusd), false)
                .await
                .unwrap();
        assert_eq!(gas, 250_000);
    }

    #[tokio::test]
    async fn test_estimation_errors() {
        let tokens = tokens();
        let signer = MockSigner::new(44787);
        let err = estimate_gas_limit(&signer, &tokens, TransactionType::LockParys, None, None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ParysError::GasEstimation(_)));

        let err = estimate_gas_limit(
            &signer,
            &tokens,
            TransactionType::LockParys,
            None,
            Some(Address::repeat_byte(0x42)),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ParysError::Config(_)));
    }

    #[tokio::test]
    async fn test_plan_fees_use_doubled_gas_price_minimum() {
        let config = NetworkConfig::alfajores();
        let tokens = TokenRegistry::new(&config);
        let signer = MockSigner::new(config.chain_id);
        let contracts = ContractRegistry::new(&config, signer.address());
        let chain = MockChain::new();
        let gpm = config.contracts.gas_price_minimum;
        chain.on_call(move |to, _| (to == gpm).then(|| U256::from(5u64).abi_encode().into()));

        let estimator = FeeEstimator::new(&signer, &chain, &contracts, &tokens, &config);
        let plan = [
            PlanItem::RegisterAccount,
            PlanItem::Lock {
                amount: U256::from(1u64),
            },
        ];
        let fees = estimator.estimate_plan_fees(&plan, None).await.unwrap();
        assert_eq!(fees.len(), 2);
        assert_eq!(fees[0].gas_price, U256::from(10u64));
        assert_eq!(fees[0].gas_limit, 100_000);
        assert_eq!(fees[1].fee, U256::from(10u64 * 95_000));
        assert_eq!(fees[1].fee_token, tokens.native().address);
    }
}
