//! Fetching AMM state for every stable token

use super::rate::{ExchangeRate, ToNativeRates};
use crate::amount::to_fixidity;
use crate::chain::ChainGateway;
use crate::constants::{EXCHANGE_RATE_STALE_TIME, MAX_EXCHANGE_SPREAD};
use crate::contracts::{ContractHandle, ContractRegistry, IExchange};
use crate::error::{ParysError, Result};
use crate::tokens::{Token, TokenRegistry};
use crate::utils::{is_stale, now_millis};
use alloy::primitives::U256;
use futures::future::try_join_all;

/// Read spread and buckets from a stable token's exchange and validate them
pub async fn fetch_exchange_rate<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    token: &Token,
) -> Result<ExchangeRate> {
    let exchange_address = token.exchange_address.ok_or_else(|| {
        ParysError::Config(format!("Token {} has no known exchange address", token.symbol))
    })?;
    let exchange = ContractHandle::new(exchange_address, contracts.signer());

    let buckets_call = IExchange::getBuyAndSellBucketsCall { sellGold: false };
    let (spread, buckets) = tokio::try_join!(
        exchange.call(chain, &IExchange::spreadCall {}),
        exchange.call(chain, &buckets_call),
    )?;

    let max_spread = to_fixidity(MAX_EXCHANGE_SPREAD)?;
    if spread.is_zero() || spread > max_spread {
        return Err(ParysError::ChainQuery(format!(
            "Invalid exchange spread for {}: {spread}",
            token.symbol
        )));
    }

    // Not selling the native token: the native bucket is bought from
    let parys_bucket = buckets.buyBucket;
    let stable_bucket = buckets.sellBucket;
    if parys_bucket == U256::ZERO || stable_bucket == U256::ZERO {
        return Err(ParysError::ChainQuery(format!(
            "Invalid exchange buckets for {}: {parys_bucket}, {stable_bucket}",
            token.symbol
        )));
    }

    Ok(ExchangeRate {
        parys_bucket,
        stable_bucket,
        spread,
        last_updated: now_millis(),
    })
}

/// Fetch rates for every stable token concurrently
pub async fn fetch_exchange_rates<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    tokens: &TokenRegistry,
) -> Result<ToNativeRates> {
    let stables = tokens.stable_tokens();
    let rates = try_join_all(
        stables
            .iter()
            .map(|token| fetch_exchange_rate(chain, contracts, token)),
    )
    .await?;
    Ok(stables.iter().map(|t| t.address).zip(rates).collect())
}

/// Whether cached rates must be refetched
pub fn are_rates_stale(rates: &ToNativeRates) -> bool {
    rates.is_empty()
        || rates
            .values()
            .any(|rate| is_stale(rate.last_updated, EXCHANGE_RATE_STALE_TIME))
}

/// Refresh `cache` if stale. With `force`, the cache is cleared first so a
/// failed refetch never leaves old rates behind.
pub async fn refresh_exchange_rates<C: ChainGateway>(
    cache: &mut ToNativeRates,
    force: bool,
    chain: &C,
    contracts: &ContractRegistry,
    tokens: &TokenRegistry,
) -> Result<ToNativeRates> {
    if force {
        cache.clear();
    }
    if are_rates_stale(cache) {
        tracing::debug!(force, "Fetching exchange rates");
        *cache = fetch_exchange_rates(chain, contracts, tokens).await?;
    }
    Ok(cache.clone())
}
