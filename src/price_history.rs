//! Native/stable price history from oracle `MedianUpdated` logs
//!
//! For each day missing from the cached history, a one minute block window at
//! that day's offset is scanned for oracle reports. Requests are paced with a
//! fixed pause and failed windows are skipped.

use crate::amount::from_fixidity;
use crate::blockscout::{validate_log, BlockscoutClient, BlockscoutLog};
use crate::chain::ChainGateway;
use crate::config::ContractId;
use crate::constants::{BLOCK_TIME_SECS, PAUSE_BETWEEN_FETCH_REQUESTS_MS};
use crate::contracts::{ContractRegistry, ISortedOracles};
use crate::error::{ParysError, Result};
use crate::tokens::Token;
use crate::utils::now_millis;
use alloy::primitives::Address;
use alloy::sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_HISTORY_NUM_DAYS: u64 = 7;
pub const MAX_TOKEN_PRICE_NUM_DAYS: u64 = 30;

const SECONDS_PER_DAY: u64 = 86_400;
const MS_PER_DAY: u64 = SECONDS_PER_DAY * 1000;
const BLOCK_FETCHING_INTERVAL_SECS: u64 = 60;
const MAX_TIME_FROM_NOW_FOR_LOG_MS: u64 = 600_000;
const EXPECTED_MIN_PARYS_TO_STABLE: f64 = 0.1;
const EXPECTED_MAX_PARYS_TO_STABLE: f64 = 100.0;

/// One price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPricePoint {
    /// Unix milliseconds
    pub timestamp: u64,
    pub price: f64,
}

/// Price points per quote token, oldest first
pub type PriceHistory = BTreeMap<Address, Vec<TokenPricePoint>>;

/// Number of blocks produced in `seconds`
pub fn blocks_per_interval(seconds: u64) -> u64 {
    seconds / BLOCK_TIME_SECS
}

/// Days (0 = today) within the last `num_days` that have no price point
pub fn find_missing_price_days(num_days: u64, history: Option<&PriceHistory>, now_ms: u64) -> Vec<u64> {
    let points: Vec<u64> = history
        .map(|h| h.values().flatten().map(|p| p.timestamp).collect())
        .unwrap_or_default();
    (0..num_days)
        .filter(|day| {
            let end = now_ms.saturating_sub(day * MS_PER_DAY);
            let start = end.saturating_sub(MS_PER_DAY);
            !points.iter().any(|t| *t > start && *t <= end)
        })
        .collect()
}

/// Merge new points into an existing history, dropping duplicate timestamps
pub fn merge_price_histories(updates: PriceHistory, old: Option<&PriceHistory>) -> PriceHistory {
    let mut merged = old.cloned().unwrap_or_default();
    for (token, points) in updates {
        let entry = merged.entry(token).or_default();
        entry.extend(points);
        entry.sort_by_key(|p| p.timestamp);
        entry.dedup_by_key(|p| p.timestamp);
    }
    merged
}

fn parse_oracle_log(
    log: &BlockscoutLog,
    search_token: Address,
    min_block: u64,
    now_ms: u64,
) -> eyre::Result<Option<TokenPricePoint>> {
    validate_log(log, ISortedOracles::MedianUpdated::SIGNATURE_HASH, min_block)?;
    let event = ISortedOracles::MedianUpdated::decode_raw_log(log.topics()?, &log.data()?)?;
    if event.token != search_token {
        return Ok(None);
    }

    let price = from_fixidity(event.value);
    if price <= EXPECTED_MIN_PARYS_TO_STABLE || price >= EXPECTED_MAX_PARYS_TO_STABLE {
        eyre::bail!("Invalid median value: {}", event.value);
    }

    let timestamp = log.timestamp()?.saturating_mul(1000);
    if timestamp == 0 || timestamp > now_ms + MAX_TIME_FROM_NOW_FOR_LOG_MS {
        eyre::bail!("Invalid timestamp: {}", log.time_stamp);
    }
    Ok(Some(TokenPricePoint { timestamp, price }))
}

/// First valid price for `token` among `logs`; unparseable logs are skipped
pub fn parse_oracle_logs_for_token(
    logs: &[BlockscoutLog],
    token: Address,
    min_block: u64,
    now_ms: u64,
) -> Option<TokenPricePoint> {
    for log in logs {
        match parse_oracle_log(log, token, min_block, now_ms) {
            Ok(Some(point)) => return Some(point),
            Ok(None) => continue,
            Err(e) => tracing::warn!(error = %e, "Unable to parse token price log, will attempt next"),
        }
    }
    tracing::error!(%token, "All log parse attempts failed or no log found for token");
    None
}

/// Fetch missing days of native/stable prices and merge them into `old`.
///
/// Returns `None` when nothing was missing.
pub async fn fetch_price_history<C: ChainGateway>(
    chain: &C,
    explorer: &BlockscoutClient,
    contracts: &ContractRegistry,
    stable_tokens: &[Token],
    num_days: u64,
    old: Option<&PriceHistory>,
) -> Result<Option<PriceHistory>> {
    if num_days > MAX_TOKEN_PRICE_NUM_DAYS {
        return Err(ParysError::Config(format!(
            "Cannot retrieve prices for such a wide window: {num_days}"
        )));
    }

    let missing = find_missing_price_days(num_days, old, now_millis());
    if missing.is_empty() {
        return Ok(None);
    }

    let latest_block = chain.block_number().await?;
    let oracle = contracts.get(ContractId::SortedOracles).address;
    let blocks_per_day = blocks_per_interval(SECONDS_PER_DAY);
    let blocks_per_window = blocks_per_interval(BLOCK_FETCHING_INTERVAL_SECS);

    let mut updates = PriceHistory::new();
    for day in missing {
        let to_block = latest_block.saturating_sub(blocks_per_day * day);
        let from_block = to_block.saturating_sub(blocks_per_window);

        let logs = match explorer
            .get_logs(oracle, ISortedOracles::MedianUpdated::SIGNATURE_HASH, from_block, to_block)
            .await
        {
            Ok(logs) if !logs.is_empty() => logs,
            Ok(_) => {
                tracing::error!(from_block, to_block, "No oracle logs found in time range");
                continue;
            }
            Err(e) => {
                tracing::error!(from_block, to_block, error = %e, "Failed to fetch oracle logs");
                continue;
            }
        };

        let now_ms = now_millis();
        for token in stable_tokens {
            if let Some(point) = parse_oracle_logs_for_token(&logs, token.address, from_block, now_ms) {
                updates.entry(token.address).or_default().push(point);
            }
        }
        tokio::time::sleep(Duration::from_millis(PAUSE_BETWEEN_FETCH_REQUESTS_MS)).await;
    }

    Ok(Some(merge_price_histories(updates, old)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::to_fixidity;
    use alloy::primitives::{B256, U256};
    use alloy::sol_types::SolValue;

    const TOKEN: Address = Address::repeat_byte(0x76);

    fn oracle_log(token: Address, value: U256, block: u64, timestamp_secs: u64) -> BlockscoutLog {
        BlockscoutLog {
            address: Address::repeat_byte(0xfd).to_string(),
            block_number: format!("{block:#x}"),
            data: alloy::hex::encode_prefixed(value.abi_encode()),
            time_stamp: format!("{timestamp_secs:#x}"),
            topics: vec![
                Some(ISortedOracles::MedianUpdated::SIGNATURE_HASH.to_string()),
                Some(B256::left_padding_from(token.as_slice()).to_string()),
                None,
            ],
            transaction_hash: "0x01".into(),
        }
    }

    #[test]
    fn test_parse_first_valid_log_for_token() {
        let now = now_millis();
        let secs = now / 1000;
        let logs = vec![
            oracle_log(Address::repeat_byte(1), to_fixidity("2").unwrap(), 10, secs),
            // out of the expected price band
            oracle_log(TOKEN, to_fixidity("500").unwrap(), 10, secs),
            oracle_log(TOKEN, to_fixidity("3.5").unwrap(), 10, secs),
        ];
        let point = parse_oracle_logs_for_token(&logs, TOKEN, 5, now).unwrap();
        assert_eq!(point.price, 3.5);
        assert_eq!(point.timestamp, secs * 1000);

        assert!(parse_oracle_logs_for_token(&logs, TOKEN, 11, now).is_none());
    }

    #[test]
    fn test_rejects_future_timestamp() {
        let now = now_millis();
        let future = (now + 2 * MAX_TIME_FROM_NOW_FOR_LOG_MS) / 1000;
        let logs = vec![oracle_log(TOKEN, to_fixidity("2").unwrap(), 10, future)];
        assert!(parse_oracle_logs_for_token(&logs, TOKEN, 0, now).is_none());
    }

    #[test]
    fn test_missing_days() {
        let now = 100 * MS_PER_DAY;
        assert_eq!(find_missing_price_days(3, None, now), vec![0, 1, 2]);

        let mut history = PriceHistory::new();
        history.insert(
            TOKEN,
            vec![TokenPricePoint {
                timestamp: now - MS_PER_DAY - 10,
                price: 1.0,
            }],
        );
        assert_eq!(find_missing_price_days(3, Some(&history), now), vec![0, 2]);
    }

    #[test]
    fn test_merge_dedupes_and_orders() {
        let point = |timestamp| TokenPricePoint {
            timestamp,
            price: 1.0,
        };
        let mut old = PriceHistory::new();
        old.insert(TOKEN, vec![point(1), point(3)]);
        let mut updates = PriceHistory::new();
        updates.insert(TOKEN, vec![point(3), point(2)]);
        let merged = merge_price_histories(updates, Some(&old));
        let timestamps: Vec<u64> = merged[&TOKEN].iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
    }

    #[test]
    fn test_block_windows() {
        assert_eq!(blocks_per_interval(SECONDS_PER_DAY), 17_280);
        assert_eq!(blocks_per_interval(BLOCK_FETCHING_INTERVAL_SECS), 12);
    }
}
