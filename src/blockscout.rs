//! Blockscout block explorer client
//!
//! Used for historical event logs only. Explorer data is a soft dependency:
//! callers log and skip failures instead of failing the user action.

use alloy::primitives::{Address, Bytes, B256};
use eyre::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Event log as returned by the explorer's `getLogs` action
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockscoutLog {
    pub address: String,
    /// Hex encoded
    pub block_number: String,
    pub data: String,
    /// Hex encoded unix seconds
    pub time_stamp: String,
    /// Unused topic slots come back as `null`
    pub topics: Vec<Option<String>>,
    pub transaction_hash: String,
}

impl BlockscoutLog {
    pub fn block_number(&self) -> Result<u64> {
        parse_hex_u64(&self.block_number).context("Invalid log block number")
    }

    /// Timestamp in unix seconds
    pub fn timestamp(&self) -> Result<u64> {
        parse_hex_u64(&self.time_stamp).context("Invalid log timestamp")
    }

    /// Non-empty topics, parsed
    pub fn topics(&self) -> Result<Vec<B256>> {
        self.topics
            .iter()
            .flatten()
            .map(|t| B256::from_str(t).with_context(|| format!("Invalid log topic {t}")))
            .collect()
    }

    pub fn data(&self) -> Result<Bytes> {
        Bytes::from_str(&self.data).context("Invalid log data")
    }
}

fn parse_hex_u64(value: &str) -> Result<u64> {
    let digits = value.trim_start_matches("0x");
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid hex number {value}"))
}

/// Check that a log has the expected first topic and is not older than `min_block`
pub fn validate_log(log: &BlockscoutLog, topic0: B256, min_block: u64) -> Result<()> {
    let first = log
        .topics
        .first()
        .and_then(Option::as_deref)
        .ok_or_else(|| eyre::eyre!("Log has no topics"))?;
    if B256::from_str(first).ok() != Some(topic0) {
        eyre::bail!("Unexpected log topic {first}");
    }
    let block = log.block_number()?;
    if block < min_block {
        eyre::bail!("Log block {block} is older than {min_block}");
    }
    Ok(())
}

#[derive(Deserialize)]
struct BlockscoutResponse<T> {
    status: String,
    message: String,
    result: Option<T>,
}

/// Block explorer API client
pub struct BlockscoutClient {
    url: String,
    client: reqwest::Client,
}

impl BlockscoutClient {
    /// Create a client for an explorer base URL (without the `/api` suffix)
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("parys-sdk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn query<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}/api", self.url))
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to query blockscout")?
            .error_for_status()
            .context("Blockscout returned an error status")?;

        let body: BlockscoutResponse<T> = response
            .json()
            .await
            .context("Failed to parse blockscout response")?;

        if body.status != "1" {
            eyre::bail!("Blockscout query failed: {}", body.message);
        }
        body.result
            .ok_or_else(|| eyre::eyre!("Blockscout response has no result"))
    }

    /// Logs emitted by `address` with first topic `topic0` within a block range
    pub async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<BlockscoutLog>> {
        self.query(&[
            ("module", "logs".to_string()),
            ("action", "getLogs".to_string()),
            ("fromBlock", from_block.to_string()),
            ("toBlock", to_block.to_string()),
            ("address", address.to_string()),
            ("topic0", topic0.to_string()),
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "0xa9981ebfc3b766a742486e898f54959b050a66006dbce1a4155c1f84a08bcf41";

    fn log_json() -> serde_json::Value {
        serde_json::json!({
            "address": "0xfdd8bd58115ffbf04e47411c1d228ecc45e93075",
            "blockNumber": "0x64",
            "data": "0x01",
            "timeStamp": "0x5f5e1000",
            "topics": [TOPIC, "0x000000000000000000000000765de816845861e75a25fca122bb6898b8b1282a", null, null],
            "transactionHash": "0xabc",
            "gasPrice": "0x1",
        })
    }

    #[test]
    fn test_parse_log() {
        let log: BlockscoutLog = serde_json::from_value(log_json()).unwrap();
        assert_eq!(log.block_number().unwrap(), 100);
        assert_eq!(log.timestamp().unwrap(), 0x5f5e1000);
        assert_eq!(log.topics().unwrap().len(), 2);
        assert_eq!(log.data().unwrap(), Bytes::from(vec![1u8]));
    }

    #[test]
    fn test_validate_log() {
        let log: BlockscoutLog = serde_json::from_value(log_json()).unwrap();
        let topic = B256::from_str(TOPIC).unwrap();
        assert!(validate_log(&log, topic, 100).is_ok());
        assert!(validate_log(&log, topic, 101).is_err());
        assert!(validate_log(&log, B256::ZERO, 0).is_err());
    }

    #[test]
    fn test_failed_response_has_no_result() {
        let body: BlockscoutResponse<Vec<BlockscoutLog>> = serde_json::from_value(serde_json::json!({
            "status": "0",
            "message": "No logs found",
            "result": []
        }))
        .unwrap();
        assert_eq!(body.status, "0");
        assert_eq!(body.message, "No logs found");
        assert_eq!(body.result.map(|r| r.len()), Some(0));
    }
}
