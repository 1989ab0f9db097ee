//! Chain access: reads, raw submission and receipts

use crate::config::NetworkConfig;
use crate::error::{ParysError, Result};
use crate::transaction::TxDraft;
use alloy::network::{Ethereum, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::http::reqwest::Url;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Minimal receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub block_number: u64,
    pub gas_used: u64,
    /// `false` when the transaction reverted
    pub status: bool,
}

impl From<&TransactionReceipt> for TxReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash(),
            from: receipt.from(),
            to: receipt.to(),
            block_number: receipt.block_number().unwrap_or_default(),
            gas_used: receipt.gas_used(),
            status: receipt.status(),
        }
    }
}

/// Read and submission access to the chain
pub trait ChainGateway: Send + Sync {
    /// `eth_call` against `to`
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes>> + Send;

    /// Transaction count including pending transactions
    fn pending_nonce(&self, address: Address) -> impl Future<Output = Result<u64>> + Send;

    /// Native token balance
    fn native_balance(&self, address: Address) -> impl Future<Output = Result<U256>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Live gas estimation for a draft
    fn estimate_gas(&self, tx: &TxDraft) -> impl Future<Output = Result<u64>> + Send;

    /// Broadcast a signed transaction
    fn send_raw_transaction(&self, raw: Bytes) -> impl Future<Output = Result<TxHash>> + Send;

    /// Receipt if the transaction has been mined
    fn get_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>>> + Send;
}

/// Poll for a receipt until it appears.
///
/// Unbounded. Callers race it against a timer and a cancellation token.
pub async fn wait_for_receipt<C: ChainGateway>(
    chain: &C,
    tx_hash: TxHash,
    poll_interval: Duration,
) -> Result<TxReceipt> {
    loop {
        if let Some(receipt) = chain.get_receipt(tx_hash).await? {
            return Ok(receipt);
        }
        tracing::trace!(%tx_hash, "receipt not available yet");
        tokio::time::sleep(poll_interval).await;
    }
}

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// JSON-RPC implementation of [`ChainGateway`] over HTTP
#[derive(Clone)]
pub struct RpcChain {
    provider: ReadProvider,
}

impl RpcChain {
    /// Connect to an RPC endpoint
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| ParysError::Config(format!("Invalid RPC URL {rpc_url}: {e}")))?;
        // No fillers: nonce, gas and signing are handled by the SDK itself
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// Connect to the primary RPC URL of a network
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::connect(&config.rpc_url)
    }
}

impl ChainGateway for RpcChain {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.provider
            .call(TransactionRequest::default().with_to(to).with_input(data))
            .await
            .map_err(|e| ParysError::chain("eth_call failed", e))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| ParysError::chain("Failed to get nonce", e))
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| ParysError::chain("Failed to get balance", e))
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ParysError::chain("Failed to get block number", e))
    }

    async fn estimate_gas(&self, tx: &TxDraft) -> Result<u64> {
        self.provider
            .estimate_gas(tx.to_request())
            .await
            .map_err(|e| ParysError::GasEstimation(e.to_string()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| ParysError::Submission(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt: Option<TransactionReceipt> = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ParysError::chain("Failed to get transaction receipt", e))?;
        Ok(receipt.as_ref().map(TxReceipt::from))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory chain used across module tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type CallHandler = Box<dyn Fn(Address, &[u8]) -> Option<Bytes> + Send + Sync>;

    #[derive(Default)]
    pub struct MockChain {
        pub nonce: Mutex<u64>,
        pub balances: Mutex<HashMap<Address, U256>>,
        pub sent: Mutex<Vec<Bytes>>,
        /// Per-submission outcomes (`false` = reverted); defaults to success
        pub outcomes: Mutex<Vec<bool>>,
        /// Submissions whose receipt never appears
        pub never_mined: Mutex<Vec<usize>>,
        /// Receipt polls each submission misses before it is mined
        pub mined_after_polls: Mutex<HashMap<usize, usize>>,
        /// Receipt polls seen per submission
        pub receipt_polls: Mutex<HashMap<usize, usize>>,
        pub gas_estimate: Mutex<Option<u64>>,
        handlers: Mutex<Vec<CallHandler>>,
    }

    impl MockChain {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an `eth_call` responder; the first one returning `Some` wins
        pub fn on_call(
            &self,
            handler: impl Fn(Address, &[u8]) -> Option<Bytes> + Send + Sync + 'static,
        ) {
            self.handlers.lock().unwrap().push(Box::new(handler));
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn hash_of(index: usize) -> TxHash {
            TxHash::with_last_byte(index as u8 + 1)
        }
    }

    impl ChainGateway for MockChain {
        async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
            let handlers = self.handlers.lock().unwrap();
            handlers
                .iter()
                .find_map(|h| h(to, &data))
                .ok_or_else(|| ParysError::ChainQuery(format!("unexpected call to {to}")))
        }

        async fn pending_nonce(&self, _address: Address) -> Result<u64> {
            Ok(*self.nonce.lock().unwrap())
        }

        async fn native_balance(&self, address: Address) -> Result<U256> {
            Ok(self
                .balances
                .lock()
                .unwrap()
                .get(&address)
                .copied()
                .unwrap_or_default())
        }

        async fn block_number(&self) -> Result<u64> {
            Ok(100)
        }

        async fn estimate_gas(&self, _tx: &TxDraft) -> Result<u64> {
            self.gas_estimate
                .lock()
                .unwrap()
                .ok_or_else(|| ParysError::GasEstimation("no estimate configured".into()))
        }

        async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(raw);
            Ok(Self::hash_of(sent.len() - 1))
        }

        async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
            let index = tx_hash.0[31] as usize - 1;
            if self.never_mined.lock().unwrap().contains(&index) {
                return Ok(None);
            }
            let polls = {
                let mut seen = self.receipt_polls.lock().unwrap();
                let count = seen.entry(index).or_default();
                *count += 1;
                *count
            };
            let required = self.mined_after_polls.lock().unwrap().get(&index).copied();
            if required.is_some_and(|k| polls <= k) {
                return Ok(None);
            }
            let status = self.outcomes.lock().unwrap().get(index).copied().unwrap_or(true);
            Ok(Some(TxReceipt {
                transaction_hash: tx_hash,
                from: Address::ZERO,
                to: None,
                block_number: 100 + index as u64,
                gas_used: 21_000,
                status,
            }))
        }
    }
}
