//! Local private key signer

use super::{estimate_from, prepare_draft, TransactionSigner};
use crate::chain::RpcChain;
use crate::config::NetworkConfig;
use crate::error::{ParysError, Result, SigningError};
use crate::transaction::TxDraft;
use alloy::primitives::{Address, Bytes, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

/// Local signer using a private key
///
/// The key lives in memory for the lifetime of the session only. Signing is
/// synchronous; the chain handle is used for nonce lookup and gas estimation.
pub struct LocalSigner {
    key: PrivateKeySigner,
    chain_id: u64,
    chain: RpcChain,
}

impl LocalSigner {
    pub fn new(key: PrivateKeySigner, chain_id: u64, chain: RpcChain) -> Self {
        Self {
            key,
            chain_id,
            chain,
        }
    }

    /// Create a LocalSigner from a private key hex string
    ///
    /// # Arguments
    ///
    /// * `private_key` - Hex-encoded private key (with or without 0x prefix)
    /// * `config` - Network whose chain id and RPC endpoint the signer uses
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let signer = LocalSigner::from_private_key("0x...", &NetworkConfig::alfajores())?;
    /// ```
    pub fn from_private_key(private_key: impl AsRef<str>, config: &NetworkConfig) -> Result<Self> {
        let key = private_key.as_ref();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let key: PrivateKeySigner = key
            .parse()
            .map_err(|e| SigningError::Key(format!("Failed to parse private key: {e}")))?;

        Ok(Self::new(key, config.chain_id, RpcChain::from_config(config)?))
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.key.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn sign_transaction(&self, tx: &TxDraft) -> Result<Bytes> {
        let tx = prepare_draft(tx, self.address(), self.chain_id, &self.chain).await?;
        let hash = tx.signing_hash()?;
        let signature = self
            .key
            .sign_hash_sync(&hash)
            .map_err(SigningError::from)?;
        Ok(tx.encode_signed(&signature)?)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        self.key
            .sign_message_sync(message)
            .map_err(|e| ParysError::Signing(e.into()))
    }

    async fn estimate_gas(&self, tx: &TxDraft) -> Result<u64> {
        estimate_from(&self.chain, tx, self.address()).await
    }
}
