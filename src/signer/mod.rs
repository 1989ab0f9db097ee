//! Transaction signer abstraction for PARYS SDK
//!
//! Two signer variants share one capability trait: a local private key held
//! for the session and a Ledger hardware wallet driven over a device
//! transport. [`WalletSigner`] is the tagged variant the session client stores
//! and dispatches on.

pub mod ledger;
mod local;

pub use ledger::{LedgerSigner, TokenInfo};
pub use local::LocalSigner;

use crate::chain::ChainGateway;
use crate::error::{ParysError, Result, SigningError};
use crate::transaction::TxDraft;
use alloy::primitives::{Address, Bytes, Signature};
use std::future::Future;

/// Trait for signing PARYS transactions
///
/// Implemented by:
/// - `LocalSigner`: in-memory private key
/// - `LedgerSigner`: Ledger device running the PARYS app
/// - `WalletSigner`: either of the above, chosen at runtime
pub trait TransactionSigner: Send + Sync {
    /// Returns the signer's address
    fn address(&self) -> Address;

    /// Chain the signer produces replay-protected signatures for
    fn chain_id(&self) -> u64;

    /// Signs a draft, returning the serialized signed transaction
    fn sign_transaction(&self, tx: &TxDraft) -> impl Future<Output = Result<Bytes>> + Send;

    /// Signs an arbitrary message with the personal-message prefix
    fn sign_message(&self, message: &[u8]) -> impl Future<Output = Result<Signature>> + Send;

    /// Live gas estimate for a draft, sent from the signer's address
    fn estimate_gas(&self, tx: &TxDraft) -> impl Future<Output = Result<u64>> + Send;
}

/// The session's signer: one of the supported wallet kinds
pub enum WalletSigner {
    Local(LocalSigner),
    Ledger(LedgerSigner),
}

impl WalletSigner {
    pub fn is_ledger(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}

impl From<LocalSigner> for WalletSigner {
    fn from(signer: LocalSigner) -> Self {
        Self::Local(signer)
    }
}

impl From<LedgerSigner> for WalletSigner {
    fn from(signer: LedgerSigner) -> Self {
        Self::Ledger(signer)
    }
}

impl TransactionSigner for WalletSigner {
    fn address(&self) -> Address {
        match self {
            Self::Local(signer) => signer.address(),
            Self::Ledger(signer) => signer.address(),
        }
    }

    fn chain_id(&self) -> u64 {
        match self {
            Self::Local(signer) => signer.chain_id(),
            Self::Ledger(signer) => signer.chain_id(),
        }
    }

    async fn sign_transaction(&self, tx: &TxDraft) -> Result<Bytes> {
        match self {
            Self::Local(signer) => signer.sign_transaction(tx).await,
            Self::Ledger(signer) => signer.sign_transaction(tx).await,
        }
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        match self {
            Self::Local(signer) => signer.sign_message(message).await,
            Self::Ledger(signer) => signer.sign_message(message).await,
        }
    }

    async fn estimate_gas(&self, tx: &TxDraft) -> Result<u64> {
        match self {
            Self::Local(signer) => signer.estimate_gas(tx).await,
            Self::Ledger(signer) => signer.estimate_gas(tx).await,
        }
    }
}

/// Fill and check a draft before signing.
///
/// `to`, gas price and gas limit are mandatory. A missing nonce is fetched as the
/// pending count, a missing chain id is set to the signer's. A chain id or `from`
/// that disagrees with the signer is rejected.
pub(crate) async fn prepare_draft<C: ChainGateway>(
    tx: &TxDraft,
    address: Address,
    chain_id: u64,
    chain: &C,
) -> Result<TxDraft> {
    if tx.to.is_none() || tx.gas_price.is_none() || tx.gas_limit.is_none() {
        tracing::error!(?tx, "To, gasPrice, and gasLimit fields all mandatory");
        return Err(SigningError::IncompleteTransaction("to, gasPrice, gasLimit").into());
    }

    let mut tx = tx.clone();
    if tx.nonce.is_none() {
        tx.nonce = Some(chain.pending_nonce(address).await?);
    }

    match tx.chain_id {
        None => tx.chain_id = Some(chain_id),
        Some(id) if id != chain_id => {
            return Err(SigningError::Mismatch("Chain Id mismatch".to_string()).into())
        }
        Some(_) => {}
    }

    if let Some(from) = tx.from {
        if from != address {
            return Err(
                SigningError::Mismatch("Transaction from address mismatch".to_string()).into(),
            );
        }
    }

    Ok(tx)
}

/// Estimate gas for a draft as if sent by `address`
pub(crate) async fn estimate_from<C: ChainGateway>(
    chain: &C,
    tx: &TxDraft,
    address: Address,
) -> Result<u64> {
    let tx = tx.clone().with_from(address);
    chain.estimate_gas(&tx).await.map_err(|e| match e {
        ParysError::GasEstimation(_) => e,
        other => ParysError::GasEstimation(other.to_string()),
    })
}

#[cfg(test)]
pub(crate) mod mock {
    //! Deterministic in-memory signer for module tests

    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use std::sync::Mutex;

    pub struct MockSigner {
        key: PrivateKeySigner,
        chain_id: u64,
        gas_estimate: Option<u64>,
        /// Drafts passed to `sign_transaction`, in order
        pub signed: Mutex<Vec<TxDraft>>,
    }

    impl MockSigner {
        pub fn new(chain_id: u64) -> Self {
            Self {
                key: PrivateKeySigner::random(),
                chain_id,
                gas_estimate: None,
                signed: Mutex::new(Vec::new()),
            }
        }

        pub fn with_gas_estimate(mut self, gas: u64) -> Self {
            self.gas_estimate = Some(gas);
            self
        }

        pub fn signed_nonces(&self) -> Vec<u64> {
            self.signed
                .lock()
                .unwrap()
                .iter()
                .filter_map(|tx| tx.nonce)
                .collect()
        }
    }

    impl TransactionSigner for MockSigner {
        fn address(&self) -> Address {
            self.key.address()
        }

        fn chain_id(&self) -> u64 {
            self.chain_id
        }

        async fn sign_transaction(&self, tx: &TxDraft) -> Result<Bytes> {
            let mut tx = tx.clone();
            tx.chain_id.get_or_insert(self.chain_id);
            let hash = tx.signing_hash()?;
            let signature = self.key.sign_hash_sync(&hash).map_err(SigningError::from)?;
            let raw = tx.encode_signed(&signature)?;
            self.signed.lock().unwrap().push(tx);
            Ok(raw)
        }

        async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
            Ok(self
                .key
                .sign_message_sync(message)
                .map_err(SigningError::from)?)
        }

        async fn estimate_gas(&self, _tx: &TxDraft) -> Result<u64> {
            self.gas_estimate
                .ok_or_else(|| ParysError::GasEstimation("no estimate configured".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use alloy::primitives::U256;

    fn complete() -> TxDraft {
        let mut tx = TxDraft::new(Address::repeat_byte(3), vec![1, 2, 3]).with_gas_limit(21_000);
        tx.gas_price = Some(U256::from(1u8));
        tx
    }

    #[tokio::test]
    async fn test_prepare_fills_nonce_and_chain_id() {
        let chain = MockChain::new();
        *chain.nonce.lock().unwrap() = 9;
        let tx = prepare_draft(&complete(), Address::repeat_byte(1), 44787, &chain)
            .await
            .unwrap();
        assert_eq!(tx.nonce, Some(9));
        assert_eq!(tx.chain_id, Some(44787));

        let kept = prepare_draft(&complete().with_nonce(2), Address::repeat_byte(1), 44787, &chain)
            .await
            .unwrap();
        assert_eq!(kept.nonce, Some(2));
    }

    #[tokio::test]
    async fn test_prepare_rejects_mismatches() {
        let chain = MockChain::new();
        let signer = Address::repeat_byte(1);

        let err = prepare_draft(&complete().with_chain_id(1), signer, 44787, &chain)
            .await
            .unwrap_err();
        assert!(matches!(err, ParysError::Signing(SigningError::Mismatch(_))));

        let err = prepare_draft(&complete().with_from(Address::repeat_byte(2)), signer, 44787, &chain)
            .await
            .unwrap_err();
        assert!(matches!(err, ParysError::Signing(SigningError::Mismatch(_))));

        let incomplete = TxDraft::new(Address::repeat_byte(3), vec![]);
        let err = prepare_draft(&incomplete, signer, 44787, &chain).await.unwrap_err();
        assert!(matches!(
            err,
            ParysError::Signing(SigningError::IncompleteTransaction(_))
        ));
    }
}
