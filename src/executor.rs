//! Sequential execution of transaction plans
//!
//! Each item is built, signed, submitted and confirmed before the next one is
//! touched. The nonce is read once up front and incremented locally, so a plan
//! of `n` items always uses `n` consecutive nonces. A failure stops the plan:
//! confirmed items stand, later items are never built.

use crate::chain::{wait_for_receipt, ChainGateway, TxReceipt};
use crate::config::ContractId;
use crate::constants::{CONFIRMATION_TIMEOUT_SECS, RECEIPT_POLL_INTERVAL_SECS};
use crate::contracts::{ContractRegistry, IAccounts};
use crate::error::{ParysError, PlanFailure, Result};
use crate::feed::{PlaceholderTransaction, TransactionType};
use crate::fees::FeeEstimate;
use crate::plan::{build_item_tx, PlanItem};
use crate::signer::TransactionSigner;
use crate::utils::now_secs;
use alloy::primitives::{Address, TxHash};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Where a plan item currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    BuildingItem,
    Signing,
    Submitted { tx_hash: TxHash },
    Confirmed { placeholder: Box<PlaceholderTransaction> },
    Failed { error: String },
}

/// Progress event emitted while a plan runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub index: usize,
    pub tx_type: TransactionType,
    pub status: ItemStatus,
}

/// Drop a leading registration item (and its fee) when the account turns out to
/// be registered already.
///
/// Local registration state may be stale by the time a plan runs, and
/// registering twice reverts.
pub async fn drop_stale_registration<C: ChainGateway>(
    chain: &C,
    contracts: &ContractRegistry,
    account: Address,
    plan: &mut Vec<PlanItem>,
    fees: &mut Vec<FeeEstimate>,
) -> Result<()> {
    if plan.first() != Some(&PlanItem::RegisterAccount) {
        return Ok(());
    }
    let is_registered = contracts
        .get(ContractId::Accounts)
        .call(chain, &IAccounts::isAccountCall { account })
        .await?;
    if is_registered {
        tracing::info!(%account, "Account already registered, dropping registration item");
        plan.remove(0);
        if !fees.is_empty() {
            fees.remove(0);
        }
    }
    Ok(())
}

/// Runs plans against one signer and chain
pub struct PlanExecutor<'a, S, C> {
    signer: &'a S,
    chain: &'a C,
    contracts: &'a ContractRegistry,
    native_token: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    cancel: CancellationToken,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl<'a, S: TransactionSigner, C: ChainGateway> PlanExecutor<'a, S, C> {
    pub fn new(
        signer: &'a S,
        chain: &'a C,
        contracts: &'a ContractRegistry,
        native_token: Address,
    ) -> Self {
        Self {
            signer,
            chain,
            contracts,
            native_token,
            confirmation_timeout: Duration::from_secs(CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(RECEIPT_POLL_INTERVAL_SECS),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Stop before the next item, or stop waiting for the current confirmation
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, index: usize, tx_type: TransactionType, status: ItemStatus) {
        if let Some(progress) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = progress.send(ProgressEvent {
                index,
                tx_type,
                status,
            });
        }
    }

    /// Execute `plan`, paying item `i` with `fees[i]`.
    ///
    /// Returns one placeholder record per confirmed item.
    pub async fn execute(
        &self,
        plan: &[PlanItem],
        fees: &[FeeEstimate],
    ) -> Result<Vec<PlaceholderTransaction>, PlanFailure> {
        let fail = |index: usize, confirmed: usize, source: ParysError| {
            let tx_type = plan
                .get(index)
                .map(PlanItem::tx_type)
                .unwrap_or(TransactionType::Other);
            self.emit(
                index,
                tx_type,
                ItemStatus::Failed {
                    error: source.to_string(),
                },
            );
            PlanFailure {
                index,
                tx_type,
                confirmed,
                source,
            }
        };

        if plan.len() != fees.len() {
            return Err(fail(
                0,
                0,
                ParysError::Config(format!(
                    "Plan has {} items but {} fee estimates",
                    plan.len(),
                    fees.len()
                )),
            ));
        }

        let address = self.signer.address();
        let mut nonce = self
            .chain
            .pending_nonce(address)
            .await
            .map_err(|e| fail(0, 0, e))?;
        tracing::info!(items = plan.len(), %address, nonce, "Executing plan");

        let mut placeholders = Vec::with_capacity(plan.len());
        for (index, (item, fee)) in plan.iter().zip(fees).enumerate() {
            if self.cancel.is_cancelled() {
                return Err(fail(index, index, ParysError::Cancelled));
            }
            let placeholder = self
                .execute_item(index, item, fee, nonce)
                .await
                .map_err(|e| fail(index, index, e))?;
            nonce += 1;
            placeholders.push(placeholder);
        }

        tracing::info!(items = plan.len(), "Plan executed");
        Ok(placeholders)
    }

    async fn execute_item(
        &self,
        index: usize,
        item: &PlanItem,
        fee: &FeeEstimate,
        nonce: u64,
    ) -> Result<PlaceholderTransaction> {
        let tx_type = item.tx_type();

        self.emit(index, tx_type, ItemStatus::BuildingItem);
        let draft = build_item_tx(item, self.chain, self.contracts)
            .await?
            .with_nonce(nonce)
            .with_fee(fee, self.native_token);

        self.emit(index, tx_type, ItemStatus::Signing);
        let raw = self.signer.sign_transaction(&draft).await?;

        let tx_hash = self
            .chain
            .send_raw_transaction(raw)
            .await
            .map_err(|e| match e {
                ParysError::Submission(_) => e,
                other => ParysError::Submission(other.to_string()),
            })?;
        tracing::info!(index, action = ?tx_type, nonce, %tx_hash, "Transaction submitted");
        self.emit(index, tx_type, ItemStatus::Submitted { tx_hash });

        let receipt = self.confirm(tx_hash).await?;
        if !receipt.status {
            tracing::error!(index, %tx_hash, "Transaction reverted");
            return Err(ParysError::Submission(format!("Transaction {tx_hash} reverted")));
        }

        let placeholder =
            PlaceholderTransaction::from_receipt(tx_type, &receipt, item.amount(), fee, nonce, now_secs())
                .with_details(item.details());
        tracing::info!(index, %tx_hash, block = receipt.block_number, "Transaction confirmed");
        self.emit(
            index,
            tx_type,
            ItemStatus::Confirmed {
                placeholder: Box::new(placeholder.clone()),
            },
        );
        Ok(placeholder)
    }

    /// Wait for a receipt, bounded by the confirmation timeout and the cancellation token.
    ///
    /// Both bounds leave the transaction outstanding, so both report a timeout.
    async fn confirm(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        tokio::select! {
            receipt = wait_for_receipt(self.chain, tx_hash, self.poll_interval) => receipt,
            _ = tokio::time::sleep(self.confirmation_timeout) => {
                tracing::warn!(%tx_hash, "Confirmation timed out");
                Err(ParysError::Timeout(tx_hash.to_string()))
            }
            _ = self.cancel.cancelled() => {
                tracing::warn!(%tx_hash, "Confirmation wait cancelled");
                Err(ParysError::Timeout(format!("{tx_hash} (wait cancelled)")))
            }
        }
    }
}
