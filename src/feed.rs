//! Transaction types and locally synthesized feed records

use crate::amount::u256_decimal;
use crate::chain::TxReceipt;
use crate::fees::FeeEstimate;
use crate::types::VoteValue;
use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Kind of a wallet transaction.
///
/// Discriminants are persisted by feed consumers: new variants go at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionType {
    StableTokenTransfer,
    StableTokenTransferWithComment,
    StableTokenApprove,
    ParysTokenTransfer,
    ParysTokenTransferWithComment,
    ParysTokenApprove,
    ParysNativeTransfer,
    OtherTokenTransfer,
    OtherTokenApprove,
    EscrowTransfer,
    EscrowWithdraw,
    TokenExchange,
    AccountRegistration,
    LockParys,
    RelockParys,
    UnlockParys,
    WithdrawLockedParys,
    ValidatorVoteParys,
    ValidatorRevokeActiveParys,
    ValidatorRevokePendingParys,
    ValidatorActivateParys,
    GovernanceVote,
    Other,
    NftTransfer,
}

impl TransactionType {
    /// Whether this type belongs to the lock family (including registration)
    pub fn is_lock_type(self) -> bool {
        matches!(
            self,
            Self::AccountRegistration
                | Self::LockParys
                | Self::RelockParys
                | Self::UnlockParys
                | Self::WithdrawLockedParys
        )
    }

    /// Whether this type belongs to the validator staking family
    pub fn is_stake_type(self) -> bool {
        matches!(
            self,
            Self::ValidatorVoteParys
                | Self::ValidatorRevokeActiveParys
                | Self::ValidatorRevokePendingParys
                | Self::ValidatorActivateParys
        )
    }
}

/// Kind-specific fields of a placeholder record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlaceholderDetails {
    None,
    Stake { group_address: Address },
    GovernanceVote { proposal_id: u64, vote: VoteValue },
}

/// A feed record synthesized right after confirmation, before the indexer has it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderTransaction {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    #[serde(with = "u256_decimal")]
    pub value: U256,
    pub block_number: u64,
    pub nonce: u64,
    /// Unix seconds
    pub timestamp: u64,
    #[serde(with = "u256_decimal")]
    pub gas_price: U256,
    pub gas_used: u64,
    /// Token the fee was paid in
    pub fee_currency: Option<Address>,
    #[serde(with = "u256_decimal")]
    pub gateway_fee: U256,
    pub gateway_fee_recipient: Option<Address>,
    pub details: PlaceholderDetails,
}

impl PlaceholderTransaction {
    /// Build a placeholder from a confirmed receipt and the estimate it was signed with
    pub fn from_receipt(
        tx_type: TransactionType,
        receipt: &TxReceipt,
        value: U256,
        fee: &FeeEstimate,
        nonce: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            tx_type,
            hash: receipt.transaction_hash,
            from: receipt.from,
            to: receipt.to,
            value,
            block_number: receipt.block_number,
            nonce,
            timestamp,
            gas_price: fee.gas_price,
            gas_used: receipt.gas_used,
            fee_currency: Some(fee.fee_token),
            gateway_fee: fee.gateway_fee,
            gateway_fee_recipient: fee.gateway_fee_recipient,
            details: PlaceholderDetails::None,
        }
    }

    pub fn with_details(mut self, details: PlaceholderDetails) -> Self {
        self.details = details;
        self
    }

    /// Fee actually charged: gas price × gas used + gateway fee
    pub fn fee_paid(&self) -> U256 {
        self.gas_price * U256::from(self.gas_used) + self.gateway_fee
    }
}
