//! PARYS SDK for Rust
//!
//! Wallet core for the PARYS proof-of-stake network: plans, fees, signs and
//! submits the multi-step transactions behind locking, validator staking and
//! governance voting.
//!
//! # Features
//!
//! - Lock, unlock and withdraw PARYS (relocking pending withdrawals first)
//! - Vote for, activate and revoke votes on validator groups
//! - Vote on governance referendums
//! - Native/stable exchange rates and price history
//! - Local key and Ledger hardware signers
//!
//! # Example
//!
//! ```rust,ignore
//! use parys_sdk::{ExecuteOptions, LocalSigner, LockTokenParams, NetworkConfig, ParysClient};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let signer = LocalSigner::from_private_key("0x...", &config)?;
//!     let client = ParysClient::connect(signer, config)?;
//!
//!     // Lock 5 PARYS, paying fees in the native token
//!     let params = LockTokenParams::lock(parys_sdk::amount::to_wei("5", 18)?);
//!     let plan = client.plan_lock(&params).await?;
//!     let fees = client.estimate_plan_fees(&plan, None).await?;
//!     let placeholders = client
//!         .lock_token(&params.with_fee_estimates(fees), ExecuteOptions::default())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod amount;
pub mod blockscout;
pub mod chain;
pub mod client;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod feed;
pub mod fees;
pub mod plan;
pub mod price_history;
pub mod signer;
pub mod tokens;
pub mod transaction;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use chain::{ChainGateway, RpcChain, TxReceipt};
pub use client::{ExecuteOptions, ParysClient};
pub use config::{ContractId, NetworkConfig};
pub use error::{eyre, Context, ParysError, PlanFailure, Report, Result, SigningError, ValidationErrors};
pub use exchange::{ExchangeRate, ToNativeRates};
pub use executor::{ItemStatus, PlanExecutor, ProgressEvent};
pub use feed::{PlaceholderTransaction, TransactionType};
pub use fees::{FeeEstimate, FeeEstimator};
pub use plan::PlanItem;
pub use signer::{LedgerSigner, LocalSigner, TransactionSigner, WalletSigner};
pub use tokens::{Token, TokenRegistry};
pub use transaction::TxDraft;
pub use types::{
    AccountStatus, Balances, GovernanceVoteParams, LockActionType, LockTokenParams,
    LockedBalances, PendingWithdrawal, StakeActionType, StakeTokenParams, VoteValue,
};
