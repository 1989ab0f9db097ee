//! Fee estimates: gas limit resolution, gas price, validation and totals

pub mod estimate;
pub mod token_order;
pub mod validate;

pub use estimate::{estimate_gas_limit, precomputed_gas_limit, FeeEstimator};
pub use token_order::resolve_fee_token_order;
pub use validate::{validate_fee_estimate, validate_fee_estimates};

use crate::amount::u256_decimal;
use crate::feed::PlaceholderTransaction;
use crate::tokens::{Token, TokenRegistry};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Fee for one pending transaction. Produced per action, consumed once by signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    #[serde(with = "u256_decimal")]
    pub gas_price: U256,
    pub gas_limit: u64,
    /// `gas_price × gas_limit + gateway_fee`
    #[serde(with = "u256_decimal")]
    pub fee: U256,
    pub fee_token: Address,
    pub gateway_fee_recipient: Option<Address>,
    #[serde(with = "u256_decimal")]
    pub gateway_fee: U256,
}

impl FeeEstimate {
    /// Build an estimate, computing the total fee
    pub fn new(gas_price: U256, gas_limit: u64, fee_token: Address) -> Self {
        Self {
            gas_price,
            gas_limit,
            fee: gas_price * U256::from(gas_limit),
            fee_token,
            gateway_fee_recipient: None,
            gateway_fee: U256::ZERO,
        }
    }

    /// Add a full-node gateway fee to the total
    pub fn with_gateway_fee(mut self, recipient: Address, gateway_fee: U256) -> Self {
        self.gateway_fee_recipient = Some(recipient);
        self.gateway_fee = gateway_fee;
        self.fee = self.gas_price * U256::from(self.gas_limit) + gateway_fee;
        self
    }
}

/// Sum of fees across estimates and the token they are paid in.
///
/// Assumes every estimate uses the same fee token as the first one.
pub fn total_fee<'a>(estimates: &[FeeEstimate], tokens: &'a TokenRegistry) -> (U256, &'a Token) {
    let total = estimates.iter().fold(U256::ZERO, |acc, e| acc + e.fee);
    let token = estimates
        .first()
        .and_then(|e| tokens.native_token(e.fee_token))
        .unwrap_or_else(|| tokens.native());
    (total, token)
}

/// Fee actually paid by a confirmed transaction and its currency
pub fn fee_from_confirmed_tx<'a>(
    tx: &PlaceholderTransaction,
    tokens: &'a TokenRegistry,
) -> (U256, &'a Token) {
    let token = tx
        .fee_currency
        .and_then(|addr| tokens.native_token(addr))
        .unwrap_or_else(|| tokens.native());
    (tx.fee_paid(), token)
}
