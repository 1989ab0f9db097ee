//! Unsigned transaction drafts and the network's legacy transaction encoding
//!
//! The network extends the legacy (EIP-155) transaction with three fee fields:
//!
//! ```text
//! [nonce, gasPrice, gas, feeCurrency, gatewayFeeRecipient, gatewayFee, to, value, data, v, r, s]
//! ```
//!
//! Empty optional fields encode as the empty string. The signing payload replaces
//! `v, r, s` with `chainId, 0, 0`.

use crate::error::SigningError;
use crate::fees::FeeEstimate;
use alloy::network::TransactionBuilder;
use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy_rlp::{Encodable, Header};

/// An unsigned transaction, filled in progressively by the plan executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxDraft {
    pub from: Option<Address>,
    /// `None` only for contract creation, which the SDK never does
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub nonce: Option<u64>,
    pub gas_price: Option<U256>,
    pub gas_limit: Option<u64>,
    /// Fee token; `None` pays in the native token
    pub fee_currency: Option<Address>,
    pub gateway_fee_recipient: Option<Address>,
    pub gateway_fee: Option<U256>,
    pub chain_id: Option<u64>,
}

impl TxDraft {
    /// Create a new contract call draft
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: data.into(),
            ..Default::default()
        }
    }

    /// Set transaction value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Apply a fee estimate: gas price, gas limit, fee currency and gateway fee.
    ///
    /// The fee currency is omitted when the estimate pays in `native_token`.
    pub fn with_fee(mut self, fee: &FeeEstimate, native_token: Address) -> Self {
        self.gas_price = Some(fee.gas_price);
        self.gas_limit = Some(fee.gas_limit);
        self.fee_currency = (fee.fee_token != native_token).then_some(fee.fee_token);
        self.gateway_fee_recipient = fee.gateway_fee_recipient;
        self.gateway_fee = fee.gateway_fee_recipient.map(|_| fee.gateway_fee);
        self
    }

    /// Request form for `eth_call` / `eth_estimateGas`
    pub fn to_request(&self) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_value(self.value)
            .with_input(self.data.clone());
        if let Some(to) = self.to {
            request = request.with_to(to);
        }
        if let Some(from) = self.from {
            request = request.with_from(from);
        }
        request
    }

    fn mandatory(&self) -> Result<(u64, U256, u64, u64, Address), SigningError> {
        let to = self.to.ok_or(SigningError::IncompleteTransaction("to"))?;
        let nonce = self.nonce.ok_or(SigningError::IncompleteTransaction("nonce"))?;
        let gas_price = self
            .gas_price
            .ok_or(SigningError::IncompleteTransaction("gasPrice"))?;
        let gas_limit = self
            .gas_limit
            .ok_or(SigningError::IncompleteTransaction("gasLimit"))?;
        let chain_id = self
            .chain_id
            .ok_or(SigningError::IncompleteTransaction("chainId"))?;
        Ok((nonce, gas_price, gas_limit, chain_id, to))
    }

    fn encode_fields(&self, trailer: [U256; 3]) -> Result<Vec<u8>, SigningError> {
        let (nonce, gas_price, gas_limit, _, to) = self.mandatory()?;

        let fields: [Vec<u8>; 12] = [
            uint(U256::from(nonce)),
            uint(gas_price),
            uint(U256::from(gas_limit)),
            opt_address(self.fee_currency),
            opt_address(self.gateway_fee_recipient),
            self.gateway_fee.map(uint).unwrap_or_default(),
            to.to_vec(),
            uint(self.value),
            self.data.to_vec(),
            uint(trailer[0]),
            uint(trailer[1]),
            uint(trailer[2]),
        ];

        let mut payload = Vec::new();
        for field in &fields {
            field.as_slice().encode(&mut payload);
        }
        let mut out = Vec::with_capacity(payload.len() + 9);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut out);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// RLP of the signing payload (`chainId, 0, 0` in place of the signature)
    pub fn unsigned_rlp(&self) -> Result<Vec<u8>, SigningError> {
        let (_, _, _, chain_id, _) = self.mandatory()?;
        self.encode_fields([U256::from(chain_id), U256::ZERO, U256::ZERO])
    }

    /// Hash the signer must sign
    pub fn signing_hash(&self) -> Result<B256, SigningError> {
        Ok(keccak256(self.unsigned_rlp()?))
    }

    /// Serialize with an EIP-155 signature (`v = chainId * 2 + 35 + parity`)
    pub fn encode_signed(&self, signature: &Signature) -> Result<Bytes, SigningError> {
        let (_, _, _, chain_id, _) = self.mandatory()?;
        let v = U256::from(chain_id) * U256::from(2u8) + U256::from(35u8 + signature.v() as u8);
        self.encode_fields([v, signature.r(), signature.s()])
            .map(Bytes::from)
    }
}

/// Canonical integer encoding: big-endian without leading zeros
fn uint(value: U256) -> Vec<u8> {
    value.to_be_bytes_trimmed_vec()
}

fn opt_address(address: Option<Address>) -> Vec<u8> {
    address.map(|a| a.to_vec()).unwrap_or_default()
}
