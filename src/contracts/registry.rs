//! Per-session contract handles
//!
//! Handles are bound to the session signer's address (used as `from` on
//! populated drafts), so the registry is rebuilt whenever the signer changes.

use crate::chain::ChainGateway;
use crate::config::{ContractAddresses, ContractId, NetworkConfig};
use crate::error::{ParysError, Result};
use crate::transaction::TxDraft;
use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use std::collections::BTreeMap;

/// A contract bound to the session signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractHandle {
    pub address: Address,
    signer: Address,
}

impl ContractHandle {
    pub fn new(address: Address, signer: Address) -> Self {
        Self { address, signer }
    }

    /// Read-only call, decoded into the function's return type
    pub async fn call<C, G>(&self, chain: &G, call: &C) -> Result<C::Return>
    where
        C: SolCall + Sync,
        G: ChainGateway,
    {
        let data = chain
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;
        C::abi_decode_returns(&data)
            .map_err(|e| ParysError::chain(&format!("Failed to decode {}", C::SIGNATURE), e))
    }

    /// Unsigned draft invoking `call`, sent from the session signer
    pub fn populate<C: SolCall>(&self, call: &C) -> TxDraft {
        TxDraft::new(self.address, call.abi_encode()).with_from(self.signer)
    }
}

/// Arena of contract handles indexed by [`ContractId`], plus ERC20 handles by address
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    addresses: ContractAddresses,
    signer: Address,
    handles: BTreeMap<ContractId, ContractHandle>,
    erc20: BTreeMap<Address, ContractHandle>,
}

impl ContractRegistry {
    pub fn new(config: &NetworkConfig, signer: Address) -> Self {
        let mut registry = Self {
            addresses: config.contracts.clone(),
            signer,
            handles: BTreeMap::new(),
            erc20: BTreeMap::new(),
        };
        registry.rebuild();
        registry
    }

    fn rebuild(&mut self) {
        self.handles = ContractId::ALL
            .iter()
            .map(|id| (*id, ContractHandle::new(self.addresses.get(*id), self.signer)))
            .collect();
        self.erc20.clear();
    }

    /// Signer the handles are bound to
    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Handle for a core contract
    pub fn get(&self, id: ContractId) -> ContractHandle {
        self.handles
            .get(&id)
            .copied()
            .unwrap_or_else(|| ContractHandle::new(self.addresses.get(id), self.signer))
    }

    /// Handle for an arbitrary ERC20 token, cached by address
    pub fn erc20(&mut self, token: Address) -> ContractHandle {
        let signer = self.signer;
        *self
            .erc20
            .entry(token)
            .or_insert_with(|| ContractHandle::new(token, signer))
    }

    pub fn cached_erc20_count(&self) -> usize {
        self.erc20.len()
    }

    /// Drop every handle and rebind to a new signer
    pub fn reset(&mut self, signer: Address) {
        self.signer = signer;
        self.rebuild();
    }
}
