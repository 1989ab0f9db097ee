//! Network configuration for the PARYS SDK

use crate::error::{ParysError, Result};
use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core protocol contracts addressable by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractId {
    Accounts,
    Election,
    Exchange,
    ExchangeEUR,
    ExchangeBRL,
    GasPriceMinimum,
    GoldToken,
    Governance,
    LockedGold,
    Reserve,
    SortedOracles,
    StableToken,
    StableTokenEUR,
    StableTokenBRL,
    Validators,
}

impl ContractId {
    pub const ALL: [ContractId; 15] = [
        Self::Accounts,
        Self::Election,
        Self::Exchange,
        Self::ExchangeEUR,
        Self::ExchangeBRL,
        Self::GasPriceMinimum,
        Self::GoldToken,
        Self::Governance,
        Self::LockedGold,
        Self::Reserve,
        Self::SortedOracles,
        Self::StableToken,
        Self::StableTokenEUR,
        Self::StableTokenBRL,
        Self::Validators,
    ];
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Addresses of the core contracts on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub accounts: Address,
    pub election: Address,
    pub exchange: Address,
    pub exchange_eur: Address,
    pub exchange_brl: Address,
    pub gas_price_minimum: Address,
    pub gold_token: Address,
    pub governance: Address,
    pub locked_gold: Address,
    pub reserve: Address,
    pub sorted_oracles: Address,
    pub stable_token: Address,
    pub stable_token_eur: Address,
    pub stable_token_brl: Address,
    pub validators: Address,
}

impl ContractAddresses {
    /// Address of a contract by identifier
    pub fn get(&self, id: ContractId) -> Address {
        match id {
            ContractId::Accounts => self.accounts,
            ContractId::Election => self.election,
            ContractId::Exchange => self.exchange,
            ContractId::ExchangeEUR => self.exchange_eur,
            ContractId::ExchangeBRL => self.exchange_brl,
            ContractId::GasPriceMinimum => self.gas_price_minimum,
            ContractId::GoldToken => self.gold_token,
            ContractId::Governance => self.governance,
            ContractId::LockedGold => self.locked_gold,
            ContractId::Reserve => self.reserve,
            ContractId::SortedOracles => self.sorted_oracles,
            ContractId::StableToken => self.stable_token,
            ContractId::StableTokenEUR => self.stable_token_eur,
            ContractId::StableTokenBRL => self.stable_token_brl,
            ContractId::Validators => self.validators,
        }
    }
}

/// Network configuration containing RPC URLs, explorer URL and contract addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain ID (42220 for mainnet, 44787 for Alfajores)
    pub chain_id: u64,
    /// Primary RPC endpoint URL
    pub rpc_url: String,
    /// Fallback RPC endpoint URL
    pub rpc_url_secondary: Option<String>,
    /// Block explorer (Blockscout) base URL
    pub blockscout_url: String,
    /// Full-node gateway fee recipient, if the node charges one
    pub gateway_fee_recipient: Option<Address>,
    /// Gateway fee in wei paid alongside each transaction
    #[serde(with = "crate::amount::u256_decimal")]
    pub gateway_fee: U256,
    /// Core contract addresses
    pub contracts: ContractAddresses,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl NetworkConfig {
    /// Mainnet configuration
    pub fn mainnet() -> Self {
        Self {
            chain_id: 42220,
            rpc_url: "https://node.celowallet.app".to_string(),
            rpc_url_secondary: Some("https://forno.celo.org".to_string()),
            blockscout_url: "https://explorer.celo.org".to_string(),
            gateway_fee_recipient: Some(address!("97a5fF70483F9320aFA72e04AbA148Aa1c26946C")),
            gateway_fee: U256::ZERO,
            contracts: ContractAddresses {
                accounts: address!("7d21685C17607338b313a7174bAb6620baD0aaB7"),
                election: address!("8D6677192144292870907E3Fa8A5527fE55A7ff6"),
                exchange: address!("67316300f17f063085Ca8bCa4bd3f7a5a3C66275"),
                exchange_eur: address!("E383394B913d7302c49F794C7d3243c429d53D1d"),
                exchange_brl: address!("8f2cf9855C919AFAC8Bd2E7acEc0205ed568a4EA"),
                gas_price_minimum: address!("DfcA3a8d7699D8bAfe656823AD60C17cb8270ECC"),
                gold_token: address!("471EcE3750Da237f93B8E339c536989b8978a438"),
                governance: address!("D533Ca259b330c7A88f74E000a3FaEa2d63B7972"),
                locked_gold: address!("6cC083Aed9e3ebe302A6336dBC7c921C9f03349E"),
                reserve: address!("9380fA34Fd9e4Fd14c06305fd7B6199089eD4eb9"),
                sorted_oracles: address!("efB84935239dAcdecF7c5bA76d8dE40b077B7b33"),
                stable_token: address!("765DE816845861e75A25fCA122bb6898B8B1282a"),
                stable_token_eur: address!("D8763CBa276a3738E6DE85b4b3bF5FDed6D6cA73"),
                stable_token_brl: address!("e8537a3d056DA446677B9E9d6c5dB704EaAb4787"),
                validators: address!("aEb865bCa93DdC8F47b8e29F40C5399cE34d0C58"),
            },
        }
    }

    /// Alfajores testnet configuration
    pub fn alfajores() -> Self {
        Self {
            chain_id: 44787,
            rpc_url: "https://alfajores-forno.celo-testnet.org".to_string(),
            rpc_url_secondary: None,
            blockscout_url: "https://alfajores-blockscout.celo-testnet.org".to_string(),
            gateway_fee_recipient: None,
            gateway_fee: U256::ZERO,
            contracts: ContractAddresses {
                accounts: address!("ed7f51A34B4e71fbE69B3091FcF879cD14bD73A9"),
                election: address!("1c3eDf937CFc2F6F51784D20DEB1af1F9a8655fA"),
                exchange: address!("17bc3304F94c85618c46d0888aA937148007bD3C"),
                exchange_eur: address!("997B494F17D3c49E66Fafb50F37A972d8Db9325B"),
                exchange_brl: address!("f391DcaF77360d39e566b93c8c0ceb7128fa1A08"),
                gas_price_minimum: address!("d0Bf87a5936ee17014a057143a494Dc5C5d51E5e"),
                gold_token: address!("F194afDf50B03e69Bd7D057c1Aa9e10c9954E4C9"),
                governance: address!("AA963FC97281d9632d96700aB62A4D1340F9a28a"),
                locked_gold: address!("6a4CC5693DC5BFA3799C699F3B941bA2Cb00c341"),
                reserve: address!("a7ed835288Aa4524bB6C73DD23c0bF4315D9Fe3e"),
                sorted_oracles: address!("Fdd8bD58115FfBf04e47411c1d228eCC45E93075"),
                stable_token: address!("874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1"),
                stable_token_eur: address!("10c892A6EC43a53E45D0B916B4b7D383B1b78C0F"),
                stable_token_brl: address!("E4D517785D091D3c54818832dB6094bcc2744545"),
                validators: address!("9acF2A99914E083aD0d610672E93d14b0736BBCc"),
            },
        }
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// * `PARYS_NETWORK` - `mainnet` (default) or `alfajores`
    /// * `PARYS_RPC_URL` - overrides the primary RPC URL
    /// * `PARYS_BLOCKSCOUT_URL` - overrides the block explorer URL
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var("PARYS_NETWORK").ok().as_deref() {
            None | Some("mainnet") => Self::mainnet(),
            Some("alfajores") => Self::alfajores(),
            Some(other) => {
                return Err(ParysError::Config(format!("unknown PARYS_NETWORK: {other}")));
            }
        };

        if let Ok(url) = std::env::var("PARYS_RPC_URL") {
            config = config.with_rpc_url(url);
        }
        if let Ok(url) = std::env::var("PARYS_BLOCKSCOUT_URL") {
            config = config.with_blockscout_url(url);
        }

        Ok(config)
    }

    /// Address of a core contract
    pub fn contract_address(&self, id: ContractId) -> Address {
        self.contracts.get(id)
    }

    /// Set the primary RPC URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Set the block explorer URL
    pub fn with_blockscout_url(mut self, url: impl Into<String>) -> Self {
        self.blockscout_url = url.into();
        self
    }

    /// Set the gateway fee recipient and fee
    pub fn with_gateway_fee(mut self, recipient: Address, fee: U256) -> Self {
        self.gateway_fee_recipient = Some(recipient);
        self.gateway_fee = fee;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_have_distinct_contracts() {
        let mainnet = NetworkConfig::mainnet();
        let alfajores = NetworkConfig::alfajores();
        assert_eq!(mainnet.chain_id, 42220);
        assert_eq!(alfajores.chain_id, 44787);
        for id in ContractId::ALL {
            assert_ne!(mainnet.contract_address(id), Address::ZERO, "{id}");
            assert_ne!(mainnet.contract_address(id), alfajores.contract_address(id), "{id}");
        }
    }

    #[test]
    fn test_builders() {
        let recipient = address!("97a5fF70483F9320aFA72e04AbA148Aa1c26946C");
        let config = NetworkConfig::alfajores()
            .with_rpc_url("http://localhost:8545")
            .with_gateway_fee(recipient, U256::from(10u64));
        assert_eq!(config.rpc_url, "http://localhost:8545");
        assert_eq!(config.gateway_fee_recipient, Some(recipient));
        assert_eq!(config.gateway_fee, U256::from(10u64));
    }
}
