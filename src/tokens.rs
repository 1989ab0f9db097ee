//! Token identities and the per-session token registry

use crate::config::NetworkConfig;
use crate::constants::NATIVE_DECIMALS;
use crate::error::{ParysError, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token identity record. Identity is the contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub symbol: String,
    pub name: String,
    pub address: Address,
    pub chain_id: u64,
    pub decimals: u8,
    /// AMM exchange contract for stable tokens
    pub exchange_address: Option<Address>,
    /// Display order preference in balance lists
    pub sort_order: Option<u32>,
}

impl Token {
    fn native_family(
        symbol: &str,
        name: &str,
        address: Address,
        exchange_address: Option<Address>,
        sort_order: u32,
        chain_id: u64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            address,
            chain_id,
            decimals: NATIVE_DECIMALS,
            exchange_address,
            sort_order: Some(sort_order),
        }
    }

    /// Whether this token has its own AMM exchange
    pub fn is_stable(&self) -> bool {
        self.exchange_address.is_some()
    }
}

/// Native token + stable tokens for a network, plus dynamically added ERC20 tokens
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    native: Token,
    stables: Vec<Token>,
    custom: BTreeMap<Address, Token>,
}

impl TokenRegistry {
    /// Build the native token set from network config
    pub fn new(config: &NetworkConfig) -> Self {
        let c = &config.contracts;
        let chain_id = config.chain_id;
        Self {
            native: Token::native_family("PARYS", "PARYS Native", c.gold_token, None, 10, chain_id),
            stables: vec![
                Token::native_family(
                    "pUSD",
                    "PARYS Dollar",
                    c.stable_token,
                    Some(c.exchange),
                    20,
                    chain_id,
                ),
                Token::native_family(
                    "pEUR",
                    "PARYS Euro",
                    c.stable_token_eur,
                    Some(c.exchange_eur),
                    30,
                    chain_id,
                ),
                Token::native_family(
                    "pEUA",
                    "PARYS EU Allowance",
                    c.stable_token_brl,
                    Some(c.exchange_brl),
                    40,
                    chain_id,
                ),
            ],
            custom: BTreeMap::new(),
        }
    }

    /// The native (staking) token
    pub fn native(&self) -> &Token {
        &self.native
    }

    pub fn stable_tokens(&self) -> &[Token] {
        &self.stables
    }

    /// Native token followed by stable tokens
    pub fn native_tokens(&self) -> impl Iterator<Item = &Token> {
        std::iter::once(&self.native).chain(self.stables.iter())
    }

    /// All known tokens, sorted by display order
    pub fn all(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self.native_tokens().chain(self.custom.values()).collect();
        tokens.sort_by_key(|t| t.sort_order.unwrap_or(u32::MAX));
        tokens
    }

    pub fn is_native_token(&self, address: Address) -> bool {
        self.native_tokens().any(|t| t.address == address)
    }

    pub fn is_stable_token(&self, address: Address) -> bool {
        self.stables.iter().any(|t| t.address == address)
    }

    /// Native-family token (native or stable) by address
    pub fn native_token(&self, address: Address) -> Option<&Token> {
        self.native_tokens().find(|t| t.address == address)
    }

    /// Any known token by address
    pub fn get(&self, address: Address) -> Option<&Token> {
        self.native_token(address).or_else(|| self.custom.get(&address))
    }

    /// Register a discovered ERC20 token
    pub fn add_token(&mut self, token: Token) -> Result<()> {
        if self.is_native_token(token.address) {
            return Err(ParysError::Config(format!(
                "cannot add native token {}",
                token.address
            )));
        }
        if self.custom.contains_key(&token.address) {
            return Err(ParysError::Config(format!("token {} already exists", token.address)));
        }
        self.custom.insert(token.address, token);
        Ok(())
    }

    /// Remove a previously added ERC20 token
    pub fn remove_token(&mut self, address: Address) -> Option<Token> {
        self.custom.remove(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_token(address: Address) -> Token {
        Token {
            symbol: "TST".into(),
            name: "Test".into(),
            address,
            chain_id: 44787,
            decimals: 6,
            exchange_address: None,
            sort_order: None,
        }
    }

    #[test]
    fn test_native_set() {
        let config = NetworkConfig::alfajores();
        let registry = TokenRegistry::new(&config);
        assert_eq!(registry.native().symbol, "PARYS");
        assert!(registry.is_native_token(config.contracts.stable_token));
        assert!(registry.is_stable_token(config.contracts.stable_token_eur));
        assert!(!registry.is_stable_token(config.contracts.gold_token));
        let symbols: Vec<_> = registry.all().iter().map(|t| t.symbol.clone()).collect();
        assert_eq!(symbols, ["PARYS", "pUSD", "pEUR", "pEUA"]);
    }

    #[test]
    fn test_custom_tokens() {
        let config = NetworkConfig::alfajores();
        let mut registry = TokenRegistry::new(&config);
        let addr = Address::repeat_byte(0xab);
        registry.add_token(custom_token(addr)).unwrap();
        assert!(registry.add_token(custom_token(addr)).is_err());
        assert!(registry.add_token(custom_token(config.contracts.gold_token)).is_err());
        assert_eq!(registry.get(addr).map(|t| t.decimals), Some(6));
        assert!(registry.remove_token(addr).is_some());
        assert!(registry.get(addr).is_none());
    }
}
