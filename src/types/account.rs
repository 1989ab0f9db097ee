//! Account registration status

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Registration status of the signer's account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    pub is_registered: bool,
    /// Main account this address is an authorized vote signer for
    pub vote_signer_for: Option<Address>,
    /// Unix milliseconds of the last fetch
    pub last_updated: u64,
}

impl AccountStatus {
    /// Address whose locked balance and votes are used for staking
    pub fn voter_address(&self, signer: Address) -> Address {
        self.vote_signer_for.unwrap_or(signer)
    }
}
