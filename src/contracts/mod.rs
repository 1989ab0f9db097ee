//! Contract bindings for the PARYS core contracts

pub mod accounts;
pub mod election;
pub mod erc20;
pub mod exchange;
pub mod gas_price_minimum;
pub mod governance;
pub mod locked_gold;
pub mod registry;
pub mod sorted_oracles;

pub use accounts::*;
pub use election::*;
pub use erc20::*;
pub use exchange::*;
pub use gas_price_minimum::*;
pub use governance::*;
pub use locked_gold::*;
pub use registry::{ContractHandle, ContractRegistry};
pub use sorted_oracles::*;
