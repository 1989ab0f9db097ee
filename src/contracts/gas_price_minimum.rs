//! GasPriceMinimum contract bindings

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IGasPriceMinimum {
        /// Current network gas price floor, denominated in `tokenAddress`
        function getGasPriceMinimum(address tokenAddress) external view returns (uint256);
    }
}
