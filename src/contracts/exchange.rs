//! Exchange (AMM) contract bindings

use alloy::sol;

sol! {
    /// Constant-reserve AMM between the native token and one stable token
    #[sol(rpc)]
    interface IExchange {
        /// Spread as a fixidity fraction (24 decimals)
        function spread() external view returns (uint256);

        /// Reserve buckets: the first is the bucket being bought from
        function getBuyAndSellBuckets(bool sellGold)
            external
            view
            returns (uint256 buyBucket, uint256 sellBucket);

        /// Sell `sellAmount`, reverting if less than `minBuyAmount` would be received
        function exchange(uint256 sellAmount, uint256 minBuyAmount, bool sellGold) external returns (uint256);
    }
}
