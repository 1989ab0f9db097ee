//! SortedOracles contract bindings

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface ISortedOracles {
        /// Median rate as (numerator, denominator)
        function medianRate(address token) external view returns (uint256 numerator, uint256 denominator);

        /// Emitted when the median rate of a token changes
        event MedianUpdated(address indexed token, uint256 value);
    }
}
