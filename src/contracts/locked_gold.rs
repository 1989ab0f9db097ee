//! LockedGold contract bindings

use alloy::sol;

sol! {
    /// Locking and unlocking of the native token
    #[sol(rpc)]
    interface ILockedGold {
        /// Lock the value sent with the call
        function lock() external payable;

        /// Relock part of the pending withdrawal at `index`
        function relock(uint256 index, uint256 value) external;

        /// Start unlocking `value`; creates a pending withdrawal
        function unlock(uint256 value) external;

        /// Withdraw the matured pending withdrawal at `index`
        function withdraw(uint256 index) external;

        /// Pending withdrawal values and their availability times (unix seconds)
        function getPendingWithdrawals(address account)
            external
            view
            returns (uint256[] memory values, uint256[] memory timestamps);

        function getAccountTotalLockedGold(address account) external view returns (uint256);

        function getAccountNonvotingLockedGold(address account) external view returns (uint256);
    }
}
