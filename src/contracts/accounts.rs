//! Accounts contract bindings

use alloy::sol;

sol! {
    /// Account registry
    #[sol(rpc)]
    interface IAccounts {
        /// Register the sender as an account
        function createAccount() external returns (bool);

        /// Whether the address is a registered account
        function isAccount(address account) external view returns (bool);

        /// Main account for an authorized vote signer. Reverts if the address is neither.
        function voteSignerToAccount(address signer) external view returns (address);
    }
}
