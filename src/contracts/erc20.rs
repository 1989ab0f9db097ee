//! Token contract bindings: ERC20 plus the stable token extensions

use alloy::sol;

sol! {
    /// ERC20 subset used for balances and custom token discovery
    #[sol(rpc)]
    interface IERC20 {
        function name() external view returns (string memory);

        function symbol() external view returns (string memory);

        function decimals() external view returns (uint8);

        function balanceOf(address account) external view returns (uint256);

        function approve(address spender, uint256 amount) external returns (bool);

        function transfer(address to, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    /// Native-family tokens additionally support transfers with a comment
    #[sol(rpc)]
    interface IStableToken {
        function transferWithComment(address to, uint256 value, string calldata comment) external returns (bool);
    }
}
