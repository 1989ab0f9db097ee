//! Governance contract bindings

use alloy::sol;

sol! {
    /// On-chain governance interface
    #[sol(rpc)]
    interface IGovernance {
        /// Ids of dequeued proposals. Vote calls reference a proposal by its index here.
        function getDequeue() external view returns (uint256[] memory);

        /// Cast a referendum vote (value: 1 = Abstain, 2 = No, 3 = Yes)
        function vote(uint256 proposalId, uint256 index, uint8 value) external returns (bool);

        /// Current lifecycle stage (0 = None .. 5 = Expiration)
        function getProposalStage(uint256 proposalId) external view returns (uint8);

        /// Whether the account has voted on a proposal still in referendum
        function isVoting(address account) external view returns (bool);
    }
}
