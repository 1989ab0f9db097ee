//! Election contract bindings for validator group voting

use alloy::sol;

sol! {
    /// Validator election contract interface
    #[sol(rpc)]
    interface IElection {
        /// Vote for a group with non-voting locked tokens.
        /// `lesser`/`greater` are the group's neighbours in the sorted eligible list after the vote.
        function vote(address group, uint256 value, address lesser, address greater) external returns (bool);

        /// Convert pending votes for a group into active votes
        function activate(address group) external returns (bool);

        /// Revoke pending votes. `index` is the group's position in the account's voted-for list.
        function revokePending(
            address group,
            uint256 value,
            address lesser,
            address greater,
            uint256 index
        ) external returns (bool);

        /// Revoke active votes
        function revokeActive(
            address group,
            uint256 value,
            address lesser,
            address greater,
            uint256 index
        ) external returns (bool);

        /// Groups the account has voted for
        function getGroupsVotedForByAccount(address account) external view returns (address[] memory);

        function getPendingVotesForGroupByAccount(address group, address account) external view returns (uint256);

        function getActiveVotesForGroupByAccount(address group, address account) external view returns (uint256);

        /// Eligible groups and their total votes, sorted by votes descending
        function getTotalVotesForEligibleValidatorGroups()
            external
            view
            returns (address[] memory groups, uint256[] memory values);

        /// Whether pending votes for the group can be activated this epoch
        function hasActivatablePendingVotes(address account, address group) external view returns (bool);
    }
}
