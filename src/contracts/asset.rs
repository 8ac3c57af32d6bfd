//! CAT asset contract ABI definitions
//!
//! Bindings for the per-asset contracts the executors talk to after
//! deployment: chain registration, ownership handover and the destination
//! side of a bridge transfer. The ERC-20 and ERC-721 variants share the
//! surface we need except for the transfer payload, so each gets its own
//! binding.

use alloy::sol;

sol! {
    /// Signature gate for registerChains. The relayer always passes the
    /// nullified form: custodian = hot wallet, validTill = 0, no signature.
    struct SignatureVerification {
        address custodian;
        uint256 validTill;
        bytes signature;
    }

    #[sol(rpc)]
    contract CatErc20 {
        /// Register this token's sibling addresses on other chains so
        /// bridged messages from them are trusted.
        function registerChains(
            uint16[] chainIds,
            bytes32[] tokenAddresses,
            SignatureVerification signature
        ) external;

        function transferOwnership(address newOwner) external;

        /// Redeem a signed attestation on the destination chain.
        function bridgeIn(bytes encodedVaa) external;

        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }

    #[sol(rpc)]
    contract CatErc721 {
        function registerChains(
            uint16[] chainIds,
            bytes32[] tokenAddresses,
            SignatureVerification signature
        ) external;

        function transferOwnership(address newOwner) external;

        function bridgeIn(bytes encodedVaa) external;

        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }
}
