//! CAT relayer contract ABI definition
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the relayer
//! contract deployed on every supported chain. The relayer is the single
//! entry point for deployment initiation (user-paid), hot-wallet driven
//! deployment execution, deterministic address computation and bridge-out
//! initiation for both tokens and NFT collections.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    #[sol(rpc)]
    contract CatRelayer {
        /// Deploy a token on this chain with a deterministic address derived
        /// from the salt. `chainIdForMinting` is in wormhole numbering; only
        /// the minting chain receives the initial supply.
        function deployToken(
            string name,
            string symbol,
            uint8 decimals,
            uint256 totalSupply,
            bytes32 salt,
            address owner,
            uint16 chainIdForMinting
        ) external returns (address tokenAddress);

        /// Deploy the proxy wrapping an existing (generic) token. The proxy
        /// becomes the cross-chain hub for that token.
        function handleDeployProxyToken(
            address existingToken,
            bytes32 salt,
            address owner
        ) external returns (address tokenAddress);

        /// Predict the address `deployToken` will produce for these inputs
        /// on any chain. Pure view; the cross-chain determinism contract.
        function computeAddress(
            bytes32 salt,
            string name,
            string symbol,
            uint8 decimals
        ) external view returns (address addr);

        /// User-facing, fee-paying entry point observed by the deployment
        /// tracker. `params` is the ABI-encoded deploy parameter blob.
        function initiateTokensDeployment(
            bytes params,
            uint256[] destinationChains,
            uint256[] gasValues,
            uint256 tokenMintingChain
        ) external payable;

        /// Bridge a CAT token out to another chain. `trackId` is the
        /// off-chain record id, echoed back in the event for correlation.
        function initiateBridgeOut(
            address tokenAddress,
            uint256 amount,
            uint16 recipientChain,
            bytes32 recipient,
            uint32 nonce,
            string trackId
        ) external payable;

        /// Bridge a generic token out through its proxy.
        function initiateProxyBridgeOut(
            address tokenAddress,
            address proxyTokenAddress,
            uint256 amount,
            uint16 recipientChain,
            bytes32 recipient,
            uint32 nonce,
            string trackId
        ) external payable;

        function deployNFT(
            string name,
            string symbol,
            uint256 totalSupply,
            bytes32 salt,
            address owner,
            string baseUri
        ) external returns (address tokenAddress);

        function handleDeployProxyNFT(
            address existingToken,
            bytes32 salt,
            address owner
        ) external returns (address tokenAddress);

        function computeAddressNFT(
            bytes32 salt,
            string name,
            string symbol
        ) external view returns (address addr);

        function initiateNFTDeployment(
            bytes params,
            uint256[] destinationChains,
            uint256[] gasValues,
            uint256 tokenMintingChain
        ) external payable;

        function initiateBridgeOutNFT(
            address tokenAddress,
            uint256 tokenId,
            uint16 recipientChain,
            bytes32 recipient,
            uint32 nonce,
            string trackId
        ) external payable;

        function initiateProxyBridgeOutNFT(
            address tokenAddress,
            address proxyTokenAddress,
            uint256 tokenId,
            uint16 recipientChain,
            bytes32 recipient,
            uint32 nonce,
            string trackId
        ) external payable;

        /// Emitted when a user pays for a multi-chain token deployment.
        /// destinationChains are native chain ids; gasValues map one-to-one.
        event InitiateTokenDeployment(
            address indexed owner,
            bytes params,
            uint256[] destinationChains,
            uint256[] gasValues,
            uint256 tokenMintingChain
        );

        event InitiateNFTDeployment(
            address indexed owner,
            bytes params,
            uint256[] destinationChains,
            uint256[] gasValues,
            uint256 tokenMintingChain
        );

        event TokenDeployed(
            address indexed owner,
            address indexed token,
            string name,
            string symbol,
            uint8 decimals,
            bytes32 salt
        );

        event ProxyTokenDeployed(
            address indexed owner,
            address indexed token,
            bytes32 salt
        );

        event NFTDeployed(
            address indexed owner,
            address indexed token,
            string name,
            string symbol,
            bytes32 salt
        );

        event ProxyNFTDeployed(
            address indexed owner,
            address indexed token,
            bytes32 salt
        );

        event InitiatedBridgeOut(
            address indexed caller,
            address indexed token,
            uint256 amount,
            uint16 destinationChain,
            bytes32 recipient,
            uint256 nonce,
            uint256 gasValue,
            string trackId
        );

        event InitiatedProxyBridgeOut(
            address indexed caller,
            address indexed token,
            address proxyToken,
            uint256 amount,
            uint16 destinationChain,
            bytes32 recipient,
            uint256 nonce,
            uint256 gasValue,
            string trackId
        );

        event InitiatedBridgeOutNFT(
            address indexed caller,
            address indexed token,
            uint256 amount,
            uint16 destinationChain,
            bytes32 recipient,
            uint256 nonce,
            uint256 gasValue,
            string trackId
        );

        event InitiatedProxyBridgeOutNFT(
            address indexed caller,
            address indexed token,
            address proxyToken,
            uint256 tokenId,
            uint16 destinationChain,
            bytes32 recipient,
            uint256 nonce,
            uint256 gasValue,
            string trackId
        );
    }
}
