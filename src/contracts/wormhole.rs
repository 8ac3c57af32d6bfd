//! Wormhole core bridge event binding
//!
//! The relayer only consumes one thing from the core contract: the
//! LogMessagePublished event in a bridge-out receipt, which carries the
//! sequence number needed to request the signed VAA.

use alloy::sol;

sol! {
    #[sol(rpc)]
    contract WormholeCore {
        event LogMessagePublished(
            address indexed sender,
            uint64 sequence,
            uint32 nonce,
            bytes payload,
            uint8 consistencyLevel
        );
    }
}
