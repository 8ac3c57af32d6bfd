//! Gas and fee policy
//!
//! Quoted fees carry a 30% gas-price margin, a floor against near-zero gas
//! quotes on cheap chains, and a final 20% margin. Submissions re-read the
//! destination gas price and apply a further 10% bump so quotes produced
//! minutes earlier do not end up underpriced. Chains flagged `dynamic_fees`
//! skip the manual override entirely and let the client's fee estimator run.

use alloy::primitives::U256;

/// Margin folded into USD fee estimates at quote time.
pub const QUOTE_GAS_MARGIN_PERCENT: u64 = 30;

/// Second margin applied to the quoted fee after flooring.
pub const QUOTE_FEE_MARGIN_PERCENT: u64 = 20;

/// Margin applied to the live gas price at transaction submission.
pub const SUBMIT_GAS_MARGIN_PERCENT: u64 = 10;

/// 0.0004 native units in wei; quotes below this are bumped up to it.
pub const MIN_FEE_WEI: u128 = 400_000_000_000_000;

/// Gas limits per relayer operation, matched to the deployed contracts.
pub const TOKEN_DEPLOY_GAS_LIMIT: u64 = 4_000_000;
pub const TOKEN_BRIDGE_GAS_LIMIT: u64 = 2_500_000;
pub const NFT_DEPLOY_GAS_LIMIT: u64 = 6_500_000;
pub const NFT_BRIDGE_GAS_LIMIT: u64 = 550_000;

/// Scale `value` up by `percent`.
pub fn with_margin(value: U256, percent: u64) -> U256 {
    value * U256::from(100 + percent) / U256::from(100)
}

/// Margin helper for raw u128 gas prices as returned by `eth_gasPrice`.
pub fn with_margin_u128(value: u128, percent: u64) -> u128 {
    value.saturating_mul(100 + percent as u128) / 100
}

/// Gas price to attach to an outbound transaction.
pub fn submission_gas_price(current_gas_price: u128) -> u128 {
    with_margin_u128(current_gas_price, SUBMIT_GAS_MARGIN_PERCENT)
}

/// Full quote pipeline for one destination chain: margin the gas price,
/// multiply by the operation's gas limit, floor, then margin again.
pub fn quoted_fee_wei(gas_price: u128, gas_limit: u64) -> U256 {
    let enhanced_price = with_margin(U256::from(gas_price), QUOTE_GAS_MARGIN_PERCENT);
    let mut fee = enhanced_price * U256::from(gas_limit);

    if fee < U256::from(MIN_FEE_WEI) {
        fee = U256::from(MIN_FEE_WEI);
    }

    with_margin(fee, QUOTE_FEE_MARGIN_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_margin() {
        assert_eq!(
            with_margin(U256::from(1_000_000u64), 30),
            U256::from(1_300_000u64)
        );
        assert_eq!(
            with_margin(U256::from(1_000_000u64), 10),
            U256::from(1_100_000u64)
        );
        assert_eq!(with_margin(U256::ZERO, 30), U256::ZERO);
    }

    #[test]
    fn test_submission_gas_price_bump() {
        assert_eq!(submission_gas_price(1_000_000_000), 1_100_000_000);
    }

    #[test]
    fn test_quote_floor_applies_on_cheap_chains() {
        // 1 gwei * 30% margin * 2.5M gas = 0.00325 native — above the floor
        let fee = quoted_fee_wei(1_000_000_000, TOKEN_BRIDGE_GAS_LIMIT);
        assert_eq!(
            fee,
            with_margin(
                U256::from(1_300_000_000u64) * U256::from(TOKEN_BRIDGE_GAS_LIMIT),
                QUOTE_FEE_MARGIN_PERCENT
            )
        );

        // 0.001 gwei lands below the floor; the floor (plus the final 20%)
        // becomes the quote
        let cheap = quoted_fee_wei(1_000_000, TOKEN_BRIDGE_GAS_LIMIT);
        assert_eq!(cheap, with_margin(U256::from(MIN_FEE_WEI), 20));
    }

    #[test]
    fn test_quote_is_monotone_in_gas_price() {
        let low = quoted_fee_wei(5_000_000_000, TOKEN_DEPLOY_GAS_LIMIT);
        let high = quoted_fee_wei(50_000_000_000, TOKEN_DEPLOY_GAS_LIMIT);
        assert!(high > low);
    }

    #[test]
    fn test_nft_operations_price_by_their_own_limits() {
        let gas_price = 20_000_000_000;
        let deploy = quoted_fee_wei(gas_price, NFT_DEPLOY_GAS_LIMIT);
        let bridge = quoted_fee_wei(gas_price, NFT_BRIDGE_GAS_LIMIT);
        assert!(deploy > bridge);
    }
}
