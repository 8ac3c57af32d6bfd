#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Amounts, tokenIds, fees-in-wei and gas values are stored as TEXT. Callers
// that need arithmetic parse them into U256; the database never computes on
// them.

/// One logical asset (token or NFT collection), keyed by salt. Created when
/// a deploy request is first quoted; the salt never changes and is the
/// deterministic-address seed shared by every chain.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssetInfo {
    pub id: i64,
    pub asset_kind: String,
    pub name: String,
    pub symbol: String,
    /// Tokens only
    pub decimals: Option<i32>,
    /// NFT collections only
    pub base_uri: Option<String>,
    pub total_supply: String,
    pub owner: String,
    pub salt: String,
    pub token_mint_chain_id: i64,
    pub fee_payment_chain_id: i64,
    /// One-to-one with the destination chains of the deploy request
    pub gas_values: Vec<String>,
    pub gas_prices: Vec<String>,
    pub total_gas_fee_usd: f64,
    pub total_gas_fee_native: f64,
    pub total_gas_fee_wei: String,
    pub initiate_tx_hash: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For inserting new asset infos (test fixtures and the quote API layer)
#[derive(Debug, Clone)]
pub struct NewAssetInfo {
    pub asset_kind: String,
    pub name: String,
    pub symbol: String,
    pub decimals: Option<i32>,
    pub base_uri: Option<String>,
    pub total_supply: String,
    pub owner: String,
    pub salt: String,
    pub token_mint_chain_id: i64,
    pub fee_payment_chain_id: i64,
    pub gas_values: Vec<String>,
    pub gas_prices: Vec<String>,
    pub total_gas_fee_usd: f64,
    pub total_gas_fee_native: f64,
    pub total_gas_fee_wei: String,
}

/// One (asset, destination chain) pair. At most one row per pair, at most
/// one Proxy-kind row per asset.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssetNetwork {
    pub id: i64,
    pub asset_info_id: i64,
    pub asset_kind: String,
    pub chain_id: i64,
    /// Null until deployment succeeds; terminal once set
    pub address: Option<String>,
    pub deploy_kind: i32,
    pub status: String,
    pub owner: String,
    pub fee_paid_by_user: Option<String>,
    pub deployment_tx_hash: Option<String>,
    /// The existing token this network's proxy wraps, when deploy_kind is
    /// proxy on the minting chain
    pub generic_token_address: Option<String>,
    /// Cross-chain registration outcome, independent of deployment status
    pub registration: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For upserting asset networks
#[derive(Debug, Clone)]
pub struct NewAssetNetwork {
    pub asset_info_id: i64,
    pub asset_kind: String,
    pub chain_id: i64,
    pub deploy_kind: i32,
    pub status: String,
    pub owner: String,
    pub generic_token_address: Option<String>,
}

/// A PENDING asset network joined with its asset info, as consumed by the
/// deployment executor.
#[derive(Debug, Clone, FromRow)]
pub struct DeploymentCandidate {
    pub network_id: i64,
    pub asset_info_id: i64,
    pub chain_id: i64,
    pub deploy_kind: i32,
    pub network_owner: String,
    pub generic_token_address: Option<String>,
    pub address: Option<String>,
    pub name: String,
    pub symbol: String,
    pub decimals: Option<i32>,
    pub base_uri: Option<String>,
    pub total_supply: String,
    pub salt: String,
    pub owner: String,
    pub token_mint_chain_id: i64,
}

/// One bridge-out attempt. The row id doubles as the `trackId` embedded in
/// the on-chain initiation call.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BridgeRecord {
    pub id: i64,
    pub asset_kind: String,
    pub from_chain_id: i64,
    pub to_chain_id: i64,
    pub from_token: String,
    pub to_token: String,
    pub from_address: String,
    pub to_address: String,
    /// Token amount, or tokenId for NFTs
    pub amount: String,
    pub fee_native: f64,
    pub fee_usd: f64,
    pub fee_wei: String,
    pub status: String,
    pub initiate_tx_hash: Option<String>,
    pub sequence: Option<i64>,
    pub relayer_tx_hash: Option<String>,
    pub total_block_confirmation: i64,
    pub block_confirmation_done: i64,
    /// Advisory only; the pass-start requeue ignores it
    pub error_retry_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For inserting new bridge records (test fixtures and the quote API layer)
#[derive(Debug, Clone)]
pub struct NewBridgeRecord {
    pub asset_kind: String,
    pub from_chain_id: i64,
    pub to_chain_id: i64,
    pub from_token: String,
    pub to_token: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: String,
    pub fee_native: f64,
    pub fee_usd: f64,
    pub fee_wei: String,
}

/// Highest block already scanned for one (chain, scan purpose) pair.
#[derive(Debug, Clone, FromRow)]
pub struct BlockWatermark {
    pub chain_id: i64,
    pub scan_name: String,
    pub block_no: i64,
    pub updated_at: DateTime<Utc>,
}

/// Native-coin USD price, maintained by the external price poller.
/// Read-only to the relayer core.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price_usd: f64,
    pub updated_at: DateTime<Utc>,
}
