//! Deployment-initiation tracker
//!
//! Watches each chain's relayer contract for the user-paid
//! InitiateTokenDeployment / InitiateNFTDeployment events, verifies the fee
//! actually attached to the transaction against the stored quote, and flips
//! the matching asset networks from QUERIED to PENDING so the deployment
//! executor picks them up.

use alloy::consensus::Transaction as _;
use alloy::primitives::{B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::{sol_data, SolEvent, SolType};
use alloy::transports::http::{Client, Http};
use eyre::{eyre, Result, WrapErr};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chains::{ChainConfig, ChainRegistry};
use crate::contracts::relayer::CatRelayer;
use crate::db;
use crate::errors::classify_error;
use crate::metrics;
use crate::trackers::{scan_name, scan_window, ScanPurpose};
use crate::types::{AssetKind, FeeMismatchPolicy};

/// Collection thumbnails assigned to freshly initiated NFT deployments.
/// Cosmetic only; chosen deterministically from the asset id.
const COLLECTION_THUMBNAILS: &[&str] = &[
    "https://test-sdk.nexa.network/1.avif",
    "https://test-sdk.nexa.network/2.avif",
    "https://test-sdk.nexa.network/3.avif",
    "https://test-sdk.nexa.network/4.avif",
    "https://test-sdk.nexa.network/5.avif",
    "https://test-sdk.nexa.network/6.avif",
    "https://test-sdk.nexa.network/7.avif",
];

/// Decoded deploy parameter blob, common to both asset kinds.
struct DeployParams {
    salt: B256,
}

/// Decoded initiation event, common to both asset kinds.
struct DeployInitiation {
    params: Vec<u8>,
    destination_chains: Vec<U256>,
    gas_values: Vec<U256>,
    tx_hash: B256,
}

pub struct DeploymentTracker {
    kind: AssetKind,
    registry: Arc<ChainRegistry>,
    db: PgPool,
    fee_policy: FeeMismatchPolicy,
}

impl DeploymentTracker {
    pub fn new(
        kind: AssetKind,
        registry: Arc<ChainRegistry>,
        db: PgPool,
        fee_policy: FeeMismatchPolicy,
    ) -> Self {
        Self {
            kind,
            registry,
            db,
            fee_policy,
        }
    }

    /// Scan every chain once. A failing chain is logged and skipped; its
    /// watermark stays put so the window is retried next pass.
    pub async fn run_pass(&self) -> Result<()> {
        for chain in self.registry.chains() {
            if let Err(e) = self.scan_chain(chain).await {
                metrics::record_error(
                    "deploy-tracker",
                    classify_error(&e.to_string()).as_str(),
                );
                warn!(
                    kind = %self.kind,
                    chain = chain.name,
                    error = %e,
                    "Deployment tracker pass failed for chain"
                );
            }
        }
        Ok(())
    }

    async fn scan_chain(&self, chain: &ChainConfig) -> Result<()> {
        let name = scan_name(self.kind, ScanPurpose::DeploymentInitiation);
        let watermark = db::get_watermark(&self.db, chain.chain_id as i64, name)
            .await?
            .map(|block| block as u64);

        let provider = ProviderBuilder::new()
            .on_http(chain.rpc_url.parse().wrap_err("Invalid RPC URL")?);
        let head = provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")?;

        let Some((start, end)) = scan_window(watermark, chain.genesis_block, head) else {
            return Ok(());
        };

        let signature = match self.kind {
            AssetKind::Token => CatRelayer::InitiateTokenDeployment::SIGNATURE_HASH,
            AssetKind::Nft => CatRelayer::InitiateNFTDeployment::SIGNATURE_HASH,
        };
        let filter = Filter::new()
            .address(chain.relayer_address)
            .event_signature(signature)
            .from_block(start)
            .to_block(end);

        let logs = provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to query deployment initiation logs")?;

        debug!(
            kind = %self.kind,
            chain = chain.name,
            from_block = start,
            to_block = end,
            events = logs.len(),
            "Scanned deployment initiations"
        );

        for log in &logs {
            if let Err(e) = self.process_initiation(chain, &provider, log).await {
                warn!(
                    kind = %self.kind,
                    chain = chain.name,
                    tx_hash = ?log.transaction_hash,
                    error = %e,
                    "Skipping deployment initiation event"
                );
            }
        }

        db::upsert_watermark(&self.db, chain.chain_id as i64, name, end as i64).await?;
        metrics::record_scanned_block(chain.name, name, end);

        Ok(())
    }

    async fn process_initiation<P: Provider<Http<Client>>>(
        &self,
        chain: &ChainConfig,
        provider: &P,
        log: &Log,
    ) -> Result<()> {
        let initiation = self.decode_initiation(log)?;
        let params = self.decode_params(&initiation.params)?;
        let salt = format!("0x{}", hex::encode(params.salt));

        let Some(asset) = db::find_asset_info_by_salt(&self.db, self.kind, &salt).await? else {
            debug!(kind = %self.kind, salt = %salt, "No asset info for salt, skipping");
            return Ok(());
        };

        // The fee quoted at request time was paid as the initiation tx's
        // value; verify the user actually sent it.
        let paid = self.paid_value(provider, initiation.tx_hash).await?;
        let quoted = U256::from_str(&asset.total_gas_fee_wei).unwrap_or(U256::ZERO);
        if paid != quoted {
            warn!(
                kind = %self.kind,
                salt = %salt,
                paid = %paid,
                quoted = %quoted,
                policy = ?self.fee_policy,
                "Initiation fee does not match quote"
            );
            if self.fee_policy == FeeMismatchPolicy::Skip {
                return Ok(());
            }
        }

        if self.kind == AssetKind::Nft && asset.image_url.is_none() {
            let thumb =
                COLLECTION_THUMBNAILS[asset.id as usize % COLLECTION_THUMBNAILS.len()];
            db::set_asset_image_url(&self.db, asset.id, thumb).await?;
        }

        db::update_asset_initiation(
            &self.db,
            asset.id,
            &format!("0x{}", hex::encode(initiation.tx_hash)),
        )
        .await?;

        let mut promoted = 0u64;
        for (i, destination) in initiation.destination_chains.iter().enumerate() {
            let dest_chain: u64 = (*destination).try_into().unwrap_or(u64::MAX);
            let fee_paid = initiation
                .gas_values
                .get(i)
                .map(|v| v.to_string())
                .ok_or_else(|| eyre!("gasValues shorter than destinationChains"))?;

            promoted += db::promote_network_to_pending(
                &self.db,
                asset.id,
                dest_chain as i64,
                &fee_paid,
            )
            .await?;
        }

        info!(
            kind = %self.kind,
            chain = chain.name,
            salt = %salt,
            destinations = initiation.destination_chains.len(),
            promoted,
            "Deployment initiation tracked"
        );
        metrics::record_deployment_initiated(self.kind.as_str(), chain.name);

        Ok(())
    }

    fn decode_initiation(&self, log: &Log) -> Result<DeployInitiation> {
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| eyre!("Missing transaction hash"))?;

        match self.kind {
            AssetKind::Token => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiateTokenDeployment>()
                    .wrap_err("Failed to decode InitiateTokenDeployment")?;
                let data = decoded.inner.data;
                Ok(DeployInitiation {
                    params: data.params.to_vec(),
                    destination_chains: data.destinationChains,
                    gas_values: data.gasValues,
                    tx_hash,
                })
            }
            AssetKind::Nft => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiateNFTDeployment>()
                    .wrap_err("Failed to decode InitiateNFTDeployment")?;
                let data = decoded.inner.data;
                Ok(DeployInitiation {
                    params: data.params.to_vec(),
                    destination_chains: data.destinationChains,
                    gas_values: data.gasValues,
                    tx_hash,
                })
            }
        }
    }

    /// Only the salt is needed from the params blob; the remaining fields
    /// were stored when the deployment was quoted.
    fn decode_params(&self, params: &[u8]) -> Result<DeployParams> {
        // (name, symbol, decimals, totalSupply, salt, owner) for tokens;
        // (name, symbol, baseUri, totalSupply, salt, owner) for NFTs
        type TokenParams = (
            sol_data::String,
            sol_data::String,
            sol_data::Uint<8>,
            sol_data::Uint<256>,
            sol_data::FixedBytes<32>,
            sol_data::Address,
        );
        type NftParams = (
            sol_data::String,
            sol_data::String,
            sol_data::String,
            sol_data::Uint<256>,
            sol_data::FixedBytes<32>,
            sol_data::Address,
        );

        let salt = match self.kind {
            AssetKind::Token => {
                let (_name, _symbol, _decimals, _supply, salt, _owner) =
                    <TokenParams as SolType>::abi_decode_params(params, true)
                        .wrap_err("Failed to decode token deploy params")?;
                salt
            }
            AssetKind::Nft => {
                let (_name, _symbol, _base_uri, _supply, salt, _owner) =
                    <NftParams as SolType>::abi_decode_params(params, true)
                        .wrap_err("Failed to decode NFT deploy params")?;
                salt
            }
        };

        Ok(DeployParams { salt })
    }

    async fn paid_value<P: Provider<Http<Client>>>(&self, provider: &P, tx_hash: B256) -> Result<U256> {
        let tx = provider
            .get_transaction_by_hash(tx_hash)
            .await
            .wrap_err("Failed to fetch initiation transaction")?
            .ok_or_else(|| eyre!("Initiation transaction not found"))?;

        Ok(tx.value())
    }
}
