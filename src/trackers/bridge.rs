//! Bridge-initiation tracker
//!
//! Watches each chain's relayer for InitiatedBridgeOut /
//! InitiatedProxyBridgeOut events (and their NFT twins), correlates them
//! back to bridge records through the trackId embedded in the call, and
//! flips matching records to BRIDGE_INITIATED with the source transaction
//! hash. Replayed windows are no-ops: records that already completed are
//! never touched again.

use alloy::primitives::{B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use eyre::{eyre, Result, WrapErr};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chains::{ChainConfig, ChainRegistry};
use crate::contracts::relayer::CatRelayer;
use crate::db::{self, BridgeRecord};
use crate::errors::classify_error;
use crate::metrics;
use crate::trackers::{scan_name, scan_window, ScanPurpose};
use crate::types::{AssetKind, BridgeStatus};

/// Decoded bridge-out event, common to the plain and proxy variants.
struct BridgeInitiation {
    track_id: String,
    gas_value: U256,
    tx_hash: B256,
}

/// What to do with an observed initiation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiationAction {
    /// No record for this trackId — out-of-band or foreign transaction
    SkipUnknown,
    /// Record already reached its terminal state; replay is a no-op
    SkipCompleted,
    /// Flip the record to BRIDGE_INITIATED
    Commit { fee_mismatch: bool },
}

/// Decide how to handle an initiation event for `record`. Fee mismatches
/// are surfaced but never block the transition.
pub fn initiation_action(record: Option<&BridgeRecord>, gas_value: &U256) -> InitiationAction {
    let Some(record) = record else {
        return InitiationAction::SkipUnknown;
    };

    if BridgeStatus::parse(&record.status) == Some(BridgeStatus::BridgeCompleted) {
        return InitiationAction::SkipCompleted;
    }

    let quoted = U256::from_str(&record.fee_wei).unwrap_or(U256::ZERO);
    InitiationAction::Commit {
        fee_mismatch: quoted != *gas_value,
    }
}

pub struct BridgeTracker {
    kind: AssetKind,
    registry: Arc<ChainRegistry>,
    db: PgPool,
}

impl BridgeTracker {
    pub fn new(kind: AssetKind, registry: Arc<ChainRegistry>, db: PgPool) -> Self {
        Self { kind, registry, db }
    }

    pub async fn run_pass(&self) -> Result<()> {
        for chain in self.registry.chains() {
            if let Err(e) = self.scan_chain(chain).await {
                metrics::record_error(
                    "bridge-tracker",
                    classify_error(&e.to_string()).as_str(),
                );
                warn!(
                    kind = %self.kind,
                    chain = chain.name,
                    error = %e,
                    "Bridge tracker pass failed for chain"
                );
            }
        }
        Ok(())
    }

    async fn scan_chain(&self, chain: &ChainConfig) -> Result<()> {
        let name = scan_name(self.kind, ScanPurpose::BridgeInitiation);
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

        // Plain and proxy bridge-outs are separate events; both flow into
        // the same record transition.
        let (plain_sig, proxy_sig) = match self.kind {
            AssetKind::Token => (
                CatRelayer::InitiatedBridgeOut::SIGNATURE_HASH,
                CatRelayer::InitiatedProxyBridgeOut::SIGNATURE_HASH,
            ),
            AssetKind::Nft => (
                CatRelayer::InitiatedBridgeOutNFT::SIGNATURE_HASH,
                CatRelayer::InitiatedProxyBridgeOutNFT::SIGNATURE_HASH,
            ),
        };

        let mut events = Vec::new();
        for signature in [plain_sig, proxy_sig] {
            let filter = Filter::new()
                .address(chain.relayer_address)
                .event_signature(signature)
                .from_block(start)
                .to_block(end);
            let logs = provider
                .get_logs(&filter)
                .await
                .wrap_err("Failed to query bridge initiation logs")?;
            events.extend(logs);
        }

        debug!(
            kind = %self.kind,
            chain = chain.name,
            from_block = start,
            to_block = end,
            events = events.len(),
            "Scanned bridge initiations"
        );

        for log in &events {
            if let Err(e) = self.process_initiation(chain, log).await {
                warn!(
                    kind = %self.kind,
                    chain = chain.name,
                    tx_hash = ?log.transaction_hash,
                    error = %e,
                    "Skipping bridge initiation event"
                );
            }
        }

        db::upsert_watermark(&self.db, chain.chain_id as i64, name, end as i64).await?;
        metrics::record_scanned_block(chain.name, name, end);

        Ok(())
    }

    async fn process_initiation(&self, chain: &ChainConfig, log: &Log) -> Result<()> {
        let initiation = self.decode_initiation(log)?;

        // trackIds we did not issue (manual calls, other deployments of the
        // same contract) simply do not resolve.
        let Ok(record_id) = initiation.track_id.parse::<i64>() else {
            debug!(
                kind = %self.kind,
                track_id = %initiation.track_id,
                "Unparseable trackId, skipping"
            );
            return Ok(());
        };

        let record = db::get_bridge_record(&self.db, self.kind, record_id).await?;

        match initiation_action(record.as_ref(), &initiation.gas_value) {
            InitiationAction::SkipUnknown => {
                debug!(
                    kind = %self.kind,
                    track_id = record_id,
                    "No bridge record for trackId, skipping"
                );
            }
            InitiationAction::SkipCompleted => {
                debug!(
                    kind = %self.kind,
                    track_id = record_id,
                    "Bridge already completed for trackId, skipping"
                );
            }
            InitiationAction::Commit { fee_mismatch } => {
                if fee_mismatch {
                    warn!(
                        kind = %self.kind,
                        track_id = record_id,
                        gas_value = %initiation.gas_value,
                        quoted = %record.as_ref().map(|r| r.fee_wei.clone()).unwrap_or_default(),
                        "Bridge fee mismatch for trackId"
                    );
                }

                db::mark_bridge_initiated(
                    &self.db,
                    record_id,
                    &format!("0x{}", hex::encode(initiation.tx_hash)),
                )
                .await?;

                info!(
                    kind = %self.kind,
                    chain = chain.name,
                    track_id = record_id,
                    "Bridge initiation tracked"
                );
                metrics::record_bridge_initiated(self.kind.as_str(), chain.name);
            }
        }

        Ok(())
    }

    fn decode_initiation(&self, log: &Log) -> Result<BridgeInitiation> {
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| eyre!("Missing transaction hash"))?;

        let topic0 = log
            .topic0()
            .ok_or_else(|| eyre!("Missing event signature topic"))?;

        let (track_id, gas_value) = match *topic0 {
            t if t == CatRelayer::InitiatedBridgeOut::SIGNATURE_HASH => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiatedBridgeOut>()
                    .wrap_err("Failed to decode InitiatedBridgeOut")?;
                (decoded.inner.data.trackId.clone(), decoded.inner.data.gasValue)
            }
            t if t == CatRelayer::InitiatedProxyBridgeOut::SIGNATURE_HASH => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiatedProxyBridgeOut>()
                    .wrap_err("Failed to decode InitiatedProxyBridgeOut")?;
                (decoded.inner.data.trackId.clone(), decoded.inner.data.gasValue)
            }
            t if t == CatRelayer::InitiatedBridgeOutNFT::SIGNATURE_HASH => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiatedBridgeOutNFT>()
                    .wrap_err("Failed to decode InitiatedBridgeOutNFT")?;
                (decoded.inner.data.trackId.clone(), decoded.inner.data.gasValue)
            }
            t if t == CatRelayer::InitiatedProxyBridgeOutNFT::SIGNATURE_HASH => {
                let decoded = log
                    .log_decode::<CatRelayer::InitiatedProxyBridgeOutNFT>()
                    .wrap_err("Failed to decode InitiatedProxyBridgeOutNFT")?;
                (decoded.inner.data.trackId.clone(), decoded.inner.data.gasValue)
            }
            _ => return Err(eyre!("Unexpected event signature in bridge scan")),
        };

        Ok(BridgeInitiation {
            track_id,
            gas_value,
            tx_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(status: BridgeStatus, fee_wei: &str) -> BridgeRecord {
        BridgeRecord {
            id: 42,
            asset_kind: "token".to_string(),
            from_chain_id: 56,
            to_chain_id: 137,
            from_token: "0x1111111111111111111111111111111111111111".to_string(),
            to_token: "0x2222222222222222222222222222222222222222".to_string(),
            from_address: "0x3333333333333333333333333333333333333333".to_string(),
            to_address: "0x4444444444444444444444444444444444444444".to_string(),
            amount: "1000000000000000000".to_string(),
            fee_native: 0.01,
            fee_usd: 3.5,
            fee_wei: fee_wei.to_string(),
            status: status.as_str().to_string(),
            initiate_tx_hash: None,
            sequence: None,
            relayer_tx_hash: None,
            total_block_confirmation: 0,
            block_confirmation_done: 0,
            error_retry_count: 0,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unknown_track_id_is_skipped() {
        assert_eq!(
            initiation_action(None, &U256::from(1u64)),
            InitiationAction::SkipUnknown
        );
    }

    #[test]
    fn test_completed_record_is_never_touched_again() {
        let completed = record(BridgeStatus::BridgeCompleted, "100");
        assert_eq!(
            initiation_action(Some(&completed), &U256::from(100u64)),
            InitiationAction::SkipCompleted
        );
    }

    #[test]
    fn test_matching_fee_commits() {
        let queried = record(BridgeStatus::Queried, "100");
        assert_eq!(
            initiation_action(Some(&queried), &U256::from(100u64)),
            InitiationAction::Commit {
                fee_mismatch: false
            }
        );
    }

    #[test]
    fn test_fee_mismatch_is_flagged_but_still_commits() {
        let queried = record(BridgeStatus::Queried, "100");
        assert_eq!(
            initiation_action(Some(&queried), &U256::from(99u64)),
            InitiationAction::Commit { fee_mismatch: true }
        );
    }

    #[test]
    fn test_replay_of_initiated_record_recommits_idempotently() {
        // A re-scanned window sees the same event again while the record is
        // already BRIDGE_INITIATED; committing again writes the same state.
        let initiated = record(BridgeStatus::BridgeInitiated, "100");
        assert_eq!(
            initiation_action(Some(&initiated), &U256::from(100u64)),
            InitiationAction::Commit {
                fee_mismatch: false
            }
        );
    }
}
