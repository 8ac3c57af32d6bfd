//! Bridge executor
//!
//! Drives initiated bridge transfers to completion: wait out the source
//! chain's confirmation requirement, pull the message sequence out of the
//! initiation receipt, fetch the signed VAA from the guardian network, and
//! redeem it on the destination token. Confirmation accrues across passes —
//! a record short of its requirement is parked in BLOCK_CONFIRMATION with
//! progress counters rather than blocking the pass.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use eyre::{eyre, Result, WrapErr};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::attestation::{emitter_address_hex, AttestationFetcher, DEFAULT_MAX_ATTEMPTS};
use crate::chains::{ChainConfig, ChainRegistry};
use crate::contracts::asset::{CatErc20, CatErc721};
use crate::contracts::wormhole::WormholeCore;
use crate::db::{self, BridgeRecord};
use crate::errors::classify_error;
use crate::executors::deployment::send_and_confirm;
use crate::gas::submission_gas_price;
use crate::metrics;
use crate::types::AssetKind;

/// Where a record stands against its source chain's confirmation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationProgress {
    /// Not enough blocks elapsed; `done` of `required` so far
    Waiting { done: u64, required: u64 },
    /// The requirement is met and the VAA can be requested
    Reached { done: u64, required: u64 },
}

/// Confirmations elapsed for a receipt mined at `receipt_block`, observed at
/// `current_block`, against the chain's requirement.
pub fn confirmation_progress(
    receipt_block: u64,
    current_block: u64,
    required: u64,
) -> ConfirmationProgress {
    let done = current_block.saturating_sub(receipt_block);
    if done < required {
        ConfirmationProgress::Waiting { done, required }
    } else {
        ConfirmationProgress::Reached { done, required }
    }
}

pub struct BridgeExecutor {
    kind: AssetKind,
    registry: Arc<ChainRegistry>,
    db: PgPool,
    signer: PrivateKeySigner,
    attestations: AttestationFetcher,
}

impl BridgeExecutor {
    pub fn new(
        kind: AssetKind,
        registry: Arc<ChainRegistry>,
        db: PgPool,
        signer: PrivateKeySigner,
        mainnet: bool,
    ) -> Self {
        Self {
            kind,
            registry,
            db,
            signer,
            attestations: AttestationFetcher::new(mainnet),
        }
    }

    /// One executor pass: requeue errored records, then push every active
    /// record as far as it can go this pass.
    pub async fn run_pass(&self) -> Result<()> {
        let requeued = db::requeue_errored_bridges(&self.db, self.kind).await?;
        if requeued > 0 {
            info!(kind = %self.kind, requeued, "Requeued errored bridges");
        }

        let records = db::get_active_bridges(&self.db, self.kind).await?;
        if !records.is_empty() {
            info!(kind = %self.kind, active = records.len(), "Processing active bridges");
        }

        for record in &records {
            if let Err(e) = self.process_record(record).await {
                let class = classify_error(&e.to_string());
                error!(
                    kind = %self.kind,
                    record_id = record.id,
                    from_chain = record.from_chain_id,
                    to_chain = record.to_chain_id,
                    error = %e,
                    ?class,
                    "Bridge transfer failed"
                );
                metrics::record_bridge(self.kind.as_str(), false);
                db::mark_bridge_errored(&self.db, record.id, &e.to_string()).await?;
            }
        }

        Ok(())
    }

    async fn process_record(&self, record: &BridgeRecord) -> Result<()> {
        let source_chain = self.registry.get(record.from_chain_id as u64)?;

        let initiate_tx = record
            .initiate_tx_hash
            .as_deref()
            .ok_or_else(|| eyre!("Bridge record has no initiation tx hash"))?;
        let initiate_tx = B256::from_str(initiate_tx)
            .map_err(|_| eyre!("Invalid initiation tx hash: {}", initiate_tx))?;

        let source_provider = ProviderBuilder::new()
            .on_http(source_chain.rpc_url.parse().wrap_err("Invalid RPC URL")?);

        let receipt = source_provider
            .get_transaction_receipt(initiate_tx)
            .await
            .wrap_err("Failed to fetch initiation receipt")?
            .ok_or_else(|| eyre!("No receipt for initiation tx {:?}", initiate_tx))?;
        let receipt_block = receipt
            .block_number
            .ok_or_else(|| eyre!("Missing block number on initiation receipt"))?;

        let current_block = source_provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")?;

        match confirmation_progress(
            receipt_block,
            current_block,
            source_chain.required_confirmations,
        ) {
            ConfirmationProgress::Waiting { done, required } => {
                debug!(
                    kind = %self.kind,
                    record_id = record.id,
                    chain = source_chain.name,
                    done,
                    required,
                    "Confirmation requirement not reached yet"
                );
                db::set_bridge_confirmation_progress(
                    &self.db,
                    record.id,
                    done as i64,
                    required as i64,
                )
                .await?;
                Ok(())
            }
            ConfirmationProgress::Reached { done, required } => {
                self.complete_transfer(record, source_chain, &receipt, done, required)
                    .await
            }
        }
    }

    async fn complete_transfer(
        &self,
        record: &BridgeRecord,
        source_chain: &ChainConfig,
        receipt: &TransactionReceipt,
        confirmations_done: u64,
        confirmations_required: u64,
    ) -> Result<()> {
        let sequence = parse_sequence(receipt, source_chain.wormhole_core)?;
        let emitter = self.resolve_emitter(record).await?;

        db::mark_bridge_in_queue(
            &self.db,
            record.id,
            sequence as i64,
            confirmations_done as i64,
            confirmations_required as i64,
        )
        .await?;

        info!(
            kind = %self.kind,
            record_id = record.id,
            sequence,
            emitter = %emitter,
            "Requesting signed VAA"
        );

        let vaa = self
            .attestations
            .fetch(
                source_chain.wormhole_chain_id,
                &emitter_address_hex(emitter),
                sequence,
                DEFAULT_MAX_ATTEMPTS,
            )
            .await?;

        let tx_hash = self.submit_bridge_in(record, vaa).await?;

        db::mark_bridge_completed(&self.db, record.id, &tx_hash).await?;
        info!(
            kind = %self.kind,
            record_id = record.id,
            to_chain = record.to_chain_id,
            tx_hash = %tx_hash,
            "Bridge transfer completed"
        );
        metrics::record_bridge(self.kind.as_str(), true);

        Ok(())
    }

    /// The VAA emitter is the source token, unless that token is a generic
    /// wrapped by a proxy — messages are then emitted by the proxy.
    async fn resolve_emitter(&self, record: &BridgeRecord) -> Result<Address> {
        let default: Address = record
            .from_token
            .parse()
            .map_err(|_| eyre!("Invalid source token address: {}", record.from_token))?;

        let wrapper = db::find_wrapping_proxy(
            &self.db,
            self.kind,
            record.from_chain_id,
            &record.from_token,
        )
        .await?;

        match wrapper.and_then(|w| w.address) {
            Some(proxy) => proxy
                .parse()
                .map_err(|_| eyre!("Invalid proxy address: {}", proxy)),
            None => Ok(default),
        }
    }

    /// Redeem the VAA on the destination token contract.
    async fn submit_bridge_in(&self, record: &BridgeRecord, vaa: Vec<u8>) -> Result<String> {
        let dest_chain = self.registry.get(record.to_chain_id as u64)?;
        let to_token: Address = record
            .to_token
            .parse()
            .map_err(|_| eyre!("Invalid destination token address: {}", record.to_token))?;

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .on_http(dest_chain.rpc_url.parse().wrap_err("Invalid RPC URL")?);

        let gas_price = if dest_chain.dynamic_fees {
            None
        } else {
            let current = provider
                .get_gas_price()
                .await
                .wrap_err("Failed to get gas price")?;
            Some(submission_gas_price(current))
        };

        let pending = match self.kind {
            AssetKind::Token => {
                let contract = CatErc20::new(to_token, &provider);
                let mut call = contract.bridgeIn(vaa.into());
                if let Some(gp) = gas_price {
                    call = call.gas_price(gp);
                }
                call.send().await
            }
            AssetKind::Nft => {
                let contract = CatErc721::new(to_token, &provider);
                let mut call = contract.bridgeIn(vaa.into());
                if let Some(gp) = gas_price {
                    call = call.gas_price(gp);
                }
                call.send().await
            }
        };

        let receipt = send_and_confirm(pending, 1).await?;
        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

/// Extract the message sequence from the wormhole core log in a bridge-out
/// receipt.
pub fn parse_sequence(receipt: &TransactionReceipt, wormhole_core: Address) -> Result<u64> {
    receipt
        .inner
        .logs()
        .iter()
        .filter(|log| log.address() == wormhole_core)
        .find_map(|log| log.log_decode::<WormholeCore::LogMessagePublished>().ok())
        .map(|decoded| decoded.inner.data.sequence)
        .ok_or_else(|| eyre!("LogMessagePublished event not found in receipt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmations_still_accruing() {
        // receipt at 1000, now 1050, 100 required: parked at 50/100
        assert_eq!(
            confirmation_progress(1000, 1050, 100),
            ConfirmationProgress::Waiting {
                done: 50,
                required: 100
            }
        );
    }

    #[test]
    fn test_confirmations_reached_exactly() {
        assert_eq!(
            confirmation_progress(1000, 1100, 100),
            ConfirmationProgress::Reached {
                done: 100,
                required: 100
            }
        );
    }

    #[test]
    fn test_reorged_head_behind_receipt_keeps_waiting() {
        // a lagging node can report a head below the receipt block; that
        // must read as zero confirmations, not wrap around
        assert_eq!(
            confirmation_progress(1000, 990, 100),
            ConfirmationProgress::Waiting {
                done: 0,
                required: 100
            }
        );
    }

    #[test]
    fn test_testnet_single_confirmation() {
        assert_eq!(
            confirmation_progress(500, 501, 1),
            ConfirmationProgress::Reached {
                done: 1,
                required: 1
            }
        );
        assert_eq!(
            confirmation_progress(500, 500, 1),
            ConfirmationProgress::Waiting {
                done: 0,
                required: 1
            }
        );
    }
}
