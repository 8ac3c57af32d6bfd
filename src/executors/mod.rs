//! On-chain executors
//!
//! The deployment executor drives PENDING asset networks to DEPLOYED; the
//! bridge executor drives initiated transfers to BRIDGE_COMPLETED. All four
//! asset-kind passes share the hot wallet, so one executor job runs them
//! strictly in sequence within a tick — two concurrent passes would race on
//! the signer's nonce space.

use alloy::signers::local::PrivateKeySigner;
use eyre::{Result, WrapErr};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::chains::ChainRegistry;
use crate::config::Config;
use crate::errors::classify_error;
use crate::metrics;
use crate::scheduler::run_interval_job;
use crate::types::AssetKind;

pub mod bridge;
pub mod deployment;

pub use bridge::BridgeExecutor;
pub use deployment::DeploymentExecutor;

/// Runs the four executor passes on one timer, in a fixed order.
pub struct ExecutorManager {
    token_deployment: Arc<DeploymentExecutor>,
    token_bridge: Arc<BridgeExecutor>,
    nft_deployment: Arc<DeploymentExecutor>,
    nft_bridge: Arc<BridgeExecutor>,
    interval: Duration,
}

impl ExecutorManager {
    pub fn new(config: &Config, registry: Arc<ChainRegistry>, db: PgPool) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .wallet
            .private_key
            .parse()
            .wrap_err("Invalid hot wallet private key")?;

        info!(
            hot_wallet = %signer.address(),
            chains = registry.len(),
            "Executor manager initialized"
        );

        let token_deployment = Arc::new(DeploymentExecutor::new(
            AssetKind::Token,
            registry.clone(),
            db.clone(),
            signer.clone(),
        ));
        let nft_deployment = Arc::new(DeploymentExecutor::new(
            AssetKind::Nft,
            registry.clone(),
            db.clone(),
            signer.clone(),
        ));
        let token_bridge = Arc::new(BridgeExecutor::new(
            AssetKind::Token,
            registry.clone(),
            db.clone(),
            signer.clone(),
            config.mainnet,
        ));
        let nft_bridge = Arc::new(BridgeExecutor::new(
            AssetKind::Nft,
            registry,
            db,
            signer,
            config.mainnet,
        ));

        Ok(Self {
            token_deployment,
            token_bridge,
            nft_deployment,
            nft_bridge,
            interval: Duration::from_millis(config.polling.executor_interval_ms),
        })
    }

    /// Tick until shutdown. Pass order inside a tick is fixed:
    /// token-deploy, token-bridge, nft-deploy, nft-bridge.
    pub async fn run(self, shutdown: mpsc::Receiver<()>) -> Result<()> {
        let token_deployment = self.token_deployment.clone();
        let token_bridge = self.token_bridge.clone();
        let nft_deployment = self.nft_deployment.clone();
        let nft_bridge = self.nft_bridge.clone();

        run_interval_job("executors", self.interval, shutdown, move || {
            let token_deployment = token_deployment.clone();
            let token_bridge = token_bridge.clone();
            let nft_deployment = nft_deployment.clone();
            let nft_bridge = nft_bridge.clone();

            async move {
                run_contained("token-deploy", token_deployment.run_pass()).await;
                run_contained("token-bridge", token_bridge.run_pass()).await;
                run_contained("nft-deploy", nft_deployment.run_pass()).await;
                run_contained("nft-bridge", nft_bridge.run_pass()).await;
                Ok(())
            }
        })
        .await
    }
}

/// A failing pass must not starve the passes behind it in the tick.
async fn run_contained<F>(name: &'static str, pass: F)
where
    F: std::future::Future<Output = Result<()>>,
{
    if let Err(e) = pass.await {
        let class = classify_error(&e.to_string());
        metrics::record_error(name, class.as_str());
        error!(pass = name, error = %e, ?class, "Executor pass failed");
    }
}
