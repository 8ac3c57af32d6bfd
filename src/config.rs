#![allow(dead_code)]

use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;

use crate::types::FeeMismatchPolicy;

/// Main configuration for the relayer
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub wallet: WalletConfig,
    /// Selects the chain registry, tracker genesis blocks and the wormhole
    /// endpoint pool
    pub mainnet: bool,
    pub polling: PollingConfig,
    pub fee_policy: FeePolicyConfig,
    pub api_port: u16,
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Custom Debug that redacts the database URL (may contain credentials).
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .finish()
    }
}

/// Hot wallet configuration
#[derive(Clone)]
pub struct WalletConfig {
    pub private_key: String,
}

/// Custom Debug that redacts the private key to prevent accidental log leakage.
impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Polling intervals for the tracker and executor jobs
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub tracker_interval_ms: u64,
    pub executor_interval_ms: u64,
}

/// Per-kind handling of deployment fee mismatches observed by the trackers
#[derive(Debug, Clone)]
pub struct FeePolicyConfig {
    pub token_mismatch: FeeMismatchPolicy,
    pub nft_mismatch: FeeMismatchPolicy,
}

fn default_tracker_interval() -> u64 {
    180_000
}

fn default_executor_interval() -> u64 {
    20_000
}

fn default_api_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads a .env file if present, then reads from the environment.
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .map_err(|_| eyre!("DATABASE_URL environment variable is required"))?,
        };

        let wallet = WalletConfig {
            private_key: env::var("HOT_WALLET_PRIVATE_KEY")
                .map_err(|_| eyre!("HOT_WALLET_PRIVATE_KEY environment variable is required"))?,
        };
        if !wallet.private_key.starts_with("0x") || wallet.private_key.len() != 66 {
            return Err(eyre!("HOT_WALLET_PRIVATE_KEY must be a 0x-prefixed 32-byte hex key"));
        }

        let mainnet = matches!(
            env::var("IS_MAINNET").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        );

        let polling = PollingConfig {
            tracker_interval_ms: parse_env_or("TRACKER_POLL_INTERVAL_MS", default_tracker_interval)?,
            executor_interval_ms: parse_env_or(
                "EXECUTOR_POLL_INTERVAL_MS",
                default_executor_interval,
            )?,
        };

        let fee_policy = FeePolicyConfig {
            token_mismatch: parse_policy("FEE_MISMATCH_POLICY_TOKEN")?,
            nft_mismatch: parse_policy("FEE_MISMATCH_POLICY_NFT")?,
        };

        let api_port = parse_env_or("API_PORT", default_api_port)?;

        Ok(Self {
            database,
            wallet,
            mainnet,
            polling,
            fee_policy,
            api_port,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: fn() -> T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| eyre!("{} must be a valid number", name)),
        Err(_) => Ok(default()),
    }
}

/// Mismatched deployment fees default to the strict policy: skip the record.
fn parse_policy(name: &str) -> Result<FeeMismatchPolicy> {
    match env::var(name) {
        Ok(value) => {
            FeeMismatchPolicy::parse(&value).ok_or_else(|| eyre!("{} must be 'skip' or 'proceed'", name))
        }
        Err(_) => Ok(FeeMismatchPolicy::Skip),
    }
}
