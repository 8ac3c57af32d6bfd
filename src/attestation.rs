//! Signed VAA retrieval from the wormhole guardian network
//!
//! A VAA is requested by (emitter chain in wormhole numbering, emitter
//! address, sequence). Guardians take a while to observe and sign the source
//! event, so the fetcher polls a rotating pool of public REST endpoints
//! until the VAA materializes or the attempt budget runs out. Nothing is
//! cached; every attempt asks the network again.

use alloy::primitives::Address;
use base64::Engine;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const MAINNET_GUARDIAN_HOSTS: &[&str] = &[
    "https://wormhole-v2-mainnet-api.certus.one",
    "https://wormhole.inotel.ro",
    "https://wormhole-v2-mainnet-api.mcf.rocks",
    "https://wormhole-v2-mainnet-api.chainlayer.network",
    "https://wormhole-v2-mainnet-api.staking.fund",
    "https://wormhole-v2-mainnet.01node.com",
];

const TESTNET_GUARDIAN_HOSTS: &[&str] = &["https://wormhole-v2-testnet-api.certus.one"];

/// Delay between attempts; guardians typically sign within a few seconds of
/// the source chain reaching finality.
const RETRY_INTERVAL: Duration = Duration::from_millis(1500);

/// Default attempt budget used by the bridge executor.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

// Process-wide so concurrent fetches keep rotating instead of hammering the
// same host.
static NEXT_HOST: AtomicUsize = AtomicUsize::new(0);

/// Advance `counter` and map it onto an endpoint index.
fn rotate(counter: &AtomicUsize, pool_len: usize) -> usize {
    counter.fetch_add(1, Ordering::Relaxed) % pool_len
}

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("attestation attempts exhausted after {attempts} tries: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Debug, Deserialize)]
struct SignedVaaResponse {
    #[serde(rename = "vaaBytes")]
    vaa_bytes: String,
}

/// Fetches signed VAAs from the guardian REST endpoints.
pub struct AttestationFetcher {
    hosts: &'static [&'static str],
    client: reqwest::Client,
    retry_interval: Duration,
}

impl AttestationFetcher {
    pub fn new(mainnet: bool) -> Self {
        Self {
            hosts: if mainnet {
                MAINNET_GUARDIAN_HOSTS
            } else {
                TESTNET_GUARDIAN_HOSTS
            },
            client: reqwest::Client::new(),
            retry_interval: RETRY_INTERVAL,
        }
    }

    /// Fetch the signed VAA for (emitter chain, emitter, sequence), retrying
    /// across the endpoint pool up to `max_attempts` times. Returns the raw
    /// VAA bytes; the relayer never parses them.
    pub async fn fetch(
        &self,
        emitter_chain: u16,
        emitter_address: &str,
        sequence: u64,
        max_attempts: u32,
    ) -> Result<Vec<u8>, AttestationError> {
        let mut attempts = 0u32;
        let mut last_error = String::from("no attempts made");

        loop {
            attempts += 1;
            tokio::time::sleep(self.retry_interval).await;

            let host = self.hosts[rotate(&NEXT_HOST, self.hosts.len())];
            let url = format!(
                "{}/v1/signed_vaa/{}/{}/{}",
                host, emitter_chain, emitter_address, sequence
            );

            match self.request(&url).await {
                Ok(bytes) => {
                    debug!(
                        emitter_chain,
                        emitter = emitter_address,
                        sequence,
                        attempts,
                        host,
                        vaa_len = bytes.len(),
                        "Signed VAA retrieved"
                    );
                    return Ok(bytes);
                }
                Err(e) => {
                    last_error = e;
                    if attempts > max_attempts {
                        warn!(
                            emitter_chain,
                            emitter = emitter_address,
                            sequence,
                            attempts,
                            error = %last_error,
                            "Giving up on signed VAA"
                        );
                        return Err(AttestationError::Exhausted {
                            attempts,
                            last_error,
                        });
                    }
                }
            }
        }
    }

    async fn request(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let body: SignedVaaResponse = response.json().await.map_err(|e| e.to_string())?;

        base64::engine::general_purpose::STANDARD
            .decode(&body.vaa_bytes)
            .map_err(|e| format!("invalid base64 vaaBytes: {}", e))
    }
}

/// Wormhole emitter representation of an EVM address: the 20 bytes
/// left-padded to 32, hex-encoded without a 0x prefix.
pub fn emitter_address_hex(address: Address) -> String {
    let mut padded = [0u8; 32];
    padded[12..32].copy_from_slice(address.as_slice());
    hex::encode(padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_host_rotation_wraps() {
        let counter = AtomicUsize::new(0);
        let len = MAINNET_GUARDIAN_HOSTS.len();
        let picked: Vec<usize> = (0..len * 2).map(|_| rotate(&counter, len)).collect();

        // two full laps over the pool, in order
        let lap: Vec<usize> = (0..len).collect();
        assert_eq!(&picked[..len], &lap[..]);
        assert_eq!(&picked[len..], &lap[..]);
    }

    #[test]
    fn test_single_host_pool_always_selects_it() {
        let counter = AtomicUsize::new(0);
        for _ in 0..5 {
            assert_eq!(rotate(&counter, 1), 0);
        }
    }

    #[test]
    fn test_emitter_address_hex_left_pads() {
        let addr = Address::from_str("0x0290FB167208Af455bB137780163b7B7a9a10C16").unwrap();
        assert_eq!(
            emitter_address_hex(addr),
            "0000000000000000000000000290fb167208af455bb137780163b7b7a9a10c16"
        );
    }
}
