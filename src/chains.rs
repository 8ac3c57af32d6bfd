//! Supported-chain registry
//!
//! Every chain the relayer touches needs a complete row here: RPC endpoint,
//! relayer contract, wormhole core contract, the chain's id in wormhole
//! numbering, VAA confirmation requirement, tracker genesis block and price
//! symbol. The registry is validated once at startup so a missing mapping
//! fails the process immediately instead of deep inside a polling pass.

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::collections::HashMap;
use std::str::FromStr;

/// Fully-resolved configuration for a single supported chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Native EVM chain id
    pub chain_id: u64,
    /// Human-readable name for logs and metrics labels
    pub name: &'static str,
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,
    /// CAT relayer contract on this chain
    pub relayer_address: Address,
    /// Wormhole core bridge contract (emits LogMessagePublished)
    pub wormhole_core: Address,
    /// This chain's id in wormhole numbering (not the native chain id)
    pub wormhole_chain_id: u16,
    /// Blocks that must elapse on this chain before a VAA is requested
    pub required_confirmations: u64,
    /// First block the trackers scan when no watermark exists yet
    pub genesis_block: u64,
    /// Price-table symbol for this chain's native coin
    pub price_symbol: &'static str,
    /// Leave gas pricing to the client's dynamic fee defaults instead of
    /// overriding gasPrice manually
    pub dynamic_fees: bool,
}

/// Static part of a chain row; RPC URL and relayer address can be overridden
/// (or, for test networks, supplied) through the environment.
struct ChainSpec {
    chain_id: u64,
    name: &'static str,
    default_rpc_url: &'static str,
    default_relayer: Option<&'static str>,
    wormhole_core: &'static str,
    wormhole_chain_id: u16,
    required_confirmations: u64,
    genesis_block: u64,
    price_symbol: &'static str,
    dynamic_fees: bool,
}

/// Relayer contract address shared by all mainnet deployments.
const MAINNET_RELAYER: &str = "0x9A82776580aB1511C7aFF2Bf8eD3551d9c97Ecda";

const MAINNET_CHAINS: &[ChainSpec] = &[
    ChainSpec {
        chain_id: 1,
        name: "ethereum",
        default_rpc_url: "https://rpc.ankr.com/eth",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
        wormhole_chain_id: 2,
        required_confirmations: 100,
        genesis_block: 18_665_156,
        price_symbol: "ethereum",
        dynamic_fees: true,
    },
    ChainSpec {
        chain_id: 56,
        name: "bsc",
        default_rpc_url: "https://bsc-dataseed.binance.org",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
        wormhole_chain_id: 4,
        required_confirmations: 100,
        genesis_block: 33_867_653,
        price_symbol: "binancecoin",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 137,
        name: "polygon",
        default_rpc_url: "https://polygon-rpc.com",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0x7A4B5a56256163F07b2C80A7cA55aBE66c4ec4d7",
        wormhole_chain_id: 5,
        required_confirmations: 1000,
        genesis_block: 50_464_591,
        price_symbol: "matic-network",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 43114,
        name: "avalanche",
        default_rpc_url: "https://api.avax.network/ext/bc/C/rpc",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0x54a8e5f9c4CbA08F9943965859F6c34eAF03E26c",
        wormhole_chain_id: 6,
        required_confirmations: 100,
        genesis_block: 38_321_803,
        price_symbol: "avalanche-2",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 250,
        name: "fantom",
        default_rpc_url: "https://rpc.ftm.tools",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0x126783A6Cb203a3E35344528B26ca3a0489a1485",
        wormhole_chain_id: 10,
        required_confirmations: 100,
        genesis_block: 71_624_213,
        price_symbol: "fantom",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 42161,
        name: "arbitrum",
        default_rpc_url: "https://arb1.arbitrum.io/rpc",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0xa5f208e072434bC67592E4C49C1B991BA79BCA46",
        wormhole_chain_id: 23,
        required_confirmations: 100,
        genesis_block: 154_692_521,
        price_symbol: "ethereum",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 10,
        name: "optimism",
        default_rpc_url: "https://mainnet.optimism.io",
        default_relayer: Some(MAINNET_RELAYER),
        wormhole_core: "0xEe91C335eab126dF5fDB3797EA9d6aD93aeC9722",
        wormhole_chain_id: 24,
        required_confirmations: 100,
        genesis_block: 112_758_166,
        price_symbol: "ethereum",
        dynamic_fees: false,
    },
];

// Test networks have no baked-in relayer deployment; the address must come
// from CAT_RELAYER_ADDRESS_<chain_id>.
const TESTNET_CHAINS: &[ChainSpec] = &[
    ChainSpec {
        chain_id: 5,
        name: "goerli",
        default_rpc_url: "https://rpc.ankr.com/eth_goerli",
        default_relayer: None,
        wormhole_core: "0x706abc4E45D419950511e474C7B9Ed348A4a716c",
        wormhole_chain_id: 2,
        required_confirmations: 1,
        genesis_block: 8_975_484,
        price_symbol: "ethereum",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 97,
        name: "bsc-testnet",
        default_rpc_url: "https://rpc.ankr.com/bsc_testnet_chapel",
        default_relayer: None,
        wormhole_core: "0x68605AD7b15c732a30b1BbC62BE8F2A509D74b4D",
        wormhole_chain_id: 4,
        required_confirmations: 1,
        genesis_block: 29_675_331,
        price_symbol: "binancecoin",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 80001,
        name: "mumbai",
        default_rpc_url: "https://rpc.ankr.com/polygon_mumbai",
        default_relayer: None,
        wormhole_core: "0x0CBE91CF822c73C2315FB05100C2F714765d5c20",
        wormhole_chain_id: 5,
        required_confirmations: 1,
        genesis_block: 35_418_410,
        price_symbol: "matic-network",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 43113,
        name: "fuji",
        default_rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
        default_relayer: None,
        wormhole_core: "0x7bbcE28e64B3F8b84d876Ab298393c38ad7aac4C",
        wormhole_chain_id: 6,
        required_confirmations: 1,
        genesis_block: 21_762_060,
        price_symbol: "avalanche-2",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 4002,
        name: "fantom-testnet",
        default_rpc_url: "https://rpc.testnet.fantom.network",
        default_relayer: None,
        wormhole_core: "0x1BB3B4119b7BA9dfad76B0545fb3F531383c3bB7",
        wormhole_chain_id: 10,
        required_confirmations: 1,
        genesis_block: 15_468_120,
        price_symbol: "fantom",
        dynamic_fees: false,
    },
    ChainSpec {
        chain_id: 421613,
        name: "arbitrum-goerli",
        default_rpc_url: "https://goerli-rollup.arbitrum.io/rpc",
        default_relayer: None,
        wormhole_core: "0xC7A204bDBFe983FCD8d8E61D02b475D4073fF97e",
        wormhole_chain_id: 23,
        required_confirmations: 1,
        genesis_block: 19_300_323,
        price_symbol: "ethereum",
        dynamic_fees: false,
    },
];

/// Validated set of supported chains for the selected environment.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    by_id: HashMap<u64, usize>,
}

impl ChainRegistry {
    /// Build the registry for mainnet or testnet, applying per-chain
    /// environment overrides and validating every entry.
    pub fn load(mainnet: bool) -> Result<Self> {
        let specs = if mainnet { MAINNET_CHAINS } else { TESTNET_CHAINS };

        let mut chains = Vec::with_capacity(specs.len());
        for spec in specs {
            chains.push(Self::resolve(spec)?);
        }
        Self::from_chains(chains)
    }

    /// Build a registry from explicit chain configs (used by tests).
    pub fn from_chains(chains: Vec<ChainConfig>) -> Result<Self> {
        if chains.is_empty() {
            return Err(eyre!("At least one chain must be configured"));
        }

        let mut by_id = HashMap::new();
        for (idx, chain) in chains.iter().enumerate() {
            if by_id.insert(chain.chain_id, idx).is_some() {
                return Err(eyre!("Duplicate chain id in registry: {}", chain.chain_id));
            }
        }

        Ok(Self { chains, by_id })
    }

    fn resolve(spec: &ChainSpec) -> Result<ChainConfig> {
        let rpc_url = std::env::var(format!("CAT_RPC_URL_{}", spec.chain_id))
            .unwrap_or_else(|_| spec.default_rpc_url.to_string());

        let relayer = match std::env::var(format!("CAT_RELAYER_ADDRESS_{}", spec.chain_id)) {
            Ok(addr) => addr,
            Err(_) => spec
                .default_relayer
                .map(str::to_string)
                .ok_or_else(|| {
                    eyre!(
                        "No relayer address for chain {} ({}); set CAT_RELAYER_ADDRESS_{}",
                        spec.chain_id,
                        spec.name,
                        spec.chain_id
                    )
                })?,
        };

        let relayer_address = Address::from_str(&relayer)
            .wrap_err_with(|| format!("Invalid relayer address for chain {}", spec.name))?;
        let wormhole_core = Address::from_str(spec.wormhole_core)
            .wrap_err_with(|| format!("Invalid wormhole core address for chain {}", spec.name))?;

        Ok(ChainConfig {
            chain_id: spec.chain_id,
            name: spec.name,
            rpc_url,
            relayer_address,
            wormhole_core,
            wormhole_chain_id: spec.wormhole_chain_id,
            required_confirmations: spec.required_confirmations,
            genesis_block: spec.genesis_block,
            price_symbol: spec.price_symbol,
            dynamic_fees: spec.dynamic_fees,
        })
    }

    /// Look up a chain by native id; unknown ids are an error, never a panic.
    pub fn get(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.by_id
            .get(&chain_id)
            .map(|&idx| &self.chains[idx])
            .ok_or_else(|| eyre!("Unsupported chain id: {}", chain_id))
    }

    /// All chains in registry order.
    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Translate a native chain id into wormhole numbering.
    pub fn wormhole_chain_id(&self, chain_id: u64) -> Result<u16> {
        Ok(self.get(chain_id)?.wormhole_chain_id)
    }

    /// Wormhole ids of every chain except `exclude` — the fan-out set for
    /// star-topology registration from a freshly deployed hub.
    pub fn wormhole_ids_excluding(&self, exclude: u64) -> Vec<u16> {
        self.chains
            .iter()
            .filter(|c| c.chain_id != exclude)
            .map(|c| c.wormhole_chain_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_registry_loads_and_validates() {
        let registry = ChainRegistry::load(true).unwrap();
        assert_eq!(registry.len(), 7);

        let eth = registry.get(1).unwrap();
        assert_eq!(eth.wormhole_chain_id, 2);
        assert_eq!(eth.required_confirmations, 100);
        assert!(eth.dynamic_fees);

        let polygon = registry.get(137).unwrap();
        assert_eq!(polygon.required_confirmations, 1000);
        assert!(!polygon.dynamic_fees);
    }

    #[test]
    fn test_unknown_chain_is_error() {
        let registry = ChainRegistry::load(true).unwrap();
        assert!(registry.get(195).is_err());
    }

    #[test]
    fn test_star_registration_excludes_hub_chain() {
        let registry = ChainRegistry::load(true).unwrap();
        let ids = registry.wormhole_ids_excluding(56);
        assert_eq!(ids.len(), registry.len() - 1);
        assert!(!ids.contains(&4)); // bsc's wormhole id
        assert!(ids.contains(&2)); // ethereum still present
    }

    #[test]
    fn test_duplicate_chain_id_rejected() {
        let registry = ChainRegistry::load(true).unwrap();
        let mut chains: Vec<ChainConfig> = registry.chains().cloned().collect();
        chains.push(chains[0].clone());
        assert!(ChainRegistry::from_chains(chains).is_err());
    }
}
