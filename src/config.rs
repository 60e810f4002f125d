use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::address::Address;
use crate::chains::{builtin_networks, ChainDescriptor, ChainId, ChainKind, ChainRegistry};
use crate::scanning::BackoffKind;

/// ERC-20 token to look up on an EVM chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    /// Queried from the contract when omitted
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// Pacing and retry settings for one chain
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Addresses fetched concurrently per batch
    pub batch_size: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "inter_batch_delay_ms")]
    pub inter_batch_delay: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "retry_delay_ms")]
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "fetch_timeout_ms")]
    pub fetch_timeout: Duration,
    /// Fractional digits kept when formatting balances
    pub display_places: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_millis(1000),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            backoff: BackoffKind::Fixed,
            fetch_timeout: Duration::from_secs(10),
            display_places: 4,
        }
    }
}

/// Per-chain overrides; unset fields fall back to the global settings
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOverrides {
    pub batch_size: Option<usize>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "inter_batch_delay_ms")]
    pub inter_batch_delay: Option<Duration>,
    pub max_retries: Option<u32>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "retry_delay_ms")]
    pub retry_delay: Option<Duration>,
    pub backoff: Option<BackoffKind>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(rename = "fetch_timeout_ms")]
    pub fetch_timeout: Option<Duration>,
    pub display_places: Option<u8>,
}

impl ScanOverrides {
    pub fn apply(&self, defaults: &ScanSettings) -> ScanSettings {
        ScanSettings {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            inter_batch_delay: self.inter_batch_delay.unwrap_or(defaults.inter_batch_delay),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
            backoff: self.backoff.unwrap_or(defaults.backoff),
            fetch_timeout: self.fetch_timeout.unwrap_or(defaults.fetch_timeout),
            display_places: self.display_places.unwrap_or(defaults.display_places),
        }
    }
}

/// Chain definition as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub kind: ChainKind,
    pub symbol: String,
    #[serde(default)]
    pub native_decimals: Option<u8>,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub explorer: String,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub scan: ScanOverrides,
}

/// Application configuration from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub addresses: Vec<String>,
    /// Chains scanned when none are given on the command line
    pub chains: Vec<String>,
    pub scan: ScanSettings,
    /// Added chains, or replacements for built-in ones with the same key
    pub networks: BTreeMap<String, NetworkConfig>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Built-in chains merged with the configured networks
    pub fn registry(&self) -> Result<ChainRegistry> {
        let mut registry = ChainRegistry::builtin(&self.scan);

        for (key, network) in &self.networks {
            let descriptor = ChainDescriptor::from_network(ChainId::new(key), network, &self.scan);
            descriptor.validate()?;
            registry.insert(descriptor);
        }

        Ok(registry)
    }

    /// Configured addresses, rejecting any malformed entry
    pub fn parsed_addresses(&self) -> Result<Vec<Address>> {
        self.addresses
            .iter()
            .map(|raw| Address::parse(raw).map_err(|e| eyre!("invalid address in config: {e}")))
            .collect()
    }

    /// Chains to scan, `SUI` and `ETH` when none are configured
    pub fn selected_chains(&self) -> Vec<ChainId> {
        if self.chains.is_empty() {
            return vec![ChainId::new("SUI"), ChainId::new("ETH")];
        }
        self.chains.iter().map(|key| ChainId::new(key)).collect()
    }
}

/// Keys of every chain that works without a config file
pub fn builtin_chain_keys() -> Vec<String> {
    builtin_networks().into_keys().collect()
}
