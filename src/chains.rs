use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{NetworkConfig, ScanSettings, TokenConfig};
use crate::error::ScanError;

/// Chain key such as `SUI` or `ETH`, always upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChainId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl FromStr for ChainId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// RPC family a chain speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Evm,
    Sui,
}

impl ChainKind {
    pub fn default_native_decimals(self) -> u8 {
        match self {
            ChainKind::Evm => 18,
            ChainKind::Sui => 9,
        }
    }
}

/// Resolved, read-only description of one chain
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDescriptor {
    pub id: ChainId,
    pub name: String,
    pub kind: ChainKind,
    pub symbol: String,
    pub native_decimals: u8,
    pub rpc_urls: Vec<String>,
    pub explorer: String,
    pub tokens: Vec<TokenConfig>,
    pub scan: ScanSettings,
}

impl ChainDescriptor {
    pub fn from_network(id: ChainId, network: &NetworkConfig, defaults: &ScanSettings) -> Self {
        Self {
            id,
            name: network.name.clone(),
            kind: network.kind,
            symbol: network.symbol.clone(),
            native_decimals: network
                .native_decimals
                .unwrap_or_else(|| network.kind.default_native_decimals()),
            rpc_urls: network.rpc_urls.clone(),
            explorer: network.explorer.clone(),
            tokens: network.tokens.clone(),
            scan: network.scan.apply(defaults),
        }
    }

    /// Reject descriptors that cannot be scanned
    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |reason: &str| ScanError::InvalidChainConfig {
            chain: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.rpc_urls.iter().all(|url| url.trim().is_empty()) {
            return Err(invalid("no rpc endpoint configured"));
        }
        if self.scan.batch_size == 0 {
            return Err(invalid("batch_size must be greater than zero"));
        }
        if self.symbol.trim().is_empty() {
            return Err(invalid("native symbol is empty"));
        }
        Ok(())
    }

    /// Explorer page for an address, if an explorer is configured
    pub fn explorer_address_url(&self, address: &str) -> Option<String> {
        if self.explorer.is_empty() {
            return None;
        }
        let base = self.explorer.trim_end_matches('/');
        Some(format!("{base}/address/{address}"))
    }
}

/// All chains known to this process
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, ChainDescriptor>,
}

impl ChainRegistry {
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ChainDescriptor>) -> Self {
        Self {
            chains: descriptors
                .into_iter()
                .map(|descriptor| (descriptor.id.clone(), descriptor))
                .collect(),
        }
    }

    /// Built-in chains with the given scan settings
    pub fn builtin(defaults: &ScanSettings) -> Self {
        Self::from_descriptors(
            builtin_networks()
                .iter()
                .map(|(key, network)| ChainDescriptor::from_network(ChainId::new(key), network, defaults)),
        )
    }

    pub fn get(&self, id: &ChainId) -> Result<&ChainDescriptor, ScanError> {
        self.chains
            .get(id)
            .ok_or_else(|| ScanError::UnknownChain(id.clone()))
    }

    pub fn contains(&self, id: &ChainId) -> bool {
        self.chains.contains_key(id)
    }

    /// Add a chain, replacing any existing entry with the same id
    pub fn insert(&mut self, descriptor: ChainDescriptor) {
        self.chains.insert(descriptor.id.clone(), descriptor);
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChainId> {
        self.chains.keys()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn token(symbol: &str, address: &str, decimals: u8) -> TokenConfig {
    TokenConfig {
        symbol: symbol.to_string(),
        address: address.to_string(),
        decimals: Some(decimals),
    }
}

fn evm(name: &str, symbol: &str, rpc: &str, explorer: &str, tokens: Vec<TokenConfig>) -> NetworkConfig {
    NetworkConfig {
        name: name.to_string(),
        kind: ChainKind::Evm,
        symbol: symbol.to_string(),
        native_decimals: None,
        rpc_urls: vec![rpc.to_string()],
        explorer: explorer.to_string(),
        tokens,
        scan: Default::default(),
    }
}

/// Chains available without any configuration file
pub fn builtin_networks() -> BTreeMap<String, NetworkConfig> {
    let mut networks = BTreeMap::new();

    networks.insert(
        "SUI".to_string(),
        NetworkConfig {
            name: "Sui".to_string(),
            kind: ChainKind::Sui,
            symbol: "SUI".to_string(),
            native_decimals: None,
            rpc_urls: vec!["https://fullnode.mainnet.sui.io:443".to_string()],
            explorer: "https://suiscan.xyz/mainnet".to_string(),
            tokens: Vec::new(),
            scan: Default::default(),
        },
    );

    networks.insert(
        "ETH".to_string(),
        evm(
            "Ethereum",
            "ETH",
            "https://ethereum.publicnode.com",
            "https://etherscan.io",
            vec![
                token("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
                token("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
                token("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F", 18),
                token("WBTC", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", 8),
                token("LINK", "0x514910771AF9Ca656af840dff83E8264EcF986CA", 18),
            ],
        ),
    );

    networks.insert(
        "POLYGON".to_string(),
        evm(
            "Polygon",
            "POL",
            "https://polygon-bor-rpc.publicnode.com",
            "https://polygonscan.com",
            vec![
                token("USDT", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
                token("USDC", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
                token("DAI", "0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063", 18),
                token("WBTC", "0x1BFD67037B42Cf73acF2047067bd4F2C47D9BfD6", 8),
                token("LINK", "0x53E0bca35eC356BD5ddDFebbD1Fc0fD03FaBad39", 18),
            ],
        ),
    );

    networks.insert(
        "OPTIMISM".to_string(),
        evm(
            "Optimism",
            "ETH",
            "https://optimism-rpc.publicnode.com",
            "https://optimistic.etherscan.io",
            vec![
                token("USDT", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58", 6),
                token("USDC", "0x7F5c764cBc14f9669B88837ca1490cCa17c31607", 6),
                token("DAI", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
                token("WBTC", "0x68f180fcCe6836688e9084f035309E29Bf0A2095", 8),
                token("LINK", "0x350a791Bfc2C21F9Ed5d10980Dad2e2638ffa7f6", 18),
            ],
        ),
    );

    networks.insert(
        "ARBITRUM".to_string(),
        evm(
            "Arbitrum",
            "ETH",
            "https://arbitrum-one-rpc.publicnode.com",
            "https://arbiscan.io",
            vec![
                token("USDT", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
                token("USDC", "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8", 6),
                token("DAI", "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1", 18),
                token("WBTC", "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f", 8),
                token("LINK", "0xf97f4df75117a78c1A5a0DBb814Af92458539FB4", 18),
            ],
        ),
    );

    networks.insert(
        "BSC".to_string(),
        evm(
            "BNB Chain",
            "BNB",
            "https://bsc-rpc.publicnode.com",
            "https://bscscan.com",
            vec![
                token("USDT", "0x55d398326f99059fF775485246999027B3197955", 18),
                token("USDC", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", 18),
                token("DAI", "0x1AF3F329e8BE154074D8769D1FFa4eE058B1DBc3", 18),
                token("LINK", "0x404460C6A5EdE2D891e8297795264fDe62ADBB75", 18),
            ],
        ),
    );

    networks.insert(
        "AVALANCHE".to_string(),
        evm(
            "Avalanche",
            "AVAX",
            "https://avalanche-c-chain-rpc.publicnode.com",
            "https://snowtrace.io",
            vec![
                token("USDT", "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7", 6),
                token("USDC", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", 6),
                token("DAI", "0xd586E7F844cEa2F87f50152665BCbc2C279D8d70", 18),
                token("WBTC", "0x50b7545627a5162F82A992c33b87aDc75187B218", 8),
                token("LINK", "0x5947BB275c521040051D82396192181b413227A3", 18),
            ],
        ),
    );

    networks.insert(
        "BASE".to_string(),
        evm(
            "Base",
            "ETH",
            "https://base-rpc.publicnode.com",
            "https://basescan.org",
            vec![
                token("DAI", "0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb", 18),
                token("USD+", "0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA", 6),
            ],
        ),
    );

    networks.insert(
        "LINEA".to_string(),
        evm(
            "Linea",
            "ETH",
            "https://linea-rpc.publicnode.com",
            "https://lineascan.build",
            Vec::new(),
        ),
    );

    networks
}
