mod evm;
mod fallback;
mod sui;

use async_trait::async_trait;

use crate::address::Address;
use crate::chains::{ChainDescriptor, ChainKind};
use crate::error::{FetchError, ScanError};
use crate::portfolio::BalanceEntry;

pub use evm::EvmFetcher;
pub use fallback::{create_fallback_provider, FallbackConfig};
pub use sui::SuiFetcher;

/// Balance lookup for one chain.
///
/// Implementations hold the chain's client and must be free of side effects,
/// so a failed call can be retried blindly.
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    /// Native and token balances of `address`, native entry first
    async fn fetch_balances(&self, address: &Address) -> Result<Vec<BalanceEntry>, FetchError>;
}

/// Builds the client handle used for a single chain scan
#[async_trait]
pub trait FetcherFactory: Send + Sync {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Box<dyn BalanceFetcher>, ScanError>;
}

/// Factory talking to the chain's configured RPC endpoints
#[derive(Debug, Clone, Default)]
pub struct RpcFetcherFactory;

impl RpcFetcherFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FetcherFactory for RpcFetcherFactory {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Box<dyn BalanceFetcher>, ScanError> {
        match chain.kind {
            ChainKind::Evm => {
                let config = FallbackConfig::new(chain.rpc_urls.clone(), chain.rpc_urls.len());
                let provider = create_fallback_provider(config).map_err(|e| {
                    ScanError::InvalidChainConfig {
                        chain: chain.id.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Box::new(EvmFetcher::new(provider, chain)))
            }
            ChainKind::Sui => Ok(Box::new(SuiFetcher::new(chain)?)),
        }
    }
}
