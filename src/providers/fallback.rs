use alloy::{
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{
        http::{reqwest::Url, Http},
        layers::FallbackLayer,
    },
};
use eyre::Result;
use std::num::NonZeroUsize;
use tower::ServiceBuilder;

/// Configuration for fallback provider
pub struct FallbackConfig {
    pub rpc_urls: Vec<String>,
    pub active_transport_count: usize,
}

impl FallbackConfig {
    pub fn new(rpc_urls: Vec<String>, active_transport_count: usize) -> Self {
        Self {
            rpc_urls,
            active_transport_count,
        }
    }
}

/// Creates a provider that spreads requests over every configured endpoint
pub fn create_fallback_provider(config: FallbackConfig) -> Result<impl Provider> {
    let transports = config
        .rpc_urls
        .iter()
        .filter(|url| !url.trim().is_empty())
        .map(|url| {
            Url::parse(url)
                .map(Http::new)
                .map_err(|e| eyre::eyre!("Invalid URL {}: {}", url, e))
        })
        .collect::<Result<Vec<Http<_>>>>()?;

    let active = config.active_transport_count.min(transports.len());
    let active = NonZeroUsize::new(active).ok_or_else(|| eyre::eyre!("No RPC endpoint configured"))?;

    let transport = ServiceBuilder::new()
        .layer(FallbackLayer::default().with_active_transport_count(active))
        .service(transports);

    let client = RpcClient::builder().transport(transport, false);
    Ok(ProviderBuilder::new().connect_client(client))
}
