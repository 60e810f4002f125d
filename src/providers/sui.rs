use alloy::primitives::U256;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::BalanceFetcher;
use crate::address::Address;
use crate::chains::{ChainDescriptor, ChainId};
use crate::error::{FetchError, ScanError};
use crate::portfolio::BalanceEntry;
use crate::units::format_units_truncated;

/// JSON-RPC codes nodes use for throttling
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinBalance {
    coin_type: String,
    total_balance: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CoinMetadata {
    decimals: u8,
    symbol: String,
}

/// Sui balances over the fullnode JSON-RPC API.
///
/// Requests rotate across the configured endpoints, so a retry after a failed
/// call goes to the next node. Coin metadata is fetched once per coin type.
pub struct SuiFetcher {
    client: Client,
    endpoints: Vec<Url>,
    next_endpoint: AtomicUsize,
    /// `None` records a coin type without published metadata
    metadata: Mutex<HashMap<String, Option<CoinMetadata>>>,
    chain: ChainId,
    symbol: String,
    native_decimals: u8,
    display_places: u8,
    timeout: Duration,
}

impl SuiFetcher {
    pub fn new(chain: &ChainDescriptor) -> Result<Self, ScanError> {
        let invalid = |reason: String| ScanError::InvalidChainConfig {
            chain: chain.id.clone(),
            reason,
        };

        let endpoints = chain
            .rpc_urls
            .iter()
            .filter(|url| !url.trim().is_empty())
            .map(|url| Url::parse(url).map_err(|e| invalid(format!("Invalid URL {url}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        if endpoints.is_empty() {
            return Err(invalid("no rpc endpoint configured".to_string()));
        }

        let client = Client::builder()
            .timeout(chain.scan.fetch_timeout)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            endpoints,
            next_endpoint: AtomicUsize::new(0),
            metadata: Mutex::new(HashMap::new()),
            chain: chain.id.clone(),
            symbol: chain.symbol.clone(),
            native_decimals: chain.native_decimals,
            display_places: chain.scan.display_places,
            timeout: chain.scan.fetch_timeout,
        })
    }

    fn endpoint(&self) -> &Url {
        let index = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        &self.endpoints[index % self.endpoints.len()]
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.endpoint().clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_request_error(e))?;

        if let Some(error) = classify_status(method, response.status()) {
            return Err(error);
        }

        let payload: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| self.classify_request_error(e))?;

        if let Some(error) = payload.error {
            return Err(classify_rpc_error(error));
        }

        Ok(payload.result)
    }

    fn classify_request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }

    async fn coin_metadata(&self, coin_type: &str) -> Result<Option<CoinMetadata>, FetchError> {
        if let Some(cached) = self.metadata.lock().await.get(coin_type) {
            return Ok(cached.clone());
        }

        let metadata: Option<CoinMetadata> = self
            .call("suix_getCoinMetadata", json!([coin_type]))
            .await?;
        debug!(chain = %self.chain, coin_type, "Cached coin metadata");
        self.metadata
            .lock()
            .await
            .insert(coin_type.to_string(), metadata.clone());
        Ok(metadata)
    }

    async fn coin_entry(&self, coin: &CoinBalance) -> Result<BalanceEntry, FetchError> {
        let raw = parse_raw_amount(&coin.total_balance)?;

        let metadata = self.coin_metadata(&coin.coin_type).await?;
        let (symbol, decimals) = match metadata {
            Some(metadata) => (metadata.symbol, metadata.decimals),
            None => (fallback_symbol(&coin.coin_type), 0),
        };

        Ok(BalanceEntry {
            token: coin.coin_type.clone(),
            symbol,
            amount: format_units_truncated(raw, decimals, self.display_places),
            decimals,
        })
    }
}

#[async_trait]
impl BalanceFetcher for SuiFetcher {
    async fn fetch_balances(&self, address: &Address) -> Result<Vec<BalanceEntry>, FetchError> {
        let coins: Vec<CoinBalance> = self
            .call("suix_getAllBalances", json!([address.as_str()]))
            .await?
            .unwrap_or_default();

        let mut native_raw = U256::ZERO;
        let mut tokens = Vec::new();

        for coin in &coins {
            if is_native_coin(&coin.coin_type) {
                native_raw = parse_raw_amount(&coin.total_balance)?;
                continue;
            }

            match self.coin_entry(coin).await {
                Ok(entry) => tokens.push(entry),
                Err(e) => {
                    warn!(
                        chain = %self.chain,
                        coin_type = %coin.coin_type,
                        address = %address,
                        error = %e,
                        "Error getting coin metadata"
                    );
                }
            }
        }

        let mut balances = vec![BalanceEntry::native(
            &self.symbol,
            format_units_truncated(native_raw, self.native_decimals, self.display_places),
            self.native_decimals,
        )];
        balances.extend(tokens);
        Ok(balances)
    }
}

/// Error for a non-success HTTP status; throttling and server faults are transient
fn classify_status(method: &str, status: StatusCode) -> Option<FetchError> {
    let message = format!("{method} returned {status}");
    if status == StatusCode::TOO_MANY_REQUESTS {
        Some(FetchError::RateLimited(message))
    } else if status.is_server_error() {
        Some(FetchError::Transport(message))
    } else if !status.is_success() {
        Some(FetchError::Rpc {
            code: i64::from(status.as_u16()),
            message,
        })
    } else {
        None
    }
}

fn classify_rpc_error(error: RpcErrorBody) -> FetchError {
    if RATE_LIMIT_CODES.contains(&error.code) {
        FetchError::RateLimited(error.message)
    } else {
        FetchError::Rpc {
            code: error.code,
            message: error.message,
        }
    }
}

fn parse_raw_amount(raw: &str) -> Result<U256, FetchError> {
    U256::from_str(raw).map_err(|e| FetchError::Decode(format!("bad balance {raw}: {e}")))
}

/// `0x2::sui::SUI`, in short or zero-padded form
fn is_native_coin(coin_type: &str) -> bool {
    let mut parts = coin_type.split("::");
    let package = parts.next().unwrap_or_default();
    let package = package.trim_start_matches("0x").trim_start_matches('0');
    package == "2" && parts.next() == Some("sui") && parts.next() == Some("SUI") && parts.next().is_none()
}

fn fallback_symbol(coin_type: &str) -> String {
    coin_type.rsplit("::").next().unwrap_or(coin_type).to_string()
}
