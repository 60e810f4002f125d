use alloy::{
    primitives::Address as EvmAddress,
    providers::Provider,
    transports::{RpcError, TransportError},
};
use async_trait::async_trait;
use eyre::Result;
use std::str::FromStr;
use tracing::warn;

use super::BalanceFetcher;
use crate::address::Address;
use crate::chains::{ChainDescriptor, ChainId};
use crate::config::TokenConfig;
use crate::contracts::IERC20;
use crate::error::FetchError;
use crate::portfolio::BalanceEntry;
use crate::units::format_units_truncated;

/// JSON-RPC codes providers use for throttling
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

/// Native and ERC-20 balances over an alloy provider
pub struct EvmFetcher<P> {
    provider: P,
    chain: ChainId,
    symbol: String,
    native_decimals: u8,
    display_places: u8,
    tokens: Vec<TokenConfig>,
}

impl<P: Provider> EvmFetcher<P> {
    pub fn new(provider: P, chain: &ChainDescriptor) -> Self {
        Self {
            provider,
            chain: chain.id.clone(),
            symbol: chain.symbol.clone(),
            native_decimals: chain.native_decimals,
            display_places: chain.scan.display_places,
            tokens: chain.tokens.clone(),
        }
    }

    /// Get balance of one configured token
    async fn token_balance(&self, token: &TokenConfig, owner: EvmAddress) -> Result<BalanceEntry> {
        let token_address = EvmAddress::from_str(&token.address)?;
        let contract = IERC20::new(token_address, &self.provider);

        let balance = contract.balanceOf(owner).call().await?;
        let decimals = match token.decimals {
            Some(decimals) => decimals,
            None => contract.decimals().call().await?,
        };

        Ok(BalanceEntry {
            token: token.address.clone(),
            symbol: token.symbol.clone(),
            amount: format_units_truncated(balance, decimals, self.display_places),
            decimals,
        })
    }
}

#[async_trait]
impl<P> BalanceFetcher for EvmFetcher<P>
where
    P: Provider + 'static,
{
    async fn fetch_balances(&self, address: &Address) -> Result<Vec<BalanceEntry>, FetchError> {
        let owner = EvmAddress::from_str(address.as_str()).map_err(|e| FetchError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        let native = self
            .provider
            .get_balance(owner)
            .await
            .map_err(classify_transport_error)?;

        let mut balances = vec![BalanceEntry::native(
            &self.symbol,
            format_units_truncated(native, self.native_decimals, self.display_places),
            self.native_decimals,
        )];

        // A missing token balance does not fail the account
        for token in &self.tokens {
            match self.token_balance(token, owner).await {
                Ok(entry) => balances.push(entry),
                Err(e) => {
                    warn!(
                        chain = %self.chain,
                        token = %token.symbol,
                        address = %address,
                        error = %e,
                        "Error getting token balance"
                    );
                }
            }
        }

        Ok(balances)
    }
}

fn classify_transport_error(err: TransportError) -> FetchError {
    match err {
        RpcError::ErrorResp(payload) if RATE_LIMIT_CODES.contains(&payload.code) => {
            FetchError::RateLimited(payload.message.to_string())
        }
        RpcError::ErrorResp(payload) => FetchError::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
        },
        RpcError::Transport(kind) => FetchError::Transport(kind.to_string()),
        other => FetchError::Decode(other.to_string()),
    }
}
