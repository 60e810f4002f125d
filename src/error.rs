use std::string::FromUtf8Error;
use std::time::Duration;
use thiserror::Error;

use crate::chains::ChainId;

/// Failure of a single balance lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::RateLimited(_) | FetchError::Transport(_)
        )
    }
}

/// Chain-level failure, raised before any address is scanned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unsupported chain: {0}")]
    UnknownChain(ChainId),

    #[error("invalid configuration for chain {chain}: {reason}")]
    InvalidChainConfig { chain: ChainId, reason: String },
}

/// Rejected address input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address {0} must start with 0x")]
    MissingPrefix(String),

    #[error("address {0} contains non-hex characters")]
    InvalidHex(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export is not valid utf-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}
