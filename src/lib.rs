pub mod address;
pub mod chains;
pub mod config;
pub mod contracts;
pub mod error;
pub mod export;
pub mod logger;
pub mod portfolio;
pub mod providers;
pub mod scanning;
pub mod units;

pub use address::{parse_addresses_from_text, shorten_address, Address};
pub use chains::{ChainDescriptor, ChainId, ChainKind, ChainRegistry};
pub use config::{Config, NetworkConfig, ScanOverrides, ScanSettings, TokenConfig};
pub use contracts::IERC20;
pub use error::{AddressError, ExportError, FetchError, ScanError};
pub use export::{chain_portfolio_csv, portfolio_csv, write_csv};
pub use logger::{init_tracing, log_chain_portfolio, log_event, log_portfolio_json, log_portfolio_summary};
pub use portfolio::{AccountScanResult, AccountStatus, BalanceEntry, ChainPortfolio, MultiChainPortfolio};
pub use providers::{BalanceFetcher, EvmFetcher, FetcherFactory, RpcFetcherFactory, SuiFetcher};
pub use scanning::{
    with_retry, BackoffKind, BatchRunner, ChainScanner, ChainStatus, PortfolioAggregator,
    PortfolioEvent, RetryOutcome, RetryPolicy, ScanGeneration, ScanProgress, TerminalError,
};
