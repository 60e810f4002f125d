//! Balance scanning across addresses and chains.
//!
//! [`BatchRunner`] paces fetches, [`with_retry`] absorbs transient failures,
//! [`ChainScanner`] combines both for one chain and [`PortfolioAggregator`]
//! runs chains side by side and merges their results.

mod aggregator;
mod batch;
mod coordinator;
mod retry;

pub use aggregator::{ChainStatus, PortfolioAggregator, PortfolioEvent, ScanGeneration};
pub use batch::BatchRunner;
pub use coordinator::{ChainScanner, NoProgress, ScanProgress};
pub use retry::{with_retry, BackoffKind, RetryOutcome, RetryPolicy, Retryable, TerminalError};
