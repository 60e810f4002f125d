use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::batch::BatchRunner;
use super::retry::{with_retry, RetryOutcome, RetryPolicy};
use crate::address::Address;
use crate::chains::{ChainId, ChainRegistry};
use crate::error::{FetchError, ScanError};
use crate::portfolio::{AccountScanResult, AccountStatus, BalanceEntry, ChainPortfolio};
use crate::providers::{BalanceFetcher, FetcherFactory};

/// Receives each account as soon as its fetch settles
#[async_trait]
pub trait ScanProgress: Send + Sync {
    async fn account_settled(&self, chain: &ChainId, index: usize, account: &AccountScanResult);
}

/// Progress sink that ignores every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

#[async_trait]
impl ScanProgress for NoProgress {
    async fn account_settled(&self, _chain: &ChainId, _index: usize, _account: &AccountScanResult) {}
}

/// Scans every address of one chain
#[derive(Clone)]
pub struct ChainScanner {
    registry: Arc<ChainRegistry>,
    factory: Arc<dyn FetcherFactory>,
}

impl ChainScanner {
    pub fn new(registry: Arc<ChainRegistry>, factory: Arc<dyn FetcherFactory>) -> Self {
        Self { registry, factory }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Fetch balances of `addresses` on `chain`.
    ///
    /// Only an unknown or misconfigured chain fails the call; per-address
    /// failures end up as `Failed` accounts in the returned portfolio.
    pub async fn scan_chain(
        &self,
        chain: &ChainId,
        addresses: &[Address],
        progress: &dyn ScanProgress,
    ) -> Result<ChainPortfolio, ScanError> {
        let descriptor = self.registry.get(chain)?;
        descriptor.validate()?;

        let settings = &descriptor.scan;
        let runner = BatchRunner::from_settings(settings);
        let policy = RetryPolicy::from_settings(settings);

        info!(
            chain = %chain,
            addresses = addresses.len(),
            batch_size = runner.batch_size(),
            "Starting chain scan"
        );

        let client = self.factory.connect(descriptor).await?;
        let fetcher: &dyn BalanceFetcher = client.as_ref();
        let fetch_timeout = settings.fetch_timeout;

        let slots: Vec<(usize, AccountScanResult)> = addresses
            .iter()
            .map(|address| AccountScanResult::pending(address.clone(), chain.clone()))
            .enumerate()
            .collect();

        let accounts = runner
            .run(slots, |(index, mut account)| {
                let policy = &policy;
                async move {
                    let address = account.address().clone();
                    let outcome = with_retry(policy, || {
                        fetch_with_timeout(fetcher, &address, fetch_timeout)
                    })
                    .await;

                    if let Some(detail) = outcome_error(&outcome) {
                        warn!(
                            chain = %chain,
                            address = %address,
                            attempts = outcome.attempts(),
                            error = %detail,
                            "Address scan failed"
                        );
                    }

                    account.settle(outcome);
                    progress.account_settled(chain, index, &account).await;
                    account
                }
            })
            .await;

        drop(client);
        debug!(chain = %chain, "Released chain client");

        let portfolio = ChainPortfolio::new(chain.clone(), accounts);
        info!(
            chain = %chain,
            succeeded = portfolio.count(AccountStatus::Success),
            failed = portfolio.count(AccountStatus::Failed),
            total = %portfolio.total_native_balance,
            "Chain scan finished"
        );

        Ok(portfolio)
    }
}

async fn fetch_with_timeout(
    fetcher: &dyn BalanceFetcher,
    address: &Address,
    limit: Duration,
) -> Result<Vec<BalanceEntry>, FetchError> {
    match timeout(limit, fetcher.fetch_balances(address)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    }
}

fn outcome_error<T>(outcome: &RetryOutcome<T>) -> Option<&str> {
    match outcome {
        RetryOutcome::Terminal(terminal) => Some(terminal.message.as_str()),
        RetryOutcome::Success { .. } => None,
    }
}
