use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::coordinator::{ChainScanner, ScanProgress};
use crate::address::Address;
use crate::chains::ChainId;
use crate::error::ScanError;
use crate::portfolio::{AccountScanResult, ChainPortfolio, MultiChainPortfolio};

const EVENT_CAPACITY: usize = 256;

/// Per-chain state shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ChainStatus {
    #[default]
    Idle,
    Scanning,
    Done,
    Errored(String),
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStatus::Idle => f.write_str("idle"),
            ChainStatus::Scanning => f.write_str("scanning"),
            ChainStatus::Done => f.write_str("done"),
            ChainStatus::Errored(detail) => write!(f, "error: {detail}"),
        }
    }
}

/// Tag of one scan invocation; results of older generations are dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScanGeneration(u64);

impl ScanGeneration {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Notifications published while scans progress
#[derive(Debug, Clone)]
pub enum PortfolioEvent {
    ScanStarted {
        chain: ChainId,
        generation: ScanGeneration,
        addresses: usize,
    },
    AccountSettled {
        chain: ChainId,
        generation: ScanGeneration,
        index: usize,
        account: AccountScanResult,
    },
    ChainCompleted {
        chain: ChainId,
        generation: ScanGeneration,
        portfolio: ChainPortfolio,
        total_value: Decimal,
    },
    ChainFailed {
        chain: ChainId,
        generation: ScanGeneration,
        error: ScanError,
    },
    ChainRemoved {
        chain: ChainId,
        total_value: Decimal,
    },
}

#[derive(Debug, Default)]
struct AggregatorState {
    addresses: Vec<Address>,
    selected: BTreeSet<ChainId>,
    portfolio: MultiChainPortfolio,
    statuses: BTreeMap<ChainId, ChainStatus>,
    /// Generation allowed to commit for each chain with a scan in flight
    in_flight: HashMap<ChainId, ScanGeneration>,
    /// Partially settled view of each in-flight scan
    progress: HashMap<ChainId, ChainPortfolio>,
    last_generation: u64,
}

impl AggregatorState {
    fn is_current(&self, chain: &ChainId, generation: ScanGeneration) -> bool {
        self.in_flight.get(chain) == Some(&generation)
    }

    fn next_generation(&mut self) -> ScanGeneration {
        self.last_generation += 1;
        ScanGeneration(self.last_generation)
    }

    /// Forget the in-flight scan of `chain` so its results are discarded
    fn invalidate(&mut self, chain: &ChainId) {
        if self.in_flight.remove(chain).is_some() {
            self.progress.remove(chain);
            if self.statuses.get(chain) == Some(&ChainStatus::Scanning) {
                self.statuses.insert(chain.clone(), ChainStatus::Idle);
            }
        }
    }

    fn invalidate_all(&mut self) {
        let chains: Vec<ChainId> = self.in_flight.keys().cloned().collect();
        for chain in &chains {
            self.invalidate(chain);
        }
    }
}

/// Runs chain scans and keeps the merged cross-chain portfolio.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct PortfolioAggregator {
    scanner: ChainScanner,
    state: Arc<RwLock<AggregatorState>>,
    events: broadcast::Sender<PortfolioEvent>,
}

impl PortfolioAggregator {
    pub fn new(scanner: ChainScanner) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scanner,
            state: Arc::new(RwLock::new(AggregatorState::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PortfolioEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: PortfolioEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Replace the address list.
    ///
    /// A different list abandons every in-flight scan and drops the
    /// portfolios computed for the old addresses.
    pub async fn set_addresses(&self, addresses: Vec<Address>) {
        let mut state = self.state.write().await;
        if state.addresses == addresses {
            return;
        }

        state.invalidate_all();
        state.portfolio.clear();
        for status in state.statuses.values_mut() {
            *status = ChainStatus::Idle;
        }
        state.addresses = addresses;
        debug!(addresses = state.addresses.len(), "Address list replaced");
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.state.read().await.addresses.clone()
    }

    /// Add a chain to the selection; returns `false` if already selected
    pub async fn select_chain(&self, chain: ChainId) -> bool {
        let mut state = self.state.write().await;
        state.statuses.entry(chain.clone()).or_default();
        state.selected.insert(chain)
    }

    /// Drop a chain from the selection, its portfolio and any scan in flight.
    ///
    /// `ChainRemoved` is only published for a chain that was selected.
    pub async fn deselect_chain(&self, chain: &ChainId) -> Option<ChainPortfolio> {
        let (was_selected, removed, total_value) = {
            let mut state = self.state.write().await;
            let was_selected = state.selected.remove(chain);
            state.invalidate(chain);
            state.statuses.remove(chain);
            let removed = state.portfolio.remove(chain);
            (was_selected, removed, state.portfolio.total_value)
        };

        if was_selected {
            self.emit(PortfolioEvent::ChainRemoved {
                chain: chain.clone(),
                total_value,
            });
        }
        removed
    }

    pub async fn selected_chains(&self) -> Vec<ChainId> {
        self.state.read().await.selected.iter().cloned().collect()
    }

    /// Abandon every in-flight scan; their late results are discarded
    pub async fn cancel(&self) {
        let mut state = self.state.write().await;
        let abandoned = state.in_flight.len();
        state.invalidate_all();
        if abandoned > 0 {
            info!(abandoned, "Cancelled in-flight scans");
        }
    }

    /// Scan `addresses` on every chain in `chains` concurrently and return the
    /// merged portfolio once all of them settled.
    ///
    /// Chains selected earlier but missing from `chains` are deselected.
    pub async fn scan_chains(
        &self,
        addresses: Vec<Address>,
        chains: impl IntoIterator<Item = ChainId>,
    ) -> MultiChainPortfolio {
        self.set_addresses(addresses).await;

        let requested: BTreeSet<ChainId> = chains.into_iter().collect();
        let dropped: Vec<ChainId> = self
            .state
            .read()
            .await
            .selected
            .difference(&requested)
            .cloned()
            .collect();
        for chain in &dropped {
            self.deselect_chain(chain).await;
        }

        join_all(requested.into_iter().map(|chain| self.scan_chain(chain))).await;
        self.snapshot().await
    }

    /// Scan one chain in the background, updating the shared state
    pub fn scan_chain_async(&self, chain: ChainId) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            this.scan_chain(chain).await;
        })
    }

    /// Scan one chain with the current address list.
    ///
    /// Supersedes any scan of the same chain still in flight. Returns the
    /// committed status, or `None` when this scan was itself superseded or
    /// cancelled before finishing.
    pub async fn scan_chain(&self, chain: ChainId) -> Option<ChainStatus> {
        let (generation, addresses) = {
            let mut state = self.state.write().await;
            let generation = state.next_generation();
            let pending = ChainPortfolio::pending(chain.clone(), &state.addresses);

            state.selected.insert(chain.clone());
            state.in_flight.insert(chain.clone(), generation);
            state.statuses.insert(chain.clone(), ChainStatus::Scanning);
            state.progress.insert(chain.clone(), pending);
            (generation, state.addresses.clone())
        };

        self.emit(PortfolioEvent::ScanStarted {
            chain: chain.clone(),
            generation,
            addresses: addresses.len(),
        });

        let sink = GenerationSink {
            aggregator: self,
            generation,
        };
        let result = self.scanner.scan_chain(&chain, &addresses, &sink).await;

        self.commit(chain, generation, result).await
    }

    async fn commit(
        &self,
        chain: ChainId,
        generation: ScanGeneration,
        result: Result<ChainPortfolio, ScanError>,
    ) -> Option<ChainStatus> {
        let mut state = self.state.write().await;
        if !state.is_current(&chain, generation) {
            debug!(chain = %chain, generation = generation.value(), "Discarding stale scan result");
            return None;
        }
        state.in_flight.remove(&chain);
        state.progress.remove(&chain);

        match result {
            Ok(portfolio) => {
                state.portfolio.insert(portfolio.clone());
                state.statuses.insert(chain.clone(), ChainStatus::Done);
                let total_value = state.portfolio.total_value;
                drop(state);

                self.emit(PortfolioEvent::ChainCompleted {
                    chain,
                    generation,
                    portfolio,
                    total_value,
                });
                Some(ChainStatus::Done)
            }
            Err(error) => {
                warn!(chain = %chain, error = %error, "Chain scan failed");
                let status = ChainStatus::Errored(error.to_string());
                state.statuses.insert(chain.clone(), status.clone());
                drop(state);

                self.emit(PortfolioEvent::ChainFailed {
                    chain,
                    generation,
                    error,
                });
                Some(status)
            }
        }
    }

    /// Completed portfolios of all chains and their total
    pub async fn snapshot(&self) -> MultiChainPortfolio {
        self.state.read().await.portfolio.clone()
    }

    pub async fn status(&self, chain: &ChainId) -> ChainStatus {
        self.state
            .read()
            .await
            .statuses
            .get(chain)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn statuses(&self) -> BTreeMap<ChainId, ChainStatus> {
        self.state.read().await.statuses.clone()
    }

    /// Partially settled portfolio of a chain whose scan is in flight
    pub async fn progress(&self, chain: &ChainId) -> Option<ChainPortfolio> {
        self.state.read().await.progress.get(chain).cloned()
    }
}

/// Commits per-account progress only while its generation is current
struct GenerationSink<'a> {
    aggregator: &'a PortfolioAggregator,
    generation: ScanGeneration,
}

#[async_trait]
impl<'a> ScanProgress for GenerationSink<'a> {
    async fn account_settled(&self, chain: &ChainId, index: usize, account: &AccountScanResult) {
        {
            let mut state = self.aggregator.state.write().await;
            if !state.is_current(chain, self.generation) {
                return;
            }
            if let Some(view) = state.progress.get_mut(chain) {
                view.settle_account(index, account.clone());
            }
        }

        self.aggregator.emit(PortfolioEvent::AccountSettled {
            chain: chain.clone(),
            generation: self.generation,
            index,
            account: account.clone(),
        });
    }
}
