#![allow(dead_code)]

use async_trait::async_trait;
use portfolio_scanner::{
    Address, AccountScanResult, BalanceEntry, BalanceFetcher, ChainDescriptor, ChainId, ChainKind,
    ChainRegistry, FetchError, FetcherFactory, RetryOutcome, ScanError, ScanSettings, TerminalError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the scripted fetcher answers for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Balances(Vec<BalanceEntry>),
    Fail(FetchError),
    Delayed(Duration, Box<Reply>),
}

/// Fetcher answering from per-address scripts.
///
/// Replies are consumed in order; the last one repeats forever.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Vec<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, address: &str, replies: Vec<Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), replies);
    }

    pub fn calls(&self, address: &str) -> usize {
        self.calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_reply(&self, address: &str) -> Reply {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(address) {
            Some(replies) if replies.len() > 1 => replies.remove(0),
            Some(replies) if !replies.is_empty() => replies[0].clone(),
            _ => Reply::Fail(FetchError::Rpc {
                code: -32602,
                message: format!("no script for {address}"),
            }),
        }
    }
}

struct SharedFetcher(Arc<ScriptedFetcher>);

#[async_trait]
impl BalanceFetcher for SharedFetcher {
    async fn fetch_balances(&self, address: &Address) -> Result<Vec<BalanceEntry>, FetchError> {
        let mut reply = self.0.next_reply(address.as_str());
        loop {
            match reply {
                Reply::Balances(balances) => return Ok(balances),
                Reply::Fail(error) => return Err(error),
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

/// Hands out scripted fetchers per chain and counts connections
#[derive(Default)]
pub struct ScriptedFactory {
    fetchers: HashMap<ChainId, Arc<ScriptedFetcher>>,
    connects: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, chain: &str, fetcher: Arc<ScriptedFetcher>) -> Self {
        self.fetchers.insert(ChainId::new(chain), fetcher);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetcherFactory for ScriptedFactory {
    async fn connect(&self, chain: &ChainDescriptor) -> Result<Box<dyn BalanceFetcher>, ScanError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.fetchers.get(&chain.id) {
            Some(fetcher) => Ok(Box::new(SharedFetcher(fetcher.clone()))),
            None => Err(ScanError::InvalidChainConfig {
                chain: chain.id.clone(),
                reason: "no fetcher scripted".to_string(),
            }),
        }
    }
}

pub fn addr(raw: &str) -> Address {
    Address::parse(raw).unwrap()
}

pub fn native(symbol: &str, amount: &str, decimals: u8) -> Vec<BalanceEntry> {
    vec![BalanceEntry::native(symbol, amount, decimals)]
}

pub fn token(token: &str, symbol: &str, amount: &str, decimals: u8) -> BalanceEntry {
    BalanceEntry {
        token: token.to_string(),
        symbol: symbol.to_string(),
        amount: amount.to_string(),
        decimals,
    }
}

/// Small batches and short delays
pub fn fast_settings() -> ScanSettings {
    ScanSettings {
        batch_size: 2,
        inter_batch_delay: Duration::from_millis(100),
        max_retries: 2,
        retry_delay: Duration::from_millis(50),
        fetch_timeout: Duration::from_secs(1),
        ..ScanSettings::default()
    }
}

pub fn descriptor(id: &str, kind: ChainKind, symbol: &str, settings: ScanSettings) -> ChainDescriptor {
    ChainDescriptor {
        id: ChainId::new(id),
        name: id.to_string(),
        kind,
        symbol: symbol.to_string(),
        native_decimals: kind.default_native_decimals(),
        rpc_urls: vec!["http://127.0.0.1:9000".to_string()],
        explorer: String::new(),
        tokens: Vec::new(),
        scan: settings,
    }
}

/// SUI and ETH with the given settings
pub fn registry(settings: ScanSettings) -> Arc<ChainRegistry> {
    Arc::new(ChainRegistry::from_descriptors([
        descriptor("SUI", ChainKind::Sui, "SUI", settings.clone()),
        descriptor("ETH", ChainKind::Evm, "ETH", settings),
    ]))
}

pub fn settled(address: &str, chain: &str, balances: Vec<BalanceEntry>) -> AccountScanResult {
    let mut account = AccountScanResult::pending(addr(address), ChainId::new(chain));
    account.settle(RetryOutcome::Success {
        value: balances,
        attempts: 1,
    });
    account
}

pub fn failed(address: &str, chain: &str, message: &str, attempts: u32) -> AccountScanResult {
    let mut account = AccountScanResult::pending(addr(address), ChainId::new(chain));
    account.settle(RetryOutcome::Terminal(TerminalError {
        message: message.to_string(),
        attempts,
    }));
    account
}
