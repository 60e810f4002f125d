use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::address::Address;
use crate::chains::ChainId;
use crate::scanning::RetryOutcome;

/// Token identifier of a chain's base currency
pub const NATIVE_TOKEN: &str = "native";

/// One token balance of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// `native`, a contract address, or a Move coin type
    pub token: String,
    pub symbol: String,
    /// Base-10 decimal string
    pub amount: String,
    /// Scale used to convert from integer base units
    pub decimals: u8,
}

impl BalanceEntry {
    pub fn native(symbol: &str, amount: impl Into<String>, decimals: u8) -> Self {
        Self {
            token: NATIVE_TOKEN.to_string(),
            symbol: symbol.to_string(),
            amount: amount.into(),
            decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        self.token == NATIVE_TOKEN
    }

    pub fn amount_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.amount).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Success,
    Failed,
}

impl AccountStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AccountStatus::Pending)
    }
}

/// Scan state of one address on one chain.
///
/// Starts `Pending` and settles exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountScanResult {
    address: Address,
    chain: ChainId,
    balances: Vec<BalanceEntry>,
    status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    retry_count: u32,
}

impl AccountScanResult {
    pub fn pending(address: Address, chain: ChainId) -> Self {
        Self {
            address,
            chain,
            balances: Vec::new(),
            status: AccountStatus::Pending,
            error: None,
            retry_count: 0,
        }
    }

    /// Record the outcome of the (possibly retried) fetch.
    ///
    /// Returns `false` and leaves the result untouched if it already settled.
    pub fn settle(&mut self, outcome: RetryOutcome<Vec<BalanceEntry>>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                self.balances = value;
                self.status = AccountStatus::Success;
                self.retry_count = self.retry_count.max(attempts.saturating_sub(1));
            }
            RetryOutcome::Terminal(terminal) => {
                self.status = AccountStatus::Failed;
                self.error = Some(terminal.message);
                self.retry_count = self.retry_count.max(terminal.attempts.saturating_sub(1));
            }
        }
        true
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn chain(&self) -> &ChainId {
        &self.chain
    }

    pub fn balances(&self) -> &[BalanceEntry] {
        &self.balances
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn native_entry(&self) -> Option<&BalanceEntry> {
        self.balances.iter().find(|entry| entry.is_native())
    }

    /// Native balance counted towards totals; zero unless the scan succeeded
    pub fn native_amount(&self) -> Decimal {
        if self.status != AccountStatus::Success {
            return Decimal::ZERO;
        }
        match self.native_entry() {
            Some(entry) => entry.amount_decimal().unwrap_or_else(|| {
                tracing::warn!(
                    address = %self.address,
                    chain = %self.chain,
                    amount = %entry.amount,
                    "Native amount is not a decimal, counting as zero"
                );
                Decimal::ZERO
            }),
            None => Decimal::ZERO,
        }
    }
}

/// Accounts of one chain scan with their native total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainPortfolio {
    pub chain: ChainId,
    pub accounts: Vec<AccountScanResult>,
    pub total_native_balance: Decimal,
    pub scanned_at: DateTime<Utc>,
}

impl ChainPortfolio {
    pub fn new(chain: ChainId, accounts: Vec<AccountScanResult>) -> Self {
        let mut portfolio = Self {
            chain,
            accounts,
            total_native_balance: Decimal::ZERO,
            scanned_at: Utc::now(),
        };
        portfolio.recompute_total();
        portfolio
    }

    /// All-pending view for a scan that has just started
    pub fn pending(chain: ChainId, addresses: &[Address]) -> Self {
        let accounts = addresses
            .iter()
            .map(|address| AccountScanResult::pending(address.clone(), chain.clone()))
            .collect();
        Self::new(chain, accounts)
    }

    /// Replace one account slot with its settled result and refresh the total.
    ///
    /// A slot that already settled is kept as is.
    pub fn settle_account(&mut self, index: usize, account: AccountScanResult) -> bool {
        let Some(slot) = self.accounts.get_mut(index) else {
            return false;
        };
        if slot.status().is_terminal() || slot.address() != account.address() {
            return false;
        }
        *slot = account;
        self.recompute_total();
        true
    }

    /// Sum native amounts of successful accounts.
    ///
    /// An account whose amount would overflow the total is left out with a warning.
    pub fn recompute_total(&mut self) {
        let mut total = Decimal::ZERO;
        for account in &self.accounts {
            let amount = account.native_amount();
            match total.checked_add(amount) {
                Some(sum) => total = sum,
                None => tracing::warn!(
                    chain = %self.chain,
                    address = %account.address,
                    amount = %amount,
                    "Native amount overflows the chain total, leaving it out"
                ),
            }
        }
        self.total_native_balance = total;
    }

    pub fn count(&self, status: AccountStatus) -> usize {
        self.accounts.iter().filter(|a| a.status() == status).count()
    }

    pub fn is_complete(&self) -> bool {
        self.accounts.iter().all(|a| a.status().is_terminal())
    }
}

/// Latest completed portfolio of every scanned chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiChainPortfolio {
    pub portfolios: BTreeMap<ChainId, ChainPortfolio>,
    /// Sum of native totals across chains, without unit conversion
    pub total_value: Decimal,
}

impl MultiChainPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a chain's portfolio, replacing the previous one wholesale
    pub fn insert(&mut self, portfolio: ChainPortfolio) -> Option<ChainPortfolio> {
        let previous = self.portfolios.insert(portfolio.chain.clone(), portfolio);
        self.recompute_total();
        previous
    }

    pub fn remove(&mut self, chain: &ChainId) -> Option<ChainPortfolio> {
        let removed = self.portfolios.remove(chain);
        self.recompute_total();
        removed
    }

    pub fn clear(&mut self) {
        self.portfolios.clear();
        self.recompute_total();
    }

    pub fn get(&self, chain: &ChainId) -> Option<&ChainPortfolio> {
        self.portfolios.get(chain)
    }

    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }

    fn recompute_total(&mut self) {
        let mut total = Decimal::ZERO;
        for portfolio in self.portfolios.values() {
            match total.checked_add(portfolio.total_native_balance) {
                Some(sum) => total = sum,
                None => tracing::warn!(
                    chain = %portfolio.chain,
                    total = %portfolio.total_native_balance,
                    "Chain total overflows the portfolio value, leaving it out"
                ),
            }
        }
        self.total_value = total;
    }
}
