use eyre::Result;
use std::collections::BTreeMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::address::shorten_address;
use crate::chains::{ChainId, ChainRegistry};
use crate::portfolio::{AccountScanResult, AccountStatus, ChainPortfolio, MultiChainPortfolio};
use crate::scanning::{ChainStatus, PortfolioEvent};

/// Setup tracing; `RUST_LOG` takes precedence over `level`
pub fn init_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

fn symbol_of<'a>(registry: &'a ChainRegistry, chain: &ChainId) -> &'a str {
    registry
        .get(chain)
        .map(|descriptor| descriptor.symbol.as_str())
        .unwrap_or("")
}

/// One progress line per scan event
pub fn log_event(event: &PortfolioEvent, registry: &ChainRegistry) {
    match event {
        PortfolioEvent::ScanStarted { chain, addresses, .. } => {
            println!("🔍 Scanning {} ({} addresses)", chain, addresses);
        }
        PortfolioEvent::AccountSettled { chain, account, .. } => {
            let address = shorten_address(account.address().as_str());
            match account.status() {
                AccountStatus::Success => {
                    let amount = account
                        .native_entry()
                        .map(|entry| entry.amount.as_str())
                        .unwrap_or("0");
                    println!("   ✅ {} {}: {} {}", chain, address, amount, symbol_of(registry, chain));
                }
                AccountStatus::Failed => {
                    println!(
                        "   ❌ {} {}: {}",
                        chain,
                        address,
                        account.error().unwrap_or("unknown error")
                    );
                }
                AccountStatus::Pending => {}
            }
        }
        PortfolioEvent::ChainCompleted { chain, portfolio, .. } => {
            println!(
                "📦 {} done: {}/{} addresses, total {} {}",
                chain,
                portfolio.count(AccountStatus::Success),
                portfolio.accounts.len(),
                portfolio.total_native_balance,
                symbol_of(registry, chain)
            );
        }
        PortfolioEvent::ChainFailed { chain, error, .. } => {
            println!("⚠️  {} failed: {}", chain, error);
        }
        PortfolioEvent::ChainRemoved { chain, .. } => {
            println!("➖ {} removed", chain);
        }
    }
}

/// Accounts ordered by native balance, failed and pending ones last
pub fn ranked_accounts(portfolio: &ChainPortfolio) -> Vec<&AccountScanResult> {
    let mut accounts: Vec<&AccountScanResult> = portfolio.accounts.iter().collect();
    accounts.sort_by(|a, b| {
        let a_ok = a.status() == AccountStatus::Success;
        let b_ok = b.status() == AccountStatus::Success;
        b_ok.cmp(&a_ok)
            .then_with(|| b.native_amount().cmp(&a.native_amount()))
    });
    accounts
}

/// Ranked table of one chain's accounts
pub fn log_chain_portfolio(portfolio: &ChainPortfolio, registry: &ChainRegistry) {
    let descriptor = registry.get(&portfolio.chain).ok();
    let name = descriptor
        .map(|d| d.name.as_str())
        .unwrap_or(portfolio.chain.as_str());
    let symbol = symbol_of(registry, &portfolio.chain);

    println!("=== {} Portfolio ===", name);
    println!("Total Balance: {} {}\n", portfolio.total_native_balance, symbol);

    for (rank, account) in ranked_accounts(portfolio).into_iter().enumerate() {
        let address = shorten_address(account.address().as_str());
        match account.status() {
            AccountStatus::Success => {
                println!("{:>3}. 📌 {}", rank + 1, address);
                for entry in account.balances() {
                    println!("       {}: {}", entry.symbol, entry.amount);
                }
            }
            AccountStatus::Failed => {
                println!(
                    "{:>3}. ❌ {} Error: {} (after {} retries)",
                    rank + 1,
                    address,
                    account.error().unwrap_or("unknown error"),
                    account.retry_count()
                );
            }
            AccountStatus::Pending => {
                println!("{:>3}. ⏳ {} Loading...", rank + 1, address);
            }
        }

        if let Some(url) = descriptor.and_then(|d| d.explorer_address_url(account.address().as_str())) {
            println!("       🔗 {}", url);
        }
    }
    println!();
}

/// Every chain's table followed by the cross-chain total
pub fn log_portfolio_summary(
    portfolio: &MultiChainPortfolio,
    statuses: &BTreeMap<ChainId, ChainStatus>,
    registry: &ChainRegistry,
) {
    for chain_portfolio in portfolio.portfolios.values() {
        log_chain_portfolio(chain_portfolio, registry);
    }

    for (chain, status) in statuses {
        if let ChainStatus::Errored(detail) = status {
            println!("⚠️  Error scanning {}: {}", chain, detail);
        }
    }

    if !portfolio.is_empty() {
        println!("=== Total Portfolio Value ===");
        println!(
            "{} (sum of native balances, not converted between chains)\n",
            portfolio.total_value
        );
    }
}

/// JSON logging
pub fn log_portfolio_json(portfolio: &MultiChainPortfolio) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(portfolio)?);
    Ok(())
}
