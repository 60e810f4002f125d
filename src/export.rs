//! Tabular export of scanned portfolios.
//!
//! One row per address and one column per symbol seen anywhere in the export,
//! columns sorted by name. With more than one chain every column is prefixed
//! with its chain (`ETH:USDT`) so equal symbols on different chains stay apart.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::chains::ChainId;
use crate::error::ExportError;
use crate::portfolio::{AccountStatus, ChainPortfolio, MultiChainPortfolio};

/// Cell value for a symbol the address does not hold or could not be scanned
pub const ABSENT_VALUE: &str = "0.0000";

pub fn chain_portfolio_csv(portfolio: &ChainPortfolio) -> Result<String, ExportError> {
    render(&[portfolio], false)
}

pub fn portfolio_csv(portfolio: &MultiChainPortfolio) -> Result<String, ExportError> {
    let chains: Vec<&ChainPortfolio> = portfolio.portfolios.values().collect();
    render(&chains, chains.len() > 1)
}

/// Write an export to disk, replacing any existing file
pub fn write_csv<P: AsRef<Path>>(path: P, content: &str) -> Result<(), ExportError> {
    fs::write(path, content)?;
    Ok(())
}

fn column_name(chain: &ChainId, symbol: &str, prefix_chain: bool) -> String {
    if prefix_chain {
        format!("{chain}:{symbol}")
    } else {
        symbol.to_string()
    }
}

/// Combine two amounts landing in the same cell
fn add_amounts(existing: &str, extra: &str) -> Option<String> {
    let sum = Decimal::from_str(existing)
        .ok()?
        .checked_add(Decimal::from_str(extra).ok()?)?;
    Some(sum.to_string())
}

fn render(portfolios: &[&ChainPortfolio], prefix_chain: bool) -> Result<String, ExportError> {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<(String, BTreeMap<String, String>)> = Vec::new();

    for portfolio in portfolios {
        for account in &portfolio.accounts {
            let address = account.address().to_string();
            let index = *row_index.entry(address.clone()).or_insert_with(|| {
                rows.push((address, BTreeMap::new()));
                rows.len() - 1
            });

            if account.status() != AccountStatus::Success {
                continue;
            }

            let cells = &mut rows[index].1;
            for entry in account.balances() {
                let column = column_name(&portfolio.chain, &entry.symbol, prefix_chain);
                columns.insert(column.clone());

                match cells.get_mut(&column) {
                    Some(existing) => {
                        match add_amounts(existing, &entry.amount) {
                            Some(sum) => *existing = sum,
                            None => tracing::warn!(
                                address = %account.address(),
                                column = %column,
                                amount = %entry.amount,
                                "Cannot add amount to export cell, keeping the first value"
                            ),
                        }
                    }
                    None => {
                        cells.insert(column, entry.amount.clone());
                    }
                }
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = vec!["Address".to_string()];
    header.extend(columns.iter().cloned());
    writer.write_record(&header)?;

    for (address, cells) in &rows {
        let mut record = vec![address.clone()];
        record.extend(columns.iter().map(|column| {
            cells
                .get(column)
                .cloned()
                .unwrap_or_else(|| ABSENT_VALUE.to_string())
        }));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
