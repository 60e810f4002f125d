use clap::Parser;
use eyre::{eyre, Result};
use portfolio_scanner::{
    config::builtin_chain_keys, init_tracing, log_event, log_portfolio_json, log_portfolio_summary,
    parse_addresses_from_text, portfolio_csv, write_csv, Address, ChainId, ChainScanner, Config,
    PortfolioAggregator, RpcFetcherFactory,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Scan token balances of many addresses across several chains
#[derive(Debug, Parser)]
#[command(name = "portfolio-scanner", version)]
struct Args {
    /// YAML configuration file; built-in chains are used when it is missing
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address to scan, may be repeated
    #[arg(short, long = "address")]
    addresses: Vec<String>,

    /// Text file with addresses separated by newlines, commas or spaces
    #[arg(short = 'f', long)]
    addresses_file: Option<PathBuf>,

    /// Chains to scan, e.g. SUI,ETH
    #[arg(long, value_delimiter = ',')]
    chains: Vec<String>,

    /// Write the portfolio table as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the final portfolio as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// List the built-in chains and exit
    #[arg(long)]
    list_chains: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// `json` for structured logs
    #[arg(long)]
    log_format: Option<String>,
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path)
    } else {
        Ok(Config::default())
    }
}

fn collect_addresses(args: &Args, config: &Config) -> Result<Vec<Address>> {
    let mut addresses = config.parsed_addresses()?;

    for raw in &args.addresses {
        let address = Address::parse(raw).map_err(|e| eyre!("{e}"))?;
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }

    if let Some(path) = &args.addresses_file {
        let text = fs::read_to_string(path)?;
        for address in parse_addresses_from_text(&text) {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
    }

    Ok(addresses)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format.as_deref())?;

    if args.list_chains {
        for key in builtin_chain_keys() {
            println!("{}", key);
        }
        return Ok(());
    }

    // Load configuration
    let config = load_config(&args.config)?;
    let registry = Arc::new(config.registry()?);

    let addresses = collect_addresses(&args, &config)?;
    if addresses.is_empty() {
        return Err(eyre!("Please enter at least one valid address (starting with 0x)"));
    }

    let chains: Vec<ChainId> = if args.chains.is_empty() {
        config.selected_chains()
    } else {
        args.chains.iter().map(|key| ChainId::new(key)).collect()
    };

    let scanner = ChainScanner::new(registry.clone(), Arc::new(RpcFetcherFactory::new()));
    let aggregator = PortfolioAggregator::new(scanner);

    // Progress printer
    let mut events = aggregator.subscribe();
    let printer_registry = registry.clone();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event, &printer_registry),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!(
        "Scanning {} addresses across {} chain(s)\n",
        addresses.len(),
        chains.len()
    );

    let portfolio = tokio::select! {
        portfolio = aggregator.scan_chains(addresses, chains) => portfolio,
        _ = tokio::signal::ctrl_c() => {
            aggregator.cancel().await;
            eprintln!("Scan cancelled");
            aggregator.snapshot().await
        }
    };

    let statuses = aggregator.statuses().await;
    drop(aggregator);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Progress printer stopped abnormally");
    }

    if args.json {
        log_portfolio_json(&portfolio)?;
    } else {
        println!();
        log_portfolio_summary(&portfolio, &statuses, &registry);
    }

    if let Some(path) = &args.output {
        if portfolio.is_empty() {
            eprintln!("⚠️  Nothing to export");
        } else {
            write_csv(path, &portfolio_csv(&portfolio)?)?;
            println!("Portfolio written to {}", path.display());
        }
    }

    Ok(())
}
