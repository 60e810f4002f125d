mod common;

use common::*;
use portfolio_scanner::{chain_portfolio_csv, portfolio_csv, write_csv, ChainId, ChainPortfolio, MultiChainPortfolio};

#[test]
fn test_single_chain_export() {
    let portfolio = ChainPortfolio::new(
        ChainId::new("SUI"),
        vec![
            settled("0xA", "SUI", native("SUI", "12.5000", 9)),
            settled("0xB", "SUI", native("SUI", "0.0000", 9)),
        ],
    );

    let csv = chain_portfolio_csv(&portfolio).unwrap();

    assert_eq!(csv, "Address,SUI\n0xA,12.5000\n0xB,0.0000\n");
}

#[test]
fn test_missing_and_failed_cells_are_zero_filled() {
    let mut usdc_holder = native("ETH", "0.1000", 18);
    usdc_holder.push(token("0xA0b8", "USDC", "250.0000", 6));

    let portfolio = ChainPortfolio::new(
        ChainId::new("ETH"),
        vec![
            settled("0xA", "ETH", usdc_holder),
            failed("0xB", "ETH", "transport error: connection refused", 4),
            settled(
                "0xC",
                "ETH",
                vec![
                    token("0xdAC1", "USDT", "3.0000", 6),
                    token("0x6B17", "DAI", "1.5000", 18),
                ],
            ),
        ],
    );

    let csv = chain_portfolio_csv(&portfolio).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(
        lines,
        vec![
            "Address,DAI,ETH,USDC,USDT",
            "0xA,0.0000,0.1000,250.0000,0.0000",
            "0xB,0.0000,0.0000,0.0000,0.0000",
            "0xC,1.5000,0.0000,0.0000,3.0000",
        ]
    );
}

#[test]
fn test_duplicate_symbols_of_one_account_are_summed() {
    let portfolio = ChainPortfolio::new(
        ChainId::new("SUI"),
        vec![settled(
            "0xA",
            "SUI",
            vec![
                token("0x1::usdc::USDC", "USDC", "1.2500", 6),
                token("0x2::usdc::USDC", "USDC", "0.7500", 6),
            ],
        )],
    );

    let csv = chain_portfolio_csv(&portfolio).unwrap();

    assert_eq!(csv, "Address,USDC\n0xA,2.0000\n");
}

#[test]
fn test_overflowing_duplicate_cell_keeps_first_amount() {
    let huge = "70000000000000000000000000000";
    let portfolio = ChainPortfolio::new(
        ChainId::new("SUI"),
        vec![settled(
            "0xA",
            "SUI",
            vec![
                token("0x1::big::BIG", "BIG", huge, 0),
                token("0x2::big::BIG", "BIG", huge, 0),
            ],
        )],
    );

    let csv = chain_portfolio_csv(&portfolio).unwrap();

    assert_eq!(csv, format!("Address,BIG\n0xA,{huge}\n"));
}

#[test]
fn test_multi_chain_export_prefixes_columns() {
    let mut eth_balances = native("ETH", "0.5000", 18);
    eth_balances.push(token("0xdAC1", "USDT", "10.0000", 6));

    let mut portfolio = MultiChainPortfolio::new();
    portfolio.insert(ChainPortfolio::new(
        ChainId::new("SUI"),
        vec![
            settled("0xA", "SUI", native("SUI", "12.5000", 9)),
            settled("0xB", "SUI", native("SUI", "1.0000", 9)),
        ],
    ));
    portfolio.insert(ChainPortfolio::new(
        ChainId::new("ETH"),
        vec![settled("0xA", "ETH", eth_balances)],
    ));

    let csv = portfolio_csv(&portfolio).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "Address,ETH:ETH,ETH:USDT,SUI:SUI");
    assert_eq!(lines[1], "0xA,0.5000,10.0000,12.5000");
    assert_eq!(lines[2], "0xB,0.0000,0.0000,1.0000");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_one_chain_in_a_multi_chain_portfolio_is_not_prefixed() {
    let mut portfolio = MultiChainPortfolio::new();
    portfolio.insert(ChainPortfolio::new(
        ChainId::new("SUI"),
        vec![settled("0xA", "SUI", native("SUI", "3.0000", 9))],
    ));

    assert_eq!(portfolio_csv(&portfolio).unwrap(), "Address,SUI\n0xA,3.0000\n");
}

#[test]
fn test_empty_portfolio_exports_header_only() {
    let csv = portfolio_csv(&MultiChainPortfolio::new()).unwrap();
    assert_eq!(csv, "Address\n");
}

#[test]
fn test_write_csv_replaces_existing_file() {
    let path = std::env::temp_dir().join(format!("portfolio-export-{}.csv", std::process::id()));
    std::fs::write(&path, "stale").unwrap();

    write_csv(&path, "Address,SUI\n0xA,1.0000\n").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Address,SUI\n0xA,1.0000\n");
    std::fs::remove_file(&path).unwrap();
}
