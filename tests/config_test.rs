use eyre::Result;
use portfolio_scanner::config::builtin_chain_keys;
use portfolio_scanner::{BackoffKind, ChainId, ChainKind, Config, ScanSettings};
use std::time::Duration;

const CONFIG: &str = r#"
addresses:
  - "0x02a212de6a9dfa3a69e22387acfbafbb1a9e591bd9d636e7895dcfc8de05f331"
  - "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
chains: [sui, eth, devnet]
scan:
  batch_size: 10
  max_retries: 5
  backoff: exponential
networks:
  devnet:
    name: "Local devnet"
    kind: evm
    symbol: DEV
    rpc_urls:
      - "http://127.0.0.1:8545"
    tokens:
      - symbol: TKN
        address: "0x5FbDB2315678afecb367f032d93F642f64180aa3"
    scan:
      batch_size: 2
      fetch_timeout_ms: 2500
"#;

#[test]
fn test_config_parses_with_overrides_and_defaults() -> Result<()> {
    let config = Config::from_yaml_str(CONFIG)?;

    assert_eq!(config.addresses.len(), 2);
    assert_eq!(
        config.selected_chains(),
        vec![ChainId::new("SUI"), ChainId::new("ETH"), ChainId::new("DEVNET")]
    );

    assert_eq!(config.scan.batch_size, 10);
    assert_eq!(config.scan.max_retries, 5);
    assert_eq!(config.scan.backoff, BackoffKind::Exponential);
    assert_eq!(config.scan.inter_batch_delay, Duration::from_millis(1000));
    assert_eq!(config.scan.display_places, 4);

    let registry = config.registry()?;
    let devnet = registry.get(&ChainId::new("devnet"))?;
    assert_eq!(devnet.kind, ChainKind::Evm);
    assert_eq!(devnet.native_decimals, 18);
    assert_eq!(devnet.tokens[0].decimals, None);
    assert_eq!(devnet.scan.batch_size, 2);
    assert_eq!(devnet.scan.fetch_timeout, Duration::from_millis(2500));
    assert_eq!(devnet.scan.max_retries, 5);

    // built-in chains pick up the global settings too
    let sui = registry.get(&ChainId::new("SUI"))?;
    assert_eq!(sui.kind, ChainKind::Sui);
    assert_eq!(sui.native_decimals, 9);
    assert_eq!(sui.scan.batch_size, 10);

    assert_eq!(config.parsed_addresses()?.len(), 2);
    Ok(())
}

#[test]
fn test_empty_config_scans_sui_and_eth() -> Result<()> {
    let config = Config::from_yaml_str("{}")?;

    assert!(config.addresses.is_empty());
    assert_eq!(config.scan, ScanSettings::default());
    assert_eq!(
        config.selected_chains(),
        vec![ChainId::new("SUI"), ChainId::new("ETH")]
    );

    let registry = config.registry()?;
    for key in builtin_chain_keys() {
        assert!(registry.contains(&ChainId::new(&key)), "missing {key}");
    }
    Ok(())
}

#[test]
fn test_network_without_rpc_is_rejected() -> Result<()> {
    let config = Config::from_yaml_str(
        r#"
networks:
  broken:
    name: Broken
    kind: sui
    symbol: BRK
    rpc_urls: []
"#,
    )?;

    let error = config.registry().unwrap_err();
    assert!(error.to_string().contains("BROKEN"), "{error}");
    assert!(error.to_string().contains("no rpc endpoint"), "{error}");
    Ok(())
}

#[test]
fn test_network_with_zero_batch_size_is_rejected() -> Result<()> {
    let config = Config::from_yaml_str(
        r#"
networks:
  SUI:
    name: Sui
    kind: sui
    symbol: SUI
    rpc_urls: ["https://fullnode.testnet.sui.io:443"]
    scan:
      batch_size: 0
"#,
    )?;

    assert!(config.registry().is_err());
    Ok(())
}

#[test]
fn test_malformed_config_address_is_an_error() -> Result<()> {
    let config = Config::from_yaml_str("addresses: [\"0xabc\", \"not-an-address\"]")?;

    let error = config.parsed_addresses().unwrap_err();
    assert!(error.to_string().contains("not-an-address"), "{error}");
    Ok(())
}

#[test]
fn test_unknown_backoff_fails_to_parse() {
    assert!(Config::from_yaml_str("scan:\n  backoff: random\n").is_err());
}
