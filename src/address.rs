use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// Wallet address as entered by the user.
///
/// Only the chain-independent shape is checked here (non-empty, `0x` prefix,
/// hex body). Width and checksum rules belong to each chain's fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let Some(body) = trimmed.strip_prefix("0x") else {
            return Err(AddressError::MissingPrefix(trimmed.to_string()));
        };

        if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Extract addresses from pasted free text.
///
/// Tokens are split on newlines, commas and whitespace; anything that does not
/// parse as an address is skipped. Duplicates keep their first position.
pub fn parse_addresses_from_text(text: &str) -> Vec<Address> {
    let mut addresses: Vec<Address> = Vec::new();

    for token in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Ok(address) = Address::parse(token) {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
    }

    addresses
}

/// Shorten an address for display, keeping both ends
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}
