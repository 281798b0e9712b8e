//! 20-byte account / contract identifiers.
//!
//! Funds, assets, controllers, vault implementations, adapters and callers are
//! all identified by the same `Address` type. Parsing is strict: a `0x` prefix
//! followed by exactly 40 hex digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FundError, Result};

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Account or contract identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address whose low 8 bytes hold `n` (big endian) and whose
    /// first byte is `tag`. Used for engine-derived ids such as fund addresses.
    pub fn derived(tag: u8, n: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = tag;
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Parse a `0x`-prefixed hex string.
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| FundError::Configuration(format!("address must start with 0x: {s}")))?;

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(FundError::Configuration(format!(
                "address must have {} hex digits: {s}",
                ADDRESS_LEN * 2
            )));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| FundError::Configuration(format!("invalid address {s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl FromStr for Address {
    type Err = FundError;

    fn from_str(s: &str) -> Result<Self> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = FundError;

    fn try_from(s: String) -> Result<Self> {
        Address::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}
