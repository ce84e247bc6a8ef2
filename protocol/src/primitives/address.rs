//! Account addresses.
//!
//! Addresses are the lower 20 bytes of a SHA-256 digest over whatever
//! identifies the account (a public key for externally owned accounts, the
//! owner + salt pair for smart accounts). Only the textual format is
//! validated here; nothing checks that an account exists.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of raw bytes in an address.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),

    #[error("address must have 40 hex characters after 0x, got {0}")]
    WrongLength(usize),

    #[error("address contains non-hex characters: {0}")]
    NotHex(String),
}

/// A 20-byte account address, stored as lower-case `0x`-prefixed hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Builds an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Derives an address from arbitrary preimage bytes by taking the last
    /// 20 bytes of their SHA-256 digest.
    pub fn derive(preimage: &[u8]) -> Self {
        let digest = Sha256::digest(preimage);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self::from_bytes(bytes)
    }

    /// The all-zero address. Used as the "native asset" marker in logs.
    pub fn zero() -> Self {
        Self::from_bytes([0u8; ADDRESS_LENGTH])
    }

    /// Returns the canonical lower-case string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `s` is a well-formed address string.
    pub fn is_valid(s: &str) -> bool {
        s.parse::<Address>().is_ok()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(trimmed.to_string()))?;

        if body.len() != ADDRESS_LENGTH * 2 {
            return Err(AddressError::WrongLength(body.len()));
        }
        if !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::NotHex(trimmed.to_string()));
        }

        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}
