//! Asset identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Address;

/// What a balance or transfer is denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    /// The chain's native currency.
    Native,
    /// A fungible token identified by its contract address.
    Token { contract: Address },
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token { contract } => write!(f, "token:{contract}"),
        }
    }
}
