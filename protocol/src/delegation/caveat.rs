//! Caveats and their composition.
//!
//! Order matters to the enforcers only in that each one is checked in
//! sequence and the first failure aborts redemption. We always emit the
//! inheritance chain as time window, then call limit, then amount cap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DELEGATION_CALL_LIMIT, TIMESTAMP_NO_EXPIRY};
use crate::primitives::{Address, Amount, Asset};

/// A single restriction on a delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Caveat {
    /// Valid only when `after <= now` and (`before == 0` or `now < before`).
    /// Both are Unix seconds.
    Timestamp { after: i64, before: i64 },

    /// May be redeemed at most `limit` times.
    LimitedCalls { limit: u32 },

    /// Native transfers capped at `max` in total.
    NativeTransferAmount { max: Amount },

    /// Token transfers on `token` capped at `max` in total.
    TokenTransferAmount { token: Address, max: Amount },
}

/// Fluent builder for a caveat chain.
#[derive(Debug, Default, Clone)]
pub struct CaveatBuilder {
    caveats: Vec<Caveat>,
}

impl CaveatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valid from `after` onward, forever.
    pub fn not_before(mut self, after: DateTime<Utc>) -> Self {
        self.caveats.push(Caveat::Timestamp {
            after: after.timestamp(),
            before: TIMESTAMP_NO_EXPIRY,
        });
        self
    }

    pub fn limited_calls(mut self, limit: u32) -> Self {
        self.caveats.push(Caveat::LimitedCalls { limit });
        self
    }

    pub fn transfer_amount(mut self, asset: &Asset, max: Amount) -> Self {
        let caveat = match asset {
            Asset::Native => Caveat::NativeTransferAmount { max },
            Asset::Token { contract } => Caveat::TokenTransferAmount {
                token: contract.clone(),
                max,
            },
        };
        self.caveats.push(caveat);
        self
    }

    pub fn build(self) -> Vec<Caveat> {
        self.caveats
    }
}

/// The three-caveat chain every inheritance delegation carries.
pub fn inheritance_caveats(deadline: DateTime<Utc>, asset: &Asset, amount: Amount) -> Vec<Caveat> {
    CaveatBuilder::new()
        .not_before(deadline)
        .limited_calls(DELEGATION_CALL_LIMIT)
        .transfer_amount(asset, amount)
        .build()
}
