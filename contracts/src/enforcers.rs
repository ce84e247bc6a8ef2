//! # Caveat Enforcers
//!
//! The devnet counterpart of the on-chain enforcer contracts. Before a
//! delegation is redeemed every caveat it carries is checked in order
//! against the pending execution and the delegation's redemption history.
//! The first violation aborts the redemption.
//!
//! | Caveat                  | Passes when                                        |
//! |-------------------------|----------------------------------------------------|
//! | `Timestamp`             | `after <= now` and (`before == 0` or `now < before`) |
//! | `LimitedCalls`          | prior redemptions `< limit`                        |
//! | `NativeTransferAmount`  | native execution and `spent + amount <= max`       |
//! | `TokenTransferAmount`   | same token and `spent + amount <= max`             |

use chrono::{DateTime, Utc};
use thiserror::Error;

use lastwill_protocol::config::TIMESTAMP_NO_EXPIRY;
use lastwill_protocol::delegation::{Caveat, Execution};
use lastwill_protocol::primitives::{Amount, Asset};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an enforcer refused a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaveatViolation {
    #[error("not valid before {after} (now {now})")]
    NotYetValid { after: i64, now: i64 },

    #[error("expired at {before} (now {now})")]
    Expired { before: i64, now: i64 },

    #[error("call limit of {limit} reached")]
    CallLimitReached { limit: u32 },

    #[error("transfer of {requested} exceeds remaining allowance {remaining}")]
    AmountExceeded { requested: Amount, remaining: Amount },

    #[error("execution moves {found}, caveat only allows {expected}")]
    AssetMismatch { expected: Asset, found: Asset },
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything an enforcer may look at.
#[derive(Debug, Clone, Copy)]
pub struct EnforcementContext<'a> {
    pub now: DateTime<Utc>,
    /// Successful redemptions of this delegation so far.
    pub prior_calls: u32,
    /// Total moved by earlier redemptions of this delegation.
    pub prior_spent: Amount,
    pub execution: &'a Execution,
}

// ---------------------------------------------------------------------------
// Enforcement
// ---------------------------------------------------------------------------

pub fn enforce(caveat: &Caveat, ctx: &EnforcementContext<'_>) -> Result<(), CaveatViolation> {
    match caveat {
        Caveat::Timestamp { after, before } => {
            let now = ctx.now.timestamp();
            if now < *after {
                return Err(CaveatViolation::NotYetValid { after: *after, now });
            }
            if *before != TIMESTAMP_NO_EXPIRY && now >= *before {
                return Err(CaveatViolation::Expired {
                    before: *before,
                    now,
                });
            }
            Ok(())
        }
        Caveat::LimitedCalls { limit } => {
            if ctx.prior_calls >= *limit {
                return Err(CaveatViolation::CallLimitReached { limit: *limit });
            }
            Ok(())
        }
        Caveat::NativeTransferAmount { max } => {
            enforce_amount(&Asset::Native, *max, ctx)
        }
        Caveat::TokenTransferAmount { token, max } => enforce_amount(
            &Asset::Token {
                contract: token.clone(),
            },
            *max,
            ctx,
        ),
    }
}

/// Runs every caveat in order, stopping at the first violation.
pub fn enforce_all(caveats: &[Caveat], ctx: &EnforcementContext<'_>) -> Result<(), CaveatViolation> {
    caveats.iter().try_for_each(|c| enforce(c, ctx))
}

fn enforce_amount(
    allowed: &Asset,
    max: Amount,
    ctx: &EnforcementContext<'_>,
) -> Result<(), CaveatViolation> {
    let found = ctx.execution.asset();
    if &found != allowed {
        return Err(CaveatViolation::AssetMismatch {
            expected: allowed.clone(),
            found,
        });
    }
    let remaining = max.saturating_sub(ctx.prior_spent);
    let requested = ctx.execution.amount();
    if requested > remaining {
        return Err(CaveatViolation::AmountExceeded {
            requested,
            remaining,
        });
    }
    Ok(())
}
