//! # Protocol Configuration & Constants
//!
//! Every tunable number in LastWill lives here. Validation bounds, gas
//! parameters for the devnet ledger, and the engine's runtime knobs.
//!
//! The bounds are deliberately conservative. A vault with a 30-second
//! check-in period is a footgun, and one with a 5-year period is a vault
//! nobody will remember to check in to.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The protocol version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version tag embedded in every persisted vault record. Bump when the
/// JSON layout changes in a way older readers cannot handle.
pub const RECORD_FORMAT_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Check-in Period Bounds
// ---------------------------------------------------------------------------

/// Seconds in a minute.
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Seconds in an hour.
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;

/// Seconds in a day.
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Seconds in a week.
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// A "month" is 30 days. Calendar months are not worth the complexity
/// for a deadline that only needs to be roughly right.
pub const SECONDS_PER_MONTH: i64 = 30 * SECONDS_PER_DAY;

/// Shortest accepted check-in period: 5 minutes.
pub const MIN_PERIOD_SECS: i64 = 5 * SECONDS_PER_MINUTE;

/// Longest accepted check-in period: 365 days.
pub const MAX_PERIOD_SECS: i64 = 365 * SECONDS_PER_DAY;

/// Periods shorter than this produce a "testing only" warning.
pub const SHORT_PERIOD_WARNING_SECS: i64 = SECONDS_PER_HOUR;

/// Periods longer than this (~6 months) produce a warning.
pub const LONG_PERIOD_WARNING_SECS: i64 = 180 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Beneficiary Limits
// ---------------------------------------------------------------------------

/// Minimum number of beneficiaries in a setup call.
pub const MIN_BENEFICIARIES: usize = 1;

/// Maximum number of beneficiaries per vault.
pub const MAX_BENEFICIARIES: usize = 10;

/// Maximum display name length, in characters.
pub const MAX_NAME_LENGTH: usize = 50;

// ---------------------------------------------------------------------------
// Delegation Parameters
// ---------------------------------------------------------------------------

/// Each inheritance delegation may be redeemed exactly once.
pub const DELEGATION_CALL_LIMIT: u32 = 1;

/// Sentinel for "no upper bound" on the timestamp caveat.
pub const TIMESTAMP_NO_EXPIRY: i64 = 0;

/// How many times a single on-chain disable is attempted during check-in
/// before it is left pending for the next check-in.
pub const DEFAULT_DISABLE_ATTEMPTS: u32 = 3;

/// How many times a claim re-applies its bookkeeping after a version
/// conflict. The redemption already happened on-chain at that point.
pub const CLAIM_PERSIST_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// Gas Parameters
// ---------------------------------------------------------------------------

/// Fixed gas price in wei. The bundler rejects anything below its minimum,
/// so every transaction pays exactly this.
pub const GAS_PRICE_WEI: u128 = 1_000_000_000;

/// Gas limit for a smart-account deployment.
pub const DEPLOY_GAS_LIMIT: u64 = 1_000_000;

/// Gas limit for a plain native transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Gas limit for a `disableDelegation` call.
pub const DISABLE_GAS_LIMIT: u64 = 150_000;

/// Gas limit for a `redeemDelegations` call.
pub const REDEEM_GAS_LIMIT: u64 = 500_000;

// ---------------------------------------------------------------------------
// Engine Configuration
// ---------------------------------------------------------------------------

/// Runtime knobs for the vault lifecycle engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Attempts per delegation disable during check-in.
    pub disable_attempts: u32,
    /// Maximum beneficiaries per vault.
    pub max_beneficiaries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disable_attempts: DEFAULT_DISABLE_ATTEMPTS,
            max_beneficiaries: MAX_BENEFICIARIES,
        }
    }
}
