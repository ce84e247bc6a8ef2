//! Errors returned by the vault lifecycle engine.

use thiserror::Error;

use crate::framework::FrameworkError;
use crate::primitives::Address;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Every way a lifecycle operation can fail.
///
/// Claim-precondition variants (`AlreadyClaimed`, `DelegationDisabled`,
/// `TooEarly`) are expected outcomes that a UI shows to the beneficiary,
/// not faults.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Bad input. Nothing was changed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The smart account could not be deployed.
    #[error("deployment failed: {0}")]
    Deployment(#[source] FrameworkError),

    /// The vault exists but the funding transfer failed. Retry with
    /// `fund_vault`.
    #[error("funding failed for vault {vault}: {source}")]
    Funding {
        vault: Address,
        #[source]
        source: FrameworkError,
    },

    /// A delegation could not be signed. Nothing from this call was
    /// persisted.
    #[error("signing failed for beneficiary {beneficiary}: {source}")]
    Signing {
        beneficiary: Address,
        #[source]
        source: FrameworkError,
    },

    #[error("vault not found: {0}")]
    VaultNotFound(Address),

    #[error("beneficiary {beneficiary} not found in vault {vault}")]
    BeneficiaryNotFound { vault: Address, beneficiary: Address },

    #[error("beneficiary {0} has already claimed")]
    AlreadyClaimed(Address),

    #[error("delegation for {0} has been disabled")]
    DelegationDisabled(Address),

    #[error("too early to claim: {seconds_remaining}s remaining")]
    TooEarly { seconds_remaining: u64 },

    #[error("vault {0} has no active delegations to check in")]
    NoActiveDelegations(Address),

    /// The supplied key does not own the vault.
    #[error("key {presented} is not the owner of vault {vault}")]
    Unauthorized { vault: Address, presented: Address },

    /// The framework refused a redemption the off-chain checks allowed.
    #[error("redemption failed: {0}")]
    Redemption(#[source] FrameworkError),

    /// A balance or status query to the framework failed.
    #[error("chain query failed: {0}")]
    Chain(#[source] FrameworkError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type VaultResult<T> = Result<T, VaultError>;
