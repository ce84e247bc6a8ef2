//! # Input Validation
//!
//! Pure checks on everything a caller hands the engine: addresses, check-in
//! periods, display names, and beneficiary sets. Nothing here touches the
//! network or storage; balances are passed in.
//!
//! Each check returns `Err` on the first hard failure. Soft problems
//! (a one-minute period, an under-allocated vault) become warnings in the
//! [`ValidationReport`] and do not block the operation.
//!
//! The composed validator runs in a fixed order:
//!
//! ```text
//! period → count → per-entry (address, name, amount) → duplicates → sums
//! ```

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::config::{
    LONG_PERIOD_WARNING_SECS, MAX_NAME_LENGTH, MAX_PERIOD_SECS, MIN_BENEFICIARIES,
    MIN_PERIOD_SECS, SHORT_PERIOD_WARNING_SECS,
};
use crate::primitives::{Address, Amount, Asset};
use crate::time::{humanize, CheckInPeriod};
use crate::vault::model::{Allocation, BeneficiaryInput};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A hard validation failure. No state changes when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("check-in period {period} is shorter than the 5 minute minimum")]
    PeriodTooShort { period: String },

    #[error("check-in period {period} is longer than the 365 day maximum")]
    PeriodTooLong { period: String },

    #[error("at least {min} beneficiary is required")]
    TooFewBeneficiaries { min: usize },

    #[error("too many beneficiaries: {count} (maximum {max})")]
    TooManyBeneficiaries { count: usize, max: usize },

    #[error("allocation for {address} must be greater than zero")]
    ZeroAllocation { address: String },

    #[error("duplicate beneficiary: {address}")]
    DuplicateBeneficiary { address: String },

    #[error("{address} cannot be a beneficiary of its own vault")]
    SelfBeneficiary { address: String },

    #[error("beneficiary name must not be empty")]
    EmptyName,

    #[error("beneficiary name is {len} characters (maximum {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("allocations of {asset} total {allocated}, vault holds {available}")]
    OverAllocated {
        asset: Asset,
        allocated: Amount,
        available: Amount,
    },
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Non-fatal findings from a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    fn merge(&mut self, other: ValidationReport) {
        self.warnings.extend(other.warnings);
    }
}

// ---------------------------------------------------------------------------
// Individual Checks
// ---------------------------------------------------------------------------

/// Format check only. Returns the normalized address.
pub fn validate_address(raw: &str) -> Result<Address, ValidationError> {
    raw.parse::<Address>()
        .map_err(|e| ValidationError::InvalidAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })
}

pub fn validate_period(period: CheckInPeriod) -> Result<ValidationReport, ValidationError> {
    let secs = period.as_secs();
    if secs < MIN_PERIOD_SECS {
        return Err(ValidationError::PeriodTooShort {
            period: period.to_string(),
        });
    }
    if secs > MAX_PERIOD_SECS {
        return Err(ValidationError::PeriodTooLong {
            period: period.to_string(),
        });
    }

    let mut report = ValidationReport::default();
    if secs < SHORT_PERIOD_WARNING_SECS {
        report.warn(format!(
            "check-in period of {period} is shorter than one hour; use for testing only"
        ));
    }
    if secs > LONG_PERIOD_WARNING_SECS {
        report.warn(format!(
            "check-in period of {period} is longer than six months; beneficiaries may wait a long time"
        ));
    }
    Ok(report)
}

/// Non-empty after trimming, at most [`MAX_NAME_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            len,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

fn validate_allocation(address: &Address, allocation: &Allocation) -> Result<(), ValidationError> {
    if allocation.amount().is_zero() {
        return Err(ValidationError::ZeroAllocation {
            address: address.to_string(),
        });
    }
    if let Allocation::Token { contract, .. } = allocation {
        // Typed already, but a zero contract is never a real token.
        if *contract == Address::zero() {
            return Err(ValidationError::InvalidAddress {
                address: contract.to_string(),
                reason: "token contract cannot be the zero address".into(),
            });
        }
    }
    Ok(())
}

/// Validates a full beneficiary set against per-asset vault balances.
///
/// `excluded` holds addresses that may never be beneficiaries (the vault
/// itself and its owner). Assets missing from `balances` count as zero.
pub fn validate_beneficiaries(
    inputs: &[BeneficiaryInput],
    balances: &BTreeMap<Asset, Amount>,
    excluded: &[Address],
    max_beneficiaries: usize,
) -> Result<ValidationReport, ValidationError> {
    if inputs.len() < MIN_BENEFICIARIES {
        return Err(ValidationError::TooFewBeneficiaries {
            min: MIN_BENEFICIARIES,
        });
    }
    if inputs.len() > max_beneficiaries {
        return Err(ValidationError::TooManyBeneficiaries {
            count: inputs.len(),
            max: max_beneficiaries,
        });
    }

    let mut parsed = Vec::with_capacity(inputs.len());
    for input in inputs {
        let address = validate_address(&input.address)?;
        validate_name(&input.name)?;
        validate_allocation(&address, &input.allocation)?;
        if excluded.contains(&address) {
            return Err(ValidationError::SelfBeneficiary {
                address: address.to_string(),
            });
        }
        parsed.push(address);
    }

    // Addresses are normalized to lower case on parse, so this is the
    // case-insensitive duplicate check.
    let mut seen = HashSet::with_capacity(parsed.len());
    for address in &parsed {
        if !seen.insert(address) {
            return Err(ValidationError::DuplicateBeneficiary {
                address: address.to_string(),
            });
        }
    }

    let mut report = ValidationReport::default();
    for (asset, allocated) in sum_by_asset(inputs.iter().map(|i| &i.allocation))? {
        let available = balances.get(&asset).copied().unwrap_or(Amount::ZERO);
        if allocated > available {
            return Err(ValidationError::OverAllocated {
                asset,
                allocated,
                available,
            });
        }
        if allocated < available {
            let rest = available.saturating_sub(allocated);
            report.warn(format!(
                "{rest} of {asset} ({:.2}%) remains unallocated",
                rest.percentage_of(available)
            ));
        }
    }

    Ok(report)
}

/// Composed validator for a setup call: period first, then the set.
pub fn validate_setup(
    period: CheckInPeriod,
    inputs: &[BeneficiaryInput],
    balances: &BTreeMap<Asset, Amount>,
    excluded: &[Address],
    max_beneficiaries: usize,
) -> Result<ValidationReport, ValidationError> {
    let mut report = validate_period(period)?;
    report.merge(validate_beneficiaries(
        inputs,
        balances,
        excluded,
        max_beneficiaries,
    )?);
    Ok(report)
}

/// Per-asset totals. Overflow is reported as over-allocation against the
/// maximum representable amount.
pub fn sum_by_asset<'a>(
    allocations: impl Iterator<Item = &'a Allocation>,
) -> Result<BTreeMap<Asset, Amount>, ValidationError> {
    let mut totals: BTreeMap<Asset, Amount> = BTreeMap::new();
    for allocation in allocations {
        let asset = allocation.asset();
        let entry = totals.entry(asset.clone()).or_insert(Amount::ZERO);
        *entry = entry
            .checked_add(allocation.amount())
            .map_err(|_| ValidationError::OverAllocated {
                asset,
                allocated: Amount::new(u128::MAX),
                available: Amount::ZERO,
            })?;
    }
    Ok(totals)
}

/// Human-readable period length, for log lines.
pub fn describe_period(period: CheckInPeriod) -> String {
    humanize(period.as_secs().max(0) as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
