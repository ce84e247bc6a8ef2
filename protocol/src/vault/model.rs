//! Persisted vault records.
//!
//! [`VaultStorage`] is the root aggregate and the unit of persistence: one
//! JSON document per vault. The engine loads it, mutates it, and saves it
//! back within a single operation; nothing holds one across calls.
//!
//! ## Epochs
//!
//! Delegation caveats are immutable once signed, so extending a deadline
//! means disabling the old delegations and signing new ones. Each such
//! generation is an *epoch*. [`StoredDelegation::epoch`] records which one a
//! delegation belongs to, and only the current epoch is consulted when a
//! beneficiary claims. Earlier epochs whose on-chain disable never
//! succeeded stay live until a later check-in mops them up.
//!
//! A delegation is live while it is neither disabled nor redeemed. A
//! redeemed one has used up its single call and is never disabled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RECORD_FORMAT_VERSION;
use crate::crypto::Hash32;
use crate::delegation::SignedDelegation;
use crate::primitives::{Address, Amount, Asset};
use crate::time::{deadline_from, CheckInPeriod};

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Identity, schedule, and cached balance of a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// On-chain smart account address. Also the storage key.
    pub address: Address,
    pub owner: Address,
    /// Deployment salt used to derive `address`.
    pub salt: u64,
    pub period: CheckInPeriod,
    pub last_check_in: DateTime<Utc>,
    /// Always `last_check_in + period`.
    pub next_deadline: DateTime<Utc>,
    /// Not-before time signed into the current epoch. Equals `next_deadline`
    /// unless a setup asked for a later one.
    #[serde(default)]
    pub unlock_at: DateTime<Utc>,
    /// Native balance as of the last refresh.
    pub total_value: Amount,
    pub created_at: DateTime<Utc>,
    /// Current delegation epoch. Bumped on every check-in.
    pub epoch: u32,
}

impl VaultConfig {
    pub fn new(
        address: Address,
        owner: Address,
        salt: u64,
        period: CheckInPeriod,
        now: DateTime<Utc>,
    ) -> Self {
        let next_deadline = deadline_from(period, now);
        Self {
            address,
            owner,
            salt,
            period,
            last_check_in: now,
            next_deadline,
            unlock_at: next_deadline,
            total_value: Amount::ZERO,
            created_at: now,
            epoch: 0,
        }
    }

    /// Restarts the countdown from `now`, optionally switching period.
    pub fn record_check_in(&mut self, now: DateTime<Utc>, period: Option<CheckInPeriod>) {
        if let Some(p) = period {
            self.period = p;
        }
        self.last_check_in = now;
        self.next_deadline = deadline_from(self.period, now);
        self.unlock_at = self.next_deadline;
    }

    /// When current-epoch delegations become claimable: never before the
    /// check-in deadline.
    pub fn unlock_time(&self) -> DateTime<Utc> {
        self.unlock_at.max(self.next_deadline)
    }
}

// ---------------------------------------------------------------------------
// Beneficiaries
// ---------------------------------------------------------------------------

/// What a beneficiary inherits. Each variant carries only what its asset
/// kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "asset", rename_all = "snake_case")]
pub enum Allocation {
    Native { amount: Amount },
    Token { contract: Address, amount: Amount },
}

impl Allocation {
    pub fn native(amount: impl Into<Amount>) -> Self {
        Allocation::Native {
            amount: amount.into(),
        }
    }

    pub fn asset(&self) -> Asset {
        match self {
            Allocation::Native { .. } => Asset::Native,
            Allocation::Token { contract, .. } => Asset::Token {
                contract: contract.clone(),
            },
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Allocation::Native { amount } | Allocation::Token { amount, .. } => *amount,
        }
    }
}

/// Unvalidated beneficiary as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryInput {
    pub address: String,
    pub name: String,
    pub allocation: Allocation,
}

/// A beneficiary of a vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub address: Address,
    pub name: String,
    pub allocation: Allocation,
    pub claimed: bool,
    pub claim_tx: Option<Hash32>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Beneficiary {
    pub fn new(address: Address, name: impl Into<String>, allocation: Allocation) -> Self {
        Self {
            address,
            name: name.into().trim().to_string(),
            allocation,
            claimed: false,
            claim_tx: None,
            claimed_at: None,
        }
    }

    pub fn mark_claimed(&mut self, tx: Hash32, at: DateTime<Utc>) {
        self.claimed = true;
        self.claim_tx = Some(tx);
        self.claimed_at = Some(at);
    }

    /// Back to a caller-facing input, e.g. to re-run validation.
    pub fn to_input(&self) -> BeneficiaryInput {
        BeneficiaryInput {
            address: self.address.to_string(),
            name: self.name.clone(),
            allocation: self.allocation.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Delegations & History
// ---------------------------------------------------------------------------

/// One beneficiary's signed delegation for one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDelegation {
    pub beneficiary: Address,
    pub epoch: u32,
    pub signed: SignedDelegation,
    pub hash: Hash32,
    pub created_at: DateTime<Utc>,
    /// The not-before timestamp encoded in the delegation's caveats.
    pub deadline: DateTime<Utc>,
    pub disabled: bool,
    pub disable_tx: Option<Hash32>,
    /// Set once the beneficiary's claim went through this delegation.
    #[serde(default)]
    pub redeemed: bool,
}

impl StoredDelegation {
    pub fn new(
        beneficiary: Address,
        epoch: u32,
        signed: SignedDelegation,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        let hash = signed.hash();
        Self {
            beneficiary,
            epoch,
            signed,
            hash,
            created_at,
            deadline,
            disabled: false,
            disable_tx: None,
            redeemed: false,
        }
    }

    pub fn mark_disabled(&mut self, tx: Option<Hash32>) {
        self.disabled = true;
        self.disable_tx = tx;
    }

    pub fn mark_redeemed(&mut self) {
        self.redeemed = true;
    }

    /// Still redeemable as far as this record knows.
    pub fn is_live(&self) -> bool {
        !self.disabled && !self.redeemed
    }
}

/// A single owner check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    pub timestamp: DateTime<Utc>,
    /// Last disable transaction submitted, if any were needed.
    pub tx_hash: Option<Hash32>,
    pub new_deadline: DateTime<Utc>,
    pub disabled_count: u32,
    pub created_count: u32,
    /// Delegations still live on-chain after all disable attempts.
    pub pending_disables: u32,
    pub gas_used: u64,
    /// Gas spent across all check-ins up to and including this one.
    pub cumulative_gas: u64,
}

// ---------------------------------------------------------------------------
// VaultStorage
// ---------------------------------------------------------------------------

/// Root aggregate persisted per vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultStorage {
    pub format: u16,
    pub config: VaultConfig,
    /// Ordered as supplied by the owner.
    pub beneficiaries: Vec<Beneficiary>,
    /// Append-only across epochs.
    pub delegations: Vec<StoredDelegation>,
    pub check_ins: Vec<CheckInRecord>,
    pub last_updated: DateTime<Utc>,
    /// Optimistic concurrency counter. Stores reject a save whose version
    /// does not match what is on disk, then bump it.
    pub version: u64,
}

impl VaultStorage {
    pub fn new(config: VaultConfig) -> Self {
        let now = config.created_at;
        Self {
            format: RECORD_FORMAT_VERSION,
            config,
            beneficiaries: Vec::new(),
            delegations: Vec::new(),
            check_ins: Vec::new(),
            last_updated: now,
            version: 0,
        }
    }

    pub fn address(&self) -> &Address {
        &self.config.address
    }

    pub fn beneficiary(&self, address: &Address) -> Option<&Beneficiary> {
        self.beneficiaries.iter().find(|b| &b.address == address)
    }

    pub fn beneficiary_mut(&mut self, address: &Address) -> Option<&mut Beneficiary> {
        self.beneficiaries.iter_mut().find(|b| &b.address == address)
    }

    /// The beneficiary's delegation in the current epoch, if one was signed.
    pub fn current_delegation(&self, beneficiary: &Address) -> Option<&StoredDelegation> {
        let epoch = self.config.epoch;
        self.delegations
            .iter()
            .rev()
            .find(|d| d.epoch == epoch && &d.beneficiary == beneficiary)
    }

    pub fn delegation_mut(&mut self, hash: &Hash32) -> Option<&mut StoredDelegation> {
        self.delegations.iter_mut().find(|d| &d.hash == hash)
    }

    /// Live delegations of the current epoch.
    pub fn live_current_delegations(&self) -> impl Iterator<Item = &StoredDelegation> {
        let epoch = self.config.epoch;
        self.delegations
            .iter()
            .filter(move |d| d.epoch == epoch && d.is_live())
    }

    /// Live delegations from any epoch.
    pub fn live_delegations(&self) -> impl Iterator<Item = &StoredDelegation> {
        self.delegations.iter().filter(|d| d.is_live())
    }

    /// Live delegations from epochs before the current one. These are the
    /// ones a partial check-in left redeemable.
    pub fn stale_live_delegations(&self) -> impl Iterator<Item = &StoredDelegation> {
        let epoch = self.config.epoch;
        self.delegations
            .iter()
            .filter(move |d| d.epoch < epoch && d.is_live())
    }

    pub fn all_claimed(&self) -> bool {
        !self.beneficiaries.is_empty() && self.beneficiaries.iter().all(|b| b.claimed)
    }

    pub fn claimed_count(&self) -> usize {
        self.beneficiaries.iter().filter(|b| b.claimed).count()
    }

    /// Allocation totals per asset across the beneficiaries matching `pick`.
    pub fn allocated_by_asset<F>(&self, pick: F) -> BTreeMap<Asset, Amount>
    where
        F: Fn(&Beneficiary) -> bool,
    {
        let mut totals: BTreeMap<Asset, Amount> = BTreeMap::new();
        for b in self.beneficiaries.iter().filter(|b| pick(b)) {
            let entry = totals.entry(b.allocation.asset()).or_insert(Amount::ZERO);
            *entry = Amount::new(entry.value().saturating_add(b.allocation.amount().value()));
        }
        totals
    }

    /// Distinct assets the vault cares about: native plus every allocated token.
    pub fn tracked_assets(&self) -> Vec<Asset> {
        let mut assets = vec![Asset::Native];
        for b in &self.beneficiaries {
            let asset = b.allocation.asset();
            if !assets.contains(&asset) {
                assets.push(asset);
            }
        }
        assets
    }

    pub fn total_check_in_gas(&self) -> u64 {
        self.check_ins.last().map(|c| c.cumulative_gas).unwrap_or(0)
    }
}
