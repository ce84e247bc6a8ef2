//! # Status & Reporting
//!
//! Read-side projections of a vault. Status is never stored: it is
//! recomputed from the record, live balances, and the clock every time
//! someone asks.
//!
//! | Status      | When                                                          |
//! |-------------|---------------------------------------------------------------|
//! | `CREATED`   | no beneficiaries yet                                          |
//! | `EMPTY`     | every tracked balance is zero, or every beneficiary claimed   |
//! | `CLAIMABLE` | unlock time passed, funds remain, someone has not claimed     |
//! | `DISABLED`  | deadline ahead but no live current-epoch delegation           |
//! | `ACTIVE`    | otherwise                                                     |
//!
//! The checks run top to bottom; the first match wins. The unlock time is
//! the check-in deadline, or the later time an owner set when configuring
//! beneficiaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Allocation, VaultStorage};
use crate::crypto::Hash32;
use crate::primitives::{Address, Amount, Asset};
use crate::time::{is_past, remaining, CheckInPeriod, TimeRemaining};

/// Lifecycle state of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultStatus {
    Created,
    Active,
    Claimable,
    Empty,
    Disabled,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VaultStatus::Created => "CREATED",
            VaultStatus::Active => "ACTIVE",
            VaultStatus::Claimable => "CLAIMABLE",
            VaultStatus::Empty => "EMPTY",
            VaultStatus::Disabled => "DISABLED",
        };
        f.write_str(s)
    }
}

/// Derives the status of `storage` given live `balances` at `now`.
pub fn compute_status(
    storage: &VaultStorage,
    balances: &BTreeMap<Asset, Amount>,
    now: DateTime<Utc>,
) -> VaultStatus {
    if storage.beneficiaries.is_empty() {
        return VaultStatus::Created;
    }
    let has_funds = balances.values().any(|b| !b.is_zero());
    if !has_funds || storage.all_claimed() {
        return VaultStatus::Empty;
    }
    if is_past(storage.config.unlock_time(), now) {
        return VaultStatus::Claimable;
    }
    if storage.live_current_delegations().next().is_none() {
        return VaultStatus::Disabled;
    }
    VaultStatus::Active
}

// ---------------------------------------------------------------------------
// VaultState
// ---------------------------------------------------------------------------

/// Per-asset balance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub asset: Asset,
    pub balance: Amount,
    /// Allocations not yet claimed.
    pub outstanding: Amount,
    /// Balance not covered by outstanding allocations.
    pub unallocated: Amount,
}

/// A beneficiary as shown in a vault snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryState {
    pub address: Address,
    pub name: String,
    pub allocation: Allocation,
    /// Display only. Share of what the vault held for this asset at setup.
    pub percentage: f64,
    pub claimed: bool,
    pub claim_tx: Option<Hash32>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub delegation_hash: Option<Hash32>,
    pub delegation_live: bool,
}

/// Everything a client needs to render a vault, computed at `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultState {
    pub address: Address,
    pub owner: Address,
    pub status: VaultStatus,
    pub period: CheckInPeriod,
    pub last_check_in: DateTime<Utc>,
    pub next_deadline: DateTime<Utc>,
    pub time_remaining: TimeRemaining,
    /// When current delegations become claimable.
    pub unlock_at: DateTime<Utc>,
    /// Live native balance.
    pub total_value: Amount,
    pub assets: Vec<AssetSummary>,
    pub beneficiaries: Vec<BeneficiaryState>,
    pub epoch: u32,
    pub check_in_count: usize,
    /// Delegations from earlier epochs still live on-chain.
    pub pending_disables: usize,
    pub created_at: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
}

impl VaultState {
    pub fn build(
        storage: &VaultStorage,
        balances: &BTreeMap<Asset, Amount>,
        now: DateTime<Utc>,
    ) -> Self {
        let status = compute_status(storage, balances, now);

        // Claimed allocations already left the vault; add them back so a
        // beneficiary's percentage is stable across other people's claims.
        let claimed_by_asset = storage.allocated_by_asset(|b| b.claimed);
        let outstanding_by_asset = storage.allocated_by_asset(|b| !b.claimed);

        let beneficiaries = storage
            .beneficiaries
            .iter()
            .map(|b| {
                let asset = b.allocation.asset();
                let balance = balances.get(&asset).copied().unwrap_or(Amount::ZERO);
                let claimed = claimed_by_asset.get(&asset).copied().unwrap_or(Amount::ZERO);
                let basis = Amount::new(balance.value().saturating_add(claimed.value()));
                let delegation = storage.current_delegation(&b.address);
                BeneficiaryState {
                    address: b.address.clone(),
                    name: b.name.clone(),
                    allocation: b.allocation.clone(),
                    percentage: b.allocation.amount().percentage_of(basis),
                    claimed: b.claimed,
                    claim_tx: b.claim_tx,
                    claimed_at: b.claimed_at,
                    delegation_hash: delegation.map(|d| d.hash),
                    delegation_live: delegation.map(|d| d.is_live()).unwrap_or(false),
                }
            })
            .collect();

        let assets = balances
            .iter()
            .map(|(asset, balance)| {
                let outstanding = outstanding_by_asset
                    .get(asset)
                    .copied()
                    .unwrap_or(Amount::ZERO);
                AssetSummary {
                    asset: asset.clone(),
                    balance: *balance,
                    outstanding,
                    unallocated: balance.saturating_sub(outstanding),
                }
            })
            .collect();

        Self {
            address: storage.config.address.clone(),
            owner: storage.config.owner.clone(),
            status,
            period: storage.config.period,
            last_check_in: storage.config.last_check_in,
            next_deadline: storage.config.next_deadline,
            time_remaining: remaining(storage.config.next_deadline, now),
            unlock_at: storage.config.unlock_time(),
            total_value: balances.get(&Asset::Native).copied().unwrap_or(Amount::ZERO),
            assets,
            beneficiaries,
            epoch: storage.config.epoch,
            check_in_count: storage.check_ins.len(),
            pending_disables: storage.stale_live_delegations().count(),
            created_at: storage.config.created_at,
            as_of: now,
        }
    }

    pub fn claimed_count(&self) -> usize {
        self.beneficiaries.iter().filter(|b| b.claimed).count()
    }

    pub fn owner_dashboard(&self) -> OwnerDashboard {
        let native = self.assets.iter().find(|a| a.asset.is_native());
        OwnerDashboard {
            address: self.address.clone(),
            status: self.status,
            time_remaining: self.time_remaining.clone(),
            next_deadline: self.next_deadline,
            last_check_in: self.last_check_in,
            total_value: self.total_value,
            allocated: native.map(|a| a.outstanding).unwrap_or(Amount::ZERO),
            unallocated: native.map(|a| a.unallocated).unwrap_or(self.total_value),
            beneficiary_count: self.beneficiaries.len(),
            claimed_count: self.claimed_count(),
            check_in_count: self.check_in_count,
            pending_disables: self.pending_disables,
        }
    }

    /// What `address` sees when it looks at this vault. Non-beneficiaries
    /// get a view with `eligible == false`.
    pub fn beneficiary_view(&self, address: &Address) -> BeneficiaryView {
        let me = self.beneficiaries.iter().find(|b| &b.address == address);
        let eligible = me.is_some();
        let claimed = me.map(|b| b.claimed).unwrap_or(false);
        let live = me.map(|b| b.delegation_live).unwrap_or(false);
        BeneficiaryView {
            vault: self.address.clone(),
            address: address.clone(),
            eligible,
            name: me.map(|b| b.name.clone()),
            allocation: me.map(|b| b.allocation.clone()),
            percentage: me.map(|b| b.percentage).unwrap_or(0.0),
            claimed,
            claim_tx: me.and_then(|b| b.claim_tx),
            claimable_now: eligible
                && !claimed
                && live
                && self.status == VaultStatus::Claimable,
            seconds_until_claimable: remaining(self.unlock_at, self.as_of).seconds_remaining,
            vault_status: self.status,
        }
    }
}

/// Owner-facing summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerDashboard {
    pub address: Address,
    pub status: VaultStatus,
    pub time_remaining: TimeRemaining,
    pub next_deadline: DateTime<Utc>,
    pub last_check_in: DateTime<Utc>,
    pub total_value: Amount,
    /// Outstanding native allocations.
    pub allocated: Amount,
    pub unallocated: Amount,
    pub beneficiary_count: usize,
    pub claimed_count: usize,
    pub check_in_count: usize,
    pub pending_disables: usize,
}

/// Beneficiary-facing summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryView {
    pub vault: Address,
    pub address: Address,
    pub eligible: bool,
    pub name: Option<String>,
    pub allocation: Option<Allocation>,
    pub percentage: f64,
    pub claimed: bool,
    pub claim_tx: Option<Hash32>,
    pub claimable_now: bool,
    pub seconds_until_claimable: u64,
    pub vault_status: VaultStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AccountKey;
    use crate::delegation::Delegation;
    use crate::time::PeriodUnit;
    use crate::vault::model::{Beneficiary, StoredDelegation, VaultConfig};
    use chrono::TimeZone;

    const START: i64 = 1_700_000_000;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn native(amount: u128) -> BTreeMap<Asset, Amount> {
        BTreeMap::from([(Asset::Native, Amount::new(amount))])
    }

    fn vault_with(allocs: &[(&str, u128)]) -> VaultStorage {
        let mut s = VaultStorage::new(VaultConfig::new(
            Address::derive(b"vault"),
            Address::derive(b"owner"),
            0,
            CheckInPeriod::new(5, PeriodUnit::Minutes),
            t(START),
        ));
        let key = AccountKey::from_seed(&[3u8; 32]);
        for (tag, amount) in allocs {
            let addr = Address::derive(tag.as_bytes());
            s.beneficiaries
                .push(Beneficiary::new(addr.clone(), *tag, Allocation::native(*amount)));
            let signed = Delegation::new(s.config.address.clone(), addr.clone(), vec![], 0)
                .sign(&key);
            s.delegations.push(StoredDelegation::new(
                addr,
                0,
                signed,
                t(START),
                s.config.next_deadline,
            ));
        }
        s
    }

    #[test]
    fn no_beneficiaries_is_created() {
        let s = vault_with(&[]);
        assert_eq!(compute_status(&s, &native(0), t(START)), VaultStatus::Created);
        assert_eq!(compute_status(&s, &native(100), t(START)), VaultStatus::Created);
    }

    #[test]
    fn funded_before_deadline_is_active() {
        let s = vault_with(&[("a", 40), ("b", 30), ("c", 30)]);
        assert_eq!(compute_status(&s, &native(100), t(START + 10)), VaultStatus::Active);
    }

    #[test]
    fn after_deadline_is_claimable() {
        let s = vault_with(&[("a", 100)]);
        assert_eq!(
            compute_status(&s, &native(100), t(START + 300)),
            VaultStatus::Claimable
        );
    }

    #[test]
    fn zero_balance_is_empty() {
        let s = vault_with(&[("a", 100)]);
        assert_eq!(compute_status(&s, &native(0), t(START + 10)), VaultStatus::Empty);
    }

    #[test]
    fn all_claimed_is_empty_even_with_dust() {
        let mut s = vault_with(&[("a", 90)]);
        s.beneficiaries[0].mark_claimed(Hash32::of(b"tx"), t(START + 400));
        assert_eq!(compute_status(&s, &native(10), t(START + 400)), VaultStatus::Empty);
    }

    #[test]
    fn no_live_delegation_before_deadline_is_disabled() {
        let mut s = vault_with(&[("a", 100)]);
        s.delegations[0].mark_disabled(None);
        assert_eq!(
            compute_status(&s, &native(100), t(START + 10)),
            VaultStatus::Disabled
        );
    }

    #[test]
    fn snapshot_percentages_and_remaining() {
        let s = vault_with(&[("a", 40), ("b", 30), ("c", 30)]);
        let state = VaultState::build(&s, &native(100), t(START + 60));
        assert_eq!(state.status, VaultStatus::Active);
        assert_eq!(state.time_remaining.seconds_remaining, 240);
        let pct: Vec<_> = state.beneficiaries.iter().map(|b| b.percentage).collect();
        assert!((pct[0] - 40.0).abs() < 1e-9);
        assert!((pct[1] - 30.0).abs() < 1e-9);
        assert!((pct[2] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_stable_after_other_claims() {
        let mut s = vault_with(&[("a", 40), ("b", 60)]);
        s.beneficiaries[1].mark_claimed(Hash32::of(b"tx"), t(START + 400));
        let state = VaultState::build(&s, &native(40), t(START + 400));
        assert!((state.beneficiaries[0].percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn dashboard_totals() {
        let mut s = vault_with(&[("a", 40), ("b", 30)]);
        s.beneficiaries[0].mark_claimed(Hash32::of(b"tx"), t(START + 400));
        let state = VaultState::build(&s, &native(60), t(START + 400));
        let dash = state.owner_dashboard();
        assert_eq!(dash.allocated, Amount::new(30));
        assert_eq!(dash.unallocated, Amount::new(30));
        assert_eq!(dash.claimed_count, 1);
        assert_eq!(dash.beneficiary_count, 2);
        assert_eq!(dash.status, VaultStatus::Claimable);
    }

    #[test]
    fn beneficiary_view_eligibility() {
        let s = vault_with(&[("a", 100)]);
        let before = VaultState::build(&s, &native(100), t(START + 10));
        let view = before.beneficiary_view(&Address::derive(b"a"));
        assert!(view.eligible);
        assert!(!view.claimable_now);
        assert_eq!(view.seconds_until_claimable, 290);

        let after = VaultState::build(&s, &native(100), t(START + 301));
        assert!(after.beneficiary_view(&Address::derive(b"a")).claimable_now);

        let stranger = after.beneficiary_view(&Address::derive(b"zed"));
        assert!(!stranger.eligible);
        assert!(!stranger.claimable_now);
    }

    #[test]
    fn later_unlock_keeps_status_and_view_in_step() {
        let mut s = vault_with(&[("a", 100)]);
        s.config.unlock_at = t(START + 900);

        let past_deadline = VaultState::build(&s, &native(100), t(START + 301));
        assert_eq!(past_deadline.status, VaultStatus::Active);
        assert!(past_deadline.time_remaining.is_past);
        let view = past_deadline.beneficiary_view(&Address::derive(b"a"));
        assert!(!view.claimable_now);
        assert_eq!(view.seconds_until_claimable, 599);

        let unlocked = VaultState::build(&s, &native(100), t(START + 900));
        assert_eq!(unlocked.status, VaultStatus::Claimable);
        let view = unlocked.beneficiary_view(&Address::derive(b"a"));
        assert!(view.claimable_now);
        assert_eq!(view.seconds_until_claimable, 0);
    }

    #[test]
    fn redeemed_delegation_is_not_shown_live() {
        let mut s = vault_with(&[("a", 60), ("b", 40)]);
        s.beneficiaries[0].mark_claimed(Hash32::of(b"tx"), t(START + 400));
        s.delegations[0].mark_redeemed();
        let state = VaultState::build(&s, &native(40), t(START + 400));
        assert!(!state.beneficiaries[0].delegation_live);
        assert!(state.beneficiaries[1].delegation_live);
        assert_eq!(state.status, VaultStatus::Claimable);
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&VaultStatus::Claimable).unwrap(),
            "\"CLAIMABLE\""
        );
    }
}
