//! # Vault Lifecycle Engine
//!
//! Orchestrates the create → configure → check-in → claim lifecycle on top
//! of an injected [`DelegationFramework`] and a [`VaultStore`].
//!
//! Every operation is a single load → on-chain calls → save cycle. Nothing
//! is cached between calls and no lock spans the cycle; the store's version
//! check catches concurrent writers.
//!
//! ## Check-in
//!
//! Signed caveats cannot be edited, so pushing the deadline out means
//! retiring the current delegations and signing a fresh set:
//!
//! ```text
//! for each live delegation (any epoch):
//!     already disabled on-chain?  → record it, no tx
//!     else disable, up to N tries → record tx, or leave pending
//! deadline = now + period; epoch += 1
//! sign one delegation per unclaimed beneficiary
//! append CheckInRecord, save
//! ```
//!
//! A disable that keeps failing leaves its delegation redeemable once its
//! old deadline passes. It stays live in the record and is retried by
//! every later check-in until it goes through. Redeemed delegations have
//! used their one call and are skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{VaultError, VaultResult};
use super::model::{
    Beneficiary, BeneficiaryInput, CheckInRecord, StoredDelegation, VaultConfig, VaultStorage,
};
use super::status::VaultState;
use crate::config::{EngineConfig, CLAIM_PERSIST_ATTEMPTS};
use crate::crypto::{AccountKey, Hash32};
use crate::delegation::{inheritance_caveats, Delegation, Execution, SignedDelegation};
use crate::framework::{DelegationFramework, Deployment, FrameworkError, TxReceipt};
use crate::primitives::{Address, Amount, Asset};
use crate::storage::{StoreError, VaultStore};
use crate::time::{deadline_from, remaining, CheckInPeriod, SharedClock};
use crate::validation::{
    describe_period, validate_address, validate_beneficiaries, validate_period, validate_setup,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of [`VaultEngine::create_vault`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedVault {
    pub address: Address,
    pub owner: Address,
    pub salt: u64,
    pub next_deadline: DateTime<Utc>,
    pub deployment: Deployment,
    pub funding: Option<TxReceipt>,
    pub warnings: Vec<String>,
}

/// Result of a call that (re)signs delegations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupOutcome {
    pub vault: Address,
    pub epoch: u32,
    pub deadline: DateTime<Utc>,
    /// Hashes of the delegations signed by this call, in beneficiary order.
    pub delegations: Vec<Hash32>,
    /// Earlier delegations this call could not disable.
    pub pending_disables: Vec<Hash32>,
    pub warnings: Vec<String>,
}

/// Result of [`VaultEngine::check_in`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInOutcome {
    pub vault: Address,
    pub epoch: u32,
    pub record: CheckInRecord,
    pub pending_disables: Vec<Hash32>,
    pub warnings: Vec<String>,
}

/// Result of [`VaultEngine::claim`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimOutcome {
    pub vault: Address,
    pub beneficiary: Address,
    pub asset: Asset,
    pub amount: Amount,
    pub receipt: TxReceipt,
}

/// Tally from one pass over delegations that need disabling.
#[derive(Debug, Default)]
struct Retirement {
    disabled: u32,
    pending: Vec<Hash32>,
    last_tx: Option<Hash32>,
    gas_used: u64,
}

// ---------------------------------------------------------------------------
// VaultEngine
// ---------------------------------------------------------------------------

pub struct VaultEngine {
    framework: Arc<dyn DelegationFramework>,
    store: Arc<dyn VaultStore>,
    clock: SharedClock,
    config: EngineConfig,
}

impl VaultEngine {
    pub fn new(
        framework: Arc<dyn DelegationFramework>,
        store: Arc<dyn VaultStore>,
        clock: SharedClock,
        config: EngineConfig,
    ) -> Self {
        Self {
            framework,
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Creation & funding
    // -----------------------------------------------------------------------

    /// Deploys a smart account for `owner`, persists an empty vault, then
    /// optionally funds it.
    ///
    /// A funding failure returns [`VaultError::Funding`] with the vault
    /// already persisted. Nothing is rolled back; call
    /// [`fund_vault`](Self::fund_vault) to retry.
    pub async fn create_vault(
        &self,
        owner: &AccountKey,
        period: CheckInPeriod,
        initial_funding: Option<Amount>,
    ) -> VaultResult<CreatedVault> {
        let report = validate_period(period)?;
        for w in &report.warnings {
            warn!(warning = %w, "vault period");
        }

        let owner_addr = owner.address();
        let (salt, address) = self.fresh_vault_address(&owner_addr)?;

        let deployment = if self
            .framework
            .is_deployed(&address)
            .await
            .map_err(VaultError::Deployment)?
        {
            debug!(%address, "smart account already deployed");
            Deployment {
                address: address.clone(),
                receipt: None,
            }
        } else {
            self.framework
                .deploy_account(owner, salt)
                .await
                .map_err(VaultError::Deployment)?
        };

        let now = self.clock.now();
        let mut storage =
            VaultStorage::new(VaultConfig::new(address.clone(), owner_addr.clone(), salt, period, now));
        self.store.save(&address, &mut storage)?;
        info!(
            vault = %address,
            owner = %owner_addr,
            period = %describe_period(period),
            deadline = %storage.config.next_deadline,
            "vault created"
        );

        let mut created = CreatedVault {
            address: address.clone(),
            owner: owner_addr,
            salt,
            next_deadline: storage.config.next_deadline,
            deployment,
            funding: None,
            warnings: report.warnings,
        };

        if let Some(amount) = initial_funding.filter(|a| !a.is_zero()) {
            created.funding = Some(self.fund_vault(&address, owner, amount).await?);
        }

        Ok(created)
    }

    /// Sends `amount` of native currency from `funder` to the vault and
    /// refreshes the cached total.
    pub async fn fund_vault(
        &self,
        vault: &Address,
        funder: &AccountKey,
        amount: Amount,
    ) -> VaultResult<TxReceipt> {
        let mut storage = self.load(vault)?;
        let receipt = self
            .framework
            .transfer_native(funder, vault, amount)
            .await
            .map_err(|source| VaultError::Funding {
                vault: vault.clone(),
                source,
            })?;

        storage.config.total_value = self.native_balance_or(vault, storage.config.total_value).await;
        storage.last_updated = self.clock.now();
        self.store.save(vault, &mut storage)?;
        info!(%vault, %amount, tx = %receipt.tx_hash, "vault funded");
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Beneficiaries
    // -----------------------------------------------------------------------

    /// Replaces the whole beneficiary set and signs one delegation each,
    /// unlocking at `deadline` (the vault's current deadline if `None`).
    /// The unlock time is kept on the vault so later additions and status
    /// reads use the same one.
    ///
    /// Previous beneficiaries, including their claim history, are dropped.
    /// If the vault already had delegations the new set goes into a fresh
    /// epoch and the old live ones are disabled.
    pub async fn setup_beneficiaries(
        &self,
        vault: &Address,
        owner: &AccountKey,
        inputs: Vec<BeneficiaryInput>,
        deadline: Option<DateTime<Utc>>,
    ) -> VaultResult<SetupOutcome> {
        let mut storage = self.load(vault)?;
        authorize(&storage, owner)?;

        let balances = self.balances(vault, &assets_of(&inputs)).await?;
        let report = validate_setup(
            storage.config.period,
            &inputs,
            &balances,
            &excluded(&storage),
            self.config.max_beneficiaries,
        )?;

        let beneficiaries = into_beneficiaries(&inputs)?;
        let deadline = deadline.unwrap_or(storage.config.next_deadline);
        let epoch = if storage.delegations.is_empty() {
            storage.config.epoch
        } else {
            storage.config.epoch + 1
        };

        let now = self.clock.now();
        let signed = self
            .sign_delegations(vault, owner, &beneficiaries, epoch, deadline, now)
            .await?;

        let retirement = self.retire(&mut storage, owner, |_| true).await;

        let hashes = signed.iter().map(|d| d.hash).collect();
        storage.beneficiaries = beneficiaries;
        storage.delegations.extend(signed);
        storage.config.epoch = epoch;
        storage.config.unlock_at = deadline;
        storage.config.total_value = balances.get(&Asset::Native).copied().unwrap_or(Amount::ZERO);
        storage.last_updated = now;
        self.store.save(vault, &mut storage)?;

        info!(
            %vault,
            epoch,
            beneficiaries = storage.beneficiaries.len(),
            retired = retirement.disabled,
            pending = retirement.pending.len(),
            "beneficiaries configured"
        );

        Ok(SetupOutcome {
            vault: vault.clone(),
            epoch,
            deadline,
            delegations: hashes,
            pending_disables: retirement.pending,
            warnings: report.warnings,
        })
    }

    /// Adds one beneficiary to the current epoch without touching the
    /// others' delegations.
    pub async fn add_beneficiary(
        &self,
        vault: &Address,
        owner: &AccountKey,
        input: BeneficiaryInput,
    ) -> VaultResult<SetupOutcome> {
        let mut storage = self.load(vault)?;
        authorize(&storage, owner)?;

        let mut inputs: Vec<BeneficiaryInput> =
            storage.beneficiaries.iter().map(Beneficiary::to_input).collect();
        inputs.push(input);

        // Claimed allocations already left the vault; count them back in so
        // the set is checked against what the vault held at setup.
        let mut balances = self.balances(vault, &assets_of(&inputs)).await?;
        for (asset, claimed) in storage.allocated_by_asset(|b| b.claimed) {
            let entry = balances.entry(asset).or_insert(Amount::ZERO);
            *entry = Amount::new(entry.value().saturating_add(claimed.value()));
        }
        let report = validate_beneficiaries(
            &inputs,
            &balances,
            &excluded(&storage),
            self.config.max_beneficiaries,
        )?;

        let added = into_beneficiaries(&inputs[inputs.len() - 1..])?;
        let epoch = storage.config.epoch;
        let deadline = storage.config.unlock_time();
        let now = self.clock.now();
        let signed = self
            .sign_delegations(vault, owner, &added, epoch, deadline, now)
            .await?;

        let hashes = signed.iter().map(|d| d.hash).collect();
        storage.beneficiaries.extend(added);
        storage.delegations.extend(signed);
        storage.last_updated = now;
        self.store.save(vault, &mut storage)?;
        info!(%vault, epoch, beneficiaries = storage.beneficiaries.len(), "beneficiary added");

        Ok(SetupOutcome {
            vault: vault.clone(),
            epoch,
            deadline,
            delegations: hashes,
            pending_disables: Vec::new(),
            warnings: report.warnings,
        })
    }

    /// Disables every live delegation to `beneficiary`, then drops them from
    /// the set. Fails without changing anything if a disable cannot be
    /// confirmed, since the beneficiary could otherwise still claim.
    pub async fn remove_beneficiary(
        &self,
        vault: &Address,
        owner: &AccountKey,
        beneficiary: &Address,
    ) -> VaultResult<SetupOutcome> {
        let mut storage = self.load(vault)?;
        authorize(&storage, owner)?;

        let target = storage
            .beneficiary(beneficiary)
            .ok_or_else(|| VaultError::BeneficiaryNotFound {
                vault: vault.clone(),
                beneficiary: beneficiary.clone(),
            })?;
        if target.claimed {
            return Err(VaultError::AlreadyClaimed(beneficiary.clone()));
        }

        let targets: Vec<usize> = storage
            .delegations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_live() && &d.beneficiary == beneficiary)
            .map(|(i, _)| i)
            .collect();

        let mut disabled = Vec::with_capacity(targets.len());
        for i in &targets {
            let signed = storage.delegations[*i].signed.clone();
            let receipt = self
                .disable_with_retry(owner, &signed)
                .await
                .map_err(VaultError::Chain)?;
            disabled.push((*i, receipt.map(|r| r.tx_hash)));
        }

        for (i, tx) in disabled {
            storage.delegations[i].mark_disabled(tx);
        }
        storage.beneficiaries.retain(|b| &b.address != beneficiary);
        storage.last_updated = self.clock.now();
        self.store.save(vault, &mut storage)?;
        info!(%vault, %beneficiary, disabled = targets.len(), "beneficiary removed");

        Ok(SetupOutcome {
            vault: vault.clone(),
            epoch: storage.config.epoch,
            deadline: storage.config.unlock_time(),
            delegations: Vec::new(),
            pending_disables: Vec::new(),
            warnings: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Check-in
    // -----------------------------------------------------------------------

    /// Proves the owner is alive: retires every live delegation, moves the
    /// deadline to `now + period`, and re-signs for unclaimed beneficiaries.
    pub async fn check_in(
        &self,
        vault: &Address,
        owner: &AccountKey,
        new_period: Option<CheckInPeriod>,
    ) -> VaultResult<CheckInOutcome> {
        let mut storage = self.load(vault)?;
        authorize(&storage, owner)?;

        let warnings = match new_period {
            Some(p) => validate_period(p)?.warnings,
            None => Vec::new(),
        };

        if storage.live_delegations().next().is_none() {
            return Err(VaultError::NoActiveDelegations(vault.clone()));
        }

        let retirement = self.retire(&mut storage, owner, |_| true).await;

        let now = self.clock.now();
        let period = new_period.unwrap_or(storage.config.period);
        let deadline = deadline_from(period, now);
        let epoch = storage.config.epoch + 1;
        let unclaimed: Vec<Beneficiary> = storage
            .beneficiaries
            .iter()
            .filter(|b| !b.claimed)
            .cloned()
            .collect();

        let signed = match self
            .sign_delegations(vault, owner, &unclaimed, epoch, deadline, now)
            .await
        {
            Ok(signed) => signed,
            Err(e) => {
                // The disables already happened on-chain; keep that much.
                storage.last_updated = now;
                self.store.save(vault, &mut storage)?;
                return Err(e);
            }
        };

        storage.config.record_check_in(now, new_period);
        storage.config.epoch = epoch;
        storage.config.total_value = self.native_balance_or(vault, storage.config.total_value).await;

        let created_count = signed.len() as u32;
        storage.delegations.extend(signed);

        let record = CheckInRecord {
            timestamp: now,
            tx_hash: retirement.last_tx,
            new_deadline: storage.config.next_deadline,
            disabled_count: retirement.disabled,
            created_count,
            pending_disables: retirement.pending.len() as u32,
            gas_used: retirement.gas_used,
            cumulative_gas: storage.total_check_in_gas() + retirement.gas_used,
        };
        storage.check_ins.push(record.clone());
        storage.last_updated = now;
        self.store.save(vault, &mut storage)?;

        info!(
            %vault,
            epoch,
            deadline = %record.new_deadline,
            disabled = record.disabled_count,
            created = record.created_count,
            pending = record.pending_disables,
            "checked in"
        );

        Ok(CheckInOutcome {
            vault: vault.clone(),
            epoch,
            record,
            pending_disables: retirement.pending,
            warnings,
        })
    }

    // -----------------------------------------------------------------------
    // Claim
    // -----------------------------------------------------------------------

    /// Redeems the caller's current delegation. The beneficiary pays gas.
    pub async fn claim(
        &self,
        vault: &Address,
        beneficiary_key: &AccountKey,
    ) -> VaultResult<ClaimOutcome> {
        let storage = self.load(vault)?;
        let who = beneficiary_key.address();

        let beneficiary = storage
            .beneficiary(&who)
            .ok_or_else(|| VaultError::BeneficiaryNotFound {
                vault: vault.clone(),
                beneficiary: who.clone(),
            })?;
        if beneficiary.claimed {
            return Err(VaultError::AlreadyClaimed(who));
        }

        let delegation = match storage.current_delegation(&who) {
            Some(d) if d.is_live() => d,
            _ => return Err(VaultError::DelegationDisabled(who)),
        };

        let now = self.clock.now();
        let unlock = delegation.deadline.max(storage.config.unlock_time());
        let left = remaining(unlock, now);
        if !left.is_past {
            return Err(VaultError::TooEarly {
                seconds_remaining: left.seconds_remaining,
            });
        }

        let asset = beneficiary.allocation.asset();
        let amount = beneficiary.allocation.amount();
        let execution = Execution::transfer(&asset, who.clone(), amount);
        let receipt = self
            .framework
            .redeem_delegation(beneficiary_key, &delegation.signed, execution)
            .await
            .map_err(VaultError::Redemption)?;
        info!(%vault, beneficiary = %who, %asset, %amount, tx = %receipt.tx_hash, "claimed");

        let redeemed = delegation.hash;
        let total_value = self.native_balance_or(vault, storage.config.total_value).await;
        self.persist_claim(storage, &who, redeemed, receipt.tx_hash, now, total_value)?;

        Ok(ClaimOutcome {
            vault: vault.clone(),
            beneficiary: who,
            asset,
            amount,
            receipt,
        })
    }

    /// The funds already moved; a version conflict here means someone else
    /// saved in between, so reload and apply the claim mark again.
    fn persist_claim(
        &self,
        mut storage: VaultStorage,
        who: &Address,
        redeemed: Hash32,
        tx: Hash32,
        at: DateTime<Utc>,
        total_value: Amount,
    ) -> VaultResult<()> {
        let vault = storage.address().clone();
        let mut attempt = 1;
        loop {
            if let Some(b) = storage.beneficiary_mut(who) {
                b.mark_claimed(tx, at);
            }
            if let Some(d) = storage.delegation_mut(&redeemed) {
                d.mark_redeemed();
            }
            storage.config.total_value = total_value;
            storage.last_updated = at;
            match self.store.save(&vault, &mut storage) {
                Ok(()) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) if attempt < CLAIM_PERSIST_ATTEMPTS => {
                    warn!(%vault, beneficiary = %who, attempt, "claim save conflicted, reloading");
                    storage = self.load(&vault)?;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads & housekeeping
    // -----------------------------------------------------------------------

    /// Snapshot of the vault with live balances.
    pub async fn get_status(&self, vault: &Address) -> VaultResult<VaultState> {
        let storage = self.load(vault)?;
        let balances = self.balances(vault, &storage.tracked_assets()).await?;
        Ok(VaultState::build(&storage, &balances, self.clock.now()))
    }

    pub fn list_vaults(&self) -> VaultResult<Vec<Address>> {
        Ok(self.store.list()?)
    }

    /// The raw persisted record.
    pub fn record(&self, vault: &Address) -> VaultResult<VaultStorage> {
        self.load(vault)
    }

    /// Removes the record. On-chain state is untouched.
    pub fn delete_vault(&self, vault: &Address) -> VaultResult<()> {
        if !self.store.delete(vault)? {
            return Err(VaultError::VaultNotFound(vault.clone()));
        }
        info!(%vault, "vault record deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn load(&self, vault: &Address) -> VaultResult<VaultStorage> {
        self.store
            .load(vault)?
            .ok_or_else(|| VaultError::VaultNotFound(vault.clone()))
    }

    /// Picks a salt whose counterfactual address has no record yet.
    fn fresh_vault_address(&self, owner: &Address) -> VaultResult<(u64, Address)> {
        loop {
            let salt: u64 = rand::random();
            let address = self.framework.counterfactual_address(owner, salt);
            if self.store.load(&address)?.is_none() {
                return Ok((salt, address));
            }
            debug!(%address, "salt collides with an existing vault, drawing again");
        }
    }

    async fn balances(
        &self,
        vault: &Address,
        assets: &[Asset],
    ) -> VaultResult<BTreeMap<Asset, Amount>> {
        let mut out = BTreeMap::new();
        for asset in assets {
            let balance = self
                .framework
                .balance_of(vault, asset)
                .await
                .map_err(VaultError::Chain)?;
            out.insert(asset.clone(), balance);
        }
        Ok(out)
    }

    /// Native balance for the cached total. Keeps `fallback` when the query
    /// fails, since the caller's on-chain work already succeeded.
    async fn native_balance_or(&self, vault: &Address, fallback: Amount) -> Amount {
        match self.framework.balance_of(vault, &Asset::Native).await {
            Ok(b) => b,
            Err(e) => {
                warn!(%vault, error = %e, "balance refresh failed");
                fallback
            }
        }
    }

    async fn sign_delegations(
        &self,
        vault: &Address,
        owner: &AccountKey,
        beneficiaries: &[Beneficiary],
        epoch: u32,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> VaultResult<Vec<StoredDelegation>> {
        let mut out = Vec::with_capacity(beneficiaries.len());
        for b in beneficiaries {
            let caveats =
                inheritance_caveats(deadline, &b.allocation.asset(), b.allocation.amount());
            let delegation = Delegation::new(vault.clone(), b.address.clone(), caveats, rand::random());
            let signed = self
                .framework
                .sign_delegation(owner, delegation)
                .await
                .map_err(|source| VaultError::Signing {
                    beneficiary: b.address.clone(),
                    source,
                })?;
            debug!(%vault, beneficiary = %b.address, epoch, hash = %signed.hash(), "delegation signed");
            out.push(StoredDelegation::new(b.address.clone(), epoch, signed, now, deadline));
        }
        Ok(out)
    }

    /// Disables every live delegation matching `select`. Failures are
    /// logged and returned as pending; they never abort the caller.
    async fn retire<F>(
        &self,
        storage: &mut VaultStorage,
        owner: &AccountKey,
        select: F,
    ) -> Retirement
    where
        F: Fn(&StoredDelegation) -> bool,
    {
        let vault = storage.address().clone();
        let targets: Vec<usize> = storage
            .delegations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_live() && select(d))
            .map(|(i, _)| i)
            .collect();

        let mut out = Retirement::default();
        for i in targets {
            let signed = storage.delegations[i].signed.clone();
            let hash = storage.delegations[i].hash;
            match self.disable_with_retry(owner, &signed).await {
                Ok(Some(receipt)) => {
                    out.gas_used += receipt.gas_used;
                    out.last_tx = Some(receipt.tx_hash);
                    out.disabled += 1;
                    storage.delegations[i].mark_disabled(Some(receipt.tx_hash));
                }
                Ok(None) => {
                    out.disabled += 1;
                    storage.delegations[i].mark_disabled(None);
                }
                Err(e) => {
                    warn!(
                        %vault,
                        delegation = %hash,
                        epoch = storage.delegations[i].epoch,
                        error = %e,
                        "disable failed, leaving pending"
                    );
                    out.pending.push(hash);
                }
            }
        }
        out
    }

    /// `Ok(None)` when the delegation was already disabled on-chain.
    async fn disable_with_retry(
        &self,
        owner: &AccountKey,
        signed: &SignedDelegation,
    ) -> Result<Option<TxReceipt>, FrameworkError> {
        let hash = signed.hash();
        let attempts = self.config.disable_attempts.max(1);
        let mut last_err = FrameworkError::Rpc("no disable attempted".into());
        for attempt in 1..=attempts {
            match self.framework.is_disabled(&hash).await {
                Ok(true) => return Ok(None),
                Ok(false) => {}
                Err(e) => {
                    debug!(delegation = %hash, attempt, error = %e, "disabled-status query failed");
                    last_err = e;
                    continue;
                }
            }
            match self.framework.disable_delegation(owner, signed).await {
                Ok(receipt) => return Ok(Some(receipt)),
                Err(e) => {
                    debug!(delegation = %hash, attempt, error = %e, "disable attempt failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn authorize(storage: &VaultStorage, key: &AccountKey) -> VaultResult<()> {
    let presented = key.address();
    if presented != storage.config.owner {
        return Err(VaultError::Unauthorized {
            vault: storage.address().clone(),
            presented,
        });
    }
    Ok(())
}

/// Addresses that may never inherit from this vault.
fn excluded(storage: &VaultStorage) -> [Address; 2] {
    [storage.config.address.clone(), storage.config.owner.clone()]
}

/// Native plus every asset named by `inputs`.
fn assets_of(inputs: &[BeneficiaryInput]) -> Vec<Asset> {
    let mut assets = vec![Asset::Native];
    for input in inputs {
        let asset = input.allocation.asset();
        if !assets.contains(&asset) {
            assets.push(asset);
        }
    }
    assets
}

/// Already-validated inputs to records.
fn into_beneficiaries(inputs: &[BeneficiaryInput]) -> VaultResult<Vec<Beneficiary>> {
    inputs
        .iter()
        .map(|i| -> VaultResult<Beneficiary> {
            let address = validate_address(&i.address)?;
            Ok(Beneficiary::new(address, i.name.clone(), i.allocation.clone()))
        })
        .collect()
}
