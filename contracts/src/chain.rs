//! # Simulated Chain
//!
//! An in-process devnet implementing [`DelegationFramework`]. It plays the
//! roles of the smart-account factory, the delegation manager, the caveat
//! enforcers, and the RPC node, all behind one lock.
//!
//! ## Model
//!
//! - Externally owned accounts are addresses derived from Ed25519 public
//!   keys. Holding the key authorizes spending from the address.
//! - A smart account for `(owner, salt)` lives at a deterministic address
//!   that can receive funds before it is deployed, like a CREATE2 account.
//! - Every state-changing call mines one block and returns a receipt. Gas
//!   used is always the operation's fixed limit; the fee is
//!   `gas_used × gas_price` and is burned from the caller's account.
//! - Delegations are verified with the signer's public key and the signer
//!   must own the delegator account. Disabled hashes live in a registry.
//!
//! Time comes from the shared [`Clock`](lastwill_protocol::time::Clock), so
//! tests that advance a `ManualClock` move both the engine and the chain.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lastwill_protocol::config::{
    DEPLOY_GAS_LIMIT, DISABLE_GAS_LIMIT, GAS_PRICE_WEI, REDEEM_GAS_LIMIT, TRANSFER_GAS_LIMIT,
};
use lastwill_protocol::crypto::{AccountKey, Hash32};
use lastwill_protocol::delegation::{Delegation, Execution, SignedDelegation};
use lastwill_protocol::framework::{DelegationFramework, Deployment, FrameworkError, TxReceipt};
use lastwill_protocol::primitives::{Address, Amount, Asset};
use lastwill_protocol::time::SharedClock;

use crate::enforcers::{enforce_all, EnforcementContext};
use crate::faults::{Fault, FaultPlan};
use crate::ledger::{Ledger, LedgerError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Devnet parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Wei per unit of gas. Zero makes every transaction free.
    pub gas_price: u128,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 31_337,
            gas_price: GAS_PRICE_WEI,
        }
    }
}

/// A deployed smart account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAccount {
    pub address: Address,
    pub owner: Address,
    pub salt: u64,
    pub deployed_at: u64,
}

/// Per-delegation redemption history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedemptionStats {
    pub calls: u32,
    pub spent: Amount,
}

#[derive(Debug, Default)]
struct ChainState {
    ledger: Ledger,
    block_number: u64,
    accounts: HashMap<Address, SmartAccount>,
    disabled: HashSet<Hash32>,
    redemptions: HashMap<Hash32, RedemptionStats>,
    faults: FaultPlan,
    tx_count: u64,
}

impl ChainState {
    /// Mines a block for one transaction and charges its fee.
    fn mine(
        &mut self,
        payer: &Address,
        gas_limit: u64,
        gas_price: u128,
        kind: &str,
    ) -> Result<TxReceipt, FrameworkError> {
        let fee = gas_fee(gas_limit, gas_price);
        self.ledger
            .burn(payer, &Asset::Native, fee)
            .map_err(ledger_error)?;
        self.block_number += 1;
        self.tx_count += 1;
        let tx_hash = Hash32::of(
            format!("{kind}:{}:{}:{payer}", self.block_number, self.tx_count).as_bytes(),
        );
        Ok(TxReceipt {
            tx_hash,
            block_number: self.block_number,
            gas_used: gas_limit,
        })
    }

    /// The smart account that `delegation` draws from, checked against the
    /// key that signed it.
    fn authorized_account(
        &self,
        delegation: &Delegation,
        signer: &Address,
    ) -> Result<&SmartAccount, FrameworkError> {
        let account = self
            .accounts
            .get(&delegation.delegator)
            .ok_or_else(|| FrameworkError::UnknownAccount(delegation.delegator.clone()))?;
        if &account.owner != signer {
            return Err(FrameworkError::Unauthorized(format!(
                "{signer} does not own {}",
                account.address
            )));
        }
        Ok(account)
    }
}

fn gas_fee(gas_limit: u64, gas_price: u128) -> Amount {
    Amount::new(u128::from(gas_limit).saturating_mul(gas_price))
}

fn ledger_error(e: LedgerError) -> FrameworkError {
    FrameworkError::InsufficientFunds(e.to_string())
}

// ---------------------------------------------------------------------------
// SimulatedChain
// ---------------------------------------------------------------------------

pub struct SimulatedChain {
    config: ChainConfig,
    clock: SharedClock,
    state: RwLock<ChainState>,
}

impl SimulatedChain {
    pub fn new(config: ChainConfig, clock: SharedClock) -> Self {
        info!(chain_id = config.chain_id, gas_price = %config.gas_price, "devnet started");
        Self {
            config,
            clock,
            state: RwLock::new(ChainState::default()),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn block_number(&self) -> u64 {
        self.state.read().block_number
    }

    /// Mints native currency to `to`. Mines a block, charges nothing.
    pub fn faucet(&self, to: &Address, amount: Amount) -> Result<TxReceipt, FrameworkError> {
        let mut state = self.state.write();
        state
            .ledger
            .mint(to, &Asset::Native, amount)
            .map_err(|e| FrameworkError::Reverted(e.to_string()))?;
        let receipt = state.mine(to, 0, 0, "faucet")?;
        debug!(%to, %amount, "faucet drip");
        Ok(receipt)
    }

    /// Mints `amount` of the token at `contract` to `to`.
    pub fn mint_token(
        &self,
        contract: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TxReceipt, FrameworkError> {
        let asset = Asset::Token {
            contract: contract.clone(),
        };
        let mut state = self.state.write();
        state
            .ledger
            .mint(to, &asset, amount)
            .map_err(|e| FrameworkError::Reverted(e.to_string()))?;
        let receipt = state.mine(to, 0, 0, "mint")?;
        debug!(%contract, %to, %amount, "token minted");
        Ok(receipt)
    }

    /// Synchronous balance read, for tests and the devnet endpoints.
    pub fn balance(&self, address: &Address, asset: &Asset) -> Amount {
        self.state.read().ledger.balance(address, asset)
    }

    pub fn account(&self, address: &Address) -> Option<SmartAccount> {
        self.state.read().accounts.get(address).cloned()
    }

    pub fn redemption_stats(&self, delegation: &Hash32) -> RedemptionStats {
        self.state
            .read()
            .redemptions
            .get(delegation)
            .copied()
            .unwrap_or_default()
    }

    /// Fails the next `times` calls of `fault`.
    pub fn inject(&self, fault: Fault, times: u32) {
        self.state.write().faults.arm(fault, times);
    }

    pub fn clear_faults(&self) {
        self.state.write().faults.clear();
    }

    fn fee(&self, gas_limit: u64) -> Amount {
        gas_fee(gas_limit, self.config.gas_price)
    }
}

#[async_trait]
impl DelegationFramework for SimulatedChain {
    fn counterfactual_address(&self, owner: &Address, salt: u64) -> Address {
        let mut preimage = b"lastwill-account:".to_vec();
        preimage.extend_from_slice(owner.as_str().as_bytes());
        preimage.extend_from_slice(&salt.to_be_bytes());
        Address::derive(&preimage)
    }

    async fn is_deployed(&self, address: &Address) -> Result<bool, FrameworkError> {
        Ok(self.state.read().accounts.contains_key(address))
    }

    async fn deploy_account(
        &self,
        owner_key: &AccountKey,
        salt: u64,
    ) -> Result<Deployment, FrameworkError> {
        let owner = owner_key.address();
        let address = self.counterfactual_address(&owner, salt);
        let mut state = self.state.write();
        if state.faults.trip(Fault::Deploy) {
            return Err(FrameworkError::Rpc("deployment dropped".into()));
        }
        if state.accounts.contains_key(&address) {
            return Ok(Deployment {
                address,
                receipt: None,
            });
        }

        let receipt = state.mine(&owner, DEPLOY_GAS_LIMIT, self.config.gas_price, "deploy")?;
        state.accounts.insert(
            address.clone(),
            SmartAccount {
                address: address.clone(),
                owner: owner.clone(),
                salt,
                deployed_at: receipt.block_number,
            },
        );
        info!(%address, %owner, block = receipt.block_number, "smart account deployed");
        Ok(Deployment {
            address,
            receipt: Some(receipt),
        })
    }

    async fn transfer_native(
        &self,
        from: &AccountKey,
        to: &Address,
        amount: Amount,
    ) -> Result<TxReceipt, FrameworkError> {
        let sender = from.address();
        let mut state = self.state.write();
        if state.faults.trip(Fault::Transfer) {
            return Err(FrameworkError::Rpc("transfer dropped".into()));
        }

        let needed = amount
            .checked_add(self.fee(TRANSFER_GAS_LIMIT))
            .map_err(|e| FrameworkError::InsufficientFunds(e.to_string()))?;
        let balance = state.ledger.balance(&sender, &Asset::Native);
        if balance < needed {
            return Err(FrameworkError::InsufficientFunds(format!(
                "{sender} has {balance}, needs {needed}"
            )));
        }

        let receipt = state.mine(&sender, TRANSFER_GAS_LIMIT, self.config.gas_price, "transfer")?;
        state
            .ledger
            .transfer(&sender, to, &Asset::Native, amount)
            .map_err(ledger_error)?;
        debug!(from = %sender, %to, %amount, "native transfer");
        Ok(receipt)
    }

    async fn balance_of(&self, address: &Address, asset: &Asset) -> Result<Amount, FrameworkError> {
        let mut state = self.state.write();
        if state.faults.trip(Fault::BalanceQuery) {
            return Err(FrameworkError::Rpc("balance query timed out".into()));
        }
        Ok(state.ledger.balance(address, asset))
    }

    async fn sign_delegation(
        &self,
        authority: &AccountKey,
        delegation: Delegation,
    ) -> Result<SignedDelegation, FrameworkError> {
        let mut state = self.state.write();
        if state.faults.trip(Fault::Sign) {
            return Err(FrameworkError::Rpc("signer unavailable".into()));
        }
        state.authorized_account(&delegation, &authority.address())?;
        Ok(delegation.sign(authority))
    }

    async fn disable_delegation(
        &self,
        authority: &AccountKey,
        delegation: &SignedDelegation,
    ) -> Result<TxReceipt, FrameworkError> {
        let caller = authority.address();
        let hash = delegation.hash();
        let mut state = self.state.write();
        if state.faults.trip(Fault::Disable) {
            return Err(FrameworkError::Rpc("disable dropped".into()));
        }
        state.authorized_account(&delegation.delegation, &caller)?;
        if state.disabled.contains(&hash) {
            return Err(FrameworkError::Reverted(format!(
                "delegation {hash} already disabled"
            )));
        }

        let receipt = state.mine(&caller, DISABLE_GAS_LIMIT, self.config.gas_price, "disable")?;
        state.disabled.insert(hash);
        debug!(delegation = %hash, block = receipt.block_number, "delegation disabled");

        if state.faults.trip(Fault::DisableReceiptLost) {
            return Err(FrameworkError::Rpc("receipt not observed".into()));
        }
        Ok(receipt)
    }

    async fn is_disabled(&self, delegation_hash: &Hash32) -> Result<bool, FrameworkError> {
        Ok(self.state.read().disabled.contains(delegation_hash))
    }

    async fn redeem_delegation(
        &self,
        redeemer: &AccountKey,
        delegation: &SignedDelegation,
        execution: Execution,
    ) -> Result<TxReceipt, FrameworkError> {
        let caller = redeemer.address();
        let hash = delegation.hash();
        let now = self.clock.now();
        let mut state = self.state.write();
        if state.faults.trip(Fault::Redeem) {
            return Err(FrameworkError::Rpc("redemption dropped".into()));
        }

        if !delegation.verify_signature() {
            return Err(FrameworkError::Reverted("invalid delegation signature".into()));
        }
        let vault = state
            .authorized_account(&delegation.delegation, &delegation.signer.address())?
            .address
            .clone();
        if delegation.delegation.delegate != caller {
            return Err(FrameworkError::Unauthorized(format!(
                "{caller} is not the delegate"
            )));
        }
        if state.disabled.contains(&hash) {
            return Err(FrameworkError::Reverted(format!(
                "delegation {hash} is disabled"
            )));
        }

        let stats = state.redemptions.get(&hash).copied().unwrap_or_default();
        let ctx = EnforcementContext {
            now,
            prior_calls: stats.calls,
            prior_spent: stats.spent,
            execution: &execution,
        };
        enforce_all(&delegation.delegation.caveats, &ctx)
            .map_err(|v| FrameworkError::Reverted(v.to_string()))?;

        // Both sides are checked before anything moves.
        let fee = self.fee(REDEEM_GAS_LIMIT);
        let gas_balance = state.ledger.balance(&caller, &Asset::Native);
        if gas_balance < fee {
            return Err(FrameworkError::InsufficientFunds(format!(
                "{caller} cannot pay {fee} for gas"
            )));
        }
        let asset = execution.asset();
        let amount = execution.amount();
        let vault_balance = state.ledger.balance(&vault, &asset);
        if vault_balance < amount {
            return Err(FrameworkError::Reverted(format!(
                "vault holds {vault_balance} of {asset}, execution moves {amount}"
            )));
        }

        let receipt = state.mine(&caller, REDEEM_GAS_LIMIT, self.config.gas_price, "redeem")?;
        state
            .ledger
            .transfer(&vault, execution.recipient(), &asset, amount)
            .map_err(ledger_error)?;
        let entry = state.redemptions.entry(hash).or_default();
        entry.calls += 1;
        entry.spent = Amount::new(entry.spent.value().saturating_add(amount.value()));

        info!(
            %vault,
            delegation = %hash,
            to = %execution.recipient(),
            %asset,
            %amount,
            block = receipt.block_number,
            "delegation redeemed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lastwill_protocol::delegation::inheritance_caveats;
    use lastwill_protocol::time::{Clock, ManualClock};
    use std::sync::Arc;

    const START: i64 = 1_700_000_000;

    fn chain() -> (SimulatedChain, ManualClock) {
        let clock = ManualClock::at_timestamp(START);
        let chain = SimulatedChain::new(
            ChainConfig {
                chain_id: 1,
                gas_price: 0,
            },
            Arc::new(clock.clone()),
        );
        (chain, clock)
    }

    async fn deployed(chain: &SimulatedChain, owner: &AccountKey) -> Address {
        chain.deploy_account(owner, 7).await.unwrap().address
    }

    fn native_delegation(vault: &Address, heir: &Address, unlock: DateTime<Utc>, cap: u128) -> Delegation {
        Delegation::new(
            vault.clone(),
            heir.clone(),
            inheritance_caveats(unlock, &Asset::Native, Amount::new(cap)),
            1,
        )
    }

    #[tokio::test]
    async fn deploy_is_deterministic_and_idempotent() {
        let (chain, _) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let expected = chain.counterfactual_address(&owner.address(), 7);

        let first = chain.deploy_account(&owner, 7).await.unwrap();
        assert_eq!(first.address, expected);
        assert!(first.receipt.is_some());
        assert!(chain.is_deployed(&expected).await.unwrap());

        let again = chain.deploy_account(&owner, 7).await.unwrap();
        assert!(again.receipt.is_none());
        assert_ne!(chain.counterfactual_address(&owner.address(), 8), expected);
    }

    #[tokio::test]
    async fn gas_is_charged_at_fixed_price() {
        let clock = ManualClock::at_timestamp(START);
        let chain = SimulatedChain::new(ChainConfig::default(), Arc::new(clock));
        let owner = AccountKey::from_seed(&[1u8; 32]);
        assert!(matches!(
            chain.deploy_account(&owner, 1).await,
            Err(FrameworkError::InsufficientFunds(_))
        ));

        let funds = Amount::new(10u128.pow(18));
        chain.faucet(&owner.address(), funds).unwrap();
        let receipt = chain.deploy_account(&owner, 1).await.unwrap().receipt.unwrap();
        assert_eq!(receipt.gas_used, DEPLOY_GAS_LIMIT);
        let fee = u128::from(DEPLOY_GAS_LIMIT) * GAS_PRICE_WEI;
        assert_eq!(
            chain.balance(&owner.address(), &Asset::Native),
            Amount::new(10u128.pow(18) - fee)
        );
    }

    #[tokio::test]
    async fn only_the_owner_can_sign_for_an_account() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let stranger = AccountKey::from_seed(&[2u8; 32]);
        let vault = deployed(&chain, &owner).await;
        let d = native_delegation(&vault, &stranger.address(), clock.now(), 1);

        assert!(matches!(
            chain.sign_delegation(&stranger, d.clone()).await,
            Err(FrameworkError::Unauthorized(_))
        ));
        assert!(chain.sign_delegation(&owner, d).await.is_ok());
    }

    #[tokio::test]
    async fn redeem_respects_time_lock_and_single_use() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let vault = deployed(&chain, &owner).await;
        chain.faucet(&vault, Amount::new(100)).unwrap();

        let unlock = clock.now() + Duration::seconds(300);
        let signed = chain
            .sign_delegation(&owner, native_delegation(&vault, &heir.address(), unlock, 40))
            .await
            .unwrap();
        let exec = Execution::transfer(&Asset::Native, heir.address(), Amount::new(40));

        let early = chain.redeem_delegation(&heir, &signed, exec.clone()).await;
        assert!(matches!(early, Err(FrameworkError::Reverted(_))));

        clock.advance_secs(300);
        chain.redeem_delegation(&heir, &signed, exec.clone()).await.unwrap();
        assert_eq!(chain.balance(&heir.address(), &Asset::Native), Amount::new(40));
        assert_eq!(chain.balance(&vault, &Asset::Native), Amount::new(60));

        let twice = chain.redeem_delegation(&heir, &signed, exec).await;
        assert!(matches!(twice, Err(FrameworkError::Reverted(_))));
        assert_eq!(chain.redemption_stats(&signed.hash()).calls, 1);
    }

    #[tokio::test]
    async fn only_the_delegate_can_redeem() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let thief = AccountKey::from_seed(&[4u8; 32]);
        let vault = deployed(&chain, &owner).await;
        chain.faucet(&vault, Amount::new(100)).unwrap();
        let signed = chain
            .sign_delegation(&owner, native_delegation(&vault, &heir.address(), clock.now(), 40))
            .await
            .unwrap();

        let exec = Execution::transfer(&Asset::Native, thief.address(), Amount::new(40));
        assert!(matches!(
            chain.redeem_delegation(&thief, &signed, exec).await,
            Err(FrameworkError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn disabled_delegation_cannot_be_redeemed() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let vault = deployed(&chain, &owner).await;
        chain.faucet(&vault, Amount::new(100)).unwrap();
        let signed = chain
            .sign_delegation(&owner, native_delegation(&vault, &heir.address(), clock.now(), 40))
            .await
            .unwrap();

        chain.disable_delegation(&owner, &signed).await.unwrap();
        assert!(chain.is_disabled(&signed.hash()).await.unwrap());
        assert!(matches!(
            chain.disable_delegation(&owner, &signed).await,
            Err(FrameworkError::Reverted(_))
        ));

        let exec = Execution::transfer(&Asset::Native, heir.address(), Amount::new(40));
        assert!(chain.redeem_delegation(&heir, &signed, exec).await.is_err());
        assert_eq!(chain.balance(&vault, &Asset::Native), Amount::new(100));
    }

    #[tokio::test]
    async fn tampered_delegation_is_rejected() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let vault = deployed(&chain, &owner).await;
        chain.faucet(&vault, Amount::new(100)).unwrap();
        let mut signed = chain
            .sign_delegation(&owner, native_delegation(&vault, &heir.address(), clock.now(), 40))
            .await
            .unwrap();
        signed.delegation.caveats =
            inheritance_caveats(clock.now(), &Asset::Native, Amount::new(100));

        let exec = Execution::transfer(&Asset::Native, heir.address(), Amount::new(100));
        assert!(matches!(
            chain.redeem_delegation(&heir, &signed, exec).await,
            Err(FrameworkError::Reverted(_))
        ));
    }

    #[tokio::test]
    async fn lost_disable_receipt_still_lands() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let vault = deployed(&chain, &owner).await;
        let signed = chain
            .sign_delegation(&owner, native_delegation(&vault, &heir.address(), clock.now(), 1))
            .await
            .unwrap();

        chain.inject(Fault::DisableReceiptLost, 1);
        assert!(matches!(
            chain.disable_delegation(&owner, &signed).await,
            Err(FrameworkError::Rpc(_))
        ));
        assert!(chain.is_disabled(&signed.hash()).await.unwrap());
    }

    #[tokio::test]
    async fn token_redemption_moves_tokens_only() {
        let (chain, clock) = chain();
        let owner = AccountKey::from_seed(&[1u8; 32]);
        let heir = AccountKey::from_seed(&[3u8; 32]);
        let usdc = Address::derive(b"usdc");
        let token = Asset::Token {
            contract: usdc.clone(),
        };
        let vault = deployed(&chain, &owner).await;
        chain.mint_token(&usdc, &vault, Amount::new(500)).unwrap();

        let d = Delegation::new(
            vault.clone(),
            heir.address(),
            inheritance_caveats(clock.now(), &token, Amount::new(500)),
            9,
        );
        let signed = chain.sign_delegation(&owner, d).await.unwrap();

        let native = Execution::transfer(&Asset::Native, heir.address(), Amount::new(1));
        assert!(chain.redeem_delegation(&heir, &signed, native).await.is_err());

        let exec = Execution::transfer(&token, heir.address(), Amount::new(500));
        chain.redeem_delegation(&heir, &signed, exec).await.unwrap();
        assert_eq!(chain.balance(&heir.address(), &token), Amount::new(500));
        assert_eq!(chain.balance(&vault, &token), Amount::ZERO);
    }
}
