//! # Balance Ledger
//!
//! Per-asset, per-account balances for the devnet. Native currency and
//! every token share the same table, keyed by [`Asset`].
//!
//! Supply is tracked alongside balances and every mutation is checked, so
//! a transfer either moves the full amount or changes nothing.

use std::collections::HashMap;

use thiserror::Error;

use lastwill_protocol::primitives::{Address, Amount, Asset};

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient {asset} balance on {account}: has {balance}, needs {requested}")]
    InsufficientBalance {
        account: Address,
        asset: Asset,
        balance: Amount,
        requested: Amount,
    },

    #[error("{asset} supply overflow crediting {account}")]
    SupplyOverflow { account: Address, asset: Asset },
}

/// Balances and supply for every asset on the devnet.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balances: HashMap<Asset, HashMap<Address, Amount>>,
    supply: HashMap<Asset, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &Address, asset: &Asset) -> Amount {
        self.balances
            .get(asset)
            .and_then(|m| m.get(account))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_supply(&self, asset: &Asset) -> Amount {
        self.supply.get(asset).copied().unwrap_or(Amount::ZERO)
    }

    /// Creates `amount` out of thin air. Faucet and token issuance only.
    pub fn mint(&mut self, to: &Address, asset: &Asset, amount: Amount) -> Result<(), LedgerError> {
        let overflow = || LedgerError::SupplyOverflow {
            account: to.clone(),
            asset: asset.clone(),
        };
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .map_err(|_| overflow())?;
        let balance = self
            .balance(to, asset)
            .checked_add(amount)
            .map_err(|_| overflow())?;

        self.supply.insert(asset.clone(), supply);
        self.set(to, asset, balance);
        Ok(())
    }

    /// Removes `amount` from circulation. Used for gas fees.
    pub fn burn(&mut self, from: &Address, asset: &Asset, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.debit_checked(from, asset, amount)?;
        self.set(from, asset, balance);
        let supply = self.total_supply(asset).saturating_sub(amount);
        self.supply.insert(asset.clone(), supply);
        Ok(())
    }

    /// Moves `amount` between accounts. All or nothing.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        asset: &Asset,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if from == to {
            self.debit_checked(from, asset, amount)?;
            return Ok(());
        }
        let from_balance = self.debit_checked(from, asset, amount)?;
        let to_balance = self
            .balance(to, asset)
            .checked_add(amount)
            .map_err(|_| LedgerError::SupplyOverflow {
                account: to.clone(),
                asset: asset.clone(),
            })?;
        self.set(from, asset, from_balance);
        self.set(to, asset, to_balance);
        Ok(())
    }

    /// Balance after removing `amount`, without applying it.
    fn debit_checked(
        &self,
        from: &Address,
        asset: &Asset,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let balance = self.balance(from, asset);
        balance
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBalance {
                account: from.clone(),
                asset: asset.clone(),
                balance,
                requested: amount,
            })
    }

    fn set(&mut self, account: &Address, asset: &Asset, amount: Amount) {
        self.balances
            .entry(asset.clone())
            .or_default()
            .insert(account.clone(), amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: &str) -> Address {
        Address::derive(tag.as_bytes())
    }

    #[test]
    fn mint_and_transfer() {
        let mut ledger = Ledger::new();
        ledger.mint(&addr("a"), &Asset::Native, Amount::new(100)).unwrap();
        ledger
            .transfer(&addr("a"), &addr("b"), &Asset::Native, Amount::new(40))
            .unwrap();
        assert_eq!(ledger.balance(&addr("a"), &Asset::Native), Amount::new(60));
        assert_eq!(ledger.balance(&addr("b"), &Asset::Native), Amount::new(40));
        assert_eq!(ledger.total_supply(&Asset::Native), Amount::new(100));
    }

    #[test]
    fn overdraft_changes_nothing() {
        let mut ledger = Ledger::new();
        ledger.mint(&addr("a"), &Asset::Native, Amount::new(10)).unwrap();
        let err = ledger
            .transfer(&addr("a"), &addr("b"), &Asset::Native, Amount::new(11))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance(&addr("a"), &Asset::Native), Amount::new(10));
        assert_eq!(ledger.balance(&addr("b"), &Asset::Native), Amount::ZERO);
    }

    #[test]
    fn assets_are_separate() {
        let token = Asset::Token {
            contract: addr("usdc"),
        };
        let mut ledger = Ledger::new();
        ledger.mint(&addr("a"), &token, Amount::new(5)).unwrap();
        assert_eq!(ledger.balance(&addr("a"), &Asset::Native), Amount::ZERO);
        assert!(ledger
            .transfer(&addr("a"), &addr("b"), &Asset::Native, Amount::new(1))
            .is_err());
        assert!(ledger
            .transfer(&addr("a"), &addr("b"), &token, Amount::new(5))
            .is_ok());
    }

    #[test]
    fn burn_reduces_supply() {
        let mut ledger = Ledger::new();
        ledger.mint(&addr("a"), &Asset::Native, Amount::new(10)).unwrap();
        ledger.burn(&addr("a"), &Asset::Native, Amount::new(3)).unwrap();
        assert_eq!(ledger.total_supply(&Asset::Native), Amount::new(7));
        assert!(ledger.burn(&addr("a"), &Asset::Native, Amount::new(8)).is_err());
    }

    #[test]
    fn supply_overflow_rejected() {
        let mut ledger = Ledger::new();
        ledger
            .mint(&addr("a"), &Asset::Native, Amount::new(u128::MAX))
            .unwrap();
        assert!(matches!(
            ledger.mint(&addr("b"), &Asset::Native, Amount::new(1)),
            Err(LedgerError::SupplyOverflow { .. })
        ));
    }
}
