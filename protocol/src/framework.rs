//! # Delegation Framework Capability
//!
//! The smart-account / delegation toolkit and the chain behind it are an
//! external collaborator. The engine talks to them only through
//! [`DelegationFramework`], injected at construction time, so the same
//! lifecycle code runs against the devnet ledger in `lastwill-contracts`
//! or any other backend.
//!
//! Every state-changing call blocks until its receipt is observed. There is
//! no timeout: a stalled backend stalls the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{AccountKey, Hash32};
use crate::delegation::{Delegation, Execution, SignedDelegation};
use crate::primitives::{Address, Amount, Asset};

/// Errors surfaced by a framework backend.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// The transaction was submitted and reverted, or was refused outright.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The caller's key is not allowed to act for the target account.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The account or contract does not exist.
    #[error("unknown account: {0}")]
    UnknownAccount(Address),

    /// The sender cannot cover the transfer plus gas.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Transport-level failure talking to the backend.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: Hash32,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Result of [`DelegationFramework::deploy_account`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub address: Address,
    /// `None` when the account already had code and nothing was sent.
    pub receipt: Option<TxReceipt>,
}

/// Operations the vault engine consumes from the delegation toolkit and
/// the chain RPC.
#[async_trait]
pub trait DelegationFramework: Send + Sync {
    /// Address the smart account for `(owner, salt)` will have once deployed.
    fn counterfactual_address(&self, owner: &Address, salt: u64) -> Address;

    /// Whether code exists at `address`.
    async fn is_deployed(&self, address: &Address) -> Result<bool, FrameworkError>;

    /// Deploys the smart account for `owner_key` with `salt`. Idempotent:
    /// an existing deployment is returned without a receipt.
    async fn deploy_account(
        &self,
        owner_key: &AccountKey,
        salt: u64,
    ) -> Result<Deployment, FrameworkError>;

    /// Plain native transfer from the key's own account.
    async fn transfer_native(
        &self,
        from: &AccountKey,
        to: &Address,
        amount: Amount,
    ) -> Result<TxReceipt, FrameworkError>;

    async fn balance_of(&self, address: &Address, asset: &Asset)
        -> Result<Amount, FrameworkError>;

    /// Signs `delegation` on behalf of the smart account owned by
    /// `authority`.
    async fn sign_delegation(
        &self,
        authority: &AccountKey,
        delegation: Delegation,
    ) -> Result<SignedDelegation, FrameworkError>;

    /// Marks a delegation as unusable on-chain. The account owner pays.
    async fn disable_delegation(
        &self,
        authority: &AccountKey,
        delegation: &SignedDelegation,
    ) -> Result<TxReceipt, FrameworkError>;

    async fn is_disabled(&self, delegation_hash: &Hash32) -> Result<bool, FrameworkError>;

    /// Redeems `delegation` to perform `execution`. The redeemer pays gas.
    async fn redeem_delegation(
        &self,
        redeemer: &AccountKey,
        delegation: &SignedDelegation,
        execution: Execution,
    ) -> Result<TxReceipt, FrameworkError>;
}
