//! # Delegations
//!
//! A delegation lets a *delegate* execute a constrained action on behalf of
//! a *delegator* account. LastWill signs one per beneficiary per epoch:
//! the vault delegates "transfer at most X, once, after the deadline" to
//! each heir.
//!
//! This module only describes delegations. Enforcement happens in whatever
//! implements [`crate::framework::DelegationFramework`].
//!
//! ```text
//! Delegation ──sign(owner key)──▶ SignedDelegation ──hash──▶ Hash32
//!     │                                  │
//!     └── caveats: [Timestamp, LimitedCalls, TransferAmount]
//! ```

pub mod caveat;
pub mod types;

pub use caveat::{inheritance_caveats, Caveat, CaveatBuilder};
pub use types::{Delegation, Execution, SignedDelegation, ROOT_AUTHORITY};
