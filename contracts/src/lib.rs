//! # LastWill Devnet Contracts
//!
//! An in-process stand-in for the on-chain half of LastWill. It implements
//! [`DelegationFramework`](lastwill_protocol::framework::DelegationFramework)
//! so the vault engine can run end to end without a node:
//!
//! - **Ledger**: native and token balances with checked arithmetic.
//! - **Enforcers**: timestamp, call-limit, and transfer-amount caveats,
//!   evaluated in order before every redemption.
//! - **Chain**: smart-account deployment, delegation signing, the
//!   disabled-delegation registry, and redemption with fixed-price gas.
//! - **Faults**: failure injection so tests can drop RPC calls on demand.
//!
//! ## Design Principles
//!
//! 1. Every balance change goes through `checked_add` / `checked_sub`.
//! 2. A rejected transaction changes nothing.
//! 3. Signatures are verified on every privileged operation.
//! 4. Time is read from the injected clock, never from the system.

pub mod chain;
pub mod enforcers;
pub mod faults;
pub mod ledger;

pub use chain::{ChainConfig, RedemptionStats, SimulatedChain, SmartAccount};
pub use enforcers::{enforce, enforce_all, CaveatViolation, EnforcementContext};
pub use faults::{Fault, FaultPlan};
pub use ledger::{Ledger, LedgerError};
