// Copyright (c) 2026 LastWill Contributors. MIT License.
// See LICENSE for details.

//! # LastWill Protocol: Core Library
//!
//! A dead man's switch for on-chain assets. An owner funds a smart account,
//! names beneficiaries, and checks in on a schedule. Miss the deadline and
//! each beneficiary can redeem a pre-signed, time-locked delegation for
//! their share.
//!
//! ## Architecture
//!
//! - **primitives**: Addresses, amounts, assets.
//! - **crypto**: Ed25519 keys and SHA-256 hashing.
//! - **time**: Check-in periods, deadlines, and the injectable clock.
//! - **delegation**: Delegation payloads and the caveats that lock them.
//! - **framework**: The delegation toolkit as a capability trait.
//! - **validation**: Pure input checks with warnings.
//! - **storage**: Versioned vault records over memory, files, or sled.
//! - **vault**: The lifecycle engine and status reporting.
//! - **config**: Protocol constants and engine knobs.
//!
//! The chain never trusts this crate. Caveats signed into each delegation
//! are what actually stop an early or oversized claim; the checks here
//! exist so users get a readable error instead of a revert.

pub mod config;
pub mod crypto;
pub mod delegation;
pub mod framework;
pub mod primitives;
pub mod storage;
pub mod time;
pub mod validation;
pub mod vault;

pub use framework::{DelegationFramework, Deployment, FrameworkError, TxReceipt};
pub use primitives::{Address, Amount, Asset};
pub use vault::{VaultEngine, VaultError, VaultResult};
