//! # Vault Module
//!
//! The inheritance vault itself: persisted records, the lifecycle engine
//! that drives them, and the read-side status projections.
//!
//! ## Lifecycle
//!
//! ```text
//! create_vault ──▶ CREATED ──setup──▶ ACTIVE ──deadline──▶ CLAIMABLE ──claims──▶ EMPTY
//!                                       ▲  │
//!                                       └──┘ check_in
//! ```

pub mod engine;
pub mod error;
pub mod model;
pub mod status;

pub use engine::{CheckInOutcome, ClaimOutcome, CreatedVault, SetupOutcome, VaultEngine};
pub use error::{VaultError, VaultResult};
pub use model::{
    Allocation, Beneficiary, BeneficiaryInput, CheckInRecord, StoredDelegation, VaultConfig,
    VaultStorage,
};
pub use status::{
    compute_status, AssetSummary, BeneficiaryState, BeneficiaryView, OwnerDashboard, VaultState,
    VaultStatus,
};
