//! # Cryptographic Primitives
//!
//! Thin, typed wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for account keys and delegation signatures.
//! - **SHA-256** (`sha2`) for address derivation and delegation hashes.
//!
//! Nothing in here is novel. If it looks clever, it's a bug.

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_array, CanonicalHasher, Hash32};
pub use keys::{AccountKey, KeyError, PublicKey, Signature};
