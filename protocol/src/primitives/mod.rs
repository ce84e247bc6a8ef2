//! # Primitive Types
//!
//! The value types every other module leans on:
//!
//! - [`Address`]: a 20-byte account identifier rendered as `0x` + 40 hex
//!   characters. Comparison is case-insensitive; we store lower-case.
//! - [`Amount`]: an unsigned 128-bit quantity in an asset's smallest unit.
//!   Serialized as a decimal string so JSON consumers never round it
//!   through a float.
//! - [`Asset`]: native currency or a token contract.

pub mod address;
pub mod amount;
pub mod asset;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError};
pub use asset::Asset;
