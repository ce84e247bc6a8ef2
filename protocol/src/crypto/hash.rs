//! # Hashing Utilities
//!
//! SHA-256 over raw bytes, plus [`CanonicalHasher`] for digesting structured
//! values field by field. Delegation hashes and devnet transaction hashes
//! are both [`Hash32`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Compute the SHA-256 hash of the input data.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut output = [0u8; 32];
    output.copy_from_slice(&Sha256::digest(data));
    output
}

/// Incremental SHA-256 over a fixed field layout.
///
/// Integers go in big-endian; byte strings carry a `u32` length prefix so
/// adjacent fields can never be re-split into a colliding encoding.
pub struct CanonicalHasher(Sha256);

impl CanonicalHasher {
    /// Starts a digest bound to `domain`, so equal field sequences of
    /// different record kinds never share a hash.
    pub fn new(domain: &str) -> Self {
        let mut h = Self(Sha256::new());
        h.bytes(domain.as_bytes());
        h
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.0.update((data.len() as u32).to_be_bytes());
        self.0.update(data);
        self
    }

    pub fn tag(&mut self, tag: u8) -> &mut Self {
        self.0.update([tag]);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub fn u128(&mut self, v: u128) -> &mut Self {
        self.0.update(v.to_be_bytes());
        self
    }

    pub fn finish(self) -> Hash32 {
        let mut output = [0u8; 32];
        output.copy_from_slice(&self.0.finalize());
        Hash32(output)
    }
}

/// A 32-byte digest rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn of(data: &[u8]) -> Self {
        Self(sha256_array(data))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash32 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| format!("invalid hash hex: {e}"))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "hash must be 32 bytes".to_string())?;
        Ok(Self(arr))
    }
}

impl TryFrom<String> for Hash32 {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Hash32> for String {
    fn from(h: Hash32) -> Self {
        h.to_hex()
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_hash_is_stable_and_length_prefixed() {
        let digest = |a: &[u8], b: &[u8]| {
            let mut h = CanonicalHasher::new("test");
            h.bytes(a).bytes(b).u32(7);
            h.finish()
        };
        assert_eq!(digest(b"ab", b"c"), digest(b"ab", b"c"));
        // Same concatenation, different split.
        assert_ne!(digest(b"ab", b"c"), digest(b"a", b"bc"));

        let mut other = CanonicalHasher::new("other");
        other.bytes(b"ab").bytes(b"c").u32(7);
        assert_ne!(other.finish(), digest(b"ab", b"c"));
    }

    #[test]
    fn hex_parse_roundtrip() {
        let h = Hash32::of(b"delegation");
        let parsed: Hash32 = h.to_hex().parse().unwrap();
        assert_eq!(parsed, h);
        assert!("0x1234".parse::<Hash32>().is_err());
    }
}
