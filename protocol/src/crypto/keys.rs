//! # Key Management
//!
//! Ed25519 account keys. Owners sign delegations with theirs; beneficiaries
//! present theirs to redeem. An account's address is derived from its
//! public key, so holding the key *is* the authorization.
//!
//! Key bytes are never logged. `Debug` prints the address only.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::primitives::Address;

/// Errors that can occur during key operations.
///
/// Messages stay vague; details about key material do not
/// belong in error messages.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes")]
    InvalidPublicKey,
}

/// An Ed25519 account key.
///
/// Intentionally not `Serialize`. Export with [`AccountKey::to_hex`] when you
/// really mean to.
pub struct AccountKey {
    signing_key: SigningKey,
}

/// The public half of an [`AccountKey`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 32]);

/// A 64-byte Ed25519 signature, hex-encoded on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(Vec<u8>);

impl AccountKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic key from a 32-byte seed. Tests and devnet only.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a key from a hex-encoded 32-byte secret.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let body = hex_str.trim().strip_prefix("0x").unwrap_or(hex_str.trim());
        let bytes = hex::decode(body).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&arr))
    }

    /// Export the secret as hex. Handle with care.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

impl Clone for AccountKey {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({})", self.address())
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn address(&self) -> Address {
        Address::derive(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns `true` if `signature` is valid for `message` under this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.0.as_slice()) else {
            return false;
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

impl TryFrom<String> for PublicKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(&value).map_err(|e| format!("invalid public key hex: {e}"))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "public key must be 32 bytes".to_string())?;
        PublicKey::from_bytes(arr).map_err(|e| e.to_string())
    }
}

impl From<PublicKey> for String {
    fn from(pk: PublicKey) -> Self {
        pk.to_hex()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl TryFrom<String> for Signature {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        hex::decode(&value)
            .map(Signature)
            .map_err(|e| format!("invalid signature hex: {e}"))
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}…)", &hex[..hex.len().min(16)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let key = AccountKey::generate();
        let sig = key.sign(b"check in");
        assert!(key.public_key().verify(b"check in", &sig));
        assert!(!key.public_key().verify(b"tampered", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = AccountKey::generate();
        let b = AccountKey::generate();
        let sig = a.sign(b"msg");
        assert!(!b.public_key().verify(b"msg", &sig));
    }

    #[test]
    fn hex_roundtrip_preserves_address() {
        let key = AccountKey::generate();
        let restored = AccountKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.address(), restored.address());
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(AccountKey::from_hex("zz").is_err());
        assert!(AccountKey::from_hex("abcd").is_err());
    }

    #[test]
    fn address_matches_public_key() {
        let key = AccountKey::from_seed(&[7u8; 32]);
        assert_eq!(key.address(), key.public_key().address());
        assert!(key.address().as_str().starts_with("0x"));
    }

    #[test]
    fn debug_hides_secret() {
        let key = AccountKey::from_seed(&[9u8; 32]);
        let dbg = format!("{:?}", key);
        assert!(!dbg.contains(&key.to_hex()));
    }

    #[test]
    fn signature_serde_roundtrip() {
        let key = AccountKey::generate();
        let sig = key.sign(b"x");
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
