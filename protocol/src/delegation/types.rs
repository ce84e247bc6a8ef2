//! Delegation payloads, signatures, and executions.

use serde::{Deserialize, Serialize};

use super::caveat::Caveat;
use crate::crypto::{AccountKey, CanonicalHasher, Hash32, PublicKey, Signature};
use crate::primitives::{Address, Amount, Asset};

/// Authority marker for a root delegation (one not derived from another).
pub const ROOT_AUTHORITY: Hash32 = Hash32([0xff; 32]);

/// An unsigned delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// The account allowed to redeem.
    pub delegate: Address,
    /// The account whose funds move.
    pub delegator: Address,
    pub authority: Hash32,
    pub caveats: Vec<Caveat>,
    /// Distinguishes otherwise identical delegations across epochs.
    pub salt: u64,
}

impl Delegation {
    pub fn new(delegator: Address, delegate: Address, caveats: Vec<Caveat>, salt: u64) -> Self {
        Self {
            delegate,
            delegator,
            authority: ROOT_AUTHORITY,
            caveats,
            salt,
        }
    }

    /// Content hash. Identifies the delegation in the disabled registry and
    /// is the message that gets signed.
    pub fn hash(&self) -> Hash32 {
        let mut h = CanonicalHasher::new("lastwill/delegation/v1");
        h.bytes(self.delegate.as_str().as_bytes())
            .bytes(self.delegator.as_str().as_bytes())
            .bytes(self.authority.as_bytes())
            .u32(self.caveats.len() as u32);
        for caveat in &self.caveats {
            match caveat {
                Caveat::Timestamp { after, before } => {
                    h.tag(0).i64(*after).i64(*before);
                }
                Caveat::LimitedCalls { limit } => {
                    h.tag(1).u32(*limit);
                }
                Caveat::NativeTransferAmount { max } => {
                    h.tag(2).u128(max.value());
                }
                Caveat::TokenTransferAmount { token, max } => {
                    h.tag(3).bytes(token.as_str().as_bytes()).u128(max.value());
                }
            }
        }
        h.u64(self.salt);
        h.finish()
    }

    /// Signs with `key`. Whether `key` is entitled to sign for the delegator
    /// is checked at redemption, not here.
    pub fn sign(self, key: &AccountKey) -> SignedDelegation {
        let signature = key.sign(self.hash().as_bytes());
        SignedDelegation {
            delegation: self,
            signer: key.public_key(),
            signature,
        }
    }
}

/// A delegation plus the signature that authorizes it. Opaque to the engine
/// beyond its hash and delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDelegation {
    pub delegation: Delegation,
    pub signer: PublicKey,
    pub signature: Signature,
}

impl SignedDelegation {
    pub fn hash(&self) -> Hash32 {
        self.delegation.hash()
    }

    pub fn verify_signature(&self) -> bool {
        self.signer
            .verify(self.delegation.hash().as_bytes(), &self.signature)
    }
}

/// The action a redeemer asks the delegator account to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Execution {
    NativeTransfer {
        to: Address,
        amount: Amount,
    },
    TokenTransfer {
        token: Address,
        to: Address,
        amount: Amount,
    },
}

impl Execution {
    /// Transfer `amount` of `asset` to `to`. Native and token paths are
    /// mutually exclusive.
    pub fn transfer(asset: &Asset, to: Address, amount: Amount) -> Self {
        match asset {
            Asset::Native => Execution::NativeTransfer { to, amount },
            Asset::Token { contract } => Execution::TokenTransfer {
                token: contract.clone(),
                to,
                amount,
            },
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Execution::NativeTransfer { amount, .. } | Execution::TokenTransfer { amount, .. } => {
                *amount
            }
        }
    }

    pub fn asset(&self) -> Asset {
        match self {
            Execution::NativeTransfer { .. } => Asset::Native,
            Execution::TokenTransfer { token, .. } => Asset::Token {
                contract: token.clone(),
            },
        }
    }

    pub fn recipient(&self) -> &Address {
        match self {
            Execution::NativeTransfer { to, .. } | Execution::TokenTransfer { to, .. } => to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegation::caveat::Caveat;

    fn sample(salt: u64) -> Delegation {
        Delegation::new(
            Address::derive(b"vault"),
            Address::derive(b"heir"),
            vec![Caveat::LimitedCalls { limit: 1 }],
            salt,
        )
    }

    #[test]
    fn signed_delegation_verifies() {
        let key = AccountKey::generate();
        let signed = sample(1).sign(&key);
        assert!(signed.verify_signature());
        assert_eq!(signed.hash(), sample(1).hash());
    }

    #[test]
    fn tampering_breaks_signature() {
        let key = AccountKey::generate();
        let mut signed = sample(1).sign(&key);
        signed.delegation.caveats.clear();
        assert!(!signed.verify_signature());
    }

    #[test]
    fn salt_changes_hash() {
        assert_ne!(sample(1).hash(), sample(2).hash());
    }

    #[test]
    fn every_field_feeds_the_hash() {
        let base = sample(1);
        let h = base.hash();
        assert_ne!(h, Hash32([0u8; 32]));

        let mut swapped = base.clone();
        std::mem::swap(&mut swapped.delegate, &mut swapped.delegator);
        assert_ne!(swapped.hash(), h);

        let mut capped = base.clone();
        capped.caveats = vec![Caveat::LimitedCalls { limit: 2 }];
        assert_ne!(capped.hash(), h);

        let mut timed = base.clone();
        timed.caveats.push(Caveat::Timestamp { after: 10, before: 0 });
        assert_ne!(timed.hash(), h);

        let mut native = base.clone();
        native.caveats = vec![Caveat::NativeTransferAmount { max: Amount::new(5) }];
        let mut token = base;
        token.caveats = vec![Caveat::TokenTransferAmount {
            token: Address::derive(b"token"),
            max: Amount::new(5),
        }];
        assert_ne!(native.hash(), token.hash());
    }

    #[test]
    fn execution_follows_asset_kind() {
        let to = Address::derive(b"heir");
        let token = Address::derive(b"token");
        let native = Execution::transfer(&Asset::Native, to.clone(), Amount::new(3));
        assert!(matches!(native, Execution::NativeTransfer { .. }));

        let tok = Execution::transfer(
            &Asset::Token {
                contract: token.clone(),
            },
            to.clone(),
            Amount::new(3),
        );
        assert_eq!(tok.asset(), Asset::Token { contract: token });
        assert_eq!(tok.recipient(), &to);
        assert_eq!(tok.amount(), Amount::new(3));
    }
}
