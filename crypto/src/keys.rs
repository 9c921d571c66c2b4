//! Key management for PACTUM
//!
//! Handles key generation and party identity derivation.

use ed25519_dalek::{
    SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey, SECRET_KEY_LENGTH,
};
use pactum_core::{PactumError, PactumResult, Party, PartyId, PublicKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hashing::blake3_hash;

/// A keypair for signing and verification
#[derive(Clone)]
pub struct KeyPair {
    signing_key: Ed25519SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create keypair from seed bytes
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = Ed25519SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Create keypair from secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> PactumResult<Self> {
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(PactumError::InvalidPrivateKey);
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(bytes);
        Ok(Self::from_seed(&seed))
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        PublicKey::from_bytes(verifying_key.to_bytes())
    }

    /// Get the party id (hash of public key)
    pub fn party_id(&self) -> PartyId {
        party_id_from_public_key(&self.public_key())
    }

    /// Get the full ledger identity
    pub fn party(&self) -> Party {
        Party::new(self.party_id(), self.public_key())
    }

    /// Get the secret key bytes (BE CAREFUL with this!)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the internal signing key for signing operations
    pub(crate) fn signing_key(&self) -> &Ed25519SigningKey {
        &self.signing_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair({})", self.party_id())
    }
}

/// Derive a party id from a public key using BLAKE3
pub fn party_id_from_public_key(public_key: &PublicKey) -> PartyId {
    let hash = blake3_hash(public_key.as_bytes());
    PartyId::from_bytes(*hash.as_bytes())
}

/// Build a `Party` from a bare public key
pub fn party_from_public_key(public_key: &PublicKey) -> Party {
    Party::new(party_id_from_public_key(public_key), *public_key)
}

/// Verify that a party id matches a public key
pub fn verify_party_id(id: &PartyId, public_key: &PublicKey) -> bool {
    let derived = party_id_from_public_key(public_key);
    id == &derived
}

/// Convert our PublicKey type to an Ed25519 verifying key
pub fn public_key_to_ed25519(key: &PublicKey) -> PactumResult<Ed25519VerifyingKey> {
    Ed25519VerifyingKey::from_bytes(key.as_bytes()).map_err(|_| PactumError::InvalidPublicKey)
}

/// Secure secret key storage (zeroizes on drop)
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; 32],
}

impl SecretKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_keypair(&self) -> KeyPair {
        KeyPair::from_seed(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp = KeyPair::generate();
        assert!(verify_party_id(&kp.party_id(), &kp.public_key()));
    }

    #[test]
    fn test_keypair_from_seed() {
        let seed = [42u8; 32];
        let kp1 = KeyPair::from_seed(&seed);
        let kp2 = KeyPair::from_seed(&seed);

        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.party_id(), kp2.party_id());
    }

    #[test]
    fn test_party_identity_is_consistent() {
        let kp = KeyPair::generate();
        let party = kp.party();
        assert_eq!(party.id, party_id_from_public_key(&party.key));
    }

    #[test]
    fn test_secret_key_to_keypair() {
        let secret = SecretKey::new([42u8; 32]);
        let kp = secret.to_keypair();
        assert_eq!(kp.public_key(), KeyPair::from_seed(&[42u8; 32]).public_key());
    }

    #[test]
    fn test_invalid_secret_length() {
        assert!(KeyPair::from_secret_bytes(&[1u8; 16]).is_err());
    }
}
