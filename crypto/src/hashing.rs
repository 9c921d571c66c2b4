//! Hashing functions using BLAKE3 (with SHA-256 fallback)

use pactum_core::Hash;
use sha2::{Digest, Sha256};

/// Compute BLAKE3 hash of data
pub fn blake3_hash(data: &[u8]) -> Hash {
    let hash = blake3::hash(data);
    Hash::from_bytes(*hash.as_bytes())
}

/// Compute SHA-256 hash of data (fallback)
pub fn sha256_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash::from_bytes(bytes)
}

/// Default hash function (BLAKE3)
pub fn hash(data: &[u8]) -> Hash {
    blake3_hash(data)
}

/// Domain-separated hash: the tag is absorbed before the payload so hashes
/// from different subsystems can never collide on equal payload bytes.
pub fn tagged_hash(tag: &[u8], data: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(tag);
    hasher.update(data);
    Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// Domain-separated hash over multiple parts
pub fn tagged_hash_parts(tag: &[u8], parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    Hash::from_bytes(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_hash_deterministic() {
        let data = b"pactum proposal body";
        assert_eq!(blake3_hash(data), blake3_hash(data));
        assert_ne!(blake3_hash(data), Hash::ZERO);
    }

    #[test]
    fn test_sha256_hash() {
        let data = b"pactum proposal body";
        assert_eq!(sha256_hash(data), sha256_hash(data));
        assert_ne!(sha256_hash(data), blake3_hash(data));
    }

    #[test]
    fn test_tagged_hash_domain_separation() {
        let data = b"same payload";
        let a = tagged_hash(b"PACTUM_A:", data);
        let b = tagged_hash(b"PACTUM_B:", data);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tagged_hash_parts_matches_concat() {
        let joined = tagged_hash(b"TAG:", b"onetwo");
        let parts = tagged_hash_parts(b"TAG:", &[b"one", b"two"]);
        assert_eq!(joined, parts);
    }
}
