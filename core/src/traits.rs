//! Core traits defining PACTUM interfaces

use crate::types::Hash;

/// Result type for PACTUM operations
pub type PactumResult<T> = Result<T, crate::error::PactumError>;

/// Trait for content-addressed types
pub trait Hashable {
    /// Compute the content hash of this object
    fn hash(&self) -> Hash;
}

/// Trait for types whose signatures are computed over a fixed byte message.
///
/// The signing bytes must be derived from the content hash, never from a
/// mutable in-memory structure, so re-serialization cannot change what is
/// signed.
pub trait Signable: Hashable {
    /// Get the bytes to be signed
    fn signing_bytes(&self) -> Vec<u8>;
}
