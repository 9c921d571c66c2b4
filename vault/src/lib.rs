//! PACTUM vault
//!
//! A party's local view of the ledger: which states it knows, and which of
//! them are consumed. Persistence is an external collaborator; this crate
//! defines the store contract and ships an in-memory implementation.

pub mod memory;
pub mod store;

pub use memory::MemoryVault;
pub use store::{Lookup, StateStatus, VaultEntry, VaultStore};
