//! Identity directory
//!
//! Maps human-readable names to ledger identities and back. Network-wide
//! directory services are an external collaborator; this in-process registry
//! implements the same lookup surface for locally hosted parties.

use dashmap::DashMap;
use pactum_core::{PactumError, PactumResult, Party, PartyId, PublicKey};

/// A registered identity
#[derive(Debug, Clone)]
pub struct PartyInfo {
    pub name: String,
    pub party: Party,
}

/// In-process identity registry
#[derive(Default)]
pub struct IdentityDirectory {
    by_name: DashMap<String, PartyInfo>,
    by_id: DashMap<PartyId, String>,
    by_key: DashMap<PublicKey, String>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party under a name, replacing any previous registration
    pub fn register(&self, name: impl Into<String>, party: Party) {
        let name = name.into();
        self.by_id.insert(party.id, name.clone());
        self.by_key.insert(party.key, name.clone());
        self.by_name.insert(name.clone(), PartyInfo { name, party });
    }

    /// Resolve a party by its registered name
    pub fn resolve(&self, name: &str) -> PactumResult<PartyInfo> {
        self.by_name
            .get(name)
            .map(|info| info.clone())
            .ok_or_else(|| PactumError::PartyNotFound(name.to_string()))
    }

    /// Resolve a party by its public key
    pub fn resolve_by_key(&self, key: &PublicKey) -> PactumResult<PartyInfo> {
        let name = self
            .by_key
            .get(key)
            .map(|name| name.clone())
            .ok_or_else(|| PactumError::PartyNotFound(key.to_string()))?;
        self.resolve(&name)
    }

    /// Resolve a party by its identifier
    pub fn resolve_by_id(&self, id: &PartyId) -> PactumResult<PartyInfo> {
        let name = self
            .by_id
            .get(id)
            .map(|name| name.clone())
            .ok_or_else(|| PactumError::PartyNotFound(id.to_string()))?;
        self.resolve(&name)
    }

    /// All registered identities
    pub fn parties(&self) -> Vec<PartyInfo> {
        self.by_name.iter().map(|entry| entry.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_crypto::keys::KeyPair;

    #[test]
    fn test_register_and_resolve() {
        let directory = IdentityDirectory::new();
        let kp = KeyPair::generate();
        directory.register("alice", kp.party());

        let by_name = directory.resolve("alice").unwrap();
        assert_eq!(by_name.party.id, kp.party_id());

        let by_key = directory.resolve_by_key(&kp.public_key()).unwrap();
        assert_eq!(by_key.name, "alice");

        let by_id = directory.resolve_by_id(&kp.party_id()).unwrap();
        assert_eq!(by_id.name, "alice");
    }

    #[test]
    fn test_unknown_party_not_found() {
        let directory = IdentityDirectory::new();
        assert!(matches!(
            directory.resolve("nobody"),
            Err(PactumError::PartyNotFound(_))
        ));

        let kp = KeyPair::generate();
        assert!(directory.resolve_by_key(&kp.public_key()).is_err());
    }
}
