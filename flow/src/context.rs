//! Per-party flow context
//!
//! Bundles the collaborators a flow instance needs: the party's keys, its
//! vault, the contract rule registry, the session transport, and the
//! checkpoint store.

use pactum_contracts::RuleRegistry;
use pactum_core::{Party, PartyId, PublicKey};
use pactum_crypto::keys::KeyPair;
use pactum_vault::VaultStore;
use std::sync::Arc;

use crate::session::SessionTransport;
use crate::state::CheckpointStore;

/// Everything a flow instance needs from its hosting party
pub struct FlowContext {
    pub keypair: KeyPair,
    pub registry: Arc<RuleRegistry>,
    pub vault: Arc<dyn VaultStore>,
    pub transport: Arc<dyn SessionTransport>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl FlowContext {
    pub fn party(&self) -> Party {
        self.keypair.party()
    }

    pub fn party_id(&self) -> PartyId {
        self.keypair.party_id()
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }
}
