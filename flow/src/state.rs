//! Flow state machine
//!
//! A flow instance's entire progress is captured as a serializable tagged
//! union, persisted at every suspension point so the instance can be
//! resumed after a crash or a long counterparty wait.
//!
//! `BUILDING -> LOCALLY_SIGNED -> COLLECTING_SIGNATURES -> FULLY_SIGNED ->
//! NOTARIZING -> FINALIZED`, with terminal `FAILED(reason)` reachable from
//! any non-terminal state.

use dashmap::DashMap;
use pactum_core::{PactumError, PartyId, StateRef, Timestamp};
use pactum_ledger::{NotarizedTransaction, SignedTransaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one flow instance
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub Uuid);

impl FlowId {
    pub fn random() -> Self {
        FlowId(Uuid::new_v4())
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow:{}", &self.0.to_string()[..8])
    }
}

impl fmt::Debug for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowId({})", self.0)
    }
}

/// Terminal failure reasons, structured so callers can distinguish
/// "rebuild and retry" from "do not retry".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowFailure {
    /// Local verification rejected the draft; never retried automatically
    VerificationRejected(String),
    /// A remote party declined to sign; aborts the protocol atomically
    CounterpartyRejected { party: PartyId, reason: String },
    /// Malformed or wrong-type message; aborts this session only
    ProtocolViolation(String),
    /// An input was already consumed by a different transaction; rebuild
    /// against current unconsumed state before retrying
    NotaryConflict { conflicting: Vec<StateRef> },
    /// A cryptographic signature check failed; always fatal
    SignatureInvalid(String),
    /// The flow was cancelled at a suspension point
    Cancelled,
}

impl FlowFailure {
    /// Whether the caller may rebuild a fresh proposal and try again
    pub fn is_rebuildable(&self) -> bool {
        matches!(self, FlowFailure::NotaryConflict { .. })
    }
}

impl fmt::Display for FlowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowFailure::VerificationRejected(reason) => {
                write!(f, "verification rejected: {reason}")
            }
            FlowFailure::CounterpartyRejected { party, reason } => {
                write!(f, "counterparty {party} rejected: {reason}")
            }
            FlowFailure::ProtocolViolation(reason) => write!(f, "protocol violation: {reason}"),
            FlowFailure::NotaryConflict { conflicting } => {
                write!(f, "notary conflict on {} input(s)", conflicting.len())
            }
            FlowFailure::SignatureInvalid(reason) => write!(f, "signature invalid: {reason}"),
            FlowFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<PactumError> for FlowFailure {
    fn from(err: PactumError) -> Self {
        match err {
            PactumError::ContractViolation(reason) | PactumError::NoRuleRegistered(reason) => {
                FlowFailure::VerificationRejected(reason)
            }
            PactumError::CounterpartyRejected { party, reason } => {
                FlowFailure::CounterpartyRejected { party, reason }
            }
            PactumError::NotaryConflict { conflicting } => {
                FlowFailure::NotaryConflict { conflicting }
            }
            PactumError::SignatureInvalid(reason) => FlowFailure::SignatureInvalid(reason),
            PactumError::UnexpectedMessage { expected, got } => {
                FlowFailure::ProtocolViolation(format!("expected {expected}, got {got}"))
            }
            PactumError::FlowCancelled => FlowFailure::Cancelled,
            other => FlowFailure::ProtocolViolation(other.to_string()),
        }
    }
}

/// The full state of a flow instance at a suspension point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowState {
    /// Assembling and verifying the draft proposal
    Building,
    /// Verified and signed with the initiator's own key
    LocallySigned { tx: SignedTransaction },
    /// Gathering counterparty signatures; `remaining` lists parties that
    /// have not replied yet
    CollectingSignatures {
        tx: SignedTransaction,
        remaining: Vec<PartyId>,
    },
    /// Every required signature present and cryptographically verified
    FullySigned { tx: SignedTransaction },
    /// Awaiting the notary's attestation
    Notarizing { tx: SignedTransaction },
    /// Terminal: notarized (when required) and distributed
    Finalized { tx: NotarizedTransaction },
    /// Terminal: the protocol aborted
    Failed(FlowFailure),
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Building => "building",
            FlowState::LocallySigned { .. } => "locally_signed",
            FlowState::CollectingSignatures { .. } => "collecting_signatures",
            FlowState::FullySigned { .. } => "fully_signed",
            FlowState::Notarizing { .. } => "notarizing",
            FlowState::Finalized { .. } => "finalized",
            FlowState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Finalized { .. } | FlowState::Failed(_))
    }
}

/// A flow's persisted snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowCheckpoint {
    pub flow_id: FlowId,
    pub state: FlowState,
    pub updated_at: Timestamp,
}

impl FlowCheckpoint {
    pub fn new(flow_id: FlowId, state: FlowState) -> Self {
        Self {
            flow_id,
            state,
            updated_at: Timestamp::now(),
        }
    }
}

/// Persistence seam for flow checkpoints
pub trait CheckpointStore: Send + Sync {
    fn save(&self, checkpoint: FlowCheckpoint);
    fn load(&self, flow_id: &FlowId) -> Option<FlowCheckpoint>;
    fn remove(&self, flow_id: &FlowId);
}

/// In-memory checkpoint store
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: DashMap<FlowId, FlowCheckpoint>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: FlowCheckpoint) {
        self.checkpoints.insert(checkpoint.flow_id, checkpoint);
    }

    fn load(&self, flow_id: &FlowId) -> Option<FlowCheckpoint> {
        self.checkpoints.get(flow_id).map(|c| c.clone())
    }

    fn remove(&self, flow_id: &FlowId) {
        self.checkpoints.remove(flow_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::Hash;

    #[test]
    fn test_failure_retriability() {
        let conflict = FlowFailure::NotaryConflict {
            conflicting: vec![StateRef::new(Hash([1u8; 32]), 0)],
        };
        assert!(conflict.is_rebuildable());

        assert!(!FlowFailure::VerificationRejected("bad shape".into()).is_rebuildable());
        assert!(!FlowFailure::SignatureInvalid("bad sig".into()).is_rebuildable());
        assert!(!FlowFailure::Cancelled.is_rebuildable());
    }

    #[test]
    fn test_error_mapping() {
        let failure: FlowFailure =
            PactumError::ContractViolation("count mismatch".into()).into();
        assert_eq!(failure, FlowFailure::VerificationRejected("count mismatch".into()));

        let failure: FlowFailure = PactumError::UnexpectedMessage {
            expected: "propose".into(),
            got: "reject".into(),
        }
        .into();
        assert!(matches!(failure, FlowFailure::ProtocolViolation(_)));
    }

    #[test]
    fn test_checkpoint_store_roundtrip() {
        let store = MemoryCheckpointStore::new();
        let flow_id = FlowId::random();

        store.save(FlowCheckpoint::new(flow_id, FlowState::Building));
        let loaded = store.load(&flow_id).unwrap();
        assert_eq!(loaded.state.name(), "building");

        store.save(FlowCheckpoint::new(
            flow_id,
            FlowState::Failed(FlowFailure::Cancelled),
        ));
        let loaded = store.load(&flow_id).unwrap();
        assert!(loaded.state.is_terminal());

        store.remove(&flow_id);
        assert!(store.load(&flow_id).is_none());
    }

    #[test]
    fn test_checkpoint_serializes() {
        let checkpoint = FlowCheckpoint::new(FlowId::random(), FlowState::Building);
        let bytes = bincode::serialize(&checkpoint).unwrap();
        let restored: FlowCheckpoint = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.flow_id, checkpoint.flow_id);
    }
}
