//! Flow protocol messages
//!
//! Every message travels in a typed envelope with a discriminator; a
//! receiver expecting one type and getting another surfaces a
//! `ProtocolViolation` before any payload is inspected.

use pactum_core::{PactumError, PactumResult, StateRef};
use pactum_crypto::signing::TransactionSignature;
use pactum_ledger::{NotarizedTransaction, SignedTransaction, StateAndRef};
use serde::{Deserialize, Serialize};

/// Protocol version carried in proposals
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages exchanged between flow instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowMessage {
    /// Initiator proposes a transaction for counterparty signature
    Propose(SignedTransaction),

    /// Counterparty asks the initiator to resolve input references it
    /// cannot resolve from its own vault
    ResolveRequest(Vec<StateRef>),

    /// Initiator's answer to a resolution request
    ResolveResponse(Vec<StateAndRef>),

    /// Counterparty's signature over the proposed transaction
    SignatureReply(TransactionSignature),

    /// Either side declines; aborts the protocol for all parties
    Reject { reason: String },

    /// Final notarized transaction, broadcast to every participant
    Finalized(NotarizedTransaction),
}

impl FlowMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            FlowMessage::Propose(_) => "propose",
            FlowMessage::ResolveRequest(_) => "resolve_request",
            FlowMessage::ResolveResponse(_) => "resolve_response",
            FlowMessage::SignatureReply(_) => "signature_reply",
            FlowMessage::Reject { .. } => "reject",
            FlowMessage::Finalized(_) => "finalized",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> PactumResult<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| PactumError::ProtocolViolation(format!("malformed message: {e}")))
    }

    fn unexpected(&self, expected: &str) -> PactumError {
        PactumError::UnexpectedMessage {
            expected: expected.to_string(),
            got: self.message_type().to_string(),
        }
    }

    pub fn expect_propose(self) -> PactumResult<SignedTransaction> {
        match self {
            FlowMessage::Propose(stx) => Ok(stx),
            other => Err(other.unexpected("propose")),
        }
    }

    pub fn expect_resolve_response(self) -> PactumResult<Vec<StateAndRef>> {
        match self {
            FlowMessage::ResolveResponse(resolved) => Ok(resolved),
            other => Err(other.unexpected("resolve_response")),
        }
    }

    pub fn expect_finalized(self) -> PactumResult<NotarizedTransaction> {
        match self {
            FlowMessage::Finalized(ntx) => Ok(ntx),
            other => Err(other.unexpected("finalized")),
        }
    }
}
