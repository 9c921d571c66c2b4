//! Error types for PACTUM

use crate::types::{PartyId, StateRef};
use thiserror::Error;

/// Main error type for PACTUM
#[derive(Error, Debug)]
pub enum PactumError {
    // ============ Cryptography Errors ============
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    // ============ Proposal Errors ============
    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("Duplicate input reference {0}")]
    DuplicateInput(StateRef),

    // ============ Contract Errors ============
    #[error("Contract verification rejected: {0}")]
    ContractViolation(String),

    #[error("No rule registered for command type '{0}'")]
    NoRuleRegistered(String),

    // ============ Flow Errors ============
    #[error("Counterparty {party} rejected the transaction: {reason}")]
    CounterpartyRejected { party: PartyId, reason: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage { expected: String, got: String },

    #[error("Flow cancelled")]
    FlowCancelled,

    // ============ Notary Errors ============
    #[error("Notary conflict on {} input reference(s)", .conflicting.len())]
    NotaryConflict { conflicting: Vec<StateRef> },

    #[error("Time window attestation failed: {0}")]
    TimeWindowInvalid(String),

    #[error("Wrong notary: proposal names {named}, service is {actual}")]
    WrongNotary { named: PartyId, actual: PartyId },

    // ============ Vault Errors ============
    #[error("State not found for reference {0}")]
    StateNotFound(StateRef),

    #[error("Vault error: {0}")]
    VaultError(String),

    // ============ Identity Errors ============
    #[error("Party not found: {0}")]
    PartyNotFound(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ============ General Errors ============
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for PactumError {
    fn from(err: std::io::Error) -> Self {
        PactumError::ConfigError(err.to_string())
    }
}

impl From<bincode::Error> for PactumError {
    fn from(err: bincode::Error) -> Self {
        PactumError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for PactumError {
    fn from(err: serde_json::Error) -> Self {
        PactumError::SerializationError(err.to_string())
    }
}
