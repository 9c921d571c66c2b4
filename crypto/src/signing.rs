//! Digital signature operations using Ed25519
//!
//! All transaction signatures are computed over a domain-tagged message
//! derived from the transaction's content identifier, never over an
//! in-memory structure.

use ed25519_dalek::{Signer, Verifier};
use pactum_core::{PactumError, PactumResult, PublicKey, Signature, TxId};
use serde::{Deserialize, Serialize};

use crate::keys::{public_key_to_ed25519, KeyPair};

/// Domain tag for party signatures over a transaction id
const TX_SIGNING_TAG: &[u8] = b"PACTUM_TX:";

/// Domain tag for notary signatures over a transaction id
const NOTARY_SIGNING_TAG: &[u8] = b"PACTUM_NOTARY:";

/// Sign a message using Ed25519
pub fn sign(keypair: &KeyPair, message: &[u8]) -> Signature {
    let signature = keypair.signing_key().sign(message);
    Signature::from_bytes(signature.to_bytes())
}

/// Verify a signature using Ed25519
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> PactumResult<()> {
    let verifying_key = public_key_to_ed25519(public_key)?;
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());

    verifying_key
        .verify(message, &sig)
        .map_err(|_| PactumError::SignatureInvalid(format!("verification failed for {public_key}")))
}

/// Check if a signature is valid (returns bool instead of Result)
pub fn is_valid_signature(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    verify(public_key, message, signature).is_ok()
}

/// The message a party signs to endorse a transaction
pub fn transaction_signing_message(txid: &TxId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(TX_SIGNING_TAG.len() + 32);
    msg.extend_from_slice(TX_SIGNING_TAG);
    msg.extend_from_slice(txid.as_bytes());
    msg
}

/// The message a notary signs to attest a transaction
pub fn notary_signing_message(txid: &TxId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(NOTARY_SIGNING_TAG.len() + 32);
    msg.extend_from_slice(NOTARY_SIGNING_TAG);
    msg.extend_from_slice(txid.as_bytes());
    msg
}

/// A detached signature over a transaction's content identifier.
///
/// Counterparties ship this back instead of returning the whole signed
/// transaction, so the initiator never has to re-check the transaction body
/// for tampering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub signer: PublicKey,
    pub signature: Signature,
}

impl TransactionSignature {
    /// Sign a transaction id with the given keypair
    pub fn create(keypair: &KeyPair, txid: &TxId) -> Self {
        let message = transaction_signing_message(txid);
        Self {
            signer: keypair.public_key(),
            signature: sign(keypair, &message),
        }
    }

    /// Verify this signature against a transaction id
    pub fn verify(&self, txid: &TxId) -> PactumResult<()> {
        let message = transaction_signing_message(txid);
        verify(&self.signer, &message, &self.signature)
    }
}
