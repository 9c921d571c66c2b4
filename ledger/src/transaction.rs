//! Signed and notarized transactions

use pactum_core::{PactumError, PactumResult, PartyId, PublicKey, Signature, TxId};
use pactum_crypto::keys::KeyPair;
use pactum_crypto::signing::{notary_signing_message, verify, TransactionSignature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::proposal::Proposal;

/// A proposal plus the signatures collected so far.
///
/// Signatures are keyed by signer public key in a `BTreeMap`, so the value
/// is identical no matter what order the signatures arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub proposal: Proposal,
    pub signatures: BTreeMap<PublicKey, Signature>,
}

impl SignedTransaction {
    /// Sign a freshly built proposal with the initiator's key
    pub fn sign_initial(proposal: Proposal, keypair: &KeyPair) -> Self {
        let txid = proposal.content_id();
        let tsig = TransactionSignature::create(keypair, &txid);
        let mut signatures = BTreeMap::new();
        signatures.insert(tsig.signer, tsig.signature);
        Self {
            proposal,
            signatures,
        }
    }

    /// The content identifier this transaction's signatures cover
    pub fn txid(&self) -> TxId {
        self.proposal.content_id()
    }

    /// Produce a detached signature over this transaction without attaching it
    pub fn create_signature(&self, keypair: &KeyPair) -> TransactionSignature {
        TransactionSignature::create(keypair, &self.txid())
    }

    /// Add a signature after verifying it cryptographically against the
    /// content identifier. Replacing an identical existing signature is a
    /// no-op; a key can never map to two different signatures.
    pub fn add_signature(&mut self, tsig: TransactionSignature) -> PactumResult<()> {
        tsig.verify(&self.txid())?;
        self.signatures.insert(tsig.signer, tsig.signature);
        Ok(())
    }

    /// Union of required signer keys from all commands
    pub fn required_signers(&self) -> BTreeSet<PublicKey> {
        self.proposal.required_signers()
    }

    /// Required signers that have not signed yet
    pub fn missing_signers(&self) -> BTreeSet<PublicKey> {
        self.required_signers()
            .into_iter()
            .filter(|key| !self.signatures.contains_key(key))
            .collect()
    }

    /// Whether the signature keys cover every required signer
    pub fn is_fully_signed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Cryptographically verify every attached signature
    pub fn verify_present_signatures(&self) -> PactumResult<()> {
        let txid = self.txid();
        for (signer, signature) in &self.signatures {
            TransactionSignature {
                signer: *signer,
                signature: *signature,
            }
            .verify(&txid)?;
        }
        Ok(())
    }

    /// Verify every attached signature and that the signer set covers every
    /// required signer. This is the gate for `FULLY_SIGNED`.
    pub fn verify_required_signatures(&self) -> PactumResult<()> {
        self.verify_present_signatures()?;
        let missing = self.missing_signers();
        if !missing.is_empty() {
            let keys: Vec<String> = missing.iter().map(|k| k.to_string()).collect();
            return Err(PactumError::SignatureInvalid(format!(
                "missing required signatures from [{}]",
                keys.join(", ")
            )));
        }
        Ok(())
    }

    /// Verify attached signatures, allowing the named keys to be absent.
    /// Used while collection is still in progress.
    pub fn verify_signatures_except(&self, allowed_missing: &BTreeSet<PublicKey>) -> PactumResult<()> {
        self.verify_present_signatures()?;
        let unexplained: Vec<String> = self
            .missing_signers()
            .into_iter()
            .filter(|key| !allowed_missing.contains(key))
            .map(|k| k.to_string())
            .collect();
        if !unexplained.is_empty() {
            return Err(PactumError::SignatureInvalid(format!(
                "missing required signatures from [{}]",
                unexplained.join(", ")
            )));
        }
        Ok(())
    }
}

/// The notary's attestation over a transaction's content identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarySignature {
    pub notary: PartyId,
    pub key: PublicKey,
    pub signature: Signature,
}

impl NotarySignature {
    /// Verify this attestation against a transaction id
    pub fn verify(&self, txid: &TxId) -> PactumResult<()> {
        let message = notary_signing_message(txid);
        verify(&self.key, &message, &self.signature)
    }
}

/// A finalized transaction: fully signed and, when required, notarized.
///
/// Once produced it is terminal: its consumed references are permanently
/// retired and its outputs become live states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizedTransaction {
    pub transaction: SignedTransaction,
    pub notary_signature: Option<NotarySignature>,
}

impl NotarizedTransaction {
    /// Wrap a notarized transaction with its notary attestation
    pub fn notarized(transaction: SignedTransaction, signature: NotarySignature) -> Self {
        Self {
            transaction,
            notary_signature: Some(signature),
        }
    }

    /// Wrap a transaction that needs no notary (no inputs, no time window)
    pub fn unnotarized(transaction: SignedTransaction) -> PactumResult<Self> {
        if transaction.proposal.requires_notary() {
            return Err(PactumError::InvalidProposal(
                "transaction requires notarization".into(),
            ));
        }
        Ok(Self {
            transaction,
            notary_signature: None,
        })
    }

    pub fn txid(&self) -> TxId {
        self.transaction.txid()
    }

    /// Full verification: every required signature plus the notary
    /// attestation whenever the proposal demands one.
    pub fn verify(&self) -> PactumResult<()> {
        self.transaction.verify_required_signatures()?;

        match (&self.notary_signature, self.transaction.proposal.notary) {
            (Some(nsig), Some(named)) => {
                if nsig.notary != named {
                    return Err(PactumError::WrongNotary {
                        named,
                        actual: nsig.notary,
                    });
                }
                nsig.verify(&self.txid())
            }
            (Some(_), None) => Err(PactumError::InvalidProposal(
                "notary attestation on a proposal naming no notary".into(),
            )),
            (None, _) if self.transaction.proposal.requires_notary() => Err(
                PactumError::SignatureInvalid("missing notary attestation".into()),
            ),
            (None, _) => Ok(()),
        }
    }
}
