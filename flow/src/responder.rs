//! Responder flow (counterparty side)
//!
//! Handles an inbound session: independently re-verifies a proposed
//! transaction against its own view of the resolved inputs, applies the
//! caller's acceptance predicate, signs, and records the transaction only
//! once the finalized broadcast arrives. Distribution-only sessions (a
//! bare `Finalized` as the first message) are also handled here.

use pactum_contracts::LedgerView;
use pactum_core::{PactumError, PactumResult, StateRef};
use pactum_ledger::{NotarizedTransaction, SignedTransaction, StateAndRef};
use pactum_vault::VaultStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::FlowContext;
use crate::message::FlowMessage;
use crate::session::Session;
use crate::state::{CheckpointStore, FlowCheckpoint, FlowFailure, FlowId, FlowState};

/// Extra domain-specific check a responder applies before signing, beyond
/// contract verification. Just because a transaction is contractually valid
/// and requires our signature does not mean we want to enter into it.
pub type AcceptancePredicate = Arc<dyn Fn(&LedgerView) -> PactumResult<()> + Send + Sync>;

/// Responder driver for one inbound session
pub struct ResponderFlow {
    flow_id: FlowId,
    ctx: Arc<FlowContext>,
    acceptance: AcceptancePredicate,
}

impl ResponderFlow {
    /// A responder that accepts anything contract verification accepts
    pub fn new(ctx: Arc<FlowContext>) -> Self {
        Self::with_acceptance(ctx, Arc::new(|_| Ok(())))
    }

    pub fn with_acceptance(ctx: Arc<FlowContext>, acceptance: AcceptancePredicate) -> Self {
        Self {
            flow_id: FlowId::random(),
            ctx,
            acceptance,
        }
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    fn checkpoint(&self, state: FlowState) {
        self.ctx
            .checkpoints
            .save(FlowCheckpoint::new(self.flow_id, state));
    }

    fn fail(&self, failure: FlowFailure) -> FlowFailure {
        warn!(flow = %self.flow_id, %failure, "responder flow failed");
        self.checkpoint(FlowState::Failed(failure.clone()));
        failure
    }

    /// Drive the session to a terminal state
    pub async fn handle(
        &self,
        session: &mut Box<dyn Session>,
    ) -> Result<NotarizedTransaction, FlowFailure> {
        self.checkpoint(FlowState::Building);

        match session.receive().await.map_err(|e| self.fail(e.into()))? {
            FlowMessage::Propose(stx) => self.handle_proposal(session, stx).await,
            FlowMessage::Finalized(ntx) => self.record_finalized(ntx).await,
            other => Err(self.fail(FlowFailure::ProtocolViolation(format!(
                "expected propose or finalized, got {}",
                other.message_type()
            )))),
        }
    }

    async fn handle_proposal(
        &self,
        session: &mut Box<dyn Session>,
        mut stx: SignedTransaction,
    ) -> Result<NotarizedTransaction, FlowFailure> {
        let txid = stx.txid();
        let initiator = session.counterparty();
        info!(flow = %self.flow_id, %txid, %initiator, "received proposal");

        // Build our own view of the resolved inputs: the local vault first,
        // the initiator for anything we have never seen.
        let resolved = match self.resolve_inputs(session, &stx).await {
            Ok(resolved) => resolved,
            Err(failure) => {
                self.send_rejection(session, &failure).await;
                return Err(self.fail(failure));
            }
        };

        // Independent re-verification defends against a malicious or buggy
        // initiator; then the acceptance predicate, then the cryptographic
        // checks on what the initiator already signed. Declining aborts the
        // whole protocol, and this side also terminates rejected.
        if let Err(cause) = self.evaluate(&stx, resolved) {
            self.send_rejection(session, &cause).await;
            return Err(self.fail(FlowFailure::CounterpartyRejected {
                party: self.ctx.party_id(),
                reason: cause.to_string(),
            }));
        }

        let tsig = stx.create_signature(&self.ctx.keypair);
        stx.add_signature(tsig).map_err(|e| self.fail(e.into()))?;
        self.checkpoint(FlowState::LocallySigned { tx: stx.clone() });

        session
            .send(FlowMessage::SignatureReply(tsig))
            .await
            .map_err(|e| self.fail(e.into()))?;
        debug!(flow = %self.flow_id, %txid, "signature sent, awaiting finality");

        match session.receive().await.map_err(|e| self.fail(e.into()))? {
            FlowMessage::Finalized(ntx) => {
                if ntx.txid() != txid {
                    return Err(self.fail(FlowFailure::ProtocolViolation(format!(
                        "finalized transaction {} does not match signed proposal {txid}",
                        ntx.txid()
                    ))));
                }
                self.record_finalized(ntx).await
            }
            FlowMessage::Reject { reason } => Err(self.fail(FlowFailure::CounterpartyRejected {
                party: initiator,
                reason,
            })),
            other => Err(self.fail(FlowFailure::ProtocolViolation(format!(
                "expected finalized, got {}",
                other.message_type()
            )))),
        }
    }

    /// Resolve the proposal's inputs, asking the initiator for references
    /// the local vault does not know.
    async fn resolve_inputs(
        &self,
        session: &mut Box<dyn Session>,
        stx: &SignedTransaction,
    ) -> Result<Vec<StateAndRef>, FlowFailure> {
        let inputs = &stx.proposal.inputs;
        let lookup = self.ctx.vault.lookup(inputs).await;

        let mut by_ref: HashMap<StateRef, StateAndRef> = lookup
            .found
            .into_iter()
            .map(|sar| (sar.state_ref, sar))
            .collect();

        if !lookup.missing.is_empty() {
            session
                .send(FlowMessage::ResolveRequest(lookup.missing.clone()))
                .await
                .map_err(FlowFailure::from)?;
            let supplied = session
                .receive()
                .await
                .map_err(FlowFailure::from)?
                .expect_resolve_response()
                .map_err(FlowFailure::from)?;

            for sar in supplied {
                if !lookup.missing.contains(&sar.state_ref) {
                    return Err(FlowFailure::ProtocolViolation(format!(
                        "initiator supplied unrequested state {}",
                        sar.state_ref
                    )));
                }
                by_ref.insert(sar.state_ref, sar);
            }
        }

        inputs
            .iter()
            .map(|input| {
                by_ref.remove(input).ok_or_else(|| {
                    FlowFailure::ProtocolViolation(format!(
                        "initiator failed to resolve input {input}"
                    ))
                })
            })
            .collect()
    }

    /// The decision whether to sign: contract rules, acceptance predicate,
    /// required-signer membership, and the initiator's own signatures.
    fn evaluate(
        &self,
        stx: &SignedTransaction,
        resolved: Vec<StateAndRef>,
    ) -> Result<(), FlowFailure> {
        let view = LedgerView::from_proposal(&stx.proposal, resolved)
            .map_err(|e| FlowFailure::VerificationRejected(e.to_string()))?;

        self.ctx
            .registry
            .verify(&view)
            .map_err(|e| FlowFailure::VerificationRejected(e.to_string()))?;

        (self.acceptance)(&view)
            .map_err(|e| FlowFailure::VerificationRejected(e.to_string()))?;

        if !stx.required_signers().contains(&self.ctx.public_key()) {
            return Err(FlowFailure::ProtocolViolation(
                "this party is not a required signer of the proposal".into(),
            ));
        }

        stx.verify_present_signatures()
            .map_err(|e| match e {
                PactumError::SignatureInvalid(reason) => FlowFailure::SignatureInvalid(reason),
                other => FlowFailure::SignatureInvalid(other.to_string()),
            })?;

        Ok(())
    }

    /// Translate a local failure into an explicit rejection message so the
    /// initiator can clean up; the raw error never crosses the wire.
    async fn send_rejection(&self, session: &mut Box<dyn Session>, failure: &FlowFailure) {
        let reason = failure.to_string();
        if let Err(err) = session.send(FlowMessage::Reject { reason }).await {
            debug!(flow = %self.flow_id, %err, "rejection notification failed");
        }
    }

    /// Verify and record a finalized transaction into the local vault.
    /// This is the only place the responder's vault is mutated.
    async fn record_finalized(
        &self,
        ntx: NotarizedTransaction,
    ) -> Result<NotarizedTransaction, FlowFailure> {
        ntx.verify().map_err(|e| self.fail(e.into()))?;
        self.ctx
            .vault
            .record_finalized(&ntx)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.checkpoint(FlowState::Finalized { tx: ntx.clone() });
        info!(flow = %self.flow_id, txid = %ntx.txid(), "recorded finalized transaction");
        Ok(ntx)
    }
}
