//! Commit flow (initiator side)
//!
//! Drives a proposal through verify -> sign -> collect counterparty
//! signatures -> notarize -> distribute. Every send/receive pair is a
//! suspension point; the flow's state is checkpointed at each one so the
//! instance can be resumed later.

use pactum_contracts::LedgerView;
use pactum_core::{PartyId, PublicKey};
use pactum_crypto::keys::party_id_from_public_key;
use pactum_ledger::{NotarizedTransaction, Proposal, SignedTransaction, StateAndRef};
use pactum_notary::{Notarizer, NotaryRequest};
use pactum_vault::VaultStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::FlowContext;
use crate::message::FlowMessage;
use crate::session::{Session, SessionTransport};
use crate::state::{CheckpointStore, FlowCheckpoint, FlowFailure, FlowId, FlowState};

/// Initiator driver for committing one proposal to the ledger
pub struct CommitFlow {
    flow_id: FlowId,
    ctx: Arc<FlowContext>,
    notary: Option<Arc<dyn Notarizer>>,
    observers: Vec<PartyId>,
}

impl CommitFlow {
    pub fn new(ctx: Arc<FlowContext>, notary: Option<Arc<dyn Notarizer>>) -> Self {
        Self {
            flow_id: FlowId::random(),
            ctx,
            notary,
            observers: Vec::new(),
        }
    }

    /// Additional parties to receive the finalized transaction even though
    /// no state names them
    pub fn with_observers(mut self, observers: Vec<PartyId>) -> Self {
        self.observers = observers;
        self
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
        warn!(flow = %self.flow_id, %failure, "commit flow failed");
        self.checkpoint(FlowState::Failed(failure.clone()));
        failure
    }

    /// Run the flow to a terminal state.
    ///
    /// On failure the terminal `Failed(reason)` is checkpointed and the
    /// structured reason returned; `FlowFailure::is_rebuildable` tells the
    /// caller whether requerying the vault and rebuilding can help.
    pub async fn run(&self, proposal: Proposal) -> Result<NotarizedTransaction, FlowFailure> {
        let txid = proposal.content_id();
        info!(flow = %self.flow_id, %txid, "starting commit flow");
        self.checkpoint(FlowState::Building);

        // Resolve our own inputs and verify before anything goes on the
        // wire: a proposal that fails verification never produces a
        // signature request.
        let resolved = self
            .ctx
            .vault
            .resolve(&proposal.inputs)
            .await
            .map_err(|e| self.fail(e.into()))?;
        let view = LedgerView::from_proposal(&proposal, resolved.clone())
            .map_err(|e| self.fail(e.into()))?;
        self.ctx
            .registry
            .verify(&view)
            .map_err(|e| self.fail(e.into()))?;

        // The notary named by the proposal must be the service we hold.
        let notary_service = if proposal.requires_notary() {
            match (&self.notary, proposal.notary) {
                (Some(notary), Some(named)) if notary.identity() == named => Some(notary.clone()),
                (Some(notary), Some(named)) => {
                    return Err(self.fail(FlowFailure::ProtocolViolation(format!(
                        "proposal names notary {named} but this flow holds {}",
                        notary.identity()
                    ))))
                }
                (None, _) => {
                    return Err(self.fail(FlowFailure::ProtocolViolation(
                        "proposal requires a notary but none is configured".into(),
                    )))
                }
                (_, None) => {
                    return Err(self.fail(FlowFailure::VerificationRejected(
                        "proposal with inputs or a time window names no notary".into(),
                    )))
                }
            }
        } else {
            None
        };

        let mut stx = SignedTransaction::sign_initial(proposal, &self.ctx.keypair);
        self.checkpoint(FlowState::LocallySigned { tx: stx.clone() });
        debug!(flow = %self.flow_id, "locally signed");

        // Collect counterparty signatures, in lexical key order. The
        // signature map is ordered, so the fully signed value is the same
        // whatever order replies arrive in.
        let our_key = self.ctx.public_key();
        let counterparty_keys: Vec<PublicKey> = stx
            .required_signers()
            .into_iter()
            .filter(|key| *key != our_key)
            .collect();

        let mut sessions: Vec<Box<dyn Session>> = Vec::new();
        if let Err(failure) = self
            .collect_signatures(&mut stx, &counterparty_keys, &mut sessions)
            .await
        {
            self.abort_sessions(&mut sessions, &failure).await;
            return Err(self.fail(failure));
        }

        if let Err(err) = stx.verify_required_signatures() {
            let failure = FlowFailure::from(err);
            self.abort_sessions(&mut sessions, &failure).await;
            return Err(self.fail(failure));
        }
        self.checkpoint(FlowState::FullySigned { tx: stx.clone() });
        debug!(flow = %self.flow_id, "fully signed");

        // Notarize, unless the proposal has no inputs and no time window.
        let ntx = if let Some(notary) = &notary_service {
            self.checkpoint(FlowState::Notarizing { tx: stx.clone() });
            match notary.notarize(NotaryRequest::for_transaction(&stx)).await {
                Ok(nsig) => NotarizedTransaction::notarized(stx, nsig),
                Err(err) => {
                    let failure = FlowFailure::from(err);
                    self.abort_sessions(&mut sessions, &failure).await;
                    return Err(self.fail(failure));
                }
            }
        } else {
            match NotarizedTransaction::unnotarized(stx) {
                Ok(ntx) => ntx,
                Err(err) => {
                    let failure = FlowFailure::from(err);
                    self.abort_sessions(&mut sessions, &failure).await;
                    return Err(self.fail(failure));
                }
            }
        };

        // FINALIZED: distribute to every participant, then record into our
        // own vault. This is the only transition that touches any vault.
        self.distribute(&ntx, &resolved, &mut sessions).await;
        self.ctx
            .vault
            .record_finalized(&ntx)
            .await
            .map_err(|e| self.fail(e.into()))?;

        self.checkpoint(FlowState::Finalized { tx: ntx.clone() });
        info!(flow = %self.flow_id, txid = %ntx.txid(), "finalized");
        Ok(ntx)
    }

    async fn collect_signatures(
        &self,
        stx: &mut SignedTransaction,
        counterparty_keys: &[PublicKey],
        sessions: &mut Vec<Box<dyn Session>>,
    ) -> Result<(), FlowFailure> {
        let mut remaining: Vec<PartyId> = counterparty_keys
            .iter()
            .map(party_id_from_public_key)
            .collect();

        for key in counterparty_keys {
            let party = party_id_from_public_key(key);
            self.checkpoint(FlowState::CollectingSignatures {
                tx: stx.clone(),
                remaining: remaining.clone(),
            });

            let mut session = self
                .ctx
                .transport
                .open(&party)
                .await
                .map_err(FlowFailure::from)?;
            session
                .send(FlowMessage::Propose(stx.clone()))
                .await
                .map_err(FlowFailure::from)?;

            let tsig = loop {
                self.checkpoint(FlowState::CollectingSignatures {
                    tx: stx.clone(),
                    remaining: remaining.clone(),
                });
                match session.receive().await.map_err(FlowFailure::from)? {
                    FlowMessage::ResolveRequest(refs) => {
                        let resolved = self
                            .ctx
                            .vault
                            .resolve(&refs)
                            .await
                            .map_err(FlowFailure::from)?;
                        session
                            .send(FlowMessage::ResolveResponse(resolved))
                            .await
                            .map_err(FlowFailure::from)?;
                    }
                    FlowMessage::SignatureReply(tsig) => break tsig,
                    FlowMessage::Reject { reason } => {
                        return Err(FlowFailure::CounterpartyRejected { party, reason });
                    }
                    other => {
                        return Err(FlowFailure::ProtocolViolation(format!(
                            "expected signature_reply, got {}",
                            other.message_type()
                        )));
                    }
                }
            };

            // The reply must carry the key we asked for and verify against
            // the content identifier.
            if tsig.signer != *key {
                return Err(FlowFailure::SignatureInvalid(format!(
                    "expected a signature from {key}, got one from {}",
                    tsig.signer
                )));
            }
            stx.add_signature(tsig).map_err(FlowFailure::from)?;

            remaining.retain(|p| p != &party);
            sessions.push(session);
            debug!(flow = %self.flow_id, %party, "collected signature");
        }

        Ok(())
    }

    /// Tell every open session the protocol is aborted so counterparties
    /// can clean up; local failure details are translated into an explicit
    /// rejection message, never shipped raw.
    async fn abort_sessions(&self, sessions: &mut [Box<dyn Session>], failure: &FlowFailure) {
        let reason = format!("commit aborted: {failure}");
        for session in sessions.iter_mut() {
            if let Err(err) = session
                .send(FlowMessage::Reject {
                    reason: reason.clone(),
                })
                .await
            {
                debug!(flow = %self.flow_id, %err, "abort notification failed");
            }
        }
    }

    /// Send the finalized transaction to every signer session, then to
    /// every other participant of any input or output state, then to the
    /// configured observers.
    async fn distribute(
        &self,
        ntx: &NotarizedTransaction,
        resolved_inputs: &[StateAndRef],
        sessions: &mut [Box<dyn Session>],
    ) {
        let mut already_sent: BTreeSet<PartyId> = BTreeSet::new();
        already_sent.insert(self.ctx.party_id());

        for session in sessions.iter_mut() {
            if let Err(err) = session.send(FlowMessage::Finalized(ntx.clone())).await {
                warn!(flow = %self.flow_id, %err, "distribution to signer failed");
            }
            already_sent.insert(session.counterparty());
        }

        let mut recipients: BTreeSet<PartyId> = BTreeSet::new();
        for sar in resolved_inputs {
            recipients.extend(sar.state.participants.iter().map(|p| p.id));
        }
        recipients.extend(
            ntx.transaction
                .proposal
                .output_participants()
                .iter()
                .map(|p| p.id),
        );
        recipients.extend(self.observers.iter().copied());

        for recipient in recipients.difference(&already_sent) {
            match self.ctx.transport.open(recipient).await {
                Ok(mut session) => {
                    if let Err(err) = session.send(FlowMessage::Finalized(ntx.clone())).await {
                        warn!(flow = %self.flow_id, %recipient, %err, "distribution failed");
                    }
                }
                Err(err) => {
                    warn!(flow = %self.flow_id, %recipient, %err, "participant unreachable");
                }
            }
        }
    }
}
