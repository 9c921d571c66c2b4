//! Notary service
//!
//! The single point that, for any proposal, atomically checks and records
//! that none of its consumed references have been notarized before, then
//! co-signs. This is the system's double-spend prevention and the only
//! source of total order among concurrently built transactions.

use async_trait::async_trait;
use parking_lot::Mutex;
use pactum_core::{
    NotaryConfig, PactumError, PactumResult, PartyId, PublicKey, StateRef, Timestamp, TxId,
};
use pactum_crypto::keys::KeyPair;
use pactum_crypto::signing::{notary_signing_message, sign};
use pactum_ledger::{NotarySignature, SignedTransaction, TimeWindow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Clock used for time-window attestation
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// The logical notarization RPC: transaction id, the input references to
/// retire, the declared window, and the fully signed transaction backing
/// the request.
#[derive(Debug, Clone)]
pub struct NotaryRequest {
    pub txid: TxId,
    pub inputs: Vec<StateRef>,
    pub time_window: Option<TimeWindow>,
    pub transaction: SignedTransaction,
}

impl NotaryRequest {
    pub fn for_transaction(transaction: &SignedTransaction) -> Self {
        Self {
            txid: transaction.txid(),
            inputs: transaction.proposal.inputs.clone(),
            time_window: transaction.proposal.time_window,
            transaction: transaction.clone(),
        }
    }
}

/// The notarization seam flows consume. A deployment may shard services by
/// notary identity; each service answers only for its own identity.
#[async_trait]
pub trait Notarizer: Send + Sync {
    fn identity(&self) -> PartyId;
    fn public_key(&self) -> PublicKey;
    async fn notarize(&self, request: NotaryRequest) -> PactumResult<NotarySignature>;
}

/// In-process notary service.
///
/// The consumed set is guarded by a single mutex: all of a request's
/// references are checked and inserted under one acquisition, so two
/// concurrent submissions sharing any reference can never both succeed.
pub struct NotaryService {
    keypair: KeyPair,
    config: NotaryConfig,
    clock: Arc<dyn Clock>,
    consumed: Mutex<HashMap<StateRef, TxId>>,
}

impl NotaryService {
    pub fn new(keypair: KeyPair, config: NotaryConfig) -> Self {
        Self::with_clock(keypair, config, Arc::new(SystemClock))
    }

    pub fn with_clock(keypair: KeyPair, config: NotaryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            keypair,
            config,
            clock,
            consumed: Mutex::new(HashMap::new()),
        }
    }

    /// Number of retired references (introspection for tests and metrics)
    pub fn consumed_count(&self) -> usize {
        self.consumed.lock().len()
    }

    fn attest_time_window(&self, window: &TimeWindow) -> PactumResult<()> {
        let now = self.clock.now();
        let tolerance = self.config.clock_tolerance_ms;
        let widened = TimeWindow {
            after: window.after.map(|t| t.saturating_sub_millis(tolerance)),
            before: window.before.map(|t| t.saturating_add_millis(tolerance)),
        };
        if !widened.contains(now) {
            return Err(PactumError::TimeWindowInvalid(format!(
                "current time {now} is outside the declared window"
            )));
        }
        Ok(())
    }

    fn sign_attestation(&self, txid: &TxId) -> NotarySignature {
        let message = notary_signing_message(txid);
        NotarySignature {
            notary: self.keypair.party_id(),
            key: self.keypair.public_key(),
            signature: sign(&self.keypair, &message),
        }
    }
}

#[async_trait]
impl Notarizer for NotaryService {
    fn identity(&self) -> PartyId {
        self.keypair.party_id()
    }

    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    async fn notarize(&self, request: NotaryRequest) -> PactumResult<NotarySignature> {
        // The request must be internally consistent and name this notary.
        if request.txid != request.transaction.txid() {
            return Err(PactumError::ProtocolViolation(
                "notary request txid does not match its transaction".into(),
            ));
        }
        match request.transaction.proposal.notary {
            Some(named) if named == self.identity() => {}
            Some(named) => {
                return Err(PactumError::WrongNotary {
                    named,
                    actual: self.identity(),
                })
            }
            None => {
                return Err(PactumError::InvalidProposal(
                    "transaction names no notary".into(),
                ))
            }
        }

        // Only fully signed transactions are notarized.
        request.transaction.verify_required_signatures()?;

        if let Some(window) = &request.time_window {
            self.attest_time_window(window)?;
        }

        // Atomic check-and-insert: hold the lock across both phases.
        {
            let mut consumed = self.consumed.lock();
            let conflicting: Vec<StateRef> = request
                .inputs
                .iter()
                .filter(|input| {
                    consumed
                        .get(input)
                        .is_some_and(|owner| *owner != request.txid)
                })
                .copied()
                .collect();
            if !conflicting.is_empty() {
                warn!(
                    txid = %request.txid,
                    conflicts = conflicting.len(),
                    "notarization conflict"
                );
                return Err(PactumError::NotaryConflict { conflicting });
            }
            for input in &request.inputs {
                consumed.insert(*input, request.txid);
            }
        }

        info!(txid = %request.txid, inputs = request.inputs.len(), "notarized transaction");
        Ok(self.sign_attestation(&request.txid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::Hash;
    use pactum_ledger::{Command, CommandData, ProposalBuilder, State};

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn signed_tx(
        keypair: &KeyPair,
        notary: PartyId,
        input_tag: u8,
        window: Option<TimeWindow>,
    ) -> SignedTransaction {
        let mut builder = ProposalBuilder::new()
            .add_input(StateRef::new(Hash([input_tag; 32]), 0))
            .add_output(State::new("agreement").with_attribute("data", "state data"))
            .add_command(Command::new(
                CommandData::type_only("agreement.amend"),
                vec![keypair.public_key()],
            ))
            .set_notary(notary);
        if let Some(window) = window {
            builder = builder.set_time_window(window);
        }
        SignedTransaction::sign_initial(builder.build().unwrap(), keypair)
    }

    #[tokio::test]
    async fn test_notarize_success() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let service = NotaryService::new(notary_kp.clone(), NotaryConfig::default());

        let stx = signed_tx(&party_kp, notary_kp.party_id(), 1, None);
        let nsig = service
            .notarize(NotaryRequest::for_transaction(&stx))
            .await
            .unwrap();

        assert_eq!(nsig.notary, notary_kp.party_id());
        assert!(nsig.verify(&stx.txid()).is_ok());
        assert_eq!(service.consumed_count(), 1);
    }

    #[tokio::test]
    async fn test_double_spend_conflict() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let service = NotaryService::new(notary_kp.clone(), NotaryConfig::default());

        // Two distinct transactions consuming the same input reference
        let first = signed_tx(&party_kp, notary_kp.party_id(), 1, None);
        let mut second = signed_tx(&party_kp, notary_kp.party_id(), 1, None);
        second.proposal.outputs[0] = State::new("agreement").with_attribute("data", "other");
        let second = SignedTransaction::sign_initial(second.proposal, &party_kp);
        assert_ne!(first.txid(), second.txid());

        service
            .notarize(NotaryRequest::for_transaction(&first))
            .await
            .unwrap();

        let result = service.notarize(NotaryRequest::for_transaction(&second)).await;
        match result {
            Err(PactumError::NotaryConflict { conflicting }) => {
                assert_eq!(conflicting, vec![StateRef::new(Hash([1u8; 32]), 0)]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let service = NotaryService::new(notary_kp.clone(), NotaryConfig::default());

        let stx = signed_tx(&party_kp, notary_kp.party_id(), 1, None);
        let request = NotaryRequest::for_transaction(&stx);

        let first = service.notarize(request.clone()).await.unwrap();
        let second = service.notarize(request).await.unwrap();
        assert_eq!(first.notary, second.notary);
        assert_eq!(service.consumed_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_exactly_one_wins() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let service = Arc::new(NotaryService::new(notary_kp.clone(), NotaryConfig::default()));

        let first = signed_tx(&party_kp, notary_kp.party_id(), 1, None);
        let mut other_proposal = first.proposal.clone();
        other_proposal.outputs[0] = State::new("agreement").with_attribute("data", "other");
        let second = SignedTransaction::sign_initial(other_proposal, &party_kp);

        let s1 = service.clone();
        let s2 = service.clone();
        let r1 = NotaryRequest::for_transaction(&first);
        let r2 = NotaryRequest::for_transaction(&second);
        let (a, b) = tokio::join!(
            tokio::spawn(async move { s1.notarize(r1).await }),
            tokio::spawn(async move { s2.notarize(r2).await }),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(
            a.is_ok() as u8 + b.is_ok() as u8,
            1,
            "exactly one submission must win"
        );
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(PactumError::NotaryConflict { .. })));
    }

    #[tokio::test]
    async fn test_time_window_attestation() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let clock = Arc::new(FixedClock(Timestamp::from_millis(5_000)));
        let service =
            NotaryService::with_clock(notary_kp.clone(), NotaryConfig::default(), clock);

        let inside = TimeWindow::between(Timestamp::from_millis(1_000), Timestamp::from_millis(10_000));
        let stx = signed_tx(&party_kp, notary_kp.party_id(), 1, Some(inside));
        assert!(service
            .notarize(NotaryRequest::for_transaction(&stx))
            .await
            .is_ok());

        let expired =
            TimeWindow::between(Timestamp::from_millis(100), Timestamp::from_millis(200));
        let stx = signed_tx(&party_kp, notary_kp.party_id(), 2, Some(expired));
        let result = service.notarize(NotaryRequest::for_transaction(&stx)).await;
        assert!(matches!(result, Err(PactumError::TimeWindowInvalid(_))));
    }

    #[tokio::test]
    async fn test_not_fully_signed_rejected() {
        let notary_kp = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let other_kp = KeyPair::generate();
        let service = NotaryService::new(notary_kp.clone(), NotaryConfig::default());

        // Requires two signers but carries only one signature
        let proposal = ProposalBuilder::new()
            .add_input(StateRef::new(Hash([1u8; 32]), 0))
            .add_command(Command::new(
                CommandData::type_only("agreement.amend"),
                vec![party_kp.public_key(), other_kp.public_key()],
            ))
            .set_notary(notary_kp.party_id())
            .build()
            .unwrap();
        let stx = SignedTransaction::sign_initial(proposal, &party_kp);

        let result = service.notarize(NotaryRequest::for_transaction(&stx)).await;
        assert!(matches!(result, Err(PactumError::SignatureInvalid(_))));
        assert_eq!(service.consumed_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_notary_rejected() {
        let notary_kp = KeyPair::generate();
        let other_notary = KeyPair::generate();
        let party_kp = KeyPair::generate();
        let service = NotaryService::new(notary_kp, NotaryConfig::default());

        let stx = signed_tx(&party_kp, other_notary.party_id(), 1, None);
        let result = service.notarize(NotaryRequest::for_transaction(&stx)).await;
        assert!(matches!(result, Err(PactumError::WrongNotary { .. })));
    }
}
