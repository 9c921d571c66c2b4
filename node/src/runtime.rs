//! Party runtime combining all components
//!
//! A `PartyNode` is one party's service hub: its keys, vault, contract
//! rules, transport binding, and checkpoint store, plus a spawned responder
//! loop that answers inbound flow sessions.

use pactum_contracts::RuleRegistry;
use pactum_core::{NodeConfig, PactumError, PactumResult, Party, PartyId, PublicKey};
use pactum_crypto::keys::KeyPair;
use pactum_flow::{
    AcceptancePredicate, CommitFlow, FlowContext, FlowFailure, InProcNetwork,
    MemoryCheckpointStore, ResponderFlow, Session, SessionListener,
};
use pactum_ledger::{NotarizedTransaction, Proposal};
use pactum_notary::Notarizer;
use pactum_vault::{MemoryVault, VaultStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One hosted party: context for running flows plus its inbound listener
pub struct PartyNode {
    name: String,
    config: NodeConfig,
    ctx: Arc<FlowContext>,
    listener: Option<SessionListener>,
    responder_task: Option<JoinHandle<()>>,
}

impl PartyNode {
    /// Create a party bound to the given in-process network
    pub fn new(
        name: impl Into<String>,
        config: NodeConfig,
        keypair: KeyPair,
        network: &InProcNetwork,
        registry: Arc<RuleRegistry>,
    ) -> Self {
        let name = name.into();
        let (endpoint, listener) = network.bind(keypair.party_id());

        let ctx = Arc::new(FlowContext {
            keypair,
            registry,
            vault: Arc::new(MemoryVault::new()),
            transport: Arc::new(endpoint),
            checkpoints: Arc::new(MemoryCheckpointStore::new()),
        });

        info!(party = %ctx.party_id(), %name, "party node created");
        Self {
            name,
            config,
            ctx,
            listener: Some(listener),
            responder_task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn party(&self) -> Party {
        self.ctx.party()
    }

    pub fn party_id(&self) -> PartyId {
        self.ctx.party_id()
    }

    pub fn public_key(&self) -> PublicKey {
        self.ctx.public_key()
    }

    pub fn context(&self) -> Arc<FlowContext> {
        self.ctx.clone()
    }

    pub fn vault(&self) -> Arc<dyn VaultStore> {
        self.ctx.vault.clone()
    }

    /// Start answering inbound sessions with the given acceptance
    /// predicate. Returns a channel of terminal flow results, one per
    /// handled session. May be called once.
    pub fn spawn_responder(
        &mut self,
        acceptance: AcceptancePredicate,
    ) -> PactumResult<mpsc::UnboundedReceiver<Result<NotarizedTransaction, FlowFailure>>> {
        let mut listener = self.listener.take().ok_or_else(|| {
            PactumError::Internal(format!("responder already spawned for {}", self.name))
        })?;
        let ctx = self.ctx.clone();
        let name = self.name.clone();

        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Some(mut session) = listener.accept().await {
                debug!(party = %name, session = %session.id(), "inbound session");
                let flow = ResponderFlow::with_acceptance(ctx.clone(), acceptance.clone());
                let result = flow.handle(&mut session).await;
                if results_tx.send(result).is_err() {
                    break;
                }
            }
        });
        self.responder_task = Some(task);
        Ok(results_rx)
    }

    /// Build and run a commit flow for a proposal
    pub async fn commit(
        &self,
        proposal: Proposal,
        notary: Option<Arc<dyn Notarizer>>,
    ) -> Result<NotarizedTransaction, FlowFailure> {
        CommitFlow::new(self.ctx.clone(), notary).run(proposal).await
    }

    /// A commit flow handle for callers that need observers or the flow id
    pub fn commit_flow(&self, notary: Option<Arc<dyn Notarizer>>) -> CommitFlow {
        CommitFlow::new(self.ctx.clone(), notary)
    }
}

impl Drop for PartyNode {
    fn drop(&mut self) {
        if let Some(task) = self.responder_task.take() {
            task.abort();
        }
    }
}
