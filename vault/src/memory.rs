//! In-memory vault implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use pactum_core::{PactumError, PactumResult, StateRef, TxId};
use pactum_ledger::{NotarizedTransaction, State, StateAndRef};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::store::{Lookup, StateStatus, VaultEntry, VaultStore};

#[derive(Default)]
struct VaultInner {
    states: HashMap<StateRef, State>,
    consumed: HashSet<StateRef>,
    recorded: HashSet<TxId>,
}

/// In-memory vault guarded by a single lock so `record_finalized` is atomic
#[derive(Default)]
pub struct MemoryVault {
    inner: RwLock<VaultInner>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for shared ownership
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl VaultStore for MemoryVault {
    async fn add_unconsumed(&self, state_ref: StateRef, state: State) -> PactumResult<()> {
        let mut inner = self.inner.write();
        if inner.consumed.contains(&state_ref) {
            return Err(PactumError::VaultError(format!(
                "reference {state_ref} is already consumed"
            )));
        }
        inner.states.insert(state_ref, state);
        Ok(())
    }

    async fn get(&self, state_ref: &StateRef) -> Option<VaultEntry> {
        let inner = self.inner.read();
        inner.states.get(state_ref).map(|state| VaultEntry {
            state: state.clone(),
            status: if inner.consumed.contains(state_ref) {
                StateStatus::Consumed
            } else {
                StateStatus::Unconsumed
            },
        })
    }

    async fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.inner.read().consumed.contains(state_ref)
    }

    async fn query_unconsumed(
        &self,
        state_type: &str,
        predicate: &(dyn for<'s> Fn(&'s State) -> bool + Sync),
    ) -> Vec<StateAndRef> {
        let inner = self.inner.read();
        let mut results: Vec<StateAndRef> = inner
            .states
            .iter()
            .filter(|(state_ref, state)| {
                !inner.consumed.contains(state_ref)
                    && state.state_type == state_type
                    && predicate(state)
            })
            .map(|(state_ref, state)| StateAndRef::new(*state_ref, state.clone()))
            .collect();
        // HashMap iteration order is arbitrary; sort for stable results
        results.sort_by_key(|sar| sar.state_ref);
        results
    }

    async fn resolve(&self, refs: &[StateRef]) -> PactumResult<Vec<StateAndRef>> {
        let inner = self.inner.read();
        refs.iter()
            .map(|state_ref| {
                inner
                    .states
                    .get(state_ref)
                    .map(|state| StateAndRef::new(*state_ref, state.clone()))
                    .ok_or(PactumError::StateNotFound(*state_ref))
            })
            .collect()
    }

    async fn lookup(&self, refs: &[StateRef]) -> Lookup {
        let inner = self.inner.read();
        let mut lookup = Lookup::default();
        for state_ref in refs {
            match inner.states.get(state_ref) {
                Some(state) => lookup
                    .found
                    .push(StateAndRef::new(*state_ref, state.clone())),
                None => lookup.missing.push(*state_ref),
            }
        }
        lookup
    }

    async fn record_finalized(&self, transaction: &NotarizedTransaction) -> PactumResult<()> {
        let txid = transaction.txid();
        let mut inner = self.inner.write();

        if !inner.recorded.insert(txid) {
            debug!(%txid, "transaction already recorded");
            return Ok(());
        }

        for input in &transaction.transaction.proposal.inputs {
            inner.consumed.insert(*input);
        }
        for (index, state) in transaction.transaction.proposal.outputs.iter().enumerate() {
            let state_ref = StateRef::new(txid, index as u32);
            inner.states.insert(state_ref, state.clone());
        }

        debug!(
            %txid,
            inputs = transaction.transaction.proposal.inputs.len(),
            outputs = transaction.transaction.proposal.outputs.len(),
            "recorded finalized transaction"
        );
        Ok(())
    }
}
