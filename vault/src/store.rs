//! Vault store trait and types

use async_trait::async_trait;
use pactum_core::{PactumResult, StateRef};
use pactum_ledger::{NotarizedTransaction, State, StateAndRef};

/// Consumption status of a known state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateStatus {
    Unconsumed,
    Consumed,
}

/// A state the vault knows about, with its status
#[derive(Debug, Clone)]
pub struct VaultEntry {
    pub state: State,
    pub status: StateStatus,
}

/// The outcome of a best-effort multi-reference lookup
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    pub found: Vec<StateAndRef>,
    pub missing: Vec<StateRef>,
}

/// A party's view of the ledger: known states and their statuses.
///
/// The vault is mutated only by its owning party, and — apart from seeding —
/// only in a flow's `FINALIZED` transition.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Seed a state as unconsumed (genesis and test setup)
    async fn add_unconsumed(&self, state_ref: StateRef, state: State) -> PactumResult<()>;

    /// Fetch a known state and its status
    async fn get(&self, state_ref: &StateRef) -> Option<VaultEntry>;

    /// Whether a reference is known to be consumed
    async fn is_consumed(&self, state_ref: &StateRef) -> bool;

    /// All unconsumed states of a type matching a predicate
    async fn query_unconsumed(
        &self,
        state_type: &str,
        predicate: &(dyn for<'s> Fn(&'s State) -> bool + Sync),
    ) -> Vec<StateAndRef>;

    /// Resolve references to states; any missing reference is an error
    async fn resolve(&self, refs: &[StateRef]) -> PactumResult<Vec<StateAndRef>>;

    /// Best-effort lookup splitting references into found and missing
    async fn lookup(&self, refs: &[StateRef]) -> Lookup;

    /// Record a finalized transaction: mark every input consumed and add
    /// every output as unconsumed, atomically with respect to this store.
    /// Recording the same transaction twice is a no-op.
    async fn record_finalized(&self, transaction: &NotarizedTransaction) -> PactumResult<()>;
}
