//! Resolved transaction view
//!
//! Contract rules never see raw proposals: they see a `LedgerView`, where
//! every input reference has been resolved to the state it points to.

use pactum_core::{PactumError, PactumResult, PartyId, TxId};
use pactum_ledger::{Command, Proposal, State, StateAndRef, TimeWindow};

/// A proposal with its inputs resolved to actual state values.
///
/// Resolution is the caller's responsibility (vault lookup locally,
/// `ResolveRequest` over a session remotely); the view only checks that the
/// resolution matches the proposal's input references.
#[derive(Debug, Clone)]
pub struct LedgerView {
    pub txid: TxId,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<State>,
    pub commands: Vec<Command>,
    pub time_window: Option<TimeWindow>,
    pub notary: Option<PartyId>,
}

impl LedgerView {
    /// Pair a proposal with resolved inputs. The resolved list must match
    /// the proposal's input references exactly, in order.
    pub fn from_proposal(proposal: &Proposal, resolved: Vec<StateAndRef>) -> PactumResult<Self> {
        if resolved.len() != proposal.inputs.len() {
            return Err(PactumError::InvalidProposal(format!(
                "resolved {} inputs for a proposal with {}",
                resolved.len(),
                proposal.inputs.len()
            )));
        }
        for (expected, actual) in proposal.inputs.iter().zip(resolved.iter()) {
            if *expected != actual.state_ref {
                return Err(PactumError::InvalidProposal(format!(
                    "resolved input {} does not match proposal input {}",
                    actual.state_ref, expected
                )));
            }
        }

        Ok(Self {
            txid: proposal.content_id(),
            inputs: resolved,
            outputs: proposal.outputs.clone(),
            commands: proposal.commands.clone(),
            time_window: proposal.time_window,
            notary: proposal.notary,
        })
    }

    /// All input states of the given type
    pub fn inputs_of_type(&self, state_type: &str) -> Vec<&State> {
        self.inputs
            .iter()
            .map(|sar| &sar.state)
            .filter(|s| s.state_type == state_type)
            .collect()
    }

    /// All output states of the given type
    pub fn outputs_of_type(&self, state_type: &str) -> Vec<&State> {
        self.outputs
            .iter()
            .filter(|s| s.state_type == state_type)
            .collect()
    }

    /// All commands of the given type
    pub fn commands_of_type(&self, command_type: &str) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.command_type() == command_type)
            .collect()
    }

    /// Input states of a type that satisfy a predicate
    pub fn filter_inputs(&self, state_type: &str, pred: impl Fn(&State) -> bool) -> Vec<&State> {
        self.inputs_of_type(state_type)
            .into_iter()
            .filter(|s| pred(s))
            .collect()
    }

    /// Output states of a type that satisfy a predicate
    pub fn filter_outputs(&self, state_type: &str, pred: impl Fn(&State) -> bool) -> Vec<&State> {
        self.outputs_of_type(state_type)
            .into_iter()
            .filter(|s| pred(s))
            .collect()
    }

    /// The single input of a type, or a violation naming the count
    pub fn single_input(&self, state_type: &str) -> PactumResult<&State> {
        let matched = self.inputs_of_type(state_type);
        match matched.as_slice() {
            [one] => Ok(*one),
            _ => Err(PactumError::ContractViolation(format!(
                "expected exactly one '{state_type}' input, found {}",
                matched.len()
            ))),
        }
    }

    /// The single output of a type, or a violation naming the count
    pub fn single_output(&self, state_type: &str) -> PactumResult<&State> {
        let matched = self.outputs_of_type(state_type);
        match matched.as_slice() {
            [one] => Ok(*one),
            _ => Err(PactumError::ContractViolation(format!(
                "expected exactly one '{state_type}' output, found {}",
                matched.len()
            ))),
        }
    }

    /// The single command of a type, or a violation naming the count
    pub fn single_command(&self, command_type: &str) -> PactumResult<&Command> {
        let matched = self.commands_of_type(command_type);
        match matched.as_slice() {
            [one] => Ok(*one),
            _ => Err(PactumError::ContractViolation(format!(
                "expected exactly one '{command_type}' command, found {}",
                matched.len()
            ))),
        }
    }
}
