//! Transaction proposals
//!
//! A proposal is an immutable, content-addressed draft transaction: consumed
//! state references, new output states, commands, an optional validity time
//! window, and a designated notary. Any change produces a new proposal with
//! a new content identifier.

use pactum_core::{
    Hash, Hashable, PactumError, PactumResult, Party, PartyId, PublicKey, Signable, StateRef,
    Timestamp, TxId,
};
use pactum_crypto::hashing::tagged_hash;
use pactum_crypto::signing::transaction_signing_message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::command::Command;
use crate::state::State;

/// Domain tag for proposal content identifiers
const PROPOSAL_TAG: &[u8] = b"PACTUM_PROPOSAL:";

/// The period during which a transaction must be notarized.
///
/// Open at either end; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub after: Option<Timestamp>,
    pub before: Option<Timestamp>,
}

impl TimeWindow {
    pub fn between(after: Timestamp, before: Timestamp) -> Self {
        Self {
            after: Some(after),
            before: Some(before),
        }
    }

    pub fn from_only(after: Timestamp) -> Self {
        Self {
            after: Some(after),
            before: None,
        }
    }

    pub fn until_only(before: Timestamp) -> Self {
        Self {
            after: None,
            before: Some(before),
        }
    }

    /// A window centered on an instant, extending `tolerance_ms` either side
    pub fn with_tolerance(instant: Timestamp, tolerance_ms: u64) -> Self {
        Self {
            after: Some(instant.saturating_sub_millis(tolerance_ms)),
            before: Some(instant.saturating_add_millis(tolerance_ms)),
        }
    }

    /// Check whether an instant falls within the window
    pub fn contains(&self, instant: Timestamp) -> bool {
        if let Some(after) = self.after {
            if instant < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if instant > before {
                return false;
            }
        }
        true
    }

    /// A window is well-formed when it has at least one bound and the bounds
    /// are not inverted
    pub fn validate(&self) -> PactumResult<()> {
        match (self.after, self.before) {
            (None, None) => Err(PactumError::InvalidTimeWindow(
                "time window must have at least one bound".into(),
            )),
            (Some(a), Some(b)) if a > b => Err(PactumError::InvalidTimeWindow(format!(
                "window start {a} is after window end {b}"
            ))),
            _ => Ok(()),
        }
    }
}

/// An unsigned candidate transaction.
///
/// Immutable once constructed; use [`ProposalBuilder`] to assemble one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Consumed state references, in order
    pub inputs: Vec<StateRef>,
    /// Newly created states, in order
    pub outputs: Vec<State>,
    /// Commands authorizing this transaction, in order
    pub commands: Vec<Command>,
    /// Optional validity window for notarization
    pub time_window: Option<TimeWindow>,
    /// Designated notary; required whenever inputs or a window are present
    pub notary: Option<PartyId>,
}

impl Proposal {
    /// The content identifier: a collision-resistant hash of the canonical
    /// encoding. Signatures are always computed over this identifier.
    pub fn content_id(&self) -> TxId {
        // BTreeMap attributes and ordered Vecs make the bincode encoding
        // canonical for a given proposal value.
        let encoded = bincode::serialize(self).unwrap_or_default();
        tagged_hash(PROPOSAL_TAG, &encoded)
    }

    /// Whether this proposal must be notarized before finalization
    pub fn requires_notary(&self) -> bool {
        !self.inputs.is_empty() || self.time_window.is_some()
    }

    /// Reference to the `index`-th output of this proposal
    pub fn output_ref(&self, index: u32) -> StateRef {
        StateRef::new(self.content_id(), index)
    }

    /// Union of required signer keys across all commands, lexically ordered
    pub fn required_signers(&self) -> BTreeSet<PublicKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    /// Parties participating in any output state
    pub fn output_participants(&self) -> BTreeSet<Party> {
        self.outputs
            .iter()
            .flat_map(|s| s.participants.iter().copied())
            .collect()
    }
}

impl Hashable for Proposal {
    fn hash(&self) -> Hash {
        self.content_id()
    }
}

impl Signable for Proposal {
    fn signing_bytes(&self) -> Vec<u8> {
        transaction_signing_message(&self.content_id())
    }
}

/// Builder for proposals; enforces the structural invariants at build time
#[derive(Debug, Default)]
pub struct ProposalBuilder {
    inputs: Vec<StateRef>,
    outputs: Vec<State>,
    commands: Vec<Command>,
    time_window: Option<TimeWindow>,
    notary: Option<PartyId>,
}

impl ProposalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(mut self, state_ref: StateRef) -> Self {
        self.inputs.push(state_ref);
        self
    }

    pub fn add_output(mut self, state: State) -> Self {
        self.outputs.push(state);
        self
    }

    pub fn add_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn set_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn set_notary(mut self, notary: PartyId) -> Self {
        self.notary = Some(notary);
        self
    }

    /// Build the proposal, checking structural invariants:
    /// - the transaction must not be empty;
    /// - input references must be distinct;
    /// - a proposal with any input or a time window must name a notary;
    /// - a declared time window must be well-formed.
    pub fn build(self) -> PactumResult<Proposal> {
        if self.inputs.is_empty() && self.outputs.is_empty() && self.commands.is_empty() {
            return Err(PactumError::InvalidProposal(
                "proposal has no inputs, outputs, or commands".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for input in &self.inputs {
            if !seen.insert(*input) {
                return Err(PactumError::DuplicateInput(*input));
            }
        }

        if let Some(window) = &self.time_window {
            window.validate()?;
        }

        let needs_notary = !self.inputs.is_empty() || self.time_window.is_some();
        if needs_notary && self.notary.is_none() {
            return Err(PactumError::InvalidProposal(
                "a proposal with inputs or a time window must name a notary".into(),
            ));
        }

        Ok(Proposal {
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            time_window: self.time_window,
            notary: self.notary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandData;
    use pactum_core::PartyId;

    fn notary_id() -> PartyId {
        PartyId([0xAA; 32])
    }

    fn sample_command() -> Command {
        Command::new(CommandData::type_only("agreement.issue"), vec![PublicKey([1u8; 32])])
    }

    #[test]
    fn test_content_id_is_idempotent() {
        let proposal = ProposalBuilder::new()
            .add_output(State::new("agreement").with_attribute("data", "state data"))
            .add_command(sample_command())
            .build()
            .unwrap();

        let a = proposal.content_id();
        let b = proposal.content_id();
        assert_eq!(a, b);

        // Re-encoding through serde must not change the identifier
        let encoded = bincode::serialize(&proposal).unwrap();
        let decoded: Proposal = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded.content_id(), a);
    }

    #[test]
    fn test_any_change_produces_new_id() {
        let base = ProposalBuilder::new()
            .add_output(State::new("agreement").with_attribute("data", "state data"))
            .add_command(sample_command())
            .build()
            .unwrap();
        let changed = ProposalBuilder::new()
            .add_output(State::new("agreement").with_attribute("data", "other data"))
            .add_command(sample_command())
            .build()
            .unwrap();

        assert_ne!(base.content_id(), changed.content_id());
    }

    #[test]
    fn test_inputs_require_notary() {
        let result = ProposalBuilder::new()
            .add_input(StateRef::new(Hash([1u8; 32]), 0))
            .add_output(State::new("agreement"))
            .add_command(sample_command())
            .build();

        assert!(matches!(result, Err(PactumError::InvalidProposal(_))));
    }

    #[test]
    fn test_time_window_requires_notary() {
        let result = ProposalBuilder::new()
            .add_output(State::new("agreement"))
            .add_command(sample_command())
            .set_time_window(TimeWindow::until_only(Timestamp::from_millis(10_000)))
            .build();

        assert!(matches!(result, Err(PactumError::InvalidProposal(_))));
    }

    #[test]
    fn test_duplicate_inputs_rejected() {
        let input = StateRef::new(Hash([1u8; 32]), 0);
        let result = ProposalBuilder::new()
            .add_input(input)
            .add_input(input)
            .add_command(sample_command())
            .set_notary(notary_id())
            .build();

        assert!(matches!(result, Err(PactumError::DuplicateInput(_))));
    }

    #[test]
    fn test_empty_proposal_rejected() {
        assert!(ProposalBuilder::new().build().is_err());
    }

    #[test]
    fn test_notary_free_issuance_allowed() {
        let proposal = ProposalBuilder::new()
            .add_output(State::new("agreement"))
            .add_command(sample_command())
            .build()
            .unwrap();

        assert!(!proposal.requires_notary());
    }

    #[test]
    fn test_time_window_contains() {
        let window = TimeWindow::between(Timestamp::from_millis(100), Timestamp::from_millis(200));
        assert!(window.contains(Timestamp::from_millis(100)));
        assert!(window.contains(Timestamp::from_millis(150)));
        assert!(!window.contains(Timestamp::from_millis(201)));

        let open_start = TimeWindow::until_only(Timestamp::from_millis(50));
        assert!(open_start.contains(Timestamp::from_millis(0)));
        assert!(!open_start.contains(Timestamp::from_millis(51)));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let window = TimeWindow::between(Timestamp::from_millis(200), Timestamp::from_millis(100));
        assert!(window.validate().is_err());
    }

    #[test]
    fn test_with_tolerance_window() {
        let window = TimeWindow::with_tolerance(Timestamp::from_millis(1000), 30);
        assert!(window.contains(Timestamp::from_millis(970)));
        assert!(window.contains(Timestamp::from_millis(1030)));
        assert!(!window.contains(Timestamp::from_millis(1031)));
    }

    #[test]
    fn test_signing_bytes_cover_the_content_id() {
        let proposal = ProposalBuilder::new()
            .add_output(State::new("agreement").with_attribute("data", "state data"))
            .add_command(sample_command())
            .build()
            .unwrap();

        assert_eq!(proposal.hash(), proposal.content_id());
        assert_eq!(
            proposal.signing_bytes(),
            transaction_signing_message(&proposal.content_id())
        );
    }

    #[test]
    fn test_required_signers_union() {
        let k1 = PublicKey([1u8; 32]);
        let k2 = PublicKey([2u8; 32]);
        let proposal = ProposalBuilder::new()
            .add_output(State::new("agreement"))
            .add_command(Command::new(CommandData::type_only("a"), vec![k2, k1]))
            .add_command(Command::new(CommandData::type_only("b"), vec![k1]))
            .build()
            .unwrap();

        let signers: Vec<_> = proposal.required_signers().into_iter().collect();
        assert_eq!(signers, vec![k1, k2]);
    }
}
