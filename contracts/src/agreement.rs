//! Agreement contract
//!
//! A worked rule set for bilateral "agreement" states, used by the node
//! runtime and the integration tests. Verification runs in three steps:
//! shape, contents, then signatures.

use pactum_core::{PactumError, PactumResult};
use pactum_ledger::Command;
use std::sync::Arc;

use crate::registry::{ContractRule, RuleRegistry};
use crate::view::LedgerView;

/// State type governed by this contract
pub const AGREEMENT_STATE: &str = "agreement";

/// Creates a new agreement with no inputs
pub const ISSUE_COMMAND: &str = "agreement.issue";

/// Replaces an existing agreement with an amended one
pub const AMEND_COMMAND: &str = "agreement.amend";

/// Register both agreement rules into a registry
pub fn register_agreement_rules(registry: &RuleRegistry) {
    registry.register(ISSUE_COMMAND, Arc::new(IssueRule));
    registry.register(AMEND_COMMAND, Arc::new(AmendRule));
}

/// Issue: no agreement inputs, one agreement output carrying data, and
/// every participant of the new agreement must be a required signer.
struct IssueRule;

impl ContractRule for IssueRule {
    fn verify(&self, view: &LedgerView, command: &Command) -> PactumResult<()> {
        // Shape
        if !view.inputs_of_type(AGREEMENT_STATE).is_empty() {
            return Err(PactumError::ContractViolation(
                "issue must not consume an agreement".into(),
            ));
        }
        let output = view.single_output(AGREEMENT_STATE)?;

        // Contents
        let data = output
            .attribute("data")
            .and_then(|v| v.as_text())
            .ok_or_else(|| {
                PactumError::ContractViolation("issued agreement must carry a 'data' attribute".into())
            })?;
        if data.is_empty() {
            return Err(PactumError::ContractViolation(
                "issued agreement data must be non-empty".into(),
            ));
        }
        if output.participants.len() < 2 {
            return Err(PactumError::ContractViolation(
                "an agreement needs at least two participants".into(),
            ));
        }

        // Signatures
        for participant in &output.participants {
            if !command.requires_signer(&participant.key) {
                return Err(PactumError::ContractViolation(format!(
                    "participant {} must be a required signer",
                    participant.id
                )));
            }
        }

        Ok(())
    }
}

/// Amend: one agreement in, one agreement out, participants preserved, the
/// command payload names the new data, and every participant of both the
/// old and the new agreement must be a required signer.
struct AmendRule;

impl ContractRule for AmendRule {
    fn verify(&self, view: &LedgerView, command: &Command) -> PactumResult<()> {
        // Shape
        let input = view.single_input(AGREEMENT_STATE)?;
        let output = view.single_output(AGREEMENT_STATE)?;

        // Contents
        let new_data = output
            .attribute("data")
            .and_then(|v| v.as_text())
            .ok_or_else(|| {
                PactumError::ContractViolation("amended agreement must carry a 'data' attribute".into())
            })?;
        let declared = command
            .data
            .payload_value("data")
            .and_then(|v| v.as_text())
            .ok_or_else(|| {
                PactumError::ContractViolation("amend command must declare the new 'data'".into())
            })?;
        if new_data != declared {
            return Err(PactumError::ContractViolation(format!(
                "amended data '{new_data}' does not match the command's declared '{declared}'"
            )));
        }
        if output.participants != input.participants {
            return Err(PactumError::ContractViolation(
                "amendment must preserve the agreement's participants".into(),
            ));
        }

        // Signatures
        for participant in input.participants.iter().chain(&output.participants) {
            if !command.requires_signer(&participant.key) {
                return Err(PactumError::ContractViolation(format!(
                    "participant {} must be a required signer",
                    participant.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{Hash, Party, PartyId, PublicKey, StateRef};
    use pactum_ledger::{CommandData, ProposalBuilder, State, StateAndRef};

    fn party(tag: u8) -> Party {
        Party::new(PartyId([tag; 32]), PublicKey([tag; 32]))
    }

    fn registry() -> RuleRegistry {
        let registry = RuleRegistry::new();
        register_agreement_rules(&registry);
        registry
    }

    fn agreement(data: &str, a: Party, b: Party) -> State {
        State::new(AGREEMENT_STATE)
            .with_attribute("data", data)
            .with_participant(a)
            .with_participant(b)
    }

    #[test]
    fn test_issue_accepts_valid() {
        let (a, b) = (party(1), party(2));
        let proposal = ProposalBuilder::new()
            .add_output(agreement("state data", a, b))
            .add_command(Command::new(
                CommandData::type_only(ISSUE_COMMAND),
                vec![a.key, b.key],
            ))
            .build()
            .unwrap();
        let view = LedgerView::from_proposal(&proposal, vec![]).unwrap();

        assert!(registry().verify(&view).is_ok());
    }

    #[test]
    fn test_issue_rejects_missing_participant_signer() {
        let (a, b) = (party(1), party(2));
        let proposal = ProposalBuilder::new()
            .add_output(agreement("state data", a, b))
            .add_command(Command::new(
                CommandData::type_only(ISSUE_COMMAND),
                vec![a.key], // b's key missing
            ))
            .build()
            .unwrap();
        let view = LedgerView::from_proposal(&proposal, vec![]).unwrap();

        assert!(matches!(
            registry().verify(&view),
            Err(PactumError::ContractViolation(_))
        ));
    }

    #[test]
    fn test_issue_rejects_empty_data() {
        let (a, b) = (party(1), party(2));
        let proposal = ProposalBuilder::new()
            .add_output(agreement("", a, b))
            .add_command(Command::new(
                CommandData::type_only(ISSUE_COMMAND),
                vec![a.key, b.key],
            ))
            .build()
            .unwrap();
        let view = LedgerView::from_proposal(&proposal, vec![]).unwrap();

        assert!(registry().verify(&view).is_err());
    }

    fn amend_view(new_data: &str, declared: &str) -> LedgerView {
        let (a, b) = (party(1), party(2));
        let input_ref = StateRef::new(Hash([7u8; 32]), 0);
        let proposal = ProposalBuilder::new()
            .add_input(input_ref)
            .add_output(agreement(new_data, a, b))
            .add_command(Command::new(
                CommandData::type_only(AMEND_COMMAND).with_payload("data", declared),
                vec![a.key, b.key],
            ))
            .set_notary(PartyId([0xAA; 32]))
            .build()
            .unwrap();
        let resolved = vec![StateAndRef::new(input_ref, agreement("old data", a, b))];
        LedgerView::from_proposal(&proposal, resolved).unwrap()
    }

    #[test]
    fn test_amend_accepts_valid() {
        let view = amend_view("new data", "new data");
        assert!(registry().verify(&view).is_ok());
    }

    #[test]
    fn test_amend_rejects_payload_mismatch() {
        let view = amend_view("new data", "different data");
        match registry().verify(&view) {
            Err(PactumError::ContractViolation(reason)) => {
                assert!(reason.contains("does not match"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_amend_rejects_changed_participants() {
        let (a, b, c) = (party(1), party(2), party(3));
        let input_ref = StateRef::new(Hash([7u8; 32]), 0);
        let proposal = ProposalBuilder::new()
            .add_input(input_ref)
            .add_output(agreement("new data", a, c))
            .add_command(Command::new(
                CommandData::type_only(AMEND_COMMAND).with_payload("data", "new data"),
                vec![a.key, b.key, c.key],
            ))
            .set_notary(PartyId([0xAA; 32]))
            .build()
            .unwrap();
        let resolved = vec![StateAndRef::new(input_ref, agreement("old data", a, b))];
        let view = LedgerView::from_proposal(&proposal, resolved).unwrap();

        assert!(registry().verify(&view).is_err());
    }
}
