//! Pluggable verification rules
//!
//! Rule sets are keyed by command type. The engine defines the evaluation
//! contract, not a fixed rule catalog: every command present in a
//! transaction is dispatched to its registered rule, and a command type
//! with no rule is itself a verification failure.

use dashmap::DashMap;
use pactum_core::{PactumError, PactumResult};
use pactum_ledger::Command;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::view::LedgerView;

/// A verification rule for one command type.
///
/// Rules are pure, deterministic predicates: no I/O, no randomness, and no
/// clock reads beyond the view's own declared time window.
pub trait ContractRule: Send + Sync {
    fn verify(&self, view: &LedgerView, command: &Command) -> PactumResult<()>;
}

/// Adapter so plain functions and closures can register as rules
pub struct FnRule<F>(pub F);

impl<F> ContractRule for FnRule<F>
where
    F: Fn(&LedgerView, &Command) -> PactumResult<()> + Send + Sync,
{
    fn verify(&self, view: &LedgerView, command: &Command) -> PactumResult<()> {
        (self.0)(view, command)
    }
}

/// Registry mapping command-type tags to verification rules
#[derive(Default)]
pub struct RuleRegistry {
    rules: DashMap<String, Arc<dyn ContractRule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
        }
    }

    /// Register a rule for a command type, replacing any previous rule
    pub fn register(&self, command_type: impl Into<String>, rule: Arc<dyn ContractRule>) {
        self.rules.insert(command_type.into(), rule);
    }

    /// Register a closure as a rule
    pub fn register_fn<F>(&self, command_type: impl Into<String>, rule: F)
    where
        F: Fn(&LedgerView, &Command) -> PactumResult<()> + Send + Sync + 'static,
    {
        self.register(command_type, Arc::new(FnRule(rule)));
    }

    /// Look up the rule for a command type
    pub fn rule_for(&self, command_type: &str) -> Option<Arc<dyn ContractRule>> {
        self.rules.get(command_type).map(|r| r.clone())
    }

    /// Verify a resolved transaction view.
    ///
    /// Structural invariants are checked first, then every command is
    /// dispatched to its registered rule. The first failure aborts with a
    /// diagnosable reason; this must run before any signature is requested.
    pub fn verify(&self, view: &LedgerView) -> PactumResult<()> {
        check_structure(view)?;

        for command in &view.commands {
            let command_type = command.command_type();
            let rule = self
                .rules
                .get(command_type)
                .ok_or_else(|| PactumError::NoRuleRegistered(command_type.to_string()))?;
            debug!(txid = %view.txid, command = command_type, "evaluating contract rule");
            rule.verify(view, command)?;
        }

        Ok(())
    }
}

/// Shape checks that hold for every transaction regardless of rule set
fn check_structure(view: &LedgerView) -> PactumResult<()> {
    if view.inputs.is_empty() && view.outputs.is_empty() && view.commands.is_empty() {
        return Err(PactumError::ContractViolation(
            "transaction has no inputs, outputs, or commands".into(),
        ));
    }

    let mut seen = BTreeSet::new();
    for input in &view.inputs {
        if !seen.insert(input.state_ref) {
            return Err(PactumError::DuplicateInput(input.state_ref));
        }
    }

    if let Some(window) = &view.time_window {
        window.validate()?;
    }

    if (!view.inputs.is_empty() || view.time_window.is_some()) && view.notary.is_none() {
        return Err(PactumError::ContractViolation(
            "a transaction with inputs or a time window must name a notary".into(),
        ));
    }

    for (index, command) in view.commands.iter().enumerate() {
        if command.signers.is_empty() {
            return Err(PactumError::ContractViolation(format!(
                "command #{index} ('{}') has no required signers",
                command.command_type()
            )));
        }
    }

    Ok(())
}
