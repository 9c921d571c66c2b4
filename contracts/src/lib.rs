//! PACTUM contract verification engine
//!
//! A pure, deterministic predicate over resolved transactions: structural
//! checks plus pluggable per-command-type rules. Verification always runs
//! before any signature is requested.

pub mod agreement;
pub mod registry;
pub mod view;

pub use registry::{ContractRule, FnRule, RuleRegistry};
pub use view::LedgerView;
