//! PACTUM ledger data model
//!
//! States, commands, proposals, and the signed/notarized transaction types
//! that flows exchange and notaries attest.

pub mod command;
pub mod proposal;
pub mod state;
pub mod transaction;

pub use command::{Command, CommandData};
pub use proposal::{Proposal, ProposalBuilder, TimeWindow};
pub use state::{AttributeValue, State, StateAndRef};
pub use transaction::{NotarizedTransaction, NotarySignature, SignedTransaction};
