//! PACTUM flow engine
//!
//! Suspendable multi-party session protocol that drives a proposal through
//! propose -> sign -> notarize -> distribute. Each flow instance is a
//! single-threaded state machine whose state is checkpointed at every
//! suspension point (session open, send, receive, notary await); all other
//! work is synchronous.

pub mod context;
pub mod initiator;
pub mod message;
pub mod responder;
pub mod session;
pub mod state;

pub use context::FlowContext;
pub use initiator::CommitFlow;
pub use message::FlowMessage;
pub use responder::{AcceptancePredicate, ResponderFlow};
pub use session::{InProcEndpoint, InProcNetwork, Session, SessionListener, SessionTransport};
pub use state::{
    CheckpointStore, FlowCheckpoint, FlowFailure, FlowId, FlowState, MemoryCheckpointStore,
};
