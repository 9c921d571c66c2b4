//! PACTUM node runtime
//!
//! Hosts parties in-process: identity directory, per-party service hub, and
//! logging initialization. RPC and CLI surfaces are out of scope; this crate
//! exists to wire the core components together and run multi-party flows.

pub mod directory;
pub mod runtime;

pub use directory::{IdentityDirectory, PartyInfo};
pub use runtime::PartyNode;

use tracing_subscriber::EnvFilter;

/// Initialize logging for a node process. `level` is used when `RUST_LOG`
/// is not set. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
