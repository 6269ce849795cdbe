//! SMI trap catalog, notice construction and dispatch.
//!
//! This is the layer the CLI drives. Pick a [`TrapKind`] by name, wrap an
//! open transport in a [`TrapContext`], and send: the context resolves the
//! local and subnet manager addresses, builds the notice and dispatches it
//! as a fire-and-forget SMI Trap.

pub mod builder;
pub mod catalog;
pub mod context;
pub mod dispatch;
pub mod error;

#[cfg(test)]
mod testing;

pub use builder::{build_notice, local_link_integrity, node_desc_change, port_num_from};
pub use catalog::{default_trap, lookup, names, usage_text, TrapKind, TRAPS};
pub use context::{TrapConfig, TrapContext, TrapReport, DEFAULT_ERROR_PORT};
pub use dispatch::dispatch;
pub use error::{Result, TrapError};
