//! Send InfiniBand SMI traps to the subnet manager.
//!
//! ibsendtrap impersonates a hardware event by sending a generic Trap(Notice)
//! from the local port to the fabric's subnet manager. Useful for exercising
//! how a subnet manager reacts to node description changes and link errors.
//!
//! # Crate Structure
//!
//! - [`mad`] — MAD and notice wire encoding
//! - [`transport`] — Management transport abstraction (Linux user MAD)
//! - [`trap`] — Trap catalog, notice construction and dispatch

/// Re-export wire encoding types.
pub mod mad {
    pub use ibsendtrap_mad::*;
}

/// Re-export transport types.
pub mod transport {
    pub use ibsendtrap_transport::*;
}

/// Re-export trap types.
pub mod trap {
    pub use ibsendtrap_trap::*;
}
