//! The fixed set of traps this tool can impersonate.
//!
//! Order is significant: the first entry is the default and help text lists
//! entries in this order.

use std::fmt;
use std::str::FromStr;

use ibsendtrap_mad::consts::{TRAP_LOCAL_CHANGES, TRAP_LOCAL_LINK_INTEGRITY};
use serde::Serialize;

use crate::error::TrapError;

/// A trap that can be built and sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapKind {
    /// Trap 144 reporting a NodeDescription change.
    NodeDescChange,
    /// Trap 129 reporting a local link integrity error on a port.
    LocalLinkIntegrity,
}

/// All traps, in catalog order.
pub const TRAPS: [TrapKind; 2] = [TrapKind::NodeDescChange, TrapKind::LocalLinkIntegrity];

impl TrapKind {
    /// Stable name used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            TrapKind::NodeDescChange => "node_desc_change",
            TrapKind::LocalLinkIntegrity => "local_link_integrity",
        }
    }

    /// Generic trap number carried in the notice.
    pub const fn trap_number(self) -> u16 {
        match self {
            TrapKind::NodeDescChange => TRAP_LOCAL_CHANGES,
            TrapKind::LocalLinkIntegrity => TRAP_LOCAL_LINK_INTEGRITY,
        }
    }
}

impl Default for TrapKind {
    fn default() -> Self {
        default_trap()
    }
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrapKind {
    type Err = TrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(s).ok_or_else(|| TrapError::UnknownTrap(s.to_string()))
    }
}

/// Find a trap by its exact name.
pub fn lookup(name: &str) -> Option<TrapKind> {
    TRAPS.iter().copied().find(|kind| kind.name() == name)
}

/// The trap sent when none is named.
pub fn default_trap() -> TrapKind {
    TRAPS[0]
}

/// Trap names in catalog order.
pub fn names() -> impl Iterator<Item = &'static str> {
    TRAPS.iter().map(|kind| kind.name())
}

/// Help text describing the trap name argument.
pub fn usage_text() -> String {
    let mut text = String::from("Argument <TRAP_NAME> can be one of the following:\n");
    for name in names() {
        text.push_str("  ");
        text.push_str(name);
        text.push('\n');
    }
    text.push_str(&format!(
        "\n  default behavior is to send \"{}\"",
        default_trap().name()
    ));
    text
}
