use ibsendtrap_mad::Notice;
use ibsendtrap_transport::{MadTransport, PortId, SelfAddress};
use tracing::info;

use crate::builder::build_notice;
use crate::catalog::{lookup, TrapKind};
use crate::dispatch::dispatch;
use crate::error::{Result, TrapError};

/// Port reported by the link integrity trap when none is configured.
pub const DEFAULT_ERROR_PORT: i64 = 1;

/// Caller-supplied trap parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapConfig {
    /// Port reported by the link integrity trap. Truncated to a byte on the wire.
    pub error_port: i64,
    /// M_Key placed in the SMP.
    pub m_key: u64,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            error_port: DEFAULT_ERROR_PORT,
            m_key: 0,
        }
    }
}

/// What was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapReport {
    pub trap: TrapKind,
    pub notice: Notice,
    pub issuer: SelfAddress,
    pub destination: PortId,
    pub transaction_id: u64,
}

/// An open transport plus the trap parameters, threaded through one send.
///
/// Owns the transport; dropping the context releases it.
pub struct TrapContext<T> {
    transport: T,
    config: TrapConfig,
}

impl<T: MadTransport> TrapContext<T> {
    pub fn new(transport: T, config: TrapConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &TrapConfig {
        &self.config
    }

    /// Release the context, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Look up `name` in the catalog and send that trap.
    ///
    /// An unknown name touches nothing on the transport.
    pub fn send_trap(&mut self, name: &str) -> Result<TrapReport> {
        let trap = lookup(name).ok_or_else(|| TrapError::UnknownTrap(name.to_string()))?;
        self.send(trap)
    }

    /// Resolve addresses, build the notice for `trap` and dispatch it.
    ///
    /// Either resolution failing aborts before anything is sent.
    pub fn send(&mut self, trap: TrapKind) -> Result<TrapReport> {
        let issuer = self
            .transport
            .resolve_self()
            .map_err(TrapError::ResolveSelf)?;
        let destination = self
            .transport
            .resolve_sm()
            .map_err(TrapError::ResolveSm)?;

        let notice = build_notice(trap, issuer.lid(), &self.config);
        let rpc = dispatch(&mut self.transport, &notice, &destination, self.config.m_key)?;

        info!(
            trap = trap.name(),
            trap_number = notice.trap_number,
            issuer_lid = issuer.lid(),
            sm_lid = destination.lid,
            tid = rpc.transaction_id,
            "trap sent"
        );
        Ok(TrapReport {
            trap,
            notice,
            issuer,
            destination,
            transaction_id: rpc.transaction_id,
        })
    }
}
