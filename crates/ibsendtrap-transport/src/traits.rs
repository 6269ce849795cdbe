use ibsendtrap_mad::RpcEnvelope;

use crate::error::Result;

/// Address of a fabric endpoint, LID routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortId {
    pub lid: u16,
    /// Service level used to reach the endpoint.
    pub sl: u8,
    /// Destination queue pair; 0 for subnet management.
    pub qp: u32,
    pub qkey: u32,
}

impl PortId {
    /// Subnet management address of `lid` on SL 0.
    pub fn smi(lid: u16) -> Self {
        Self {
            lid,
            ..Self::default()
        }
    }
}

/// The local port's own address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfAddress {
    pub port_id: PortId,
    /// Physical port number on the local device.
    pub port_num: u8,
}

impl SelfAddress {
    pub fn lid(&self) -> u16 {
        self.port_id.lid
    }
}

/// An open management transport.
///
/// Implementations own the underlying handle exclusively and release it on drop.
/// Every call blocks the caller until it completes or fails.
pub trait MadTransport {
    /// Resolve the address of the local port.
    fn resolve_self(&mut self) -> Result<SelfAddress>;

    /// Resolve the address of the subnet manager.
    fn resolve_sm(&mut self) -> Result<PortId>;

    /// Send one datagram described by `rpc` carrying `payload` to `dest`.
    ///
    /// Fire-and-forget: no response is awaited and nothing is retried.
    fn send(&mut self, rpc: &RpcEnvelope, dest: &PortId, payload: &[u8]) -> Result<()>;
}

impl<T: MadTransport + ?Sized> MadTransport for &mut T {
    fn resolve_self(&mut self) -> Result<SelfAddress> {
        (**self).resolve_self()
    }

    fn resolve_sm(&mut self) -> Result<PortId> {
        (**self).resolve_sm()
    }

    fn send(&mut self, rpc: &RpcEnvelope, dest: &PortId, payload: &[u8]) -> Result<()> {
        (**self).send(rpc, dest, payload)
    }
}
