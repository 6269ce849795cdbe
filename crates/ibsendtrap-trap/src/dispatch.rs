use ibsendtrap_mad::{next_transaction_id, Notice, RpcEnvelope};
use ibsendtrap_transport::{MadTransport, PortId};
use tracing::debug;

use crate::error::{Result, TrapError};

/// Send `notice` to `dest` as an SMI Trap(Notice).
///
/// One unacknowledged send with a fresh transaction ID; no retry. Returns the
/// envelope that was sent.
pub fn dispatch<T: MadTransport + ?Sized>(
    transport: &mut T,
    notice: &Notice,
    dest: &PortId,
    m_key: u64,
) -> Result<RpcEnvelope> {
    let rpc = RpcEnvelope::smi_trap(next_transaction_id(), m_key);
    let payload = notice.to_bytes();

    debug!(
        tid = rpc.transaction_id,
        trap = notice.trap_number,
        dlid = dest.lid,
        "dispatching trap"
    );
    transport
        .send(&rpc, dest, &payload)
        .map_err(TrapError::Send)?;
    Ok(rpc)
}
