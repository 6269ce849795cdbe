use ibsendtrap_mad::RpcEnvelope;
use ibsendtrap_transport::{MadTransport, PortId, Result, SelfAddress, TransportError};

pub(crate) struct SentMad {
    pub rpc: RpcEnvelope,
    pub dest: PortId,
    pub payload: Vec<u8>,
}

/// In-memory transport that records every call.
pub(crate) struct RecordingTransport {
    pub self_lid: u16,
    pub sm_lid: u16,
    pub fail_self: bool,
    pub fail_sm: bool,
    pub send_status: Option<i32>,
    pub self_calls: usize,
    pub sm_calls: usize,
    pub sends: Vec<SentMad>,
}

impl RecordingTransport {
    pub(crate) fn new(self_lid: u16, sm_lid: u16) -> Self {
        Self {
            self_lid,
            sm_lid,
            fail_self: false,
            fail_sm: false,
            send_status: None,
            self_calls: 0,
            sm_calls: 0,
            sends: Vec::new(),
        }
    }
}

impl MadTransport for RecordingTransport {
    fn resolve_self(&mut self) -> Result<SelfAddress> {
        self.self_calls += 1;
        if self.fail_self {
            return Err(TransportError::NoDevice("mock".to_string()));
        }
        Ok(SelfAddress {
            port_id: PortId::smi(self.self_lid),
            port_num: 1,
        })
    }

    fn resolve_sm(&mut self) -> Result<PortId> {
        self.sm_calls += 1;
        if self.fail_sm {
            return Err(TransportError::NoSubnetManager {
                ca: "mock".to_string(),
                port: 1,
            });
        }
        Ok(PortId::smi(self.sm_lid))
    }

    fn send(&mut self, rpc: &RpcEnvelope, dest: &PortId, payload: &[u8]) -> Result<()> {
        self.sends.push(SentMad {
            rpc: *rpc,
            dest: *dest,
            payload: payload.to_vec(),
        });
        match self.send_status {
            Some(code) => Err(TransportError::Send {
                code,
                source: std::io::Error::from_raw_os_error(code),
            }),
            None => Ok(()),
        }
    }
}
