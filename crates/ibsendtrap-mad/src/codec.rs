use bytes::{Buf, BufMut, BytesMut};

use crate::consts::{
    ATTR_NOTICE, IB_SMI_CLASS, MAD_BASE_VERSION, METHOD_TRAP, SMI_CLASS_VERSION, SMP_DATA_OFFSET,
    SMP_DATA_SIZE,
};
use crate::error::{MadError, Result};

/// Common MAD header: versions (3) + method (1) + status (2) + class specific (2) +
/// TID (8) + attribute ID (2) + reserved (2) + attribute modifier (4) = 24 bytes.
pub const MAD_HEADER_SIZE: usize = 24;

/// Every MAD is exactly 256 bytes on the wire.
pub const MAD_SIZE: usize = 256;

/// End of the SMP M_Key field; the data area may not start before it.
const SMP_MKEY_END: usize = MAD_HEADER_SIZE + 8;

/// Per-send description of a management RPC.
///
/// Built immediately before a send and discarded afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcEnvelope {
    pub mgmt_class: u8,
    pub method: u8,
    pub attr_id: u16,
    pub attr_mod: u32,
    pub transaction_id: u64,
    /// SMP M_Key; ignored by the manager unless M_Key protection is on.
    pub m_key: u64,
    pub data_offset: usize,
    pub data_size: usize,
}

impl RpcEnvelope {
    /// Envelope for an SMI Trap(Notice) with the standard SMP data layout.
    pub fn smi_trap(transaction_id: u64, m_key: u64) -> Self {
        Self {
            mgmt_class: IB_SMI_CLASS,
            method: METHOD_TRAP,
            attr_id: ATTR_NOTICE,
            attr_mod: 0,
            transaction_id,
            m_key,
            data_offset: SMP_DATA_OFFSET,
            data_size: SMP_DATA_SIZE,
        }
    }
}

/// Decoded common MAD header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MadHeader {
    pub base_version: u8,
    pub mgmt_class: u8,
    pub class_version: u8,
    pub method: u8,
    pub status: u16,
    pub class_specific: u16,
    pub transaction_id: u64,
    pub attr_id: u16,
    pub attr_mod: u32,
}

impl MadHeader {
    /// Decode the 24-byte common header from the front of `src`.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < MAD_HEADER_SIZE {
            return Err(MadError::Truncated {
                what: "MAD header",
                len: src.len(),
                need: MAD_HEADER_SIZE,
            });
        }

        let base_version = src.get_u8();
        if base_version != MAD_BASE_VERSION {
            return Err(MadError::BadBaseVersion(base_version));
        }
        let mgmt_class = src.get_u8();
        let class_version = src.get_u8();
        let method = src.get_u8();
        let status = src.get_u16();
        let class_specific = src.get_u16();
        let transaction_id = src.get_u64();
        let attr_id = src.get_u16();
        src.advance(2);
        let attr_mod = src.get_u32();

        Ok(Self {
            base_version,
            mgmt_class,
            class_version,
            method,
            status,
            class_specific,
            transaction_id,
            attr_id,
            attr_mod,
        })
    }
}

/// A LID-routed SMP borrowed from a MAD buffer.
#[derive(Debug, Clone, Copy)]
pub struct SmpView<'a> {
    pub header: MadHeader,
    pub m_key: u64,
    pub data: &'a [u8],
}

/// Encode a complete MAD into `dst`.
///
/// Wire format (LID-routed SMP):
/// ```text
/// ┌───────────────┬──────────┬──────────────┬──────────────────┬──────────────┐
/// │ Common header │ M_Key    │ Reserved     │ Data             │ Reserved     │
/// │ (24B BE)      │ (8B BE)  │ (32B)        │ (data_size B)    │ (to 256B)    │
/// └───────────────┴──────────┴──────────────┴──────────────────┴──────────────┘
/// ```
///
/// `payload` is truncated or zero-padded to `rpc.data_size`.
pub fn encode_mad(rpc: &RpcEnvelope, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let end = rpc.data_offset.checked_add(rpc.data_size);
    if rpc.data_offset < SMP_MKEY_END || end.is_none_or(|end| end > MAD_SIZE) {
        return Err(MadError::DataOutOfBounds {
            offset: rpc.data_offset,
            size: rpc.data_size,
            max: MAD_SIZE,
        });
    }

    let start = dst.len();
    dst.reserve(MAD_SIZE);
    dst.put_u8(MAD_BASE_VERSION);
    dst.put_u8(rpc.mgmt_class);
    dst.put_u8(SMI_CLASS_VERSION);
    dst.put_u8(rpc.method);
    dst.put_u16(0); // status
    dst.put_u16(0); // class specific (hop pointer/count for DR)
    dst.put_u64(rpc.transaction_id);
    dst.put_u16(rpc.attr_id);
    dst.put_u16(0);
    dst.put_u32(rpc.attr_mod);
    dst.put_u64(rpc.m_key);

    dst.resize(start + rpc.data_offset, 0);
    let len = payload.len().min(rpc.data_size);
    dst.put_slice(&payload[..len]);
    dst.resize(start + MAD_SIZE, 0);
    Ok(())
}

/// Decode a LID-routed SMP from a full MAD buffer.
pub fn decode_mad(src: &[u8]) -> Result<SmpView<'_>> {
    if src.len() < MAD_SIZE {
        return Err(MadError::Truncated {
            what: "MAD",
            len: src.len(),
            need: MAD_SIZE,
        });
    }

    let header = MadHeader::decode(src)?;
    let m_key = (&src[MAD_HEADER_SIZE..SMP_MKEY_END]).get_u64();
    let data = &src[SMP_DATA_OFFSET..SMP_DATA_OFFSET + SMP_DATA_SIZE];

    Ok(SmpView {
        header,
        m_key,
        data,
    })
}
