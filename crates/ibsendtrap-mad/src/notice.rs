use bytes::{Buf, BufMut, BytesMut};

use crate::consts::{
    is_port_error_trap, NOTICE_GENERIC, NOTICE_TYPE_INFO, TRAP_LOCAL_CHANGES,
};
use crate::error::{MadError, Result};

/// Size of a notice in the SMP data area.
///
/// The IssuerGID that follows in SA notices does not fit in an SMP and is not carried.
pub const NOTICE_SIZE: usize = 64;

/// Notice header: generic type (1) + producer type (3) + trap number (2) +
/// issuer LID (2) + toggle/count (2) = 10 bytes.
const NOTICE_HEADER_SIZE: usize = 10;

/// DataDetails area following the header.
pub const DATA_DETAILS_SIZE: usize = NOTICE_SIZE - NOTICE_HEADER_SIZE;

/// An SMI Notice attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// IsGeneric (bit 7) and notice type (bits 0-6).
    pub generic_type: u8,
    /// 24-bit producer (node) type.
    pub producer_type: u32,
    pub trap_number: u16,
    pub issuer_lid: u16,
    /// NoticeToggle (bit 15) and NoticeCount (bits 0-14).
    pub toggle_count: u16,
    pub details: NoticeDetails,
}

/// Trap-specific DataDetails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeDetails {
    /// Trap 144.
    NodeDescChange(NodeDescChangeDetails),
    /// Traps 129, 130 and 131.
    LinkIntegrity(LinkIntegrityDetails),
    /// Any other trap, kept verbatim.
    Raw([u8; DATA_DETAILS_SIZE]),
}

/// DataDetails of trap 144.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeDescChangeDetails {
    pub lid: u16,
    pub local_changes: u8,
    pub new_cap_mask: u32,
    pub change_flags: u16,
    pub cap_mask2: u16,
}

/// DataDetails of traps 129-131.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkIntegrityDetails {
    pub pad: u16,
    pub lid: u16,
    pub port_num: u8,
}

impl Notice {
    /// Create a generic informational notice.
    pub fn generic_info(
        producer_type: u32,
        trap_number: u16,
        issuer_lid: u16,
        details: NoticeDetails,
    ) -> Self {
        Self {
            generic_type: NOTICE_GENERIC | NOTICE_TYPE_INFO,
            producer_type,
            trap_number,
            issuer_lid,
            toggle_count: 0,
            details,
        }
    }

    /// Whether the IsGeneric bit is set.
    pub fn is_generic(&self) -> bool {
        self.generic_type & NOTICE_GENERIC != 0
    }

    /// The notice type (low seven bits of `generic_type`).
    pub fn notice_type(&self) -> u8 {
        self.generic_type & !NOTICE_GENERIC
    }

    /// Encode into exactly [`NOTICE_SIZE`] bytes, appended to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let start = dst.len();
        dst.reserve(NOTICE_SIZE);
        dst.put_u8(self.generic_type);
        dst.put_u8((self.producer_type >> 16) as u8);
        dst.put_u16(self.producer_type as u16);
        dst.put_u16(self.trap_number);
        dst.put_u16(self.issuer_lid);
        dst.put_u16(self.toggle_count);

        match &self.details {
            NoticeDetails::NodeDescChange(d) => {
                dst.put_u16(0); // pad1
                dst.put_u16(d.lid);
                dst.put_u8(0); // pad2
                dst.put_u8(d.local_changes);
                dst.put_u32(d.new_cap_mask);
                dst.put_u16(d.change_flags);
                dst.put_u16(d.cap_mask2);
            }
            NoticeDetails::LinkIntegrity(d) => {
                dst.put_u16(d.pad);
                dst.put_u16(d.lid);
                dst.put_u8(d.port_num);
            }
            NoticeDetails::Raw(raw) => dst.put_slice(raw),
        }

        dst.resize(start + NOTICE_SIZE, 0);
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(NOTICE_SIZE);
        self.encode(&mut buf);
        buf
    }

    /// Decode a notice from the front of `src`.
    pub fn decode(src: &[u8]) -> Result<Self> {
        if src.len() < NOTICE_SIZE {
            return Err(MadError::Truncated {
                what: "notice",
                len: src.len(),
                need: NOTICE_SIZE,
            });
        }

        let mut buf = &src[..NOTICE_SIZE];
        let generic_type = buf.get_u8();
        let producer_msb = buf.get_u8() as u32;
        let producer_type = (producer_msb << 16) | buf.get_u16() as u32;
        let trap_number = buf.get_u16();
        let issuer_lid = buf.get_u16();
        let toggle_count = buf.get_u16();

        let generic = generic_type & NOTICE_GENERIC != 0;
        let details = if generic && trap_number == TRAP_LOCAL_CHANGES {
            buf.advance(2);
            let lid = buf.get_u16();
            buf.advance(1);
            NoticeDetails::NodeDescChange(NodeDescChangeDetails {
                lid,
                local_changes: buf.get_u8(),
                new_cap_mask: buf.get_u32(),
                change_flags: buf.get_u16(),
                cap_mask2: buf.get_u16(),
            })
        } else if generic && is_port_error_trap(trap_number) {
            NoticeDetails::LinkIntegrity(LinkIntegrityDetails {
                pad: buf.get_u16(),
                lid: buf.get_u16(),
                port_num: buf.get_u8(),
            })
        } else {
            let mut raw = [0u8; DATA_DETAILS_SIZE];
            buf.copy_to_slice(&mut raw);
            NoticeDetails::Raw(raw)
        };

        Ok(Self {
            generic_type,
            producer_type,
            trap_number,
            issuer_lid,
            toggle_count,
            details,
        })
    }
}
