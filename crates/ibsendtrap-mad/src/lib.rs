//! InfiniBand management datagram (MAD) encoding for SMI traps.
//!
//! Everything on the wire is big-endian. A LID-routed SMP is laid out as:
//! - A 24-byte common MAD header (versions, class, method, TID, attribute)
//! - An 8-byte M_Key and 32 reserved bytes
//! - A 64-byte SMP data area, which carries the [`Notice`] for a trap
//! - 128 reserved bytes, padding the datagram to [`MAD_SIZE`]
//!
//! Host struct layout is never relied on; every field goes through [`bytes`].

pub mod codec;
pub mod consts;
pub mod error;
pub mod notice;
pub mod tid;

pub use codec::{
    decode_mad, encode_mad, MadHeader, RpcEnvelope, SmpView, MAD_HEADER_SIZE, MAD_SIZE,
};
pub use consts::{
    ATTR_NOTICE, IB_SMI_CLASS, IB_SMI_DIRECT_CLASS, METHOD_TRAP, SMP_DATA_OFFSET, SMP_DATA_SIZE,
};
pub use error::{MadError, Result};
pub use notice::{
    LinkIntegrityDetails, NodeDescChangeDetails, Notice, NoticeDetails, NOTICE_SIZE,
};
pub use tid::next_transaction_id;
