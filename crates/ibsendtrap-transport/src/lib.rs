//! InfiniBand management transport abstraction.
//!
//! Provides the [`MadTransport`] seam the trap layer sends through, plus the
//! Linux implementation over the kernel user MAD interface:
//! - Port selection and address resolution from sysfs
//! - Agent registration and datagram writes on `/dev/infiniband/umadN`
//!
//! This is the lowest layer of ibsendtrap. Everything that touches the fabric
//! goes through a type implementing [`MadTransport`].

pub mod error;
pub mod sysfs;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod umad;

pub use error::{Result, TransportError};
pub use sysfs::{PortConfig, SysfsPort};
pub use traits::{MadTransport, PortId, SelfAddress};

#[cfg(target_os = "linux")]
pub use umad::UmadPort;
