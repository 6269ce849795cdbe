use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use ibsendtrap_mad::consts::SMI_CLASS_VERSION;
use ibsendtrap_mad::{encode_mad, RpcEnvelope, MAD_SIZE};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::sysfs::{self, PortConfig, SysfsPort};
use crate::traits::{MadTransport, PortId, SelfAddress};

/// `struct ib_user_mad_hdr` preceding every datagram once P_Key index
/// support is enabled on the fd.
pub const UMAD_HEADER_SIZE: usize = 64;

/// `struct ib_user_mad_hdr_old`: the same layout without `pkey_index` and
/// the trailing reserved bytes. Used when the kernel refuses to enable
/// P_Key index support.
pub const UMAD_OLD_HEADER_SIZE: usize = 56;

const IB_IOCTL_MAGIC: u32 = 0x1b;

/// `struct ib_user_mad_reg_req`.
#[repr(C)]
#[derive(Debug, Default)]
struct UserMadRegReq {
    id: u32,
    method_mask: [u32; 4],
    qpn: u8,
    mgmt_class: u8,
    mgmt_class_version: u8,
    oui: [u8; 3],
    rmpp_version: u8,
}

const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | (IB_IOCTL_MAGIC << 8) | nr
}

/// `_IOWR(IB_IOCTL_MAGIC, 1, struct ib_user_mad_reg_req)`.
const IB_USER_MAD_REGISTER_AGENT: u32 = ioc(3, 1, std::mem::size_of::<UserMadRegReq>());
/// `_IOW(IB_IOCTL_MAGIC, 2, __u32)`.
const IB_USER_MAD_UNREGISTER_AGENT: u32 = ioc(1, 2, std::mem::size_of::<u32>());
/// `_IO(IB_IOCTL_MAGIC, 3)`.
const IB_USER_MAD_ENABLE_PKEY: u32 = ioc(0, 3, 0);

/// A local port opened through the Linux user MAD interface.
///
/// Registers one send-only agent per management class on open. Agents are
/// unregistered and the device is closed on drop.
pub struct UmadPort {
    file: File,
    port: SysfsPort,
    device_path: PathBuf,
    /// `(mgmt_class, agent_id)` pairs.
    agents: Vec<(u8, u32)>,
    /// Either [`UMAD_HEADER_SIZE`] or [`UMAD_OLD_HEADER_SIZE`].
    header_size: usize,
    buf: BytesMut,
}

impl UmadPort {
    /// Oldest user MAD ABI the header layout matches.
    pub const MIN_ABI_VERSION: u32 = 5;

    /// Open the port selected by `config` and register agents for `classes`.
    pub fn open(config: &PortConfig, classes: &[u8]) -> Result<Self> {
        let abi = sysfs::abi_version(&config.sysfs_root)?;
        if abi < Self::MIN_ABI_VERSION {
            return Err(TransportError::UnsupportedAbi {
                found: abi,
                required: Self::MIN_ABI_VERSION,
            });
        }

        let port = SysfsPort::select(config)?;
        let index = sysfs::umad_index(&config.sysfs_root, &port)?;
        let device_path = config
            .dev_root
            .join("infiniband")
            .join(format!("umad{index}"));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device_path)
            .map_err(|e| TransportError::Open {
                path: device_path.clone(),
                source: e,
            })?;

        // Must happen before any agent is registered, or the kernel keeps
        // parsing writes with the old header layout.
        let header_size = enable_pkey_index(&file);

        let mut umad = Self {
            file,
            port,
            device_path,
            agents: Vec::with_capacity(classes.len()),
            header_size,
            buf: BytesMut::with_capacity(header_size + MAD_SIZE),
        };
        for &class in classes {
            // On failure `umad` drops here and unregisters what was registered.
            let id = umad.register_agent(class)?;
            umad.agents.push((class, id));
        }

        info!(
            ca = %umad.port.ca,
            port = umad.port.port,
            path = ?umad.device_path,
            header_size = umad.header_size,
            "opened user MAD port"
        );
        Ok(umad)
    }

    /// Device name of the open port.
    pub fn ca_name(&self) -> &str {
        &self.port.ca
    }

    /// Port number of the open port.
    pub fn port_num(&self) -> u8 {
        self.port.port
    }

    /// Path of the umad device node.
    pub fn device_path(&self) -> &Path {
        &self.device_path
    }

    /// Unregister all agents and close the device.
    pub fn close(mut self) {
        self.release();
        debug!(path = ?self.device_path, "closed user MAD port");
    }

    fn register_agent(&self, class: u8) -> Result<u32> {
        let mut req = UserMadRegReq {
            qpn: 0,
            mgmt_class: class,
            mgmt_class_version: SMI_CLASS_VERSION,
            ..UserMadRegReq::default()
        };

        // SAFETY: `req` is a live, writable `#[repr(C)]` struct matching the
        // kernel's `ib_user_mad_reg_req`, and the fd is owned by `self.file`.
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                IB_USER_MAD_REGISTER_AGENT as _,
                &mut req as *mut UserMadRegReq,
            )
        };
        if rc < 0 {
            return Err(TransportError::RegisterAgent {
                class,
                source: std::io::Error::last_os_error(),
            });
        }

        debug!(class, agent = req.id, "registered MAD agent");
        Ok(req.id)
    }

    fn release(&mut self) {
        for (class, id) in self.agents.drain(..) {
            let mut agent = id;
            // SAFETY: `agent` outlives the call and the fd is owned by `self.file`.
            let rc = unsafe {
                libc::ioctl(
                    self.file.as_raw_fd(),
                    IB_USER_MAD_UNREGISTER_AGENT as _,
                    &mut agent as *mut u32,
                )
            };
            if rc < 0 {
                warn!(
                    class,
                    agent = id,
                    error = %std::io::Error::last_os_error(),
                    "failed to unregister MAD agent"
                );
            }
        }
    }

    fn agent_for(&self, class: u8) -> Option<u32> {
        self.agents
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, id)| *id)
    }
}

impl MadTransport for UmadPort {
    fn resolve_self(&mut self) -> Result<SelfAddress> {
        let lid = self.port.lid()?;
        debug!(lid, port = self.port.port, "resolved self");
        Ok(SelfAddress {
            port_id: PortId::smi(lid),
            port_num: self.port.port,
        })
    }

    fn resolve_sm(&mut self) -> Result<PortId> {
        let lid = self.port.sm_lid()?;
        if lid == 0 {
            return Err(TransportError::NoSubnetManager {
                ca: self.port.ca.clone(),
                port: self.port.port,
            });
        }
        let sl = self.port.sm_sl()?;
        debug!(lid, sl, "resolved subnet manager");
        Ok(PortId {
            sl,
            ..PortId::smi(lid)
        })
    }

    fn send(&mut self, rpc: &RpcEnvelope, dest: &PortId, payload: &[u8]) -> Result<()> {
        let agent = self
            .agent_for(rpc.mgmt_class)
            .ok_or(TransportError::NoAgent(rpc.mgmt_class))?;

        self.buf.clear();
        encode_umad(agent, dest, self.header_size, &mut self.buf);
        encode_mad(rpc, payload, &mut self.buf)?;

        check_written(self.file.write(&self.buf), self.buf.len())?;
        debug!(
            agent,
            dlid = dest.lid,
            tid = rpc.transaction_id,
            method = rpc.method,
            attr_id = rpc.attr_id,
            "sent MAD"
        );
        Ok(())
    }
}

impl Drop for UmadPort {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for UmadPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UmadPort")
            .field("ca", &self.port.ca)
            .field("port", &self.port.port)
            .field("path", &self.device_path)
            .finish()
    }
}

/// Ask the kernel to parse writes on `file` with the full `ib_user_mad_hdr`.
///
/// Returns the header size to use from then on.
fn enable_pkey_index(file: &File) -> usize {
    // SAFETY: `_IO` ioctl without an argument on an fd owned by `file`.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), IB_USER_MAD_ENABLE_PKEY as _) };
    if rc < 0 {
        warn!(
            error = %std::io::Error::last_os_error(),
            "P_Key index support not available, using old user MAD header"
        );
        UMAD_OLD_HEADER_SIZE
    } else {
        UMAD_HEADER_SIZE
    }
}

/// Map the result of writing one `expected`-byte datagram.
///
/// The device takes a datagram in a single write; anything shorter was not
/// sent.
fn check_written(written: std::io::Result<usize>, expected: usize) -> Result<()> {
    match written {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => Err(TransportError::Send {
            code: libc::EIO,
            source: std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("short write ({n} of {expected} bytes)"),
            ),
        }),
        Err(err) => Err(TransportError::Send {
            code: err.raw_os_error().unwrap_or(libc::EIO),
            source: err,
        }),
    }
}

/// Append the `ib_user_mad` header for a send to `dest` through `agent`.
///
/// Layout: id, status, timeout_ms, retries, length (host order), then
/// `ib_mad_addr` with QPN, QKey and LID in network order. With
/// `header_size == UMAD_HEADER_SIZE` the address ends with `pkey_index` and
/// six reserved bytes.
fn encode_umad(agent: u32, dest: &PortId, header_size: usize, dst: &mut BytesMut) {
    dst.put_u32_ne(agent);
    dst.put_u32_ne(0); // status
    dst.put_u32_ne(0); // timeout_ms: no response expected
    dst.put_u32_ne(0); // retries
    dst.put_u32_ne(MAD_SIZE as u32);
    dst.put_u32(dest.qp);
    dst.put_u32(dest.qkey);
    dst.put_u16(dest.lid);
    dst.put_u8(dest.sl);
    dst.put_u8(0); // path_bits
    dst.put_u8(0); // grh_present
    dst.put_u8(0); // gid_index
    dst.put_u8(0); // hop_limit
    dst.put_u8(0); // traffic_class
    dst.put_slice(&[0u8; 16]); // gid
    dst.put_u32(0); // flow_label
    if header_size == UMAD_HEADER_SIZE {
        dst.put_u16_ne(0); // pkey_index
        dst.put_slice(&[0u8; 6]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::FakeSysfs;

    #[test]
    fn test_ioctl_numbers_match_kernel() {
        assert_eq!(std::mem::size_of::<UserMadRegReq>(), 28);
        assert_eq!(IB_USER_MAD_REGISTER_AGENT, 0xC01C_1B01);
        assert_eq!(IB_USER_MAD_UNREGISTER_AGENT, 0x4004_1B02);
        assert_eq!(IB_USER_MAD_ENABLE_PKEY, 0x0000_1B03);
    }

    #[test]
    fn test_umad_header_layout() {
        let dest = PortId {
            lid: 0x0102,
            sl: 3,
            qp: 0,
            qkey: 0,
        };
        let mut buf = BytesMut::new();
        encode_umad(9, &dest, UMAD_HEADER_SIZE, &mut buf);

        assert_eq!(buf.len(), UMAD_HEADER_SIZE);
        assert_eq!(&buf[0..4], &9u32.to_ne_bytes());
        assert_eq!(&buf[16..20], &(MAD_SIZE as u32).to_ne_bytes());
        assert_eq!(&buf[20..28], &[0u8; 8]);
        assert_eq!(&buf[28..30], &[0x01, 0x02]);
        assert_eq!(buf[30], 3);
    }

    #[test]
    fn test_open_rejects_old_abi() {
        let sysfs = FakeSysfs::new("abi");
        std::fs::write(
            sysfs.root.join("class/infiniband_mad/abi_version"),
            "4\n",
        )
        .unwrap();

        let result = UmadPort::open(&sysfs.config(), &[ibsendtrap_mad::IB_SMI_CLASS]);
        assert!(matches!(
            result,
            Err(TransportError::UnsupportedAbi { found: 4, .. })
        ));
    }

    #[test]
    fn test_open_missing_device_node() {
        let sysfs = FakeSysfs::new("nodev");
        sysfs.add_port("mlx5_0", 1, "4: ACTIVE", "0x3", "0x1");
        sysfs.add_umad(0, "mlx5_0", 1);

        let result = UmadPort::open(&sysfs.config(), &[ibsendtrap_mad::IB_SMI_CLASS]);
        match result {
            Err(TransportError::Open { path, .. }) => {
                assert!(path.ends_with("infiniband/umad0"));
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn test_old_umad_header_drops_pkey_index() {
        let dest = PortId::smi(0x0102);
        let mut old = BytesMut::new();
        encode_umad(9, &dest, UMAD_OLD_HEADER_SIZE, &mut old);
        let mut new = BytesMut::new();
        encode_umad(9, &dest, UMAD_HEADER_SIZE, &mut new);

        assert_eq!(old.len(), UMAD_OLD_HEADER_SIZE);
        assert_eq!(&new[..UMAD_OLD_HEADER_SIZE], &old[..]);
    }

    /// A port over a regular file standing in for the device node.
    fn file_port(sysfs: &FakeSysfs, header_size: usize, writable: bool) -> (UmadPort, PathBuf) {
        sysfs.add_port("mlx5_0", 1, "4: ACTIVE", "0x3", "0x1");
        let port = SysfsPort::select(&sysfs.config()).unwrap();
        let device_path = sysfs.root.join("umad0");
        std::fs::write(&device_path, b"").unwrap();
        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&device_path)
            .unwrap();
        let umad = UmadPort {
            file,
            port,
            device_path: device_path.clone(),
            agents: vec![(ibsendtrap_mad::IB_SMI_CLASS, 7)],
            header_size,
            buf: BytesMut::new(),
        };
        (umad, device_path)
    }

    #[test]
    fn test_send_writes_header_then_mad() {
        let sysfs = FakeSysfs::new("send");
        let (mut umad, path) = file_port(&sysfs, UMAD_HEADER_SIZE, true);
        let rpc = RpcEnvelope::smi_trap(0x1234, 0);

        umad.send(&rpc, &PortId::smi(1), &[0x84; 64]).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), UMAD_HEADER_SIZE + MAD_SIZE);
        assert_eq!(&written[0..4], &7u32.to_ne_bytes());
        assert_eq!(&written[28..30], &[0x00, 0x01]);
        // base version, class, class version, method
        assert_eq!(&written[64..68], &[0x01, 0x01, 0x01, 0x05]);
        assert_eq!(&written[64 + 64..64 + 128], &[0x84; 64][..]);
    }

    #[test]
    fn test_send_with_old_header_places_mad_at_56() {
        let sysfs = FakeSysfs::new("send-old");
        let (mut umad, path) = file_port(&sysfs, UMAD_OLD_HEADER_SIZE, true);
        let rpc = RpcEnvelope::smi_trap(0x1234, 0);

        umad.send(&rpc, &PortId::smi(1), &[0x84; 64]).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), UMAD_OLD_HEADER_SIZE + MAD_SIZE);
        assert_eq!(&written[56..60], &[0x01, 0x01, 0x01, 0x05]);
    }

    #[test]
    fn test_send_without_agent_for_class() {
        let sysfs = FakeSysfs::new("noagent");
        let (mut umad, path) = file_port(&sysfs, UMAD_HEADER_SIZE, true);
        let rpc = RpcEnvelope {
            mgmt_class: ibsendtrap_mad::IB_SMI_DIRECT_CLASS,
            ..RpcEnvelope::smi_trap(1, 0)
        };

        let result = umad.send(&rpc, &PortId::smi(1), &[]);
        assert!(matches!(result, Err(TransportError::NoAgent(0x81))));
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_send_write_failure_carries_errno() {
        let sysfs = FakeSysfs::new("readonly");
        let (mut umad, _) = file_port(&sysfs, UMAD_HEADER_SIZE, false);
        let rpc = RpcEnvelope::smi_trap(1, 0);

        let err = umad.send(&rpc, &PortId::smi(1), &[]).unwrap_err();
        assert_eq!(err.status_code(), Some(libc::EBADF));
    }

    #[test]
    fn test_short_write_maps_to_eio() {
        let err = check_written(Ok(10), UMAD_HEADER_SIZE + MAD_SIZE).unwrap_err();
        assert_eq!(err.status_code(), Some(libc::EIO));
        assert!(check_written(Ok(320), 320).is_ok());
    }

    #[test]
    fn test_enable_pkey_falls_back_on_regular_file() {
        let sysfs = FakeSysfs::new("pkey");
        let path = sysfs.root.join("not-a-device");
        std::fs::write(&path, b"").unwrap();
        let file = File::open(&path).unwrap();

        assert_eq!(enable_pkey_index(&file), UMAD_OLD_HEADER_SIZE);
    }
}
