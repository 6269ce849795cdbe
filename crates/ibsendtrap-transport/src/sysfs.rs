use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};

const CLASS_INFINIBAND: &str = "class/infiniband";
const CLASS_INFINIBAND_MAD: &str = "class/infiniband_mad";

/// Port `state` value of an active link.
const PORT_STATE_ACTIVE: u32 = 4;

/// Which local port to open and where to find it.
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Device (CA) name. Default: the first device.
    pub ca: Option<String>,
    /// Port number. Default: the first active port, else the first port.
    pub port: Option<u8>,
    /// Root of the sysfs mount. Default: `/sys`.
    pub sysfs_root: PathBuf,
    /// Root of the device tree. Default: `/dev`.
    pub dev_root: PathBuf,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            ca: None,
            port: None,
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
        }
    }
}

/// A device port as exposed under `class/infiniband/<ca>/ports/<port>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsPort {
    pub ca: String,
    pub port: u8,
    dir: PathBuf,
}

impl SysfsPort {
    /// Select a port according to `config`.
    pub fn select(config: &PortConfig) -> Result<Self> {
        let class_dir = config.sysfs_root.join(CLASS_INFINIBAND);
        let ca = match &config.ca {
            Some(ca) => {
                if !class_dir.join(ca).is_dir() {
                    return Err(TransportError::NoDevice(ca.clone()));
                }
                ca.clone()
            }
            None => list_dir(&class_dir)?
                .into_iter()
                .next()
                .ok_or_else(|| TransportError::NoDevice("no devices present".to_string()))?,
        };

        let ports_dir = class_dir.join(&ca).join("ports");
        let port = match config.port {
            Some(port) => {
                if !ports_dir.join(port.to_string()).is_dir() {
                    return Err(TransportError::NoPort {
                        ca,
                        port: port.to_string(),
                    });
                }
                port
            }
            None => first_active_port(&ca, &ports_dir)?,
        };

        debug!(ca = %ca, port, "selected port");
        Ok(Self {
            dir: ports_dir.join(port.to_string()),
            ca,
            port,
        })
    }

    /// Base LID of the port.
    pub fn lid(&self) -> Result<u16> {
        read_hex_u16(&self.dir.join("lid"))
    }

    /// LID of the subnet manager as last reported to the port.
    pub fn sm_lid(&self) -> Result<u16> {
        read_hex_u16(&self.dir.join("sm_lid"))
    }

    /// Service level to reach the subnet manager.
    pub fn sm_sl(&self) -> Result<u8> {
        let path = self.dir.join("sm_sl");
        let value = read_attr(&path)?;
        value
            .parse()
            .map_err(|_| TransportError::Parse { path, value })
    }

    /// Numeric link state (4 = ACTIVE).
    pub fn state(&self) -> Result<u32> {
        read_state(&self.dir.join("state"))
    }
}

/// Kernel user MAD ABI version.
pub fn abi_version(sysfs_root: &Path) -> Result<u32> {
    let path = sysfs_root.join(CLASS_INFINIBAND_MAD).join("abi_version");
    let value = read_attr(&path)?;
    value
        .parse()
        .map_err(|_| TransportError::Parse { path, value })
}

/// Index `N` of the `umadN` device serving `port`.
pub fn umad_index(sysfs_root: &Path, port: &SysfsPort) -> Result<u32> {
    let class_dir = sysfs_root.join(CLASS_INFINIBAND_MAD);
    for name in list_dir(&class_dir)? {
        let Some(index) = name.strip_prefix("umad").and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        let dir = class_dir.join(&name);
        let ibdev = read_attr(&dir.join("ibdev"))?;
        let dev_port = read_attr(&dir.join("port"))?;
        if ibdev == port.ca && dev_port.parse::<u8>().ok() == Some(port.port) {
            return Ok(index);
        }
    }
    Err(TransportError::NoUmadDevice {
        ca: port.ca.clone(),
        port: port.port,
    })
}

fn first_active_port(ca: &str, ports_dir: &Path) -> Result<u8> {
    let mut ports: Vec<u8> = list_dir(ports_dir)?
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect();
    ports.sort_unstable();

    let first = *ports.first().ok_or_else(|| TransportError::NoPort {
        ca: ca.to_string(),
        port: "any".to_string(),
    })?;

    for port in &ports {
        match read_state(&ports_dir.join(port.to_string()).join("state")) {
            Ok(PORT_STATE_ACTIVE) => return Ok(*port),
            Ok(_) => {}
            Err(err) => debug!(port, error = %err, "skipping port with unreadable state"),
        }
    }
    Ok(first)
}

/// Sorted entry names of a directory.
fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TransportError::Sysfs {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TransportError::Sysfs {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn read_attr(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| TransportError::Sysfs {
            path: path.to_path_buf(),
            source: e,
        })
}

fn read_hex_u16(path: &Path) -> Result<u16> {
    let value = read_attr(path)?;
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(&value);
    u16::from_str_radix(digits, 16).map_err(|_| TransportError::Parse {
        path: path.to_path_buf(),
        value: value.clone(),
    })
}

/// Parses `"4: ACTIVE"`.
fn read_state(path: &Path) -> Result<u32> {
    let value = read_attr(path)?;
    value
        .split(':')
        .next()
        .and_then(|n| n.trim().parse().ok())
        .ok_or_else(|| TransportError::Parse {
            path: path.to_path_buf(),
            value: value.clone(),
        })
}
