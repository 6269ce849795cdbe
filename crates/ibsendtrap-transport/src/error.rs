use std::path::PathBuf;

/// Errors that can occur in management transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A sysfs attribute or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Sysfs {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A sysfs attribute held an unexpected value.
    #[error("unexpected value {value:?} in {path}")]
    Parse { path: PathBuf, value: String },

    /// No InfiniBand device is present, or the named one does not exist.
    #[error("InfiniBand device not found: {0}")]
    NoDevice(String),

    /// The device has no ports, or not the requested one.
    #[error("port not found on {ca}: {port}")]
    NoPort { ca: String, port: String },

    /// The kernel user MAD ABI is older than supported.
    #[error("unsupported user MAD ABI version {found} (need at least {required})")]
    UnsupportedAbi { found: u32, required: u32 },

    /// No umad device node serves the selected port.
    #[error("no umad device for {ca} port {port}")]
    NoUmadDevice { ca: String, port: u8 },

    /// The umad device node could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Registering a MAD agent with the kernel failed.
    #[error("failed to register MAD agent for class {class:#04x}: {source}")]
    RegisterAgent { class: u8, source: std::io::Error },

    /// No agent was registered for the envelope's management class.
    #[error("no MAD agent registered for class {0:#04x}")]
    NoAgent(u8),

    /// The port reports no subnet manager.
    #[error("no subnet manager reachable from {ca} port {port} (SM LID is 0)")]
    NoSubnetManager { ca: String, port: u8 },

    /// The datagram could not be encoded.
    #[error("MAD encoding failed: {0}")]
    Mad(#[from] ibsendtrap_mad::MadError),

    /// The datagram write was rejected; `code` is the transport status.
    #[error("MAD send failed (status {code}): {source}")]
    Send { code: i32, source: std::io::Error },

    /// An I/O error occurred on the device.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform has no user MAD interface.
    #[error("user MAD transport is only available on Linux")]
    Unsupported,
}

impl TransportError {
    /// Transport status code carried by a failed send.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            TransportError::Send { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
