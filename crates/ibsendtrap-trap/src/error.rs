use ibsendtrap_transport::TransportError;

/// Errors that can occur while sending a trap.
#[derive(Debug, thiserror::Error)]
pub enum TrapError {
    /// The trap name is not in the catalog. Nothing was sent.
    #[error("unknown trap '{0}'")]
    UnknownTrap(String),

    /// The local port address could not be resolved. Nothing was sent.
    #[error("can't resolve self: {0}")]
    ResolveSelf(#[source] TransportError),

    /// The subnet manager address could not be resolved. Nothing was sent.
    #[error("can't resolve SM destination port: {0}")]
    ResolveSm(#[source] TransportError),

    /// The transport rejected the send.
    #[error("trap send failed: {0}")]
    Send(#[source] TransportError),
}

impl TrapError {
    /// Transport status of a failed send.
    pub fn send_status(&self) -> Option<i32> {
        match self {
            TrapError::Send(err) => err.status_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrapError>;
