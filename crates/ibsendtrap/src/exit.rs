use std::fmt;
use std::io;

use ibsendtrap_transport::TransportError;
use ibsendtrap_trap::TrapError;

pub const SUCCESS: i32 = 0;
/// Also returned for an unknown trap name.
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const RESOLVE_FAILED: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_exit_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        _ => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. }
        | TransportError::RegisterAgent { source, .. }
        | TransportError::Io(source) => io_exit_code(source),
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn trap_error(err: TrapError) -> CliError {
    let code = match &err {
        TrapError::UnknownTrap(_) => FAILURE,
        TrapError::ResolveSelf(_) | TrapError::ResolveSm(_) => RESOLVE_FAILED,
        TrapError::Send(_) => err.send_status().unwrap_or(FAILURE),
    };
    CliError::new(code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_on_open_is_distinct() {
        let err = TransportError::Open {
            path: "/dev/infiniband/umad0".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let cli = transport_error("failed to open port", err);
        assert_eq!(cli.code, PERMISSION_DENIED);
        assert!(cli.message.starts_with("failed to open port: failed to open"));
    }

    #[test]
    fn send_failure_exits_with_transport_status() {
        let err = TrapError::Send(TransportError::Send {
            code: 5,
            source: io::Error::from_raw_os_error(5),
        });
        assert_eq!(trap_error(err).code, 5);
    }

    #[test]
    fn resolution_failure_is_fatal() {
        let err = TrapError::ResolveSm(TransportError::NoSubnetManager {
            ca: "mlx5_0".to_string(),
            port: 1,
        });
        let cli = trap_error(err);
        assert_eq!(cli.code, RESOLVE_FAILED);
        assert!(cli.message.contains("can't resolve SM destination port"));
    }
}
