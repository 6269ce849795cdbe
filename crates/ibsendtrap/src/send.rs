use std::path::PathBuf;

use clap::Args;
use ibsendtrap_transport::PortConfig;
use ibsendtrap_trap::{default_trap, lookup, TrapConfig, TrapKind, DEFAULT_ERROR_PORT};

use crate::exit::{CliError, CliResult, FAILURE};
use crate::output::OutputFormat;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Trap to send. Default: the first listed below.
    #[arg(value_name = "TRAP_NAME")]
    pub trap_name: Option<String>,
    /// Port reported by local_link_integrity (truncated to 8 bits).
    #[arg(
        value_name = "ERROR_PORT",
        allow_negative_numbers = true,
        default_value_t = DEFAULT_ERROR_PORT
    )]
    pub error_port: i64,
    /// InfiniBand device (CA) to send from.
    #[arg(short = 'C', long = "ca", value_name = "CA", env = "IBSENDTRAP_CA")]
    pub ca: Option<String>,
    /// Port of the CA to send from.
    #[arg(short = 'P', long, value_name = "PORT", env = "IBSENDTRAP_PORT")]
    pub port: Option<u8>,
    /// M_Key to place in the SMP (decimal or 0x-prefixed hex).
    #[arg(short = 'y', long = "m-key", value_name = "MKEY", value_parser = parse_m_key, default_value = "0")]
    pub m_key: u64,
    #[arg(long, value_name = "DIR", default_value = "/sys", env = "IBSENDTRAP_SYSFS_ROOT", hide = true)]
    pub sysfs_root: PathBuf,
    #[arg(long, value_name = "DIR", default_value = "/dev", env = "IBSENDTRAP_DEV_ROOT", hide = true)]
    pub dev_root: PathBuf,
}

impl SendArgs {
    fn port_config(&self) -> PortConfig {
        PortConfig {
            ca: self.ca.clone(),
            port: self.port,
            sysfs_root: self.sysfs_root.clone(),
            dev_root: self.dev_root.clone(),
        }
    }

    fn trap_config(&self) -> TrapConfig {
        TrapConfig {
            error_port: self.error_port,
            m_key: self.m_key,
        }
    }
}

pub fn run(args: SendArgs, format: Option<OutputFormat>) -> CliResult<i32> {
    // Resolve the name first: an unknown trap never opens the device.
    let trap = resolve_trap(args.trap_name.as_deref()).inspect_err(|_| {
        eprintln!("{}", crate::cli_command().render_help());
    })?;
    let port_config = args.port_config();
    let trap_config = args.trap_config();

    #[cfg(target_os = "linux")]
    {
        use ibsendtrap_mad::{IB_SMI_CLASS, IB_SMI_DIRECT_CLASS};
        use ibsendtrap_transport::UmadPort;
        use ibsendtrap_trap::TrapContext;

        use crate::exit::{trap_error, transport_error, SUCCESS};
        use crate::output::print_report;

        let transport = UmadPort::open(&port_config, &[IB_SMI_CLASS, IB_SMI_DIRECT_CLASS])
            .map_err(|err| transport_error("failed to open port", err))?;
        let ca = transport.ca_name().to_string();

        let mut context = TrapContext::new(transport, trap_config);
        let result = context.send(trap);
        context.into_transport().close();

        let report = result.map_err(trap_error)?;
        if let Some(format) = format {
            print_report(&report, &ca, format);
        }
        Ok(SUCCESS)
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (trap, port_config, trap_config, format);
        Err(crate::exit::transport_error(
            "failed to open port",
            ibsendtrap_transport::TransportError::Unsupported,
        ))
    }
}

fn resolve_trap(name: Option<&str>) -> CliResult<TrapKind> {
    match name {
        None => Ok(default_trap()),
        Some(name) => lookup(name)
            .ok_or_else(|| CliError::new(FAILURE, format!("unknown trap '{name}'"))),
    }
}

fn parse_m_key(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid M_Key: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_trap_defaults_to_first_entry() {
        assert_eq!(resolve_trap(None).unwrap(), TrapKind::NodeDescChange);
        assert_eq!(
            resolve_trap(Some("local_link_integrity")).unwrap(),
            TrapKind::LocalLinkIntegrity
        );
    }

    #[test]
    fn resolve_trap_rejects_unknown_name() {
        let err = resolve_trap(Some("bogus_name")).unwrap_err();
        assert_eq!(err.code, FAILURE);
        assert_eq!(err.message, "unknown trap 'bogus_name'");
    }

    #[test]
    fn parse_m_key_decimal_and_hex() {
        assert_eq!(parse_m_key("0").unwrap(), 0);
        assert_eq!(parse_m_key("42").unwrap(), 42);
        assert_eq!(parse_m_key("0xFFFF").unwrap(), 0xFFFF);
        assert_eq!(parse_m_key("0X10").unwrap(), 0x10);
        assert!(parse_m_key("0xZZ").is_err());
        assert!(parse_m_key("-1").is_err());
    }
}
