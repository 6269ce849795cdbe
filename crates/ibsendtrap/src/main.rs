mod exit;
mod logging;
mod output;
mod send;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};

use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;
use crate::send::SendArgs;

#[derive(Parser, Debug)]
#[command(
    name = "ibsendtrap",
    version,
    about = "Send an SMI trap to the subnet manager, impersonating a local hardware event"
)]
struct Cli {
    /// Print a summary of the sent trap to stdout.
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevel,

    /// Raise log verbosity (-d debug, -dd trace).
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    debug: u8,

    #[command(flatten)]
    send: SendArgs,
}

/// The clap command with the trap catalog appended to the help text.
fn cli_command() -> clap::Command {
    Cli::command().after_help(ibsendtrap_trap::usage_text())
}

fn main() {
    let matches = cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    init_logging(cli.log_format, cli.log_level.raised_by(cli.debug));

    match send::run(cli.send, cli.format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let matches = cli_command().try_get_matches_from(args.iter().copied())?;
        Cli::from_arg_matches(&matches)
    }

    #[test]
    fn no_arguments_uses_defaults() {
        let cli = parse(&["ibsendtrap"]).expect("empty args should parse");
        assert!(cli.send.trap_name.is_none());
        assert_eq!(cli.send.error_port, 1);
        assert_eq!(cli.send.m_key, 0);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn parses_trap_name_and_error_port() {
        let cli = parse(&["ibsendtrap", "local_link_integrity", "4"]).expect("args should parse");
        assert_eq!(cli.send.trap_name.as_deref(), Some("local_link_integrity"));
        assert_eq!(cli.send.error_port, 4);
    }

    #[test]
    fn accepts_negative_error_port() {
        let cli = parse(&["ibsendtrap", "local_link_integrity", "-1"]).expect("args should parse");
        assert_eq!(cli.send.error_port, -1);
    }

    #[test]
    fn rejects_non_numeric_error_port() {
        let err = parse(&["ibsendtrap", "local_link_integrity", "four"])
            .expect_err("non-numeric port should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_port_selection_and_m_key() {
        let cli = parse(&["ibsendtrap", "-C", "mlx5_0", "-P", "2", "-y", "0x10", "-dd"])
            .expect("args should parse");
        assert_eq!(cli.send.ca.as_deref(), Some("mlx5_0"));
        assert_eq!(cli.send.port, Some(2));
        assert_eq!(cli.send.m_key, 0x10);
        assert_eq!(cli.debug, 2);
    }

    #[test]
    fn help_lists_traps() {
        let help = cli_command().render_help().to_string();
        assert!(help.contains("node_desc_change"));
        assert!(help.contains("local_link_integrity"));
        assert!(help.contains("default behavior is to send"));
    }
}
