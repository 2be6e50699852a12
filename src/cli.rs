//! CLI argument parsing

use crate::console::ConsoleSpec;
use crate::transports;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the transport argument
fn transport_help() -> String {
    format!(
        "Transport to bridge to [available: {}]",
        transports::transport_names_short()
    )
}

#[derive(Parser)]
#[command(name = "uartbridge")]
#[command(author, version, about = "Serial line protocol bridge for packet radios", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bridge on a console
    Run(RunArgs),

    /// List available transports
    ListTransports,
}

/// Options for `run`; each one overrides the config file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[arg(short, long, help = transport_help())]
    pub transport: Option<String>,

    /// Console: stdio or dev=<port>[:baud]
    #[arg(long, value_parser = ConsoleSpec::parse)]
    pub console: Option<ConsoleSpec>,

    /// UDP bind address (e.g. 0.0.0.0:1884)
    #[arg(long)]
    pub bind: Option<String>,

    /// UDP broadcast port (defaults to the bind port)
    #[arg(long)]
    pub broadcast_port: Option<u16>,

    /// Stop after this many restarts
    #[arg(long)]
    pub max_restarts: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_args() {
        let cli = Cli::try_parse_from([
            "uartbridge",
            "-vv",
            "run",
            "--transport",
            "udp",
            "--console",
            "dev=/dev/ttyUSB0:9600",
            "--max-restarts",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.transport.as_deref(), Some("udp"));
        assert_eq!(
            args.console,
            Some(ConsoleSpec::Serial {
                device: "/dev/ttyUSB0".to_string(),
                baud: Some(9600)
            })
        );
        assert_eq!(args.max_restarts, Some(3));
        assert!(args.bind.is_none());
    }

    #[test]
    fn test_bad_console_rejected() {
        assert!(Cli::try_parse_from(["uartbridge", "run", "--console", "ttyUSB0"]).is_err());
    }
}
