//! uartbridge - Serial line protocol bridge for packet radios
//!
//! A host on a serial console drives a wireless transport through a small
//! text protocol (`SEND`, `RECEIVE`, `CONFIGURATION`, `RESET`). The protocol
//! engine lives in `uartbridge-core`; this binary wires it to a console
//! (stdin/stdout or a serial port) and to one of the compiled-in transports.

mod cli;
mod commands;
mod config;
mod console;
mod error;
mod transports;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use commands::run::RunOptions;
use config::Config;
use console::ConsoleSpec;
use error::AppError;
use transports::TransportSettings;

/// Pause before a restart when the config file sets none
const DEFAULT_RESTART_DELAY_MS: u64 = 100;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout may be the protocol console
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run(args) => {
            let options = run_options(args, config)?;
            commands::run::cmd_run(&options)?;
        }
        Commands::ListTransports => commands::list_transports(),
    }

    Ok(())
}

/// Merge command-line arguments over the config file
fn run_options(args: RunArgs, config: Config) -> Result<RunOptions, AppError> {
    let console = match args.console {
        Some(console) => console,
        None => match config.console.serial.as_deref() {
            Some(s) => ConsoleSpec::parse(s).map_err(AppError::Config)?,
            None => ConsoleSpec::Stdio,
        },
    };

    let transport = TransportSettings {
        kind: args
            .transport
            .or(config.transport.kind)
            .unwrap_or_else(|| transports::DEFAULT_TRANSPORT.to_string()),
        bind: args.bind.or(config.transport.bind),
        broadcast_port: args.broadcast_port.or(config.transport.broadcast_port),
        loopback: config.loopback,
    };

    Ok(RunOptions {
        console,
        transport,
        max_restarts: args.max_restarts.or(config.bridge.max_restarts),
        restart_delay: Duration::from_millis(
            config
                .bridge
                .restart_delay_ms
                .unwrap_or(DEFAULT_RESTART_DELAY_MS),
        ),
    })
}
