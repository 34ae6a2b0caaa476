//! `hl7`: decode HL7 v2 messages into data trees and encode them back.

use std::io::{self, IsTerminal};
use std::process;

use clap::Parser;

mod cli;
mod commands;
mod logging;
mod transcode;
mod tree;

use crate::cli::{Cli, Command, LogFormatArg};
use crate::commands::{run_decode, run_encode};
use crate::logging::{init_logging, LogConfig, LogFormat};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        process::exit(1);
    }

    let result = match &cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Encode(args) => run_encode(args),
    };
    if let Err(error) = result {
        eprintln!("error: {error:#}");
        process::exit(1);
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        use_env_filter: !cli.verbosity.is_present(),
        with_ansi: io::stderr().is_terminal(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        ..LogConfig::default()
    }
}
