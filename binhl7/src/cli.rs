//! Command-line argument definitions for the `hl7` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use libhl7::EncodeOptions;

#[derive(Parser)]
#[command(
    name = "hl7",
    version,
    about = "Decode and encode HL7 v2 messages",
    long_about = "Decode HL7 v2 messages into JSON, YAML, TOML or CBOR trees shaped by a \
                  JSON schema, and encode such trees back into message text.\n\n\
                  Without a schema, `decode` prints every segment and field by position."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vvv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode message text into a value tree.
    Decode(DecodeArgs),

    /// Encode a value tree into message text.
    Encode(EncodeArgs),
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Message file to read (stdin when omitted).
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// JSON schema describing the segments and fields to extract.
    #[arg(short, long, value_name = "SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Treat the input as a batch: every header segment starts a new message.
    #[arg(short, long)]
    pub multi: bool,

    /// Output data format.
    #[arg(short, long, value_enum, default_value = "json")]
    pub to: DataFormat,

    /// Write single-line JSON instead of pretty-printed JSON.
    #[arg(long)]
    pub compact: bool,

    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct EncodeArgs {
    /// Value tree file to read (stdin when omitted).
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// JSON schema describing where each field is written.
    #[arg(short, long, value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Input data format.
    #[arg(short, long, value_enum, default_value = "json")]
    pub from: DataFormat,

    #[arg(long, value_name = "CHAR", default_value_t = '|')]
    pub field_separator: char,

    #[arg(long, value_name = "CHAR", default_value_t = '^')]
    pub component_separator: char,

    #[arg(long, value_name = "CHAR", default_value_t = '~')]
    pub repetition_separator: char,

    #[arg(long, value_name = "CHAR", default_value_t = '\\')]
    pub escape_character: char,

    #[arg(long, value_name = "CHAR", default_value_t = '&')]
    pub subcomponent_separator: char,

    /// Segment terminator.
    #[arg(long, value_enum, default_value = "cr")]
    pub line_ending: LineEnding,

    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl EncodeArgs {
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions::default()
            .with_field_separator(self.field_separator)
            .with_component_separator(self.component_separator)
            .with_repetition_separator(self.repetition_separator)
            .with_escape_character(self.escape_character)
            .with_subcomponent_separator(self.subcomponent_separator)
            .with_line_ending(self.line_ending.as_str())
    }
}

/// Data formats a value tree can be read from or written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Json,
    #[value(alias = "yml")]
    Yaml,
    Toml,
    Cbor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LineEnding {
    Cr,
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Cr => "\r",
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
