//! Subcommand implementations.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use libhl7::{
    decode, decode_multi, encode_with_options, parse_generic, parse_schema, split_messages,
    MessageSchema,
};
use serde_json::Value as Json;
use tracing::info;

use crate::cli::{DecodeArgs, EncodeArgs};
use crate::{transcode, tree};

pub fn run_decode(args: &DecodeArgs) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let text = String::from_utf8(input).context("message text is not valid UTF-8")?;

    let document = match &args.schema {
        Some(path) => {
            let schema = load_schema(path)?;
            if args.multi {
                let messages = decode_multi(&text, &schema)?;
                info!(messages = messages.len(), "decoded batch");
                serde_json::to_value(messages)?
            } else {
                serde_json::to_value(decode(&text, &schema)?)?
            }
        }
        None if args.multi => {
            let messages = split_messages(&text)
                .iter()
                .map(|chunk| parse_generic(chunk))
                .collect::<libhl7::Result<Vec<_>>>()?;
            info!(messages = messages.len(), "parsed batch without a schema");
            serde_json::to_value(messages)?
        }
        None => serde_json::to_value(parse_generic(&text)?)?,
    };

    let output = transcode::encode(args.to, &document, args.compact)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("cannot write {:?} output", args.to))?;
    write_output(args.output.as_deref(), &output)
}

pub fn run_encode(args: &EncodeArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let input = read_input(args.file.as_deref())?;
    let document: Json = transcode::decode(args.from, &input)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("cannot read {:?} input", args.from))?;
    let messages = tree::messages_from_json(&document)?;

    let options = args.encode_options();
    let mut text = String::new();
    for (i, message) in messages.iter().enumerate() {
        let encoded = encode_with_options(message, &schema, &options)
            .with_context(|| format!("message {}", i + 1))?;
        text.push_str(&encoded);
        text.push_str(&options.line_ending);
    }
    info!(messages = messages.len(), "encoded");
    write_output(args.output.as_deref(), text.as_bytes())
}

fn load_schema(path: &Path) -> Result<MessageSchema> {
    let definition = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    parse_schema(&definition).with_context(|| format!("invalid schema {}", path.display()))
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
