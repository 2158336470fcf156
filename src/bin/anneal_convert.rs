//! anneal-convert: Convert JSON documents to match an Avro schema
//!
//! Each document is coerced against the schema and written as one line of
//! JSON. Absent fields take their declared defaults; union branches are
//! picked by the first member the value fits.
//!
//! Usage:
//!   # Read from file, output to stdout
//!   anneal-convert --schema event.avsc events.jsonl
//!
//!   # Read from stdin, dropping records that do not match
//!   cat events.json | anneal-convert --schema event.avsc --skip-invalid

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anneal::node::parse_stream;
use anneal::{convert_stream, DatasetWriter, JsonLinesWriter, Node, Schema};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};

#[derive(Parser, Debug)]
#[command(name = "anneal-convert")]
#[command(about = "Convert JSON documents to match an Avro schema", long_about = None)]
struct Args {
    /// Avro schema file (.avsc)
    #[arg(long, short = 's', value_name = "SCHEMA")]
    schema: String,

    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Skip records that do not match the schema instead of failing
    #[arg(long)]
    skip_invalid: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let schema_text = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("Failed to read schema {}", args.schema))?;
    let schema = Schema::parse(&schema_text).context("Failed to parse schema")?;

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {file_path}"))?;
        Box::new(file)
    } else {
        Box::new(std::io::stdin())
    };

    // Read entire input for SIMD parsing
    let mut content = Vec::new();
    BufReader::new(reader).read_to_end(&mut content)?;

    let stdout = std::io::stdout();
    let mut writer = JsonLinesWriter::new(BufWriter::new(stdout.lock()));

    let stats = match parse_whole(&content) {
        // A top-level array is a stream of records unless the schema wants an array
        Some(Value::Array(items)) if !matches!(schema, Schema::Array(_)) => convert_stream(
            items.into_iter().map(|v| Ok::<_, anneal::Error>(Node::from(v))),
            &schema,
            &mut writer,
            args.skip_invalid,
        )?,
        Some(value) => convert_stream(
            std::iter::once(Ok::<_, anneal::Error>(Node::from(value))),
            &schema,
            &mut writer,
            args.skip_invalid,
        )?,
        // Fallback to the streaming parser for NDJSON
        None => convert_stream(parse_stream(content.as_slice()), &schema, &mut writer, args.skip_invalid)?,
    };

    writer.close()?;

    if stats.skipped > 0 {
        eprintln!("Wrote {} records, skipped {} invalid", stats.written, stats.skipped);
    }

    Ok(())
}

/// Parse the input as one JSON value with simd-json; `None` if it is not one
fn parse_whole(content: &[u8]) -> Option<Value> {
    // simd-json parses in place, keep the original for the fallback
    let mut scratch = content.to_vec();
    simd_json::serde::from_slice::<Value>(&mut scratch).ok()
}
