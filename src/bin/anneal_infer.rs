//! anneal-infer: Infer an Avro schema from example JSON documents
//!
//! Every document in the input is inferred on its own and the results are
//! merged, so fields missing from some examples come out nullable.
//!
//! Usage:
//!   # Read from file, output to stdout
//!   anneal-infer events.jsonl --name Event
//!
//!   # Read from stdin, output to stdout
//!   echo '{"id": 1, "user": {"name": "alice"}}' | anneal-infer
//!
//!   # Nested objects as maps, only the first 1000 documents
//!   anneal-infer --maps --records 1000 events.jsonl --compact

use anneal::{infer_schema_from_reader, InferenceConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{stdin, BufReader, Read};

#[derive(Parser, Debug)]
#[command(name = "anneal-infer")]
#[command(about = "Infer an Avro schema from JSON examples", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Name of the root record
    #[arg(long, default_value = "Root")]
    name: String,

    /// Infer nested objects as maps instead of records
    #[arg(long)]
    maps: bool,

    /// Read at most N documents
    #[arg(long, value_name = "N")]
    records: Option<usize>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let reader: Box<dyn Read> = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {file_path}"))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let mut builder = InferenceConfig::builder().root_name(args.name);
    if args.maps {
        builder = builder.use_maps();
    }
    if let Some(n) = args.records {
        builder = builder.num_records(n);
    }
    let config = builder.build();

    let Some(schema) = infer_schema_from_reader(reader, &config)? else {
        eprintln!("Warning: No JSON documents found in input");
        return Ok(());
    };

    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };

    println!("{}", output);

    Ok(())
}
