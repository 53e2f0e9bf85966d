use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use avro_json_udf::{AvroJsonDecoder, DecoderConfig, Framing};
use clap::Parser;
use tracing::info;

/// Decode hex-encoded Avro payloads from stdin, one per line, to JSON lines.
#[derive(Parser)]
#[command(name = "avro2json", version, about)]
struct Cli {
    /// Schema file (Avro schema JSON)
    #[arg(long, short = 's')]
    schema: PathBuf,

    /// Ignore bytes left over after each value
    #[arg(long)]
    allow_trailing: bool,

    /// Reject schema names that break the Avro naming rules
    #[arg(long)]
    strict: bool,

    /// Maximum nesting depth (at most 1024)
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Process stdin; returns the number of failed rows.
fn run(cli: &Cli) -> Result<usize, Box<dyn std::error::Error>> {
    let mut config = DecoderConfig::from_env()?;
    if cli.allow_trailing {
        config.framing = Framing::AllowTrailing;
    }
    if cli.strict {
        config.strict_schema = true;
    }
    if let Some(depth) = cli.max_depth {
        config = config.with_max_depth(depth);
    }

    let schema_text = std::fs::read_to_string(&cli.schema)
        .map_err(|e| format!("cannot read {}: {}", cli.schema.display(), e))?;
    let decoder = AvroJsonDecoder::new(&schema_text, config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut rows = 0usize;
    let mut failed = 0usize;

    for (index, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows += 1;
        match decoder.decode_hex(&line) {
            Ok(json) => writeln!(out, "{json}")?,
            Err(e) => {
                failed += 1;
                writeln!(out, "ERROR line {}: {e}", index + 1)?;
            }
        }
    }
    out.flush()?;

    info!(rows, failed, "done");
    Ok(failed)
}
