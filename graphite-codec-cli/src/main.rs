//! CLI for the graphite-codec library.
//!
//! Converts Graphite plaintext lines to newline-delimited JSON events and back,
//! and checks codec configuration files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use graphite_codec::framing::DEFAULT_MAX_LINE_LENGTH;
use graphite_codec::{CodecConfig, Event, GraphiteCodec, LineSplitter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Size of each read from the Graphite input stream.
const READ_CHUNK_SIZE: usize = 8192;

/// graphite-codec: convert between Graphite lines and JSON events.
#[derive(Parser)]
#[command(name = "graphite-codec", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Read Graphite lines and print one JSON event per line.
    Decode {
        /// Input file (defaults to stdin).
        #[arg(long)]
        input: Option<PathBuf>,

        /// Lines longer than this many bytes are dropped.
        #[arg(long, default_value_t = DEFAULT_MAX_LINE_LENGTH)]
        max_line_length: usize,
    },

    /// Read JSON events (one per line) and print Graphite lines.
    Encode {
        /// Input file (defaults to stdin).
        #[arg(long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Validate a configuration and print it with defaults filled in.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Configuration sources shared by the commands that encode.
#[derive(clap::Args)]
struct ConfigArgs {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Explicit metric mapping as `NAME=VALUE` templates (repeatable).
    #[arg(long = "metric", value_parser = parse_metric)]
    metrics: Vec<(String, String)>,

    /// Treat every event field as a metric.
    #[arg(long)]
    fields_are_metrics: bool,

    /// Treat each metric value as a map of sub-metrics.
    #[arg(long)]
    values_are_hash: bool,

    /// Metric-name template; `*` is replaced by the metric name.
    #[arg(long)]
    metrics_format: Option<String>,
}

impl ConfigArgs {
    /// Loads the config file, if any, then applies command-line overrides.
    fn resolve(self) -> graphite_codec::Result<CodecConfig> {
        let mut config = match &self.config {
            Some(path) => CodecConfig::load(path)?,
            None => CodecConfig::default(),
        };

        for (metric, value) in self.metrics {
            config.metrics.insert(metric, value);
        }
        if self.fields_are_metrics {
            config.fields_are_metrics = true;
        }
        if self.values_are_hash {
            config.values_are_hash = true;
        }
        if let Some(format) = self.metrics_format {
            config.metrics_format = format;
        }

        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Decode {
            input,
            max_line_length,
        } => cmd_decode(input.as_deref(), max_line_length),
        Commands::Encode { input, config } => cmd_encode(input.as_deref(), config),
        Commands::Check { config } => cmd_check(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `graphite-codec decode`.
fn cmd_decode(
    input: Option<&Path>,
    max_line_length: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let codec = GraphiteCodec::new(CodecConfig::default())?;
    let mut reader = open_input(input)?;
    let mut out = BufWriter::new(io::stdout().lock());

    let mut splitter = LineSplitter::with_max_line_length(max_line_length);
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut decoded = 0u64;
    let mut skipped = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        let results: Vec<_> = if n == 0 {
            codec.finish_stream(&mut splitter).into_iter().collect()
        } else {
            codec.decode_stream(&mut splitter, &buf[..n])
        };

        for result in results {
            match result {
                Ok(event) => {
                    serde_json::to_writer(&mut out, &event)?;
                    out.write_all(b"\n")?;
                    decoded += 1;
                }
                Err(e) => {
                    warn!("skipping line: {e}");
                    skipped += 1;
                }
            }
        }

        if n == 0 {
            break;
        }
    }

    out.flush()?;
    info!(decoded, skipped, oversized = splitter.dropped(), "decode finished");
    Ok(())
}

/// Implements `graphite-codec encode`.
fn cmd_encode(input: Option<&Path>, config: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let codec = GraphiteCodec::new(config.resolve()?)?;
    let reader = BufReader::new(open_input(input)?);
    let mut out = BufWriter::new(io::stdout().lock());

    let mut batches = 0u64;
    let mut empty = 0u64;
    let mut skipped = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, "skipping invalid event: {e}");
                skipped += 1;
                continue;
            }
        };

        match codec.encode_to(&event, &mut out) {
            Ok(true) => batches += 1,
            Ok(false) => empty += 1,
            Err(graphite_codec::CodecError::Sink(e)) => return Err(e.into()),
            Err(e) => {
                warn!(line = index + 1, "skipping event: {e}");
                skipped += 1;
            }
        }
    }

    out.flush()?;
    info!(batches, empty, skipped, "encode finished");
    Ok(())
}

/// Implements `graphite-codec check`.
fn cmd_check(config: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let codec = GraphiteCodec::new(config.resolve()?)?;
    let config = codec.config();

    println!("Configuration OK");
    println!();
    println!(
        "Mode: {}",
        if config.fields_are_metrics {
            "fields are metrics"
        } else {
            "explicit mapping"
        }
    );
    if !config.fields_are_metrics {
        println!("Metrics: {}", config.metrics.len());
        for (metric, value) in &config.metrics {
            println!("  - {metric} => {value}");
        }
    }
    println!("Values are hash: {}", config.values_are_hash);
    println!("Metrics format: {:?}", config.metrics_format);
    println!("Include metrics: {:?}", config.include_metrics);
    println!("Exclude metrics: {:?}", config.exclude_metrics);
    if config.values_are_hash {
        println!("Include submetrics: {:?}", config.include_submetrics);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    Ok(())
}

/// Opens `path`, or stdin when no path is given.
fn open_input(path: Option<&Path>) -> io::Result<Box<dyn Read>> {
    match path {
        Some(path) => Ok(Box::new(File::open(path)?)),
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Parses a `--metric NAME=VALUE` argument.
fn parse_metric(s: &str) -> Result<(String, String), String> {
    let (metric, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if metric.is_empty() {
        return Err(format!("empty metric name in '{s}'"));
    }
    Ok((metric.to_string(), value.to_string()))
}
