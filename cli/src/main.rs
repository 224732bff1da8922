//! LineCodec CLI: decode newline-delimited JSON with a pool of workers.
//!
//! # Commands
//! ```text
//! linecodec decode --file <path|-> [--workers N] [--queue-depth D] [--print] [--json]
//! linecodec info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use linecodec_observability::{init_tracing, LogConfig};

mod cmd_decode;

#[derive(Parser)]
#[command(
    name = "linecodec",
    about = "Parallel newline-delimited JSON decoder (LineCodec CLI)",
    long_about = "
LineCodec CLI: split a newline-delimited JSON stream into records and decode
them concurrently. One JSON document per line; a final line without a
trailing newline is ignored.

ENVIRONMENT VARIABLES:
  RUST_LOG    Overrides --log-level when set
",
    version
)]
struct Cli {
    /// Log level for tracing output on stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit tracing output as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an NDJSON file (or stdin) and report throughput
    Decode {
        /// Input file; `-` reads stdin
        #[arg(short, long, default_value = "-")]
        file: String,
        /// Number of decoder workers (default: available CPUs)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Per-worker queue buffering
        #[arg(long, default_value_t = 10)]
        queue_depth: usize,
        /// Print every decoded value to stdout
        #[arg(long)]
        print: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        /// Write pipeline diagnostics to stderr
        #[arg(long)]
        diagnostics: bool,
    },

    /// Show default pipeline settings
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log = std::env::var("RUST_LOG")
        .map(LogConfig::with_level)
        .unwrap_or_else(|_| LogConfig::with_level(&cli.log_level));
    init_tracing(&LogConfig {
        json: cli.log_json,
        ..log
    });

    match cli.command {
        Commands::Decode {
            file,
            workers,
            queue_depth,
            print,
            json,
            diagnostics,
        } => {
            let opts = cmd_decode::DecodeOptions {
                workers,
                queue_depth,
                print,
                json,
                diagnostics,
            };
            cmd_decode::run(&file, opts).await
        }

        Commands::Info => cmd_info(),
    }
}

fn cmd_info() -> Result<()> {
    let cfg = linecodec_core::PipelineConfig::default();
    println!("LineCodec v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Default pipeline settings:");
    println!("  workers       {}", cfg.workers);
    println!("  queue depth   {}", cfg.queue_depth);
    println!("  work queue    {} records", cfg.work_capacity());
    println!("  result queue  {} values", cfg.result_capacity());
    println!("  error queue   {} errors", cfg.error_capacity());
    println!("  record format one JSON document per `\\n`-terminated line");
    Ok(())
}
