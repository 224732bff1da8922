//! `linecodec decode`: run one pipeline session over a file or stdin.

use anyhow::{bail, Context, Result};
use linecodec_core::{PipelineConfig, PipelineError};
use linecodec_observability::ThroughputReport;
use linecodec_stream::Pipeline;
use serde_json::Value;
use std::time::Instant;
use tokio::io::AsyncRead;
use tracing::info;

pub struct DecodeOptions {
    pub workers: Option<usize>,
    pub queue_depth: usize,
    pub print: bool,
    pub json: bool,
    pub diagnostics: bool,
}

async fn open_input(file: &str) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
    if file == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let f = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("open input file '{}'", file))?;
    Ok(Box::new(f))
}

pub async fn run(file: &str, opts: DecodeOptions) -> Result<()> {
    let mut config = PipelineConfig::default().queue_depth(opts.queue_depth);
    if let Some(n) = opts.workers {
        config.workers = n;
    }

    let mut pipeline =
        Pipeline::<Value>::new(config).context("invalid pipeline configuration")?;
    if opts.diagnostics {
        pipeline.set_log_output(std::io::stderr());
    }

    let input = open_input(file).await?;
    info!(
        "decoding '{}' with {} workers ({} decoder)",
        file,
        pipeline.config().workers,
        pipeline.decoder_name()
    );

    let start = Instant::now();
    let session = pipeline.decode(input, || Value::Null);
    let monitor = session.monitor();
    let (mut values, mut errors) = session.split();

    let print = opts.print;
    let (_, errors) = tokio::join!(
        async {
            while let Some(v) = values.recv().await {
                if print {
                    println!("{v}");
                }
            }
        },
        async {
            let mut out: Vec<PipelineError> = Vec::new();
            while let Some(e) = errors.recv().await {
                eprintln!("decoding error: {e}");
                out.push(e);
            }
            out
        }
    );
    monitor.wait_closed().await;

    let metrics = monitor.metrics();
    let report = ThroughputReport::new(metrics, start.elapsed());
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!("{}", report.summary());
    }

    if metrics.has_errors() {
        bail!("{} record(s) or reads failed; output is incomplete", errors.len());
    }
    Ok(())
}
