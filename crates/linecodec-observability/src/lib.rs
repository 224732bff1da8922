//! # linecodec-observability
//!
//! Logging setup and throughput reporting for LineCodec.
//!
//! ## Structured logging
//! `tracing` subscriber with per-component levels and optional JSON output,
//! compatible with ELK, Loki, CloudWatch.
//!
//! ## Throughput
//! `ThroughputReport` turns a session's `SessionMetrics` and elapsed time
//! into records/s and bytes/s.

pub mod report;
pub mod tracing_setup;

pub use report::{human_bytes, with_commas, ThroughputReport};
pub use tracing_setup::{init_tracing, LogConfig};
