//! # linecodec-stream
//!
//! Bounded-parallelism decode pipeline for newline-delimited records.
//!
//! Reads an async byte stream, splits it on `\n`, decodes each line on one
//! of N worker tasks, and emits decoded values and errors on two streams
//! that end once every task has finished.
//!
//! ## Architecture
//! ```text
//! AsyncRead
//!       │
//!       ▼
//! Splitter (Tokio task) ── read error ──────────────┐
//!       │                                           │
//!       ▼                                           │
//! work queue: mpsc<Record>, capacity N × depth      │
//!       │                                           │
//!       ▼                                           ▼
//! Worker × N ── RecordDecoder::decode ── failure ─▶ error queue, capacity N + 1
//!       │
//!       ▼
//! result queue: mpsc<T>, capacity N × depth
//!
//! Supervisor: joins splitter + workers, then closes both output queues
//! ```
//!
//! ## Guarantees
//! - every delimited record is decoded by exactly one worker
//! - a worker stops at its first decode failure and reports it once
//! - a trailing fragment without `\n` is not decoded
//! - no ordering between values

pub mod pipeline;
pub mod session;
mod splitter;
mod worker;

pub use pipeline::{decode, Pipeline};
pub use session::{ErrorStream, Session, SessionMonitor, SessionOutput, SessionState, ValueStream};
pub use worker::ValueFactory;

pub use linecodec_core::{DecodeError, PipelineConfig, PipelineError, RecordDecoder};
