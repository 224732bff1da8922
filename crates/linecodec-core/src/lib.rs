//! # linecodec-core
//!
//! Core traits, types, and primitives shared across all LineCodec crates.
//! The streaming pipeline, the observability helpers, and the CLI are all
//! built on the interfaces defined here.

pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod record;

pub use config::PipelineConfig;
pub use decoder::{JsonDecoder, RecordDecoder};
pub use diagnostics::{DiagnosticLog, SharedBuffer};
pub use error::{ConfigError, DecodeError, PipelineError};
pub use metrics::SessionMetrics;
pub use record::{Record, DELIMITER};
