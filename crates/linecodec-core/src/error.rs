//! Error types for the LineCodec decode pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a single record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Record is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Other(String),
}

impl DecodeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced on a session's error stream.
///
/// A session reports at most one `Read` error and at most one error per
/// worker (`Decode` or `WorkerPanicked`).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input failed before reaching its natural end.
    #[error("readlines: {source}")]
    Read {
        #[source]
        source: std::io::Error,
    },

    /// A worker failed to decode a record and stopped.
    #[error("decoder {worker}: record {record}: {source}")]
    Decode {
        worker: usize,
        record: u64,
        #[source]
        source: DecodeError,
    },

    /// A worker task panicked (usually inside a custom decoder).
    #[error("decoder {worker}: worker panicked")]
    WorkerPanicked { worker: usize },
}

impl PipelineError {
    /// Returns `true` for errors raised while reading the input.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }

    /// Returns `true` for errors that stopped a worker.
    pub fn is_worker_failure(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::WorkerPanicked { .. })
    }

    /// The worker this error belongs to, if any.
    pub fn worker(&self) -> Option<usize> {
        match self {
            Self::Read { .. } => None,
            Self::Decode { worker, .. } | Self::WorkerPanicked { worker } => Some(*worker),
        }
    }

    /// The 1-based index of the record that failed to decode, if any.
    pub fn record_index(&self) -> Option<u64> {
        match self {
            Self::Decode { record, .. } => Some(*record),
            _ => None,
        }
    }
}

/// Errors from pipeline configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("queue depth must be at least 1")]
    ZeroQueueDepth,
}
