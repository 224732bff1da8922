//! Pipeline configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Sizing and diagnostics settings for a decode pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent decoder workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-worker buffering of the work and result queues
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Prefix prepended to every diagnostic log line
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
fn default_queue_depth() -> usize { 10 }
fn default_log_prefix() -> String { "[linecodec] ".into() }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            log_prefix: default_log_prefix(),
        }
    }
}

impl PipelineConfig {
    /// Default config with a fixed worker count.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }

    /// Capacity of the record queue feeding the workers.
    pub fn work_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_depth).max(1)
    }

    /// Capacity of the decoded value queue.
    pub fn result_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_depth).max(1)
    }

    /// One slot per worker plus one for the reader, so error sends never block.
    pub fn error_capacity(&self) -> usize {
        self.workers.saturating_add(1)
    }
}
