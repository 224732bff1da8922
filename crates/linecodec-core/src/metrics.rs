//! Session metrics snapshot.

use serde::{Deserialize, Serialize};

/// Counters describing one decode session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Delimited records handed to the work queue
    pub records_read: u64,
    /// Input bytes consumed, including a dropped trailing fragment
    pub bytes_read: u64,
    /// Values pushed onto the result stream
    pub values_decoded: u64,
    /// Workers stopped by a decode failure or panic
    pub decode_errors: u64,
    /// 0 or 1
    pub read_errors: u64,
    /// Workers that have exited, for any reason
    pub workers_finished: u64,
}

impl SessionMetrics {
    /// Records that reached a worker but produced no value.
    pub fn unaccounted(&self) -> u64 {
        self.records_read
            .saturating_sub(self.values_decoded)
            .saturating_sub(self.decode_errors)
    }

    pub fn has_errors(&self) -> bool {
        self.decode_errors > 0 || self.read_errors > 0
    }
}
