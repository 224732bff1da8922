//! Throughput reporting for finished sessions.

use linecodec_core::SessionMetrics;
use serde::Serialize;
use std::time::Duration;

/// Session counters plus rates over the elapsed wall-clock time.
#[derive(Debug, Clone, Serialize)]
pub struct ThroughputReport {
    #[serde(flatten)]
    pub metrics: SessionMetrics,
    pub elapsed_ms: u64,
    pub records_per_sec: f64,
    pub bytes_per_sec: f64,
}

impl ThroughputReport {
    pub fn new(metrics: SessionMetrics, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let rate = |n: u64| if secs > 0.0 { n as f64 / secs } else { 0.0 };
        Self {
            metrics,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            records_per_sec: rate(metrics.values_decoded),
            bytes_per_sec: rate(metrics.bytes_read),
        }
    }

    /// One-line human summary, e.g. `1,302 records of 107.0 kB in 90ms at 1.2 MB/s (0 decode errors, 0 read errors)`.
    pub fn summary(&self) -> String {
        format!(
            "{} records of {} in {}ms at {}/s ({} decode errors, {} read errors)",
            with_commas(self.metrics.values_decoded),
            human_bytes(self.metrics.bytes_read as f64),
            self.elapsed_ms,
            human_bytes(self.bytes_per_sec),
            self.metrics.decode_errors,
            self.metrics.read_errors,
        )
    }
}

/// SI-scaled byte count: `B`, `kB`, `MB`, `GB`, `TB`.
pub fn human_bytes(n: f64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = n;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value as u64, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Thousands separators, e.g. `1302811` → `1,302,811`.
pub fn with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
