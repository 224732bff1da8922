//! `tracing` subscriber setup for the LineCodec binaries.
//!
//! Diagnostics that a pipeline writes to its own sink are not affected;
//! this only controls the `tracing` events emitted by the splitter,
//! the workers and the session supervisor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Which pipeline events reach stderr, and in what format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter applied to every crate, e.g. "warn". Any `EnvFilter`
    /// directive string is accepted.
    #[serde(default = "default_level")]
    pub level: String,
    /// Per-crate overrides keyed by crate name, e.g.
    /// `linecodec-stream = "debug"` to trace worker joins and state changes.
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// One JSON object per event instead of the compact text format
    #[serde(default)]
    pub json: bool,
}

/// Session start and close summaries are logged at `info`.
fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Build the filter directive string, e.g. `"info,linecodec_stream=debug"`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();

        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Initialise tracing with the given log config. Logs go to stderr so that
/// decoded output on stdout stays clean.
///
/// Call once at application startup; returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_normalise_component_names() {
        let mut cfg = LogConfig::with_level("warn");
        cfg.components.insert("linecodec-stream".into(), "debug".into());
        cfg.components.insert("linecodec-core".into(), "trace".into());
        assert_eq!(
            cfg.directives(),
            "warn,linecodec_core=trace,linecodec_stream=debug"
        );
    }

    #[test]
    fn config_from_json_uses_defaults() {
        let cfg: LogConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert_eq!(cfg.level, "info");
        assert!(cfg.json);
        assert!(cfg.components.is_empty());
    }
}
