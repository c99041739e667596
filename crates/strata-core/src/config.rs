//! Backend configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::reference::DEFAULT_PARALLEL_THRESHOLD;
use crate::error::StrataError;
use crate::Result;

/// Environment variable selecting the stream flavour (`immediate`/`worker`).
pub const STREAM_MODE_ENV: &str = "STRATA_STREAM_MODE";
/// Environment variable overriding [`BackendConfig::parallel_threshold`].
pub const PARALLEL_THRESHOLD_ENV: &str = "STRATA_PARALLEL_THRESHOLD";

/// How enqueued engine work is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Run work inline at submission.
    #[default]
    Immediate,
    /// Run work on a background thread; results are fenced.
    Worker,
}

impl StreamMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" | "sync" => Some(StreamMode::Immediate),
            "worker" | "async" => Some(StreamMode::Worker),
            _ => None,
        }
    }
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamMode::Immediate => f.write_str("immediate"),
            StreamMode::Worker => f.write_str("worker"),
        }
    }
}

/// Settings a [`crate::Backend`] is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub stream_mode: StreamMode,

    /// Element count at which reformat kernels split work across threads.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            stream_mode: StreamMode::default(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl BackendConfig {
    pub fn with_stream_mode(mut self, mode: StreamMode) -> Self {
        self.stream_mode = mode;
        self
    }

    /// Read overrides from the process environment.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| StrataError::InvalidArgument(format!("bad backend config: {e}")))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(STREAM_MODE_ENV) {
            match StreamMode::parse(&raw) {
                Some(mode) => config.stream_mode = mode,
                None => tracing::warn!(value = %raw, "ignoring unknown {STREAM_MODE_ENV}"),
            }
        }
        if let Some(raw) = lookup(PARALLEL_THRESHOLD_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.parallel_threshold = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid {PARALLEL_THRESHOLD_ENV}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.stream_mode, StreamMode::Immediate);
        assert_eq!(config.parallel_threshold, 1 << 16);
    }

    #[test]
    fn test_from_json_partial() {
        let config = BackendConfig::from_json(r#"{"stream_mode": "worker"}"#).unwrap();
        assert_eq!(config.stream_mode, StreamMode::Worker);
        assert_eq!(config.parallel_threshold, 1 << 16);

        let config = BackendConfig::from_json("{}").unwrap();
        assert_eq!(config, BackendConfig::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = BackendConfig::from_json(r#"{"stream_mode": "warp"}"#).unwrap_err();
        assert!(matches!(err, StrataError::InvalidArgument(_)));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = BackendConfig::from_lookup(|key| match key {
            STREAM_MODE_ENV => Some("Worker".into()),
            PARALLEL_THRESHOLD_ENV => Some("128".into()),
            _ => None,
        });
        assert_eq!(config.stream_mode, StreamMode::Worker);
        assert_eq!(config.parallel_threshold, 128);
    }

    #[test]
    fn test_lookup_ignores_bad_values() {
        let config = BackendConfig::from_lookup(|key| match key {
            STREAM_MODE_ENV => Some("sideways".into()),
            PARALLEL_THRESHOLD_ENV => Some("0".into()),
            _ => None,
        });
        assert_eq!(config, BackendConfig::default());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = BackendConfig::default().with_stream_mode(StreamMode::Worker);
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains("\"worker\""));
        assert_eq!(BackendConfig::from_json(&text).unwrap(), config);
    }
}
