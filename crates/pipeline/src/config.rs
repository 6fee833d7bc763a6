//! Environment-driven pipeline configuration.

use std::time::Duration;

/// Runtime configuration for the parse service.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Revisions parsed concurrently (default: `4`).
    pub workers: usize,
    /// Analysis service base URL; unset selects the offline stub.
    pub analysis_url: Option<String>,
    /// Per-request analysis timeout in milliseconds (default: `5000`).
    pub analysis_timeout_ms: u64,
    /// Attempts per analysis batch, first try included (default: `2`).
    pub analysis_attempts: u32,
    /// Parsed revisions kept in the in-memory store (default: `64`).
    pub cache_capacity: usize,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `SLUGLINE_WORKERS`             | `4`     |
    /// | `SLUGLINE_ANALYSIS_URL`        | unset   |
    /// | `SLUGLINE_ANALYSIS_TIMEOUT_MS` | `5000`  |
    /// | `SLUGLINE_ANALYSIS_ATTEMPTS`   | `2`     |
    /// | `SLUGLINE_CACHE_CAPACITY`      | `64`    |
    pub fn from_env() -> Self {
        let workers: usize = std::env::var("SLUGLINE_WORKERS")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("SLUGLINE_WORKERS must be a valid usize");

        let analysis_url = std::env::var("SLUGLINE_ANALYSIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let analysis_timeout_ms: u64 = std::env::var("SLUGLINE_ANALYSIS_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("SLUGLINE_ANALYSIS_TIMEOUT_MS must be a valid u64");

        let analysis_attempts: u32 = std::env::var("SLUGLINE_ANALYSIS_ATTEMPTS")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("SLUGLINE_ANALYSIS_ATTEMPTS must be a valid u32");

        let cache_capacity: usize = std::env::var("SLUGLINE_CACHE_CAPACITY")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("SLUGLINE_CACHE_CAPACITY must be a valid usize");

        Self {
            workers,
            analysis_url,
            analysis_timeout_ms,
            analysis_attempts,
            cache_capacity,
        }
    }

    /// Per-request analysis deadline.
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            analysis_url: None,
            analysis_timeout_ms: 5000,
            analysis_attempts: 2,
            cache_capacity: 64,
        }
    }
}
