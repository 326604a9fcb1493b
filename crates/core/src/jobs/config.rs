//! Configuration for background conversion jobs.

use serde::{Deserialize, Serialize};

/// Job runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Maximum conversions running at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// How long an awaiting caller waits for a result, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Finished job records kept for polling.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_max_parallel() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_history_limit() -> usize {
    1000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            timeout_secs: default_timeout_secs(),
            history_limit: default_history_limit(),
        }
    }
}

impl JobsConfig {
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobsConfig::default();
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.history_limit, 1000);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: JobsConfig = toml::from_str("max_parallel = 2").unwrap();
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.timeout_secs, 300);
    }
}
