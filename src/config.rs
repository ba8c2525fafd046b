// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! check_interval_ms = 1000
//! stale_timeout_ms = 60000
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

const DEFAULT_CHECK_INTERVAL_MS: u64 = 5_000;
const DEFAULT_STALE_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_MAX_PENDING_OPS: usize = 100;
const DEFAULT_HISTORY_LIMIT: usize = 1_000;
const DEFAULT_HISTORY_RETAIN: usize = 500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period of the maintenance tick.
    pub check_interval_ms: u64,
    /// Clients not seen for longer than this are evicted.
    pub stale_timeout_ms: u64,
    /// Cap on each client's pending queue.
    pub max_pending_ops: usize,
    /// History is trimmed once it holds more entries than this.
    pub history_limit: usize,
    /// Entries kept by a trim.
    pub history_retain: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        return EngineConfig {
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            stale_timeout_ms: DEFAULT_STALE_TIMEOUT_MS,
            max_pending_ops: DEFAULT_MAX_PENDING_OPS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_retain: DEFAULT_HISTORY_RETAIN,
        };
    }
}

impl EngineConfig {
    pub fn from_toml(source: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        return Ok(config);
    }

    pub fn check_interval(&self) -> Duration {
        return Duration::from_millis(self.check_interval_ms);
    }

    pub fn stale_timeout(&self) -> Duration {
        return Duration::from_millis(self.stale_timeout_ms);
    }

    /// Entries kept by a trim, never more than the limit.
    pub fn retained(&self) -> usize {
        return self.history_retain.min(self.history_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.check_interval(), Duration::from_secs(5));
        assert_eq!(config.stale_timeout(), Duration::from_secs(300));
        assert_eq!(config.history_limit, 1000);
        assert_eq!(config.retained(), 500);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml("stale_timeout_ms = 10\nmax_pending_ops = 3").unwrap();
        assert_eq!(config.stale_timeout_ms, 10);
        assert_eq!(config.max_pending_ops, 3);
        assert_eq!(config.check_interval_ms, DEFAULT_CHECK_INTERVAL_MS);
    }

    #[test]
    fn retain_is_clamped_to_limit() {
        let config = EngineConfig { history_limit: 10, history_retain: 50, ..EngineConfig::default() };
        assert_eq!(config.retained(), 10);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(EngineConfig::from_toml("history_limit = \"lots\"").is_err());
    }
}
