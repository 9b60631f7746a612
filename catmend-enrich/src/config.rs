//! Enrichment pipeline configuration

use crate::fetch::RetryPolicy;
use crate::reconcile::Thresholds;
use catmend_common::{config, Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    concat!("catmend/", env!("CARGO_PKG_VERSION"), " (catalog metadata reconciliation)");

/// All tunables of an enrichment run, loaded from `enrich.toml` with
/// compiled defaults for anything unset. CLI flags override individual
/// fields after loading.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Concurrent fetch workers in Pass 2.
    pub workers: usize,
    /// Minimum start-to-start spacing between requests, all workers
    /// combined.
    pub min_request_interval_ms: u64,
    pub max_attempts: u32,
    pub network_backoff_ms: u64,
    pub network_backoff_factor: u32,
    pub rate_limit_backoff_ms: u64,
    pub rate_limit_backoff_factor: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub thresholds: Thresholds,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            min_request_interval_ms: 1000,
            max_attempts: 3,
            network_backoff_ms: 500,
            network_backoff_factor: 2,
            rate_limit_backoff_ms: 2000,
            rate_limit_backoff_factor: 3,
            request_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl EnrichConfig {
    /// Load from `path`, or from the platform default location when `None`;
    /// a missing file falls back to compiled defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg: Self = config::load_toml_or_default(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Sanity-check the threshold geometry.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("conflict", t.conflict),
            ("correction_low", t.correction_low),
            ("correction_high", t.correction_high),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidInput(format!(
                    "threshold {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if t.correction_low >= t.correction_high {
            return Err(Error::InvalidInput(format!(
                "correction window is empty: low {} >= high {}",
                t.correction_low, t.correction_high
            )));
        }
        Ok(())
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            network_backoff: Duration::from_millis(self.network_backoff_ms),
            network_backoff_factor: self.network_backoff_factor,
            rate_limit_backoff: Duration::from_millis(self.rate_limit_backoff_ms),
            rate_limit_backoff_factor: self.rate_limit_backoff_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EnrichConfig::default();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.min_request_interval(), Duration::from_millis(1000));
        assert_eq!(cfg.retry_policy().max_attempts, 3);
        assert!((cfg.thresholds.conflict - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enrich.toml");
        std::fs::write(
            &path,
            "workers = 8\nmin_request_interval_ms = 250\n\n[thresholds]\nconflict = 0.5\n",
        )
        .unwrap();

        let cfg = EnrichConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.min_request_interval_ms, 250);
        assert!((cfg.thresholds.conflict - 0.5).abs() < f64::EPSILON);
        // untouched settings keep their compiled defaults
        assert_eq!(cfg.max_attempts, 3);
        assert!((cfg.thresholds.correction_high - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inverted_correction_window_is_rejected() {
        let mut cfg = EnrichConfig::default();
        cfg.thresholds.correction_low = 0.8;
        assert!(cfg.validate().is_err());

        cfg.thresholds.correction_low = 1.4;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_max_attempts_floor() {
        let cfg = EnrichConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(cfg.retry_policy().max_attempts, 1);
    }
}
