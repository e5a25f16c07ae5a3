// ==============================================================================
// config.rs - Orchestrator Configuration
// ==============================================================================
// Description: Cache/job retention, timeouts and polling intervals from env
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use genomic_analysis::AnalysisError;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Expiry of cached analysis runs
    pub cache_ttl_secs: u64,
    /// Terminal jobs older than this are removed by periodic cleanup
    pub retention_hours: u64,
    /// Expiry of durable job records
    pub record_ttl_secs: u64,
    /// Applied when a submission carries no timeout of its own
    pub default_timeout_secs: Option<u64>,
    /// How often subscribers to jobs owned elsewhere re-read the store
    pub poll_interval: Duration,
    pub cleanup_interval: Duration,
    /// Non-terminal jobs with no recorded activity for this long are considered abandoned
    pub stale_after: Duration,
    /// How often a running job refreshes its record; must stay below `stale_after`
    pub heartbeat_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            retention_hours: 24,
            record_ttl_secs: 7 * 24 * 3600,
            default_timeout_secs: None,
            poll_interval: Duration::from_millis(1000),
            cleanup_interval: Duration::from_secs(3600),
            stale_after: Duration::from_secs(10 * 60),
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let parse = |name: &str| -> Result<Option<u64>, AnalysisError> {
            match lookup(name) {
                Some(raw) if !raw.trim().is_empty() => parse_number(name, &raw).map(Some),
                _ => Ok(None),
            }
        };

        let config = Self {
            cache_ttl_secs: parse("ANALYSIS_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl_secs),
            retention_hours: parse("JOB_RETENTION_HOURS")?.unwrap_or(defaults.retention_hours),
            record_ttl_secs: parse("JOB_RECORD_TTL_SECS")?.unwrap_or(defaults.record_ttl_secs),
            default_timeout_secs: parse("JOB_DEFAULT_TIMEOUT_SECS")?.filter(|secs| *secs > 0),
            poll_interval: parse("JOB_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            cleanup_interval: parse("JOB_CLEANUP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            stale_after: parse("JOB_STALE_AFTER_MINUTES")?
                .map(|minutes| Duration::from_secs(minutes * 60))
                .unwrap_or(defaults.stale_after),
            heartbeat_interval: parse("JOB_HEARTBEAT_SECS")?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
        };

        if config.heartbeat_interval >= config.stale_after {
            return Err(AnalysisError::Configuration(format!(
                "JOB_HEARTBEAT_SECS ({}s) must be shorter than JOB_STALE_AFTER_MINUTES ({}s)",
                config.heartbeat_interval.as_secs(),
                config.stale_after.as_secs()
            )));
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, AnalysisError> {
    raw.trim().parse::<T>().map_err(|_| {
        AnalysisError::Configuration(format!("{} must be a non-negative integer, got '{}'", name, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = OrchestratorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.record_ttl_secs, 604800);
        assert_eq!(config.default_timeout_secs, None);
    }

    #[test]
    fn test_overrides() {
        let config = OrchestratorConfig::from_lookup(lookup(&[
            ("ANALYSIS_CACHE_TTL_SECS", "120"),
            ("JOB_DEFAULT_TIMEOUT_SECS", "300"),
            ("JOB_POLL_INTERVAL_MS", "250"),
            ("JOB_STALE_AFTER_MINUTES", "2"),
            ("JOB_HEARTBEAT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.cache_ttl_secs, 120);
        assert_eq!(config.default_timeout_secs, Some(300));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.stale_after, Duration::from_secs(120));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_heartbeat_must_beat_stale_threshold() {
        let err = OrchestratorConfig::from_lookup(lookup(&[
            ("JOB_STALE_AFTER_MINUTES", "1"),
            ("JOB_HEARTBEAT_SECS", "60"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(ref m) if m.contains("JOB_HEARTBEAT_SECS")));

        // Zero keeps the default, which then collides with a one-minute threshold too
        assert!(OrchestratorConfig::from_lookup(lookup(&[
            ("JOB_STALE_AFTER_MINUTES", "1"),
            ("JOB_HEARTBEAT_SECS", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn test_invalid_value_is_configuration_error() {
        let err = OrchestratorConfig::from_lookup(lookup(&[("JOB_RETENTION_HOURS", "a day")])).unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(ref m) if m.contains("JOB_RETENTION_HOURS")));
    }
}
