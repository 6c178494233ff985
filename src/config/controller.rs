//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_START_MS, DEFAULT_FAILURE_BACKOFF_BASE_SECS,
    DEFAULT_FAILURE_BACKOFF_MAX_SECS, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
    DEFAULT_METRICS_PORT, DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
    DEFAULT_SYNC_PERIOD_SECS, DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS, MIN_SYNC_PERIOD_SECS,
};
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared by the reconciler, error policy and watch loop
pub type SharedControllerConfig = Arc<ControllerConfig>;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to come up (seconds)
    pub server_startup_timeout_secs: u64,
    /// Poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Namespace to watch; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Sync period for Apps without a valid `syncPeriod` (seconds)
    pub default_sync_period_secs: u64,
    /// Lower bound applied to every App's sync period (seconds)
    pub min_sync_period_secs: u64,
    /// First retry delay after a failed reconcile (seconds)
    pub failure_backoff_base_secs: u64,
    /// Cap on retry delay after failed reconciles (seconds)
    pub failure_backoff_max_secs: u64,
    /// Exponential backoff starting value for watch errors (milliseconds)
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value for watch errors (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            watch_namespace: None,
            default_sync_period_secs: DEFAULT_SYNC_PERIOD_SECS,
            min_sync_period_secs: MIN_SYNC_PERIOD_SECS,
            failure_backoff_base_secs: DEFAULT_FAILURE_BACKOFF_BASE_SECS,
            failure_backoff_max_secs: DEFAULT_FAILURE_BACKOFF_MAX_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
            enable_metrics: true,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` uses the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            metrics_port: parse_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            server_startup_timeout_secs: parse_or(
                &lookup,
                "SERVER_STARTUP_TIMEOUT_SECS",
                defaults.server_startup_timeout_secs,
            ),
            server_poll_interval_ms: parse_or(
                &lookup,
                "SERVER_POLL_INTERVAL_MS",
                defaults.server_poll_interval_ms,
            ),
            watch_namespace: lookup("WATCH_NAMESPACE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            default_sync_period_secs: parse_or(
                &lookup,
                "DEFAULT_SYNC_PERIOD_SECS",
                defaults.default_sync_period_secs,
            ),
            min_sync_period_secs: parse_or(
                &lookup,
                "MIN_SYNC_PERIOD_SECS",
                defaults.min_sync_period_secs,
            ),
            failure_backoff_base_secs: parse_or(
                &lookup,
                "FAILURE_BACKOFF_BASE_SECS",
                defaults.failure_backoff_base_secs,
            ),
            failure_backoff_max_secs: parse_or(
                &lookup,
                "FAILURE_BACKOFF_MAX_SECS",
                defaults.failure_backoff_max_secs,
            ),
            backoff_start_ms: parse_or(&lookup, "BACKOFF_START_MS", defaults.backoff_start_ms),
            backoff_max_ms: parse_or(&lookup, "BACKOFF_MAX_MS", defaults.backoff_max_ms),
            watch_restart_delay_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            watch_restart_delay_after_end_secs: parse_or(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                defaults.watch_restart_delay_after_end_secs,
            ),
            max_concurrent_reconciliations: parse_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
            enable_metrics: bool_or(&lookup, "ENABLE_METRICS", defaults.enable_metrics),
        }
    }

    /// Sync period for Apps without a usable `syncPeriod`
    #[must_use]
    pub fn default_sync_period(&self) -> Duration {
        Duration::from_secs(self.default_sync_period_secs)
    }

    /// Lower bound for any App's sync period
    #[must_use]
    pub fn min_sync_period(&self) -> Duration {
        Duration::from_secs(self.min_sync_period_secs)
    }

    /// Get server startup timeout duration
    #[must_use]
    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    /// Get server readiness poll interval
    #[must_use]
    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read a value and parse it, or return the default
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a value as boolean or return the default
fn bool_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(default, |v| {
        let v_lower = v.to_lowercase();
        v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
    })
}
