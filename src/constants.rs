//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Name used as field manager and in log output
pub const CONTROLLER_NAME: &str = "app-controller";

/// Finalizer placed on Apps so deletion is observed before the object is gone
pub const APP_FINALIZER: &str = "finalizers.appctrl.dev/delete";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Sync period used when an App specifies none, or an invalid one (seconds)
pub const DEFAULT_SYNC_PERIOD_SECS: u64 = 30;

/// Lower bound for an App's sync period (seconds)
pub const MIN_SYNC_PERIOD_SECS: u64 = 30;

/// First retry delay after a failed reconcile (seconds)
pub const DEFAULT_FAILURE_BACKOFF_BASE_SECS: u64 = 1;

/// Cap for failed reconcile retry delay (seconds)
pub const DEFAULT_FAILURE_BACKOFF_MAX_SECS: u64 = 300;

/// Default exponential backoff starting value for watch errors (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch errors (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default upper bound on reconciles running at once
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
