//! # Reconcile Timer
//!
//! Decides when an App is due for its periodic reconcile.
//!
//! An App is due when it has never been reconciled or when its sync period has
//! elapsed since the last reconcile. After a failed reconcile the failure
//! backoff replaces the sync period.
//! Forced reconciles (a referenced Secret/ConfigMap changed) bypass the timer.

use crate::config::ControllerConfig;
use crate::controller::backoff::FailureBackoff;
use crate::crd::App;
use anyhow::Result;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

static DURATION_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?(?:ms|s|m|h))+$")
        .expect("Failed to compile DURATION_FORMAT regex - this should never happen")
});

static DURATION_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<number>\d+(?:\.\d+)?)(?P<unit>ms|s|m|h)")
        .expect("Failed to compile DURATION_COMPONENT regex - this should never happen")
});

/// Parse a Go-style duration string into `std::time::Duration`
///
/// Accepts one or more `<number><unit>` components with units `ms`, `s`, `m`, `h`,
/// e.g. `"30s"`, `"1m30s"`, `"1.5h"`, `"250ms"`.
pub fn parse_sync_period(duration_str: &str) -> Result<Duration> {
    let trimmed = duration_str.trim();

    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    if !DURATION_FORMAT.is_match(trimmed) {
        return Err(anyhow::anyhow!(
            "Invalid duration format '{trimmed}'. Expected Go duration (e.g., '30s', '1m30s', '1h')"
        ));
    }

    let mut total_secs = 0f64;
    for captures in DURATION_COMPONENT.captures_iter(trimmed) {
        let number: f64 = captures["number"]
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid duration number in '{trimmed}': {e}"))?;
        let unit_secs = match &captures["unit"] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => {
                return Err(anyhow::anyhow!(
                    "Invalid unit '{unit}' in duration '{trimmed}'. Expected: ms, s, m, or h"
                ));
            }
        };
        total_secs += number * unit_secs;
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|e| anyhow::anyhow!("Duration '{trimmed}' is out of range: {e}"))
}

/// Sync period to use for an App
///
/// A missing or unparseable `syncPeriod` falls back to the configured default.
/// The result is never below the configured minimum.
#[must_use]
pub fn effective_sync_period(sync_period: Option<&str>, config: &ControllerConfig) -> Duration {
    let period = match sync_period {
        None => config.default_sync_period(),
        Some(raw) => match parse_sync_period(raw) {
            Ok(period) => period,
            Err(e) => {
                warn!(
                    sync_period = raw,
                    error = %e,
                    "Invalid syncPeriod, using default"
                );
                config.default_sync_period()
            }
        },
    };
    period.max(config.min_sync_period())
}

/// Timer state for one App, derived from its spec and status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTimer {
    sync_period: Duration,
    last_reconcile_time: Option<DateTime<Utc>>,
    /// Retry delay after a failed reconcile; `None` when the last reconcile succeeded
    failure_retry: Option<Duration>,
}

impl ReconcileTimer {
    #[must_use]
    pub fn new(
        sync_period: Duration,
        last_reconcile_time: Option<DateTime<Utc>>,
        failure_retry: Option<Duration>,
    ) -> Self {
        Self {
            sync_period,
            last_reconcile_time,
            failure_retry,
        }
    }

    /// Build the timer from an App's `syncPeriod` and recorded status
    ///
    /// After a failure the App is due again once the failure backoff for its
    /// consecutive failure count has elapsed, never later than the sync period.
    #[must_use]
    pub fn for_app(app: &App, config: &ControllerConfig) -> Self {
        let sync_period = effective_sync_period(app.spec.sync_period.as_deref(), config);
        let status = app.status.as_ref();
        let last_reconcile_time = status
            .and_then(|s| s.last_reconcile_time.as_deref())
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));
        let failure_retry = status.filter(|s| s.has_failed()).map(|s| {
            let mut backoff = FailureBackoff::new(
                Duration::from_secs(config.failure_backoff_base_secs),
                Duration::from_secs(config.failure_backoff_max_secs),
            );
            for _ in 0..s.consecutive_reconcile_failures.max(1) {
                backoff.next_backoff();
            }
            backoff.current().min(sync_period)
        });
        Self::new(sync_period, last_reconcile_time, failure_retry)
    }

    #[must_use]
    pub fn sync_period(&self) -> Duration {
        self.sync_period
    }

    /// Whether the last recorded reconcile failed
    #[must_use]
    pub fn last_failed(&self) -> bool {
        self.failure_retry.is_some()
    }

    fn period(&self) -> Duration {
        self.failure_retry.unwrap_or(self.sync_period)
    }

    /// Whether the App is due for a reconcile at `now`
    #[must_use]
    pub fn is_ready_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_reconcile_time {
            None => true,
            Some(last) => elapsed_since(last, now) >= self.period(),
        }
    }

    /// Time remaining until the App is due; zero when already due
    #[must_use]
    pub fn duration_until_ready(&self, now: DateTime<Utc>) -> Duration {
        match self.last_reconcile_time {
            None => Duration::ZERO,
            Some(last) => self.period().saturating_sub(elapsed_since(last, now)),
        }
    }
}

// Clock skew can put `last` in the future; treat that as zero elapsed.
fn elapsed_since(last: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last).to_std().unwrap_or(Duration::ZERO)
}
