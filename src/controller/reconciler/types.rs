//! # Types
//!
//! Core types for the reconciler.

use crate::config::SharedControllerConfig;
use crate::controller::backoff::FailureBackoff;
use crate::controller::reftracker::{AppKey, AppRefTracker, AppUpdateStatus};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Trigger source for reconciliation
/// Tracks why a reconciliation ran for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// A referenced Secret or ConfigMap changed
    ReferenceChanged,
    /// The App's spec generation moved past the observed generation
    SpecChanged,
    /// Sync period elapsed, or the App was never reconciled
    TimerBased,
    /// Retry after a failed reconcile
    ErrorBackoff,
}

impl TriggerSource {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::ReferenceChanged => "reference-changed",
            TriggerSource::SpecChanged => "spec-changed",
            TriggerSource::TimerBased => "timer-based",
            TriggerSource::ErrorBackoff => "error-backoff",
        }
    }
}

/// Failure backoff state per App
#[derive(Debug)]
pub struct BackoffStates {
    base: Duration,
    max: Duration,
    states: Mutex<HashMap<AppKey, FailureBackoff>>,
}

impl BackoffStates {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failure for `app`; returns the retry delay and the failure count
    pub fn next_backoff(&self, app: &AppKey) -> (Duration, u32) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let backoff = states
            .entry(app.clone())
            .or_insert_with(|| FailureBackoff::new(self.base, self.max));
        let delay = backoff.next_backoff();
        (delay, backoff.failures())
    }

    /// Reset after success; returns whether the App had recorded failures
    pub fn reset(&self, app: &AppKey) -> bool {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(app).is_some_and(|b| b.failures() > 0)
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub config: SharedControllerConfig,
    pub tracker: Arc<AppRefTracker>,
    pub update_status: Arc<AppUpdateStatus>,
    // Managed by the error policy, reset by a successful reconcile
    pub backoff_states: Arc<BackoffStates>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("tracked_apps", &self.tracker.tracked_apps())
            .field("pending_updates", &self.update_status.pending_count())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        client: Client,
        config: SharedControllerConfig,
        tracker: Arc<AppRefTracker>,
        update_status: Arc<AppUpdateStatus>,
    ) -> Self {
        let backoff_states = Arc::new(BackoffStates::new(
            Duration::from_secs(config.failure_backoff_base_secs),
            Duration::from_secs(config.failure_backoff_max_secs),
        ));
        Self {
            client,
            config,
            tracker,
            update_status,
            backoff_states,
        }
    }

    /// Drop all in-memory state held for an App that no longer exists
    pub fn forget_app(&self, app: &AppKey) {
        self.tracker.remove_app_from_all_refs(app);
        self.update_status.forget(app);
        self.backoff_states.reset(app);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_states_are_per_app() {
        let states = BackoffStates::new(Duration::from_secs(1), Duration::from_secs(300));
        let first = AppKey::new("first", "ns");
        let second = AppKey::new("second", "ns");

        assert_eq!(states.next_backoff(&first), (Duration::from_secs(1), 1));
        assert_eq!(states.next_backoff(&first), (Duration::from_secs(2), 2));
        assert_eq!(states.next_backoff(&second), (Duration::from_secs(1), 1));
    }

    #[test]
    fn test_backoff_states_reset() {
        let states = BackoffStates::new(Duration::from_secs(1), Duration::from_secs(300));
        let app = AppKey::new("app", "ns");

        assert!(!states.reset(&app));
        states.next_backoff(&app);
        states.next_backoff(&app);
        assert!(states.reset(&app));
        assert_eq!(states.next_backoff(&app), (Duration::from_secs(1), 1));
    }

    #[test]
    fn test_trigger_source_labels() {
        assert_eq!(TriggerSource::ReferenceChanged.as_str(), "reference-changed");
        assert_eq!(TriggerSource::TimerBased.as_str(), "timer-based");
    }
}
