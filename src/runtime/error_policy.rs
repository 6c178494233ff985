//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::App;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with per-App exponential backoff
///
/// Backoff state is tracked per App so that one failing App does not slow
/// down retries of the others. A successful reconcile resets it.
pub fn handle_reconciliation_error(
    app: Arc<App>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let key = app.key();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = key.name(),
        resource.namespace = key.namespace(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", key, error);
    observability::metrics::increment_reconciliation_errors();

    let (delay, error_count) = ctx.backoff_states.next_backoff(&key);

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));
    info!(
        "🔄 Retrying with exponential backoff: {}s (error count: {}, trigger source: error-backoff)",
        delay.as_secs(),
        error_count
    );
    info!(
        "📅 Next retry scheduled: {} (in {}s, trigger source: error-backoff)",
        next_trigger_time.to_rfc3339(),
        delay.as_secs()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Classification of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 404: CRD missing or resource deleted
    NotFound,
    /// 410: resource version expired
    Expired,
    /// 429: API server storage reinitializing
    TooManyRequests,
    Other,
}

/// Classify a watch error from its debug representation
///
/// 404 is checked before 401 because a plain-text 404 body surfaces as a
/// serde error whose chain also mentions `WatchFailed`.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    let is_401 = error_string.contains("401") || error_string.contains("Unauthorized");
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");

    if is_not_found {
        WatchErrorKind::NotFound
    } else if is_401 {
        WatchErrorKind::Unauthorized
    } else if is_410 {
        WatchErrorKind::Expired
    } else if is_429 {
        WatchErrorKind::TooManyRequests
    } else {
        WatchErrorKind::Other
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error_string) {
        WatchErrorKind::Unauthorized => {
            error!(
                "❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("🔍 Verify the controller ServiceAccount can list and watch apps, secrets and configmaps:");
            error!(
                "      kubectl auth can-i watch apps.appctrl.dev --as=system:serviceaccount:<namespace>:app-controller --all-namespaces"
            );
            warn!(
                "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!(
                "Watch resource version expired (410) - this is normal during pod restarts, watch will restart"
            );
            warn!(error_type = "410", "watch.error.resource_version_expired");
            None
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
            None
        }
        WatchErrorKind::NotFound => {
            let resource_info = if error_string.contains("integer `404`") {
                "CRD or resource may have been deleted (404 returned as plain text)"
            } else if error_string.contains("App") {
                "App resource"
            } else {
                "Resource"
            };
            warn!(
                "{} not found (404) - this may be normal if resource was deleted or CRD is missing. Error: {}",
                resource_info, error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
    }
}
