//! # Status Updates
//!
//! Builds and writes `AppStatus` for the outcome of a reconcile.

use crate::constants::CONTROLLER_NAME;
use crate::controller::reconciler::types::{Reconciler, TriggerSource};
use crate::crd::{App, AppStatus, Condition, ConditionType};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kube::api::{Patch, PatchParams};
use tracing::debug;

/// Status after a successful reconcile
///
/// Forced reconciles also stamp `lastForcedReconcileTime`; otherwise the
/// previous value is kept.
#[must_use]
pub fn succeeded_status(app: &App, trigger: TriggerSource, now: DateTime<Utc>) -> AppStatus {
    let previous = app.status.clone().unwrap_or_default();
    let now = now.to_rfc3339();
    let description = "Reconcile succeeded".to_string();

    AppStatus {
        conditions: vec![Condition {
            last_transition_time: Some(now.clone()),
            ..Condition::new(
                ConditionType::ReconcileSucceeded,
                "ReconcileSucceeded",
                Some(format!("Triggered by {}", trigger.as_str())),
            )
        }],
        observed_generation: app.metadata.generation,
        friendly_description: Some(description),
        useful_error_message: None,
        last_reconcile_time: Some(now.clone()),
        last_forced_reconcile_time: if trigger == TriggerSource::ReferenceChanged {
            Some(now)
        } else {
            previous.last_forced_reconcile_time
        },
        consecutive_reconcile_successes: previous.consecutive_reconcile_successes.saturating_add(1),
        consecutive_reconcile_failures: 0,
    }
}

/// Status after a failed reconcile
#[must_use]
pub fn failed_status(app: &App, message: &str, now: DateTime<Utc>) -> AppStatus {
    let previous = app.status.clone().unwrap_or_default();
    let now = now.to_rfc3339();

    AppStatus {
        conditions: vec![Condition {
            last_transition_time: Some(now.clone()),
            ..Condition::new(
                ConditionType::ReconcileFailed,
                "ReconcileFailed",
                Some(message.to_string()),
            )
        }],
        observed_generation: app.metadata.generation,
        friendly_description: Some(format!("Reconcile failed: {message}")),
        useful_error_message: Some(message.to_string()),
        last_reconcile_time: Some(now),
        last_forced_reconcile_time: previous.last_forced_reconcile_time,
        consecutive_reconcile_successes: 0,
        consecutive_reconcile_failures: previous.consecutive_reconcile_failures.saturating_add(1),
    }
}

/// Status for an App that is paused or canceled; timers and counters are untouched
#[must_use]
pub fn suspended_status(app: &App, description: &str) -> AppStatus {
    let previous = app.status.clone().unwrap_or_default();
    AppStatus {
        observed_generation: app.metadata.generation,
        friendly_description: Some(description.to_string()),
        ..previous
    }
}

/// Write `status` to the App's status subresource
///
/// Skips the API call when nothing changed, so the write does not trigger
/// another watch event for an identical status.
pub async fn update_status(reconciler: &Reconciler, app: &App, status: AppStatus) -> Result<()> {
    if app.status.as_ref() == Some(&status) {
        debug!("Skipping status update - status unchanged");
        return Ok(());
    }

    let name = app.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = app.metadata.namespace.as_deref().unwrap_or("default");
    let api: kube::Api<App> = kube::Api::namespaced(reconciler.client.clone(), namespace);

    let patch = serde_json::json!({
        "status": status
    });

    api.patch_status(
        name,
        &PatchParams::apply(CONTROLLER_NAME),
        &Patch::Merge(patch),
    )
    .await
    .context(format!("Failed to update status for App {namespace}/{name}"))?;

    Ok(())
}
