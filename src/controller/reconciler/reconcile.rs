//! # Reconcile
//!
//! Entry point for App reconciliation.
//!
//! Every pass first brings the reference tracker in line with the App's
//! current spec so that Secret/ConfigMap events arriving afterwards find it.
//! The forced-update latch is then observed; a set latch makes this pass run
//! even when the reconcile timer says the App is not yet due. The latch is
//! only cleared once the pass has finished, so a failed run is retried as a
//! forced run.

use crate::config::ControllerConfig;
use crate::controller::reconciler::finalizer::{ensure_finalizer, remove_finalizer};
use crate::controller::reconciler::status::{
    failed_status, succeeded_status, suspended_status, update_status,
};
use crate::controller::reconciler::types::{Reconciler, ReconcilerError, TriggerSource};
use crate::controller::reftracker::{AppKey, AppUpdateStatus, UpdateTicket};
use crate::controller::timer::ReconcileTimer;
use crate::crd::App;
use crate::observability;
use chrono::{DateTime, Utc};
use kube::api::Api;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

/// What a reconcile pass should do once references and the latch are handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// `spec.paused` or `spec.canceled`: record the description and wait for a change
    Suspended(&'static str),
    /// Not due yet; requeue after the remaining time
    Wait(Duration),
    /// Do the work
    Run(TriggerSource),
}

/// Forced-update latch observed at the start of a reconcile pass
///
/// Dropping it without calling [`ForcedUpdate::consume`] leaves the latch
/// pending, so the next pass is forced again.
#[derive(Debug)]
pub struct ForcedUpdate<'a> {
    update_status: &'a AppUpdateStatus,
    ticket: Option<UpdateTicket>,
}

impl<'a> ForcedUpdate<'a> {
    #[must_use]
    pub fn observe(update_status: &'a AppUpdateStatus, app: &AppKey) -> Self {
        Self {
            update_status,
            ticket: update_status.observe(app),
        }
    }

    #[must_use]
    pub fn is_forced(&self) -> bool {
        self.ticket.is_some()
    }

    /// Clear the observed latch
    ///
    /// A mark that arrived after [`ForcedUpdate::observe`] stays pending.
    /// Returns whether the latch was cleared.
    pub fn consume(self) -> bool {
        self.ticket
            .as_ref()
            .is_some_and(|ticket| self.update_status.mark_consumed(ticket))
    }
}

/// Decide what to do with an App
///
/// A forced pass runs regardless of the timer; so does a pass for a spec
/// generation the status has not observed yet.
#[must_use]
pub fn plan_reconcile(
    app: &App,
    force: bool,
    config: &ControllerConfig,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    if app.spec.canceled {
        return ReconcilePlan::Suspended("Canceled");
    }
    if app.spec.paused {
        return ReconcilePlan::Suspended("Paused");
    }
    if force {
        return ReconcilePlan::Run(TriggerSource::ReferenceChanged);
    }

    let observed_generation = app.status.as_ref().and_then(|s| s.observed_generation);
    if app.metadata.generation != observed_generation {
        return ReconcilePlan::Run(TriggerSource::SpecChanged);
    }

    let timer = ReconcileTimer::for_app(app, config);
    if !timer.is_ready_at(now) {
        return ReconcilePlan::Wait(timer.duration_until_ready(now));
    }
    if timer.last_failed() {
        ReconcilePlan::Run(TriggerSource::ErrorBackoff)
    } else {
        ReconcilePlan::Run(TriggerSource::TimerBased)
    }
}

/// Reconcile one App
pub async fn reconcile(app: Arc<App>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let name = app.metadata.name.clone().unwrap_or_else(|| "unknown".to_string());
    let namespace = app
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());

    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
    );

    let start = Instant::now();
    observability::metrics::increment_reconciliations();
    let result = reconcile_app(&name, &namespace, &ctx).instrument(span).await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

async fn reconcile_app(
    name: &str,
    namespace: &str,
    ctx: &Reconciler,
) -> Result<Action, ReconcilerError> {
    let key = AppKey::new(name, namespace);

    // The cached object may be stale; the latest spec decides the reference set.
    let api: Api<App> = Api::namespaced(ctx.client.clone(), namespace);
    let Some(app) = api.get_opt(name).await? else {
        info!("App not found, dropping tracked references");
        ctx.forget_app(&key);
        update_tracked_gauges(ctx);
        return Ok(Action::await_change());
    };

    if app.is_being_deleted() {
        info!("App is being deleted, removing it from all references");
        ctx.forget_app(&key);
        update_tracked_gauges(ctx);
        remove_finalizer(ctx, &app).await?;
        return Ok(Action::await_change());
    }

    ensure_finalizer(ctx, &app).await?;

    ctx.tracker.reconcile_refs(app.resource_refs(), &key);
    update_tracked_gauges(ctx);

    let forced = ForcedUpdate::observe(&ctx.update_status, &key);
    if forced.is_forced() {
        debug!("Referenced resource changed since last pass, forcing reconcile");
    }

    match plan_reconcile(&app, forced.is_forced(), &ctx.config, Utc::now()) {
        ReconcilePlan::Suspended(description) => {
            info!("App is {}, skipping reconcile", description.to_lowercase());
            update_status(ctx, &app, suspended_status(&app, description)).await?;
            forced.consume();
            Ok(Action::await_change())
        }
        ReconcilePlan::Wait(remaining) => {
            debug!(
                "App not due yet, requeueing in {}s (trigger source: timer-based)",
                remaining.as_secs()
            );
            observability::metrics::increment_requeues_total("not-due");
            Ok(Action::requeue(remaining))
        }
        ReconcilePlan::Run(trigger) => {
            let action = run(ctx, &app, &key, trigger).await?;
            if !forced.consume() && trigger == TriggerSource::ReferenceChanged {
                debug!("Referenced resource changed again during reconcile, next pass is forced");
            }
            Ok(action)
        }
    }
}

async fn run(
    ctx: &Reconciler,
    app: &App,
    key: &AppKey,
    trigger: TriggerSource,
) -> Result<Action, ReconcilerError> {
    if trigger == TriggerSource::ReferenceChanged {
        observability::metrics::increment_forced_reconciliations();
    }

    if let Err(e) = update_status(ctx, app, succeeded_status(app, trigger, Utc::now())).await {
        warn!("Reconcile failed: {:#}", e);
        // Best effort: the error policy still schedules the retry if this write fails too.
        if let Err(status_err) =
            update_status(ctx, app, failed_status(app, &format!("{e:#}"), Utc::now())).await
        {
            debug!("Failed to record failure status: {:#}", status_err);
        }
        if trigger == TriggerSource::ReferenceChanged {
            debug!("Forced update stays pending until a reconcile succeeds");
        }
        return Err(ReconcilerError::ReconciliationFailed(e));
    }

    let was_in_backoff = ctx.backoff_states.reset(key);
    if was_in_backoff {
        info!("🔄 Backoff reset: returning to normal schedule");
    }

    let sync_period = ReconcileTimer::for_app(app, &ctx.config).sync_period();
    info!(
        "✅ Reconcile complete (trigger source: {}), next in {}s",
        trigger.as_str(),
        sync_period.as_secs()
    );
    observability::metrics::increment_requeues_total(trigger.as_str());
    Ok(Action::requeue(sync_period))
}

fn update_tracked_gauges(ctx: &Reconciler) {
    observability::metrics::set_tracked(ctx.tracker.tracked_apps(), ctx.tracker.tracked_refs());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AppSpec, AppStatus, Condition, ConditionType};

    fn reconciled_app(generation: i64, last_reconcile: DateTime<Utc>) -> App {
        let mut app = App::new("test-app", AppSpec::default());
        app.metadata.namespace = Some("default".to_string());
        app.metadata.generation = Some(generation);
        app.status = Some(AppStatus {
            observed_generation: Some(generation),
            last_reconcile_time: Some(last_reconcile.to_rfc3339()),
            conditions: vec![Condition::new(
                ConditionType::ReconcileSucceeded,
                "ReconcileSucceeded",
                None,
            )],
            ..Default::default()
        });
        app
    }

    #[test]
    fn test_force_bypasses_timer() {
        let now = Utc::now();
        let app = reconciled_app(1, now);
        let config = ControllerConfig::default();

        assert!(matches!(
            plan_reconcile(&app, false, &config, now),
            ReconcilePlan::Wait(_)
        ));
        assert_eq!(
            plan_reconcile(&app, true, &config, now),
            ReconcilePlan::Run(TriggerSource::ReferenceChanged)
        );
    }

    #[test]
    fn test_wait_reports_remaining_time() {
        let now = Utc::now();
        let app = reconciled_app(1, now - chrono::Duration::seconds(10));

        assert_eq!(
            plan_reconcile(&app, false, &ControllerConfig::default(), now),
            ReconcilePlan::Wait(Duration::from_secs(20))
        );
    }

    #[test]
    fn test_generation_change_runs() {
        let now = Utc::now();
        let mut app = reconciled_app(1, now);
        app.metadata.generation = Some(2);

        assert_eq!(
            plan_reconcile(&app, false, &ControllerConfig::default(), now),
            ReconcilePlan::Run(TriggerSource::SpecChanged)
        );
    }

    #[test]
    fn test_new_app_runs() {
        let mut app = App::new("test-app", AppSpec::default());
        app.metadata.generation = Some(1);
        app.status = Some(AppStatus {
            observed_generation: Some(1),
            ..Default::default()
        });

        assert_eq!(
            plan_reconcile(&app, false, &ControllerConfig::default(), Utc::now()),
            ReconcilePlan::Run(TriggerSource::TimerBased)
        );
    }

    #[test]
    fn test_paused_and_canceled_suspend_even_when_forced() {
        let now = Utc::now();
        let mut app = reconciled_app(1, now);
        app.spec.paused = true;
        assert_eq!(
            plan_reconcile(&app, true, &ControllerConfig::default(), now),
            ReconcilePlan::Suspended("Paused")
        );

        app.spec.canceled = true;
        assert_eq!(
            plan_reconcile(&app, true, &ControllerConfig::default(), now),
            ReconcilePlan::Suspended("Canceled")
        );
    }

    #[test]
    fn test_failed_app_retries_after_backoff() {
        let now = Utc::now();
        let mut app = reconciled_app(1, now);
        if let Some(status) = app.status.as_mut() {
            status.conditions = vec![Condition::new(
                ConditionType::ReconcileFailed,
                "ReconcileFailed",
                None,
            )];
            status.consecutive_reconcile_failures = 1;
        }
        let config = ControllerConfig::default();

        assert_eq!(
            plan_reconcile(&app, false, &config, now),
            ReconcilePlan::Wait(Duration::from_secs(1))
        );
        assert_eq!(
            plan_reconcile(&app, false, &config, now + chrono::Duration::seconds(1)),
            ReconcilePlan::Run(TriggerSource::ErrorBackoff)
        );
    }

    #[test]
    fn test_forced_update_kept_until_consumed() {
        let status = AppUpdateStatus::new();
        let key = AppKey::new("test-app", "default");
        status.mark_updated(&key);

        // A failed pass drops the claim without consuming it
        let forced = ForcedUpdate::observe(&status, &key);
        assert!(forced.is_forced());
        drop(forced);

        let forced = ForcedUpdate::observe(&status, &key);
        assert!(forced.is_forced());
        assert!(forced.consume());
        assert!(!ForcedUpdate::observe(&status, &key).is_forced());
    }

    #[test]
    fn test_mark_during_pass_survives_consume() {
        let status = AppUpdateStatus::new();
        let key = AppKey::new("test-app", "default");
        status.mark_updated(&key);

        let forced = ForcedUpdate::observe(&status, &key);
        status.mark_updated(&key);
        assert!(!forced.consume());
        assert!(status.is_update_needed(&key));
    }

    #[test]
    fn test_unforced_consume_is_noop() {
        let status = AppUpdateStatus::new();
        let key = AppKey::new("test-app", "default");
        let forced = ForcedUpdate::observe(&status, &key);
        assert!(!forced.is_forced());
        assert!(!forced.consume());
        assert_eq!(status.pending_count(), 0);
    }
}
