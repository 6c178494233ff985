//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `app_controller_reconciliations_total` - Total number of reconciliations
//! - `app_controller_reconciliation_errors_total` - Total number of reconciliation errors
//! - `app_controller_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `app_controller_forced_reconciliations_total` - Reconciles forced by a referenced resource change
//! - `app_controller_ref_events_total` - Secret/ConfigMap events seen, by kind
//! - `app_controller_apps_enqueued_total` - Apps enqueued because of a referenced resource change, by kind
//! - `app_controller_requeues_total` - Requeues scheduled, by reason
//! - `app_controller_tracked_apps` - Apps with at least one tracked reference
//! - `app_controller_tracked_refs` - Secrets/ConfigMaps referenced by at least one App

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "app_controller_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "app_controller_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "app_controller_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static FORCED_RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "app_controller_forced_reconciliations_total",
        "Total number of reconciliations forced by a referenced Secret or ConfigMap change",
    )
    .expect("Failed to create FORCED_RECONCILIATIONS_TOTAL metric - this should never happen")
});

static REF_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_controller_ref_events_total",
            "Total number of Secret/ConfigMap watch events handled",
        ),
        &["kind"],
    )
    .expect("Failed to create REF_EVENTS_TOTAL metric - this should never happen")
});

static APPS_ENQUEUED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_controller_apps_enqueued_total",
            "Total number of Apps enqueued because a referenced resource changed",
        ),
        &["kind"],
    )
    .expect("Failed to create APPS_ENQUEUED_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "app_controller_requeues_total",
            "Total number of requeues scheduled",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static TRACKED_APPS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "app_controller_tracked_apps",
        "Number of Apps with at least one tracked reference",
    )
    .expect("Failed to create TRACKED_APPS metric - this should never happen")
});

static TRACKED_REFS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "app_controller_tracked_refs",
        "Number of Secrets/ConfigMaps referenced by at least one App",
    )
    .expect("Failed to create TRACKED_REFS metric - this should never happen")
});

/// Register all metrics with the controller registry
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(FORCED_RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REF_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(APPS_ENQUEUED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TRACKED_APPS.clone()))?;
    REGISTRY.register(Box::new(TRACKED_REFS.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_forced_reconciliations() {
    FORCED_RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_ref_events(kind: &str) {
    REF_EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_apps_enqueued(kind: &str, count: usize) {
    APPS_ENQUEUED_TOTAL
        .with_label_values(&[kind])
        .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn set_tracked(apps: usize, refs: usize) {
    TRACKED_APPS.set(i64::try_from(apps).unwrap_or(i64::MAX));
    TRACKED_REFS.set(i64::try_from(refs).unwrap_or(i64::MAX));
}
