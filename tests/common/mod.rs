//! Common fixtures for integration tests
//!
//! Builds `App` resources from YAML the way they appear in a cluster.

#![allow(dead_code)]

use app_controller::crd::{App, AppStatus, Condition, ConditionType};
use chrono::{DateTime, Utc};

/// App referencing one Secret and one ConfigMap
pub const APP_WITH_REFS: &str = r#"
apiVersion: appctrl.dev/v1alpha1
kind: App
metadata:
  name: simple-app
  namespace: default
  generation: 1
spec:
  serviceAccountName: default-ns-sa
  syncPeriod: 1m
  fetch:
  - inline:
      pathsFrom:
      - secretRef:
          name: simple-app-config
  template:
  - ytt:
      valuesFrom:
      - configMapRef:
          name: simple-app-values
  deploy:
  - kapp: {}
"#;

/// Parse an App manifest, panicking on malformed fixtures
pub fn app_from_yaml(yaml: &str) -> App {
    serde_yaml::from_str(yaml).expect("fixture should be a valid App")
}

/// Attach a status recording a successful reconcile of the current generation
pub fn reconciled_at(mut app: App, at: DateTime<Utc>) -> App {
    app.status = Some(AppStatus {
        conditions: vec![Condition::new(
            ConditionType::ReconcileSucceeded,
            "Succeeded",
            None,
        )],
        observed_generation: app.metadata.generation,
        friendly_description: Some("Reconcile succeeded".to_string()),
        last_reconcile_time: Some(at.to_rfc3339()),
        consecutive_reconcile_successes: 1,
        ..AppStatus::default()
    });
    app
}

/// Attach a status recording `failures` consecutive failed reconciles
pub fn failed_at(mut app: App, at: DateTime<Utc>, failures: i32) -> App {
    app.status = Some(AppStatus {
        conditions: vec![Condition::new(
            ConditionType::ReconcileFailed,
            "Failed",
            Some("fetch failed".to_string()),
        )],
        observed_generation: app.metadata.generation,
        friendly_description: Some("Reconcile failed".to_string()),
        useful_error_message: Some("fetch failed".to_string()),
        last_reconcile_time: Some(at.to_rfc3339()),
        consecutive_reconcile_failures: failures,
        ..AppStatus::default()
    });
    app
}
