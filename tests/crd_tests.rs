//! # CRD Tests
//!
//! Tests for the `App` CRD: the generated definition, manifest parsing and
//! extraction of the Secrets/ConfigMaps an App references.

mod common;

use app_controller::controller::reftracker::{AppKey, RefKey};
use app_controller::crd::{App, AppStatus};
use common::{app_from_yaml, APP_WITH_REFS};
use kube::CustomResourceExt;
use std::collections::HashSet;

#[test]
fn test_crd_definition() {
    let crd = App::crd();
    assert_eq!(crd.spec.group, "appctrl.dev");
    assert_eq!(crd.spec.names.kind, "App");
    assert_eq!(crd.spec.scope, "Namespaced");
    assert_eq!(crd.spec.versions.len(), 1);

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(
        version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some(),
        "status subresource must be enabled"
    );
}

#[test]
fn test_crd_serializes_to_yaml() {
    let yaml = serde_yaml::to_string(&App::crd()).expect("CRD should serialize");
    assert!(yaml.contains("name: apps.appctrl.dev"));
    assert!(yaml.contains("syncPeriod"));
}

#[test]
fn test_parse_app_manifest() {
    let app = app_from_yaml(APP_WITH_REFS);
    assert_eq!(app.key(), AppKey::new("simple-app", "default"));
    assert_eq!(app.spec.sync_period.as_deref(), Some("1m"));
    assert!(!app.spec.paused);
    assert!(!app.spec.canceled);
    assert!(app.status.is_none());
    assert!(!app.is_being_deleted());
}

#[test]
fn test_resource_refs_from_fetch_and_template() {
    let app = app_from_yaml(APP_WITH_REFS);
    let expected: HashSet<RefKey> = [
        RefKey::secret("simple-app-config", "default"),
        RefKey::config_map("simple-app-values", "default"),
    ]
    .into_iter()
    .collect();
    assert_eq!(app.resource_refs(), expected);
}

#[test]
fn test_resource_refs_cover_every_reference_site() {
    let app = app_from_yaml(
        r#"
apiVersion: appctrl.dev/v1alpha1
kind: App
metadata:
  name: full-app
  namespace: team-a
spec:
  cluster:
    kubeconfigSecretRef:
      name: remote-kubeconfig
  fetch:
  - image:
      url: registry.example.com/bundle
      secretRef:
        name: registry-creds
  - git:
      url: https://example.com/repo.git
      secretRef:
        name: git-creds
  - helmChart:
      name: nginx
      repository:
        url: https://charts.example.com
        secretRef:
          name: chart-creds
  - inline:
      paths:
        config.yml: "a: 1"
      pathsFrom:
      - configMapRef:
          name: inline-files
  template:
  - helmTemplate:
      valuesFrom:
      - secretRef:
          name: helm-values
  - sops:
      age:
        privateKeysSecretRef:
          name: age-keys
  - ytt:
      inline:
        pathsFrom:
        - secretRef:
            name: ytt-inline
  deploy:
  - kapp: {}
"#,
    );

    let refs = app.resource_refs();
    let expected: HashSet<RefKey> = [
        RefKey::secret("remote-kubeconfig", "team-a"),
        RefKey::secret("registry-creds", "team-a"),
        RefKey::secret("git-creds", "team-a"),
        RefKey::secret("chart-creds", "team-a"),
        RefKey::config_map("inline-files", "team-a"),
        RefKey::secret("helm-values", "team-a"),
        RefKey::secret("age-keys", "team-a"),
        RefKey::secret("ytt-inline", "team-a"),
    ]
    .into_iter()
    .collect();
    assert_eq!(refs, expected);
}

#[test]
fn test_resource_refs_dedupe_and_skip_empty_names() {
    let app = app_from_yaml(
        r#"
apiVersion: appctrl.dev/v1alpha1
kind: App
metadata:
  name: dup-app
  namespace: default
spec:
  fetch:
  - inline:
      pathsFrom:
      - secretRef:
          name: shared
      - secretRef:
          name: ""
  template:
  - ytt:
      valuesFrom:
      - secretRef:
          name: shared
      - configMapRef:
          name: shared
"#,
    );

    let refs = app.resource_refs();
    assert_eq!(refs.len(), 2);
    assert!(refs.contains(&RefKey::secret("shared", "default")));
    assert!(refs.contains(&RefKey::config_map("shared", "default")));
}

#[test]
fn test_app_without_refs() {
    let app = app_from_yaml(
        r#"
apiVersion: appctrl.dev/v1alpha1
kind: App
metadata:
  name: bare-app
  namespace: default
spec:
  fetch:
  - http:
      url: https://example.com/manifests.yml
  deploy:
  - kapp: {}
"#,
    );
    assert!(app.resource_refs().is_empty());
}

#[test]
fn test_status_uses_camel_case_fields() {
    let status = AppStatus {
        observed_generation: Some(3),
        last_forced_reconcile_time: Some("2026-01-01T00:00:00+00:00".to_string()),
        consecutive_reconcile_failures: 2,
        ..AppStatus::default()
    };
    let json = serde_json::to_value(&status).expect("status should serialize");
    assert_eq!(json["observedGeneration"], 3);
    assert_eq!(json["lastForcedReconcileTime"], "2026-01-01T00:00:00+00:00");
    assert_eq!(json["consecutiveReconcileFailures"], 2);
    assert!(!status.has_failed());
}
