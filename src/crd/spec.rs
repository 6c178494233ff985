//! # App Spec
//!
//! Main CRD specification for the `App` resource.

use serde::{Deserialize, Serialize};

/// App Custom Resource Definition
///
/// An App describes where to fetch configuration from, how to template it and
/// how to deploy it. Secrets and ConfigMaps referenced anywhere in the spec are
/// tracked so that a change to any of them re-reconciles the App.
///
/// # Example
///
/// ```yaml
/// apiVersion: appctrl.dev/v1alpha1
/// kind: App
/// metadata:
///   name: simple-app
///   namespace: default
/// spec:
///   serviceAccountName: default-ns-sa
///   syncPeriod: 1m
///   fetch:
///   - inline:
///       pathsFrom:
///       - secretRef:
///           name: simple-app-config
///   template:
///   - ytt:
///       valuesFrom:
///       - configMapRef:
///           name: simple-app-values
///   deploy:
///   - kapp: {}
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "App",
    group = "appctrl.dev",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::AppStatus",
    shortname = "app",
    printcolumn = r#"{"name":"Description", "type":"string", "jsonPath":".status.friendlyDescription"}, {"name":"Since-Deploy", "type":"date", "jsonPath":".status.lastReconcileTime"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Service account used to deploy into the App's namespace
    #[serde(default)]
    pub service_account_name: Option<String>,
    /// Deploy into another cluster described by a kubeconfig secret
    #[serde(default)]
    pub cluster: Option<AppCluster>,
    /// Sources to fetch configuration from
    #[serde(default)]
    pub fetch: Vec<crate::crd::AppFetch>,
    /// Templating steps applied to fetched configuration
    #[serde(default)]
    pub template: Vec<crate::crd::AppTemplate>,
    /// Deployment steps
    #[serde(default)]
    pub deploy: Vec<AppDeploy>,
    /// Minimum interval between routine reconciles
    /// Format: Go duration string (e.g., "30s", "1m30s", "1h")
    #[serde(default)]
    pub sync_period: Option<String>,
    /// Pause periodic reconciliation
    #[serde(default)]
    pub paused: bool,
    /// Cancel the current and future reconciliations
    #[serde(default)]
    pub canceled: bool,
    /// Skip deleting deployed resources when the App is deleted
    #[serde(default)]
    pub noop_delete: bool,
}

/// Target cluster configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppCluster {
    /// Namespace to deploy into on the target cluster
    #[serde(default)]
    pub namespace: Option<String>,
    /// Secret holding the kubeconfig for the target cluster
    #[serde(default)]
    pub kubeconfig_secret_ref: Option<crate::crd::SecretKeyRef>,
}

/// Deployment step
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppDeploy {
    #[serde(default)]
    pub kapp: Option<AppDeployKapp>,
}

/// kapp deploy options (passed through unchanged)
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppDeployKapp {
    #[serde(default)]
    pub into_ns: Option<String>,
    #[serde(default)]
    pub raw_options: Vec<String>,
}
