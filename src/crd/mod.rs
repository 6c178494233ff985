//! # Custom Resource Definitions
//!
//! CRD types for the App controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `App` CRD specification, cluster and deploy types
//! - `source.rs` - Fetch/template steps and Secret/ConfigMap references
//! - `refs.rs` - Extraction of the referenced Secrets/ConfigMaps from an App
//! - `status.rs` - Status types for tracking reconciliation state

mod refs;
mod source;
mod spec;
mod status;

pub use source::{
    AppFetch, AppTemplate, ConfigMapKeyRef, HelmChartRepository, HelmChartSource, HelmTemplate,
    InlineSource, KbldTemplate, RemoteSource, SecretKeyRef, SopsKeys, SopsTemplate, ValuesSource,
    YttTemplate,
};
pub use spec::{App, AppCluster, AppDeploy, AppDeployKapp, AppSpec};
pub use status::{AppStatus, Condition, ConditionType};
