//! # Fetch and Template Sources
//!
//! Fetch/template step types and the Secret/ConfigMap reference types they use.

use serde::{Deserialize, Serialize};

/// Reference to a Secret in the App's namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    pub name: String,
}

/// Reference to a ConfigMap in the App's namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeyRef {
    pub name: String,
}

/// A source of files or values: either a Secret or a ConfigMap
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValuesSource {
    #[serde(default)]
    pub secret_ref: Option<SecretKeyRef>,
    #[serde(default)]
    pub config_map_ref: Option<ConfigMapKeyRef>,
    /// Optional directory to place the files under
    #[serde(default)]
    pub directory_path: Option<String>,
}

/// Inline content, either literal or pulled from Secrets/ConfigMaps
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineSource {
    #[serde(default)]
    pub paths: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub paths_from: Vec<ValuesSource>,
}

/// Fetch step. Exactly one source is expected to be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppFetch {
    #[serde(default)]
    pub inline: Option<InlineSource>,
    #[serde(default)]
    pub image: Option<RemoteSource>,
    #[serde(default)]
    pub http: Option<RemoteSource>,
    #[serde(default)]
    pub git: Option<RemoteSource>,
    #[serde(default)]
    pub helm_chart: Option<HelmChartSource>,
    /// Directory the fetched content lands in
    #[serde(default)]
    pub path: Option<String>,
}

/// Image, HTTP or Git source with optional credentials
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSource {
    /// Image reference or URL
    #[serde(default)]
    pub url: Option<String>,
    /// Git ref or image tag
    #[serde(default)]
    pub r#ref: Option<String>,
    /// Credentials for the source
    #[serde(default)]
    pub secret_ref: Option<SecretKeyRef>,
}

/// Helm chart source
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartSource {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<HelmChartRepository>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartRepository {
    pub url: String,
    #[serde(default)]
    pub secret_ref: Option<SecretKeyRef>,
}

/// Template step. Exactly one templater is expected to be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppTemplate {
    #[serde(default)]
    pub ytt: Option<YttTemplate>,
    #[serde(default)]
    pub helm_template: Option<HelmTemplate>,
    #[serde(default)]
    pub kbld: Option<KbldTemplate>,
    #[serde(default)]
    pub sops: Option<SopsTemplate>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct YttTemplate {
    #[serde(default)]
    pub inline: Option<InlineSource>,
    #[serde(default)]
    pub values_from: Vec<ValuesSource>,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub values_from: Vec<ValuesSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KbldTemplate {
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SopsTemplate {
    #[serde(default)]
    pub pgp: Option<SopsKeys>,
    #[serde(default)]
    pub age: Option<SopsKeys>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Private keys used for SOPS decryption
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SopsKeys {
    #[serde(default)]
    pub private_keys_secret_ref: Option<SecretKeyRef>,
}
