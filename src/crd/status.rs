//! # App Status
//!
//! Status types for tracking reconciliation state and conditions.

use serde::{Deserialize, Serialize};

/// Status of the App resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Short human-readable state, e.g. "Reconcile succeeded"
    #[serde(default)]
    pub friendly_description: Option<String>,
    /// Error message from the last failed reconcile
    #[serde(default)]
    pub useful_error_message: Option<String>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Last reconcile forced by a change to a referenced Secret or ConfigMap (RFC3339)
    #[serde(default)]
    pub last_forced_reconcile_time: Option<String>,
    #[serde(default)]
    pub consecutive_reconcile_successes: i32,
    #[serde(default)]
    pub consecutive_reconcile_failures: i32,
}

impl AppStatus {
    /// Whether the most recent reconcile recorded a failure
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.r#type == ConditionType::ReconcileFailed.as_str() && c.status == "True")
    }
}

/// Condition types used on App status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    Reconciling,
    ReconcileSucceeded,
    ReconcileFailed,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Reconciling => "Reconciling",
            ConditionType::ReconcileSucceeded => "ReconcileSucceeded",
            ConditionType::ReconcileFailed => "ReconcileFailed",
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn new(condition_type: ConditionType, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: condition_type.as_str().to_string(),
            status: "True".to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message,
        }
    }
}
