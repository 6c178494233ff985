//! # Finalizer
//!
//! The controller keeps a finalizer on every App so that deletion is observed
//! as an update carrying a deletion timestamp, and the App's references are
//! dropped before the object disappears.

use crate::constants::{APP_FINALIZER, CONTROLLER_NAME};
use crate::controller::reconciler::types::Reconciler;
use crate::crd::App;
use anyhow::{Context, Result};
use kube::api::{Patch, PatchParams};
use tracing::info;

/// Whether the App carries the controller finalizer
#[must_use]
pub fn has_finalizer(app: &App) -> bool {
    app.metadata
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == APP_FINALIZER))
}

/// Finalizer list with the controller finalizer appended
#[must_use]
pub fn with_finalizer(app: &App) -> Vec<String> {
    let mut finalizers = app.metadata.finalizers.clone().unwrap_or_default();
    if !finalizers.iter().any(|x| x == APP_FINALIZER) {
        finalizers.push(APP_FINALIZER.to_string());
    }
    finalizers
}

/// Finalizer list with the controller finalizer removed
#[must_use]
pub fn without_finalizer(app: &App) -> Vec<String> {
    app.metadata
        .finalizers
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|f| f != APP_FINALIZER)
        .collect()
}

/// Add the controller finalizer if missing
pub async fn ensure_finalizer(reconciler: &Reconciler, app: &App) -> Result<()> {
    if has_finalizer(app) {
        return Ok(());
    }
    patch_finalizers(reconciler, app, with_finalizer(app)).await?;
    info!("Added finalizer {}", APP_FINALIZER);
    Ok(())
}

/// Remove the controller finalizer if present
pub async fn remove_finalizer(reconciler: &Reconciler, app: &App) -> Result<()> {
    if !has_finalizer(app) {
        return Ok(());
    }
    patch_finalizers(reconciler, app, without_finalizer(app)).await?;
    info!("Removed finalizer {}", APP_FINALIZER);
    Ok(())
}

async fn patch_finalizers(reconciler: &Reconciler, app: &App, finalizers: Vec<String>) -> Result<()> {
    let name = app.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = app.metadata.namespace.as_deref().unwrap_or("default");
    let api: kube::Api<App> = kube::Api::namespaced(reconciler.client.clone(), namespace);

    let patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers
        }
    });

    api.patch(name, &PatchParams::apply(CONTROLLER_NAME), &Patch::Merge(patch))
        .await
        .context(format!("Failed to patch finalizers for App {namespace}/{name}"))?;
    Ok(())
}
