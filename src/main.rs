//! # App Controller
//!
//! Kubernetes controller for `App` resources.
//!
//! Watches Apps together with the Secrets and ConfigMaps they reference. A
//! change to a referenced Secret or ConfigMap forces the next reconcile of
//! every App that references it, regardless of the App's sync period.
//!
//! Configuration is read from environment variables; see `ControllerConfig`.

use anyhow::Result;
use app_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.apis,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
