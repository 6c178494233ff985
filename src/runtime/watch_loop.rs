//! # Watch Loop
//!
//! Controller watch loop. Watches `App` resources plus the Secrets and
//! ConfigMaps they reference, and triggers reconciliation when either changes.
//!
//! Secrets and ConfigMaps are watched through metadata-only watches; only the
//! name and namespace of a changed object are needed to find its owners.
//!
//! SIGINT and SIGTERM first mark the server not ready, then ask the running
//! controller to drain. Once shutdown has been requested the loop never starts
//! another controller.

use crate::config::SharedControllerConfig;
use crate::controller::handlers::RefEventHandler;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::App;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::core::PartialObjectMeta;
use kube::Client;
use kube_runtime::watcher::metadata_watcher;
use kube_runtime::{controller, watcher, Controller, WatchStreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

/// Typed APIs for everything the controller watches
#[derive(Clone)]
pub struct WatchedApis {
    pub apps: Api<App>,
    pub secrets: Api<Secret>,
    pub config_maps: Api<ConfigMap>,
}

impl std::fmt::Debug for WatchedApis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedApis").finish_non_exhaustive()
    }
}

impl WatchedApis {
    /// Cluster-wide APIs, or APIs scoped to `namespace` when set
    #[must_use]
    pub fn new(client: &Client, namespace: Option<&str>) -> Self {
        match namespace {
            Some(ns) => Self {
                apps: Api::namespaced(client.clone(), ns),
                secrets: Api::namespaced(client.clone(), ns),
                config_maps: Api::namespaced(client.clone(), ns),
            },
            None => Self {
                apps: Api::all(client.clone()),
                secrets: Api::all(client.clone()),
                config_maps: Api::all(client.clone()),
            },
        }
    }
}

/// Run the controller watch loop
///
/// Restarts the controller stream when it ends or fails, until SIGINT or
/// SIGTERM requests shutdown.
pub async fn run_watch_loop(
    apis: WatchedApis,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    info!("Starting controller watch loop...");

    let backoff_duration_ms = Arc::new(AtomicU64::new(controller_config.backoff_start_ms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(propagate_shutdown(
        shutdown_signal(),
        Arc::clone(&server_state),
        shutdown_tx,
    ));

    loop {
        if *shutdown_rx.borrow() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let secret_handler = RefEventHandler::secrets(
            Arc::clone(&reconciler.tracker),
            Arc::clone(&reconciler.update_status),
        );
        let config_map_handler = RefEventHandler::config_maps(
            Arc::clone(&reconciler.tracker),
            Arc::clone(&reconciler.update_status),
        );

        let backoff = Arc::clone(&backoff_duration_ms);
        let config_for_filter = Arc::clone(&controller_config);
        // `graceful_shutdown_on` needs a Send + Sync trigger
        let (trigger_tx, graceful_trigger) = futures::channel::oneshot::channel::<()>();
        let graceful_trigger = graceful_trigger.map(|_| ());
        let trigger_task = tokio::spawn(forward_shutdown(shutdown_rx.clone(), trigger_tx));

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        let controller_future = Controller::new(
            apis.apps.clone(),
            watcher::Config::default().any_semantic(),
        )
        .with_config(
            controller::Config::default()
                .concurrency(controller_config.max_concurrent_reconciliations),
        )
        .watches_stream(
            metadata_watcher(apis.secrets.clone(), watcher::Config::default()).touched_objects(),
            move |secret: PartialObjectMeta<Secret>| secret_handler.enqueue_apps(&secret.metadata),
        )
        .watches_stream(
            metadata_watcher(apis.config_maps.clone(), watcher::Config::default())
                .touched_objects(),
            move |config_map: PartialObjectMeta<ConfigMap>| {
                config_map_handler.enqueue_apps(&config_map.metadata)
            },
        )
        .graceful_shutdown_on(graceful_trigger)
        .run(
            reconcile,
            handle_reconciliation_error,
            Arc::clone(&reconciler),
        )
        .filter_map(move |x| {
            let backoff = Arc::clone(&backoff);
            let config = Arc::clone(&config_for_filter);
            async move {
                match &x {
                    Ok((obj, _action)) => {
                        backoff.store(config.backoff_start_ms, Ordering::Relaxed);
                        debug!(resource = %obj, "watch.event.reconciled");
                        Some(x)
                    }
                    Err(e) => {
                        let error_string = format!("{e:?}");
                        handle_watch_stream_error(
                            &error_string,
                            &backoff,
                            config.backoff_max_ms,
                            config.watch_restart_delay(),
                        )
                        .await
                        .map(|()| x)
                    }
                }
            }
        })
        .for_each(|_| futures::future::ready(()));

        info!("Controller watch started");
        controller_future.instrument(watch_span).await;
        trigger_task.abort();

        if *shutdown_rx.borrow() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = controller_config.watch_restart_delay_after_end();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        let mut restart_shutdown = shutdown_rx.clone();
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = restart_shutdown.wait_for(|requested| *requested) => {}
        }
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown..."),
        () = terminate => info!("Received SIGTERM (pod termination), initiating graceful shutdown..."),
    }
}

/// Wait for `signal`, drop readiness, then publish the shutdown request
///
/// Readiness is cleared before the request is published, so anything that
/// observes the request also observes the server as not ready.
pub async fn propagate_shutdown(
    signal: impl Future<Output = ()>,
    server_state: Arc<ServerState>,
    shutdown_tx: watch::Sender<bool>,
) {
    signal.await;
    server_state.set_ready(false);
    info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    shutdown_tx.send_replace(true);
}

/// Fire `trigger` once shutdown has been requested
async fn forward_shutdown(
    mut shutdown_rx: watch::Receiver<bool>,
    trigger: futures::channel::oneshot::Sender<()>,
) {
    if shutdown_rx.wait_for(|requested| *requested).await.is_ok() {
        let _ = trigger.send(());
    }
}
