//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::{ControllerConfig, SharedControllerConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::reftracker::{AppRefTracker, AppUpdateStatus};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::runtime::watch_loop::WatchedApis;
use anyhow::{Context, Result};
use kube::{api::ListParams, Client};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// APIs for Apps and the Secrets/ConfigMaps they reference
    pub apis: WatchedApis,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Controller configuration loaded at startup
    pub controller_config: SharedControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reference tracker, update latch and reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // rustls 0.23 needs a process-wide provider before any TLS connection is made.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let controller_config: SharedControllerConfig = Arc::new(ControllerConfig::from_env());

    init_tracing(&controller_config);

    info!("Starting App Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    if controller_config.enable_metrics {
        observability::metrics::register_metrics().context("Failed to register metrics")?;
    } else {
        info!("Metrics disabled (ENABLE_METRICS=false)");
    }

    let server_state = Arc::new(ServerState::new());

    // Start HTTP server for metrics and probes
    // We start it in a background task but wait for it to be ready before proceeding
    let server_state_clone = Arc::clone(&server_state);
    let server_port = controller_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &controller_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let apis = WatchedApis::new(&client, controller_config.watch_namespace.as_deref());
    match controller_config.watch_namespace.as_deref() {
        Some(ns) => info!("Watching Apps, Secrets and ConfigMaps in namespace '{}'", ns),
        None => info!("Watching Apps, Secrets and ConfigMaps in all namespaces"),
    }

    // The tracker and latch live for the whole process; every watch restart shares them.
    let tracker = Arc::new(AppRefTracker::new());
    let update_status = Arc::new(AppUpdateStatus::new());
    let reconciler = Arc::new(Reconciler::new(
        client.clone(),
        Arc::clone(&controller_config),
        tracker,
        update_status,
    ));

    check_crd_queryable(&apis).await;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        apis,
        reconciler,
        server_state,
        controller_config,
    })
}

/// Set up the tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this crate.
fn init_tracing(config: &ControllerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("app_controller={}", config.log_level.to_lowercase()).into()
    });

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if let Err(e) = result {
        warn!("Tracing subscriber init returned error (may already be initialized): {}", e);
    }
}

/// Poll the server state until the HTTP server has bound its port
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let startup_timeout = config.server_startup_timeout();
    let poll_interval = config.server_poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log a diagnostic when the App CRD cannot be listed
///
/// The controller still starts; the watch loop retries on its own.
async fn check_crd_queryable(apis: &WatchedApis) {
    match apis.apps.list(&ListParams::default().limit(1)).await {
        Ok(list) => {
            info!(
                "App CRD is queryable ({} App(s) on first page)",
                list.items.len()
            );
        }
        Err(e) => {
            error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD queryability check failure - controller will retry");
        }
    }
}
