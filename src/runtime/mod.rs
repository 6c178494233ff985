//! # Runtime
//!
//! Process-level wiring of the controller.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server, client and reconciler setup
//! - `watch_loop`: kube-runtime `Controller` over Apps, Secrets and ConfigMaps
//! - `error_policy`: reconcile error backoff and watch stream error handling

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
