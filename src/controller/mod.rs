//! # Controller
//!
//! Core controller modules for the App controller.
//!
//! - `backoff`: Exponential backoff for failed reconciles
//! - `handlers`: Secret/ConfigMap events to App reconcile requests
//! - `reconciler`: Core reconciliation logic
//! - `reftracker`: App <-> Secret/ConfigMap reference tracking and update latches
//! - `server`: HTTP server for metrics and health checks
//! - `timer`: Sync period parsing and reconcile timing

pub mod backoff;
pub mod handlers;
pub mod reconciler;
pub mod reftracker;
pub mod server;
pub mod timer;
