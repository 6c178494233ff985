//! # Reconciler
//!
//! Core reconciliation logic for `App` resources.
//!
//! The reconciler:
//! - Fetches the latest `App` and handles deletion through a finalizer
//! - Keeps the Secret/ConfigMap reference tracker in line with the App's spec
//! - Consumes the forced-update latch set by Secret/ConfigMap events
//! - Updates resource status with reconciliation results
//!
//! ## Reconciliation Flow
//!
//! 1. Get the latest `App` (not found: drop its tracked state)
//! 2. Deletion: drop tracked state and remove the finalizer
//! 3. Ensure the finalizer and reconcile the App's references
//! 4. Consume the forced-update latch
//! 5. Run if forced, if the spec changed, or if the reconcile timer is due
//! 6. Update status and requeue after the sync period

pub mod finalizer;
pub mod reconcile;
pub mod status;
pub mod types;

// Re-export public API
pub use reconcile::{plan_reconcile, reconcile, ForcedUpdate, ReconcilePlan};
pub use types::{BackoffStates, Reconciler, ReconcilerError, TriggerSource};
