//! # Prelude
//!
//! Re-exports commonly used types for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use app_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (App, AppSpec, AppStatus, etc.)
//! - Reference tracking types (AppRefTracker, AppUpdateStatus, keys)
//! - Reconciler types (Reconciler, ReconcilerError, etc.)
//! - Config types (ControllerConfig, SharedControllerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Reference tracking - shared by the reconciler and the event handlers
pub use crate::controller::handlers::RefEventHandler;
pub use crate::controller::reftracker::{
    AppKey, AppRefTracker, AppUpdateStatus, RefKey, RefKind, UpdateTicket,
};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError, TriggerSource};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, SharedControllerConfig};
