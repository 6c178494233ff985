//! App Controller Library
//!
//! Reconciles `App` resources and re-reconciles an App whenever a Secret or
//! ConfigMap it references changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use app_controller::prelude::*;
//! ```
//!
//! This brings commonly used types into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
