//! # Configuration
//!
//! Controller configuration loaded from environment variables.
//!
//! - `controller`: `ControllerConfig` and env parsing helpers

mod controller;

pub use controller::{ControllerConfig, SharedControllerConfig};
