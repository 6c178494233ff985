//! # Reference Tracking
//!
//! Tracks which Apps reference which Secrets and ConfigMaps, and which Apps
//! owe a forced reconcile because one of those changed.
//!
//! - `keys`: `AppKey` / `RefKey` identity values
//! - `index`: bidirectional App <-> reference index
//! - `tracker`: thread-safe `AppRefTracker` around the index
//! - `update_status`: per-App forced-update latch (`AppUpdateStatus`)

pub mod index;
pub mod keys;
pub mod tracker;
pub mod update_status;

pub use index::{RefIndex, RefIndexSnapshot};
pub use keys::{AppKey, RefKey, RefKind};
pub use tracker::AppRefTracker;
pub use update_status::{AppUpdateStatus, UpdateTicket};
