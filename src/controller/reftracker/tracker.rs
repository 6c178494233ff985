//! # App Reference Tracker
//!
//! Thread-safe wrapper around [`RefIndex`]. One instance is created at startup
//! and shared (via `Arc`) between the reconciler and the Secret/ConfigMap
//! event handlers.
//!
//! Every mutation takes the write lock once for the whole diff, so a
//! concurrent `owners_referencing` sees an App's reference set either before or
//! after a `reconcile_refs` call, never in between.

use crate::controller::reftracker::index::{RefIndex, RefIndexSnapshot};
use crate::controller::reftracker::keys::{AppKey, RefKey};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
pub struct AppRefTracker {
    index: RwLock<RefIndex>,
}

impl AppRefTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the references tracked for `app` with `new_refs`.
    ///
    /// Refs no longer present are unlinked; new ones are linked. Calling this
    /// twice with the same set leaves the index unchanged.
    pub fn reconcile_refs(&self, new_refs: HashSet<RefKey>, app: &AppKey) {
        let count = new_refs.len();
        self.write().reconcile_refs(new_refs, app);
        debug!(app = %app, refs = count, "reftracker.reconcile_refs");
    }

    /// Forget `app` entirely. Used when the App is deleted.
    pub fn remove_app_from_all_refs(&self, app: &AppKey) {
        self.write().remove_app(app);
        debug!(app = %app, "reftracker.remove_app");
    }

    /// Apps currently referencing `r`, or an empty set.
    #[must_use]
    pub fn owners_referencing(&self, r: &RefKey) -> HashSet<AppKey> {
        self.read().owners_referencing(r)
    }

    #[must_use]
    pub fn refs_of(&self, app: &AppKey) -> HashSet<RefKey> {
        self.read().refs_of(app)
    }

    #[must_use]
    pub fn tracked_apps(&self) -> usize {
        self.read().app_count()
    }

    #[must_use]
    pub fn tracked_refs(&self) -> usize {
        self.read().ref_count()
    }

    #[must_use]
    pub fn snapshot(&self) -> RefIndexSnapshot {
        self.read().snapshot()
    }

    // Critical sections never leave the index half-updated before a panic can
    // occur, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, RefIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RefIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}
