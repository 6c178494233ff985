//! # App Update Status
//!
//! Per-App latch recording that a referenced Secret or ConfigMap changed and
//! the next reconcile of that App must run even if its sync period has not
//! elapsed.
//!
//! Each pending entry stores the sequence number of its latest mark, drawn
//! from a store-wide counter that never repeats. A consumer holding an
//! [`UpdateTicket`] can therefore tell whether a new change arrived between
//! reading the latch and clearing it, even if the entry was dropped and
//! re-created in the meantime. Only a consume with an up-to-date ticket clears
//! the entry; otherwise the latch stays pending for the next reconcile.

use crate::controller::reftracker::keys::AppKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct AppUpdateStatus {
    state: Mutex<LatchState>,
}

#[derive(Debug, Default)]
struct LatchState {
    last_seq: u64,
    pending: HashMap<AppKey, u64>,
}

/// Proof of having observed a pending latch at a given mark sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTicket {
    app: AppKey,
    seq: u64,
}

impl UpdateTicket {
    #[must_use]
    pub fn app(&self) -> &AppKey {
        &self.app
    }
}

impl AppUpdateStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `app` needs a forced update. Repeated calls coalesce.
    pub fn mark_updated(&self, app: &AppKey) {
        let mut state = self.lock();
        state.last_seq += 1;
        let seq = state.last_seq;
        state.pending.insert(app.clone(), seq);
    }

    /// Whether a forced update is pending for `app`. Does not clear the latch.
    #[must_use]
    pub fn is_update_needed(&self, app: &AppKey) -> bool {
        self.lock().pending.contains_key(app)
    }

    /// Read the latch, returning a ticket to clear it with if it is pending.
    #[must_use]
    pub fn observe(&self, app: &AppKey) -> Option<UpdateTicket> {
        self.lock().pending.get(app).map(|seq| UpdateTicket {
            app: app.clone(),
            seq: *seq,
        })
    }

    /// Clear the latch observed by `ticket`.
    ///
    /// Returns `false` and leaves the latch pending when `mark_updated` ran
    /// after the ticket was taken, or when the latch is already clear.
    pub fn mark_consumed(&self, ticket: &UpdateTicket) -> bool {
        let mut state = self.lock();
        match state.pending.get(&ticket.app) {
            Some(seq) if *seq == ticket.seq => {
                state.pending.remove(&ticket.app);
                true
            }
            _ => false,
        }
    }

    /// Check and clear in one step. Returns whether an update was pending.
    pub fn take_update_needed(&self, app: &AppKey) -> bool {
        self.lock().pending.remove(app).is_some()
    }

    /// Drop any latch state for `app`. Used once the App is gone.
    pub fn forget(&self, app: &AppKey) {
        self.lock().pending.remove(app);
    }

    /// Number of Apps with a pending forced update.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
