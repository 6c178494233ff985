//! # Secondary Resource Handlers
//!
//! Maps Secret and ConfigMap watch events to the Apps that reference them.
//!
//! Every App found through the tracker gets its forced-update latch set before
//! it is returned for scheduling, so the reconcile that follows sees it.

use crate::controller::reftracker::{AppRefTracker, AppUpdateStatus, RefKey, RefKind};
use crate::crd::App;
use crate::observability;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_runtime::reflector::ObjectRef;
use std::sync::Arc;
use tracing::debug;

/// Turns events on one kind of secondary resource into App reconcile requests
#[derive(Debug, Clone)]
pub struct RefEventHandler {
    kind: RefKind,
    tracker: Arc<AppRefTracker>,
    update_status: Arc<AppUpdateStatus>,
}

impl RefEventHandler {
    #[must_use]
    pub fn new(
        kind: RefKind,
        tracker: Arc<AppRefTracker>,
        update_status: Arc<AppUpdateStatus>,
    ) -> Self {
        Self {
            kind,
            tracker,
            update_status,
        }
    }

    /// Handler for Secret events
    #[must_use]
    pub fn secrets(tracker: Arc<AppRefTracker>, update_status: Arc<AppUpdateStatus>) -> Self {
        Self::new(RefKind::Secret, tracker, update_status)
    }

    /// Handler for ConfigMap events
    #[must_use]
    pub fn config_maps(tracker: Arc<AppRefTracker>, update_status: Arc<AppUpdateStatus>) -> Self {
        Self::new(RefKind::ConfigMap, tracker, update_status)
    }

    #[must_use]
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// Mark every App referencing the changed object as needing an update and
    /// return reconcile requests for them
    ///
    /// Objects without a name or namespace produce no requests.
    pub fn enqueue_apps(&self, meta: &ObjectMeta) -> Vec<ObjectRef<App>> {
        let (Some(name), Some(namespace)) = (meta.name.as_deref(), meta.namespace.as_deref())
        else {
            return Vec::new();
        };

        let kind = self.kind.as_str();
        observability::metrics::increment_ref_events(kind);

        let ref_key = RefKey::new(self.kind, name, namespace);
        let owners = self.tracker.owners_referencing(&ref_key);
        if owners.is_empty() {
            return Vec::new();
        }

        let requests: Vec<ObjectRef<App>> = owners
            .iter()
            .map(|app| {
                self.update_status.mark_updated(app);
                ObjectRef::new(app.name()).within(app.namespace())
            })
            .collect();

        debug!(
            resource.kind = kind,
            resource.name = name,
            resource.namespace = namespace,
            apps = requests.len(),
            "Referenced resource changed, enqueueing Apps for forced reconcile"
        );
        observability::metrics::increment_apps_enqueued(kind, requests.len());

        requests
    }
}
