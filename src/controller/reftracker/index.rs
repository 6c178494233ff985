//! # Reference Index
//!
//! Bidirectional mapping between Apps and the Secrets/ConfigMaps they reference.
//!
//! Both directions are kept in step by every mutation: a pair `(app, ref)` is in
//! `app_refs[app]` exactly when it is in `ref_apps[ref]`. Sets never stay empty;
//! the owning entry is dropped as soon as its last member goes away.
//!
//! `RefIndex` carries no locking of its own. `AppRefTracker` owns one behind a
//! single lock so each mutation is applied as a unit.

use crate::controller::reftracker::keys::{AppKey, RefKey};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct RefIndex {
    app_refs: HashMap<AppKey, HashSet<RefKey>>,
    ref_apps: HashMap<RefKey, HashSet<AppKey>>,
}

impl RefIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked reference set of `app` with `new_refs`.
    ///
    /// Only the difference between the previous and new set is applied.
    pub fn reconcile_refs(&mut self, new_refs: HashSet<RefKey>, app: &AppKey) {
        let old_refs = self.app_refs.remove(app).unwrap_or_default();

        for removed in old_refs.difference(&new_refs) {
            self.unlink(removed, app);
        }
        for added in new_refs.difference(&old_refs) {
            self.ref_apps
                .entry(added.clone())
                .or_default()
                .insert(app.clone());
        }

        if !new_refs.is_empty() {
            self.app_refs.insert(app.clone(), new_refs);
        }
    }

    /// Drop `app` and every pair it participates in.
    pub fn remove_app(&mut self, app: &AppKey) {
        if let Some(refs) = self.app_refs.remove(app) {
            for r in &refs {
                self.unlink(r, app);
            }
        }
    }

    fn unlink(&mut self, r: &RefKey, app: &AppKey) {
        if let Some(apps) = self.ref_apps.get_mut(r) {
            apps.remove(app);
            if apps.is_empty() {
                self.ref_apps.remove(r);
            }
        }
    }

    #[must_use]
    pub fn owners_referencing(&self, r: &RefKey) -> HashSet<AppKey> {
        self.ref_apps.get(r).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn refs_of(&self, app: &AppKey) -> HashSet<RefKey> {
        self.app_refs.get(app).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn app_count(&self) -> usize {
        self.app_refs.len()
    }

    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.ref_apps.len()
    }

    #[must_use]
    pub fn snapshot(&self) -> RefIndexSnapshot {
        RefIndexSnapshot {
            app_refs: self.app_refs.clone(),
            ref_apps: self.ref_apps.clone(),
        }
    }
}

/// Owned copy of both directions of a [`RefIndex`] taken at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefIndexSnapshot {
    pub app_refs: HashMap<AppKey, HashSet<RefKey>>,
    pub ref_apps: HashMap<RefKey, HashSet<AppKey>>,
}

impl RefIndexSnapshot {
    /// True when both directions hold the same pairs and no set is empty.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.app_refs.iter().all(|(app, refs)| {
            !refs.is_empty()
                && refs
                    .iter()
                    .all(|r| self.ref_apps.get(r).is_some_and(|apps| apps.contains(app)))
        });
        let reverse_ok = self.ref_apps.iter().all(|(r, apps)| {
            !apps.is_empty()
                && apps
                    .iter()
                    .all(|app| self.app_refs.get(app).is_some_and(|refs| refs.contains(r)))
        });
        forward_ok && reverse_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(keys: &[&RefKey]) -> HashSet<RefKey> {
        keys.iter().map(|k| (*k).clone()).collect()
    }

    #[test]
    fn test_reconcile_refs_diff() {
        let mut index = RefIndex::new();
        let app = AppKey::new("app", "default");
        let a = RefKey::secret("a", "default");
        let b = RefKey::secret("b", "default");
        let c = RefKey::config_map("c", "default");

        index.reconcile_refs(refs(&[&a, &b]), &app);
        index.reconcile_refs(refs(&[&b, &c]), &app);

        assert!(index.owners_referencing(&a).is_empty());
        assert_eq!(index.owners_referencing(&b), HashSet::from([app.clone()]));
        assert_eq!(index.owners_referencing(&c), HashSet::from([app.clone()]));
        assert_eq!(index.refs_of(&app), refs(&[&b, &c]));
        assert!(index.snapshot().is_consistent());
    }

    #[test]
    fn test_empty_refs_drop_app_entry() {
        let mut index = RefIndex::new();
        let app = AppKey::new("app", "default");
        let a = RefKey::secret("a", "default");

        index.reconcile_refs(refs(&[&a]), &app);
        index.reconcile_refs(HashSet::new(), &app);

        assert_eq!(index.app_count(), 0);
        assert_eq!(index.ref_count(), 0);
    }

    #[test]
    fn test_shared_ref_survives_one_owner_leaving() {
        let mut index = RefIndex::new();
        let app1 = AppKey::new("app1", "default");
        let app2 = AppKey::new("app2", "default");
        let shared = RefKey::config_map("shared", "default");

        index.reconcile_refs(refs(&[&shared]), &app1);
        index.reconcile_refs(refs(&[&shared]), &app2);
        index.remove_app(&app1);

        assert_eq!(index.owners_referencing(&shared), HashSet::from([app2]));
        assert_eq!(index.app_count(), 1);
        assert!(index.snapshot().is_consistent());
    }

    #[test]
    fn test_remove_unknown_app_is_noop() {
        let mut index = RefIndex::new();
        index.remove_app(&AppKey::new("ghost", "default"));
        index.reconcile_refs(HashSet::new(), &AppKey::new("ghost", "default"));
        assert_eq!(index.snapshot(), RefIndexSnapshot::default());
    }

    #[test]
    fn test_snapshot_detects_one_sided_pair() {
        let app = AppKey::new("app", "default");
        let a = RefKey::secret("a", "default");
        let snapshot = RefIndexSnapshot {
            app_refs: HashMap::from([(app, refs(&[&a]))]),
            ref_apps: HashMap::new(),
        };
        assert!(!snapshot.is_consistent());
    }

    #[test]
    fn test_snapshot_detects_empty_residue() {
        let snapshot = RefIndexSnapshot {
            app_refs: HashMap::from([(AppKey::new("app", "default"), HashSet::new())]),
            ref_apps: HashMap::new(),
        };
        assert!(!snapshot.is_consistent());
    }
}
