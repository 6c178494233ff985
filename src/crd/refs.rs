//! # App Resource References
//!
//! Collects every Secret and ConfigMap an App names in its spec.
//! All references resolve in the App's own namespace.

use crate::controller::reftracker::{AppKey, RefKey};
use crate::crd::{App, InlineSource, ValuesSource};
use std::collections::HashSet;

impl App {
    /// Tracker key for this App
    #[must_use]
    pub fn key(&self) -> AppKey {
        AppKey::new(
            self.metadata.name.as_deref().unwrap_or_default(),
            self.metadata.namespace.as_deref().unwrap_or("default"),
        )
    }

    /// Whether the App has been marked for deletion
    #[must_use]
    pub fn is_being_deleted(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Secrets and ConfigMaps referenced anywhere in the spec
    #[must_use]
    pub fn resource_refs(&self) -> HashSet<RefKey> {
        let namespace = self.metadata.namespace.as_deref().unwrap_or("default");
        let mut refs = RefCollector {
            namespace,
            refs: HashSet::new(),
        };

        if let Some(secret) = self
            .spec
            .cluster
            .as_ref()
            .and_then(|c| c.kubeconfig_secret_ref.as_ref())
        {
            refs.secret(&secret.name);
        }

        for fetch in &self.spec.fetch {
            if let Some(inline) = &fetch.inline {
                refs.inline(inline);
            }
            for remote in [&fetch.image, &fetch.http, &fetch.git].into_iter().flatten() {
                if let Some(secret) = &remote.secret_ref {
                    refs.secret(&secret.name);
                }
            }
            if let Some(secret) = fetch
                .helm_chart
                .as_ref()
                .and_then(|h| h.repository.as_ref())
                .and_then(|r| r.secret_ref.as_ref())
            {
                refs.secret(&secret.name);
            }
        }

        for template in &self.spec.template {
            if let Some(ytt) = &template.ytt {
                if let Some(inline) = &ytt.inline {
                    refs.inline(inline);
                }
                refs.values(&ytt.values_from);
            }
            if let Some(helm) = &template.helm_template {
                refs.values(&helm.values_from);
            }
            if let Some(sops) = &template.sops {
                for keys in [&sops.pgp, &sops.age].into_iter().flatten() {
                    if let Some(secret) = &keys.private_keys_secret_ref {
                        refs.secret(&secret.name);
                    }
                }
            }
        }

        refs.refs
    }
}

struct RefCollector<'a> {
    namespace: &'a str,
    refs: HashSet<RefKey>,
}

impl RefCollector<'_> {
    fn secret(&mut self, name: &str) {
        if !name.is_empty() {
            self.refs.insert(RefKey::secret(name, self.namespace));
        }
    }

    fn config_map(&mut self, name: &str) {
        if !name.is_empty() {
            self.refs.insert(RefKey::config_map(name, self.namespace));
        }
    }

    fn values(&mut self, sources: &[ValuesSource]) {
        for source in sources {
            if let Some(secret) = &source.secret_ref {
                self.secret(&secret.name);
            }
            if let Some(config_map) = &source.config_map_ref {
                self.config_map(&config_map.name);
            }
        }
    }

    fn inline(&mut self, inline: &InlineSource) {
        self.values(&inline.paths_from);
    }
}
