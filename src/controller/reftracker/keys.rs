//! # Tracker Keys
//!
//! Identity values for Apps and the secondary resources they reference.

use std::fmt;

/// Identifies an App by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppKey {
    namespace: String,
    name: String,
}

impl AppKey {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind of secondary resource an App can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    Secret,
    ConfigMap,
}

impl RefKind {
    /// Lowercase name, used as a metric label value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Secret => "secret",
            RefKind::ConfigMap => "configmap",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a secondary resource (Secret or ConfigMap) by kind, namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefKey {
    kind: RefKind,
    namespace: String,
    name: String,
}

impl RefKey {
    #[must_use]
    pub fn new(kind: RefKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn secret(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(RefKind::Secret, name, namespace)
    }

    #[must_use]
    pub fn config_map(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(RefKind::ConfigMap, name, namespace)
    }

    #[must_use]
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.namespace, self.name)
    }
}
