//! Context classification and namespace listing strategies for kubeswitch.

use ks_core::{Category, Classifier, NamespaceProvider};
use ks_utils::contains_any_signal;

const PRODUCTION_SIGNALS: &[&str] = &["prod", "prd"];
const STAGING_SIGNALS: &[&str] = &["stage", "stg"];
const DEVELOPMENT_SIGNALS: &[&str] = &["dev", "development"];

/// Namespaces offered when no live lookup is available.
pub const STATIC_NAMESPACES: &[&str] = &[
    "default",
    "kube-system",
    "kube-public",
    "kube-node-lease",
    "monitoring",
    "logging",
    "app-frontend",
    "app-backend",
    "database",
];

/// Classify contexts by keywords in their name.
///
/// Production beats staging, staging beats development.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create a new keyword classifier.
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, name: &str) -> Category {
        if contains_any_signal(name, PRODUCTION_SIGNALS) {
            Category::Production
        } else if contains_any_signal(name, STAGING_SIGNALS) {
            Category::Staging
        } else if contains_any_signal(name, DEVELOPMENT_SIGNALS) {
            Category::Development
        } else {
            Category::Unknown
        }
    }
}

/// Offer the same fixed namespace list for every context.
#[derive(Debug, Clone)]
pub struct StaticNamespaceProvider {
    namespaces: Vec<String>,
}

impl StaticNamespaceProvider {
    /// Create a provider serving `namespaces` in the given order.
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticNamespaceProvider {
    fn default() -> Self {
        Self::new(STATIC_NAMESPACES.iter().copied())
    }
}

impl NamespaceProvider for StaticNamespaceProvider {
    fn namespaces(&self, _context: &str) -> Vec<String> {
        self.namespaces.clone()
    }
}

/// Classifier used by the binary.
pub fn default_classifier() -> Box<dyn Classifier> {
    Box::new(KeywordClassifier::new())
}

/// Namespace provider used by the binary.
// TODO: list namespaces from the cluster API once a client is wired in.
pub fn default_namespace_provider() -> Box<dyn NamespaceProvider> {
    Box::new(StaticNamespaceProvider::default())
}
