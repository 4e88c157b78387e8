//! Core domain entities, rules, and traits for kubeswitch.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Mapping;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by the document model and its collaborators.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The kubeconfig file does not exist.
    #[error("kubeconfig not found at {}", .0.display())]
    NotFound(PathBuf),
    /// The kubeconfig file exists but could not be read.
    #[error("failed to read kubeconfig: {0}")]
    Read(String),
    /// The kubeconfig contents are malformed.
    #[error("failed to parse kubeconfig: {0}")]
    Parse(String),
    /// Writing the kubeconfig back failed.
    #[error("failed to write kubeconfig: {0}")]
    Write(String),
    /// A mutation referenced something the document does not hold.
    #[error("validation error: {0}")]
    Validation(String),
    /// The document broke one of its invariants after a mutation.
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// Returned when the storage location cannot be determined.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// True for errors raised while loading a document.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Read(_) | Self::Parse(_))
    }
}

/// Risk category derived from a context name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Development clusters.
    Development,
    /// Staging clusters.
    Staging,
    /// Production clusters; switching to one is framed as a warning.
    Production,
    /// Nothing in the name matched.
    Unknown,
}

impl Category {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `context` body of a kubeconfig context entry.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ContextEntry {
    /// Cluster identifier, never interpreted.
    #[serde(default)]
    pub cluster: String,
    /// Credential identifier, never interpreted.
    #[serde(default)]
    pub user: String,
    /// Default namespace; absent means the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Keys this tool does not understand, kept verbatim.
    #[serde(flatten)]
    pub extra: Mapping,
}

impl ContextEntry {
    /// Namespace to display, falling back to `default`.
    pub fn namespace_or_default(&self) -> &str {
        match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => namespace,
            _ => "default",
        }
    }

    /// One-line summary shown next to a context.
    pub fn summary(&self) -> String {
        format!(
            "Cluster: {} | User: {} | Namespace: {}",
            self.cluster,
            self.user,
            self.namespace_or_default()
        )
    }
}

/// A named entry of the `contexts` list.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct NamedContext {
    /// Unique context name.
    pub name: String,
    /// Context body.
    #[serde(default)]
    pub context: ContextEntry,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// In-memory kubeconfig document.
///
/// Only `contexts` and `current-context` are modelled; every other key
/// (clusters, users, preferences, ...) rides along in `extra` so a save
/// writes back exactly what was loaded plus the mutation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    /// Contexts in file order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<NamedContext>,
    /// Name of the active context, empty when unset.
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_context: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl KubeConfig {
    /// Look up a context by name.
    pub fn context(&self, name: &str) -> Option<&ContextEntry> {
        self.contexts
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.context)
    }

    fn context_mut(&mut self, name: &str) -> Option<&mut ContextEntry> {
        self.contexts
            .iter_mut()
            .find(|named| named.name == name)
            .map(|named| &mut named.context)
    }

    /// True when a context with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.context(name).is_some()
    }

    /// Context names in file order.
    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|named| named.name.as_str())
    }

    /// True when `name` is the current context.
    pub fn is_current(&self, name: &str) -> bool {
        !name.is_empty() && self.current_context == name
    }

    /// Mark `name` as the current context.
    pub fn set_current_context(&mut self, name: &str) -> CoreResult<()> {
        if !self.contains(name) {
            return Err(CoreError::Validation(format!("unknown context '{name}'")));
        }
        self.current_context = name.to_string();
        Ok(())
    }

    /// Set the default namespace of `context`.
    pub fn set_namespace(&mut self, context: &str, namespace: &str) -> CoreResult<()> {
        let entry = self
            .context_mut(context)
            .ok_or_else(|| CoreError::Validation(format!("unknown context '{context}'")))?;
        entry.namespace = Some(namespace.to_string());
        Ok(())
    }

    /// Check that `current-context` resolves whenever contexts exist.
    pub fn verify(&self) -> CoreResult<()> {
        if self.contexts.is_empty() {
            return Ok(());
        }
        if !self.contains(&self.current_context) {
            return Err(CoreError::Invariant(format!(
                "current context '{}' is not a known context",
                self.current_context
            )));
        }
        Ok(())
    }
}

// kubectl writes `contexts: null` for an empty list.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Load and save kubeconfig documents.
pub trait ConfigStore {
    /// Read the document stored at `path`.
    fn load(&self, path: &Path) -> CoreResult<KubeConfig>;
    /// Write the full document to `path`, all or nothing.
    fn save(&self, config: &KubeConfig, path: &Path) -> CoreResult<()>;
}

/// Maps a context name to its risk category.
pub trait Classifier {
    fn classify(&self, name: &str) -> Category;
}

/// Lists the namespaces offered for a context.
pub trait NamespaceProvider {
    /// Ordered namespace names for `context`.
    fn namespaces(&self, context: &str) -> Vec<String>;
}
