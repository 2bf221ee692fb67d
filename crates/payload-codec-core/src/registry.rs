//! Namespace to codec chain registry.
//!
//! The registry is assembled once at startup and never mutated afterwards, so
//! request handlers share it through an `Arc` without locking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::CodecChain;
use crate::error::RegistryError;

/// Namespace used when a request does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Read-only mapping from namespace to its codec chain.
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    chains: HashMap<String, Arc<CodecChain>>,
}

impl CodecRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::default()
    }

    /// Look up the chain for a namespace.
    #[must_use]
    pub fn resolve(&self, namespace: &str) -> Option<Arc<CodecChain>> {
        self.chains.get(namespace).cloned()
    }

    /// Whether the namespace is registered.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.chains.contains_key(namespace)
    }

    /// Registered namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chains.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Whether no namespace is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Builder for [`CodecRegistry`].
#[derive(Debug, Default)]
pub struct CodecRegistryBuilder {
    chains: HashMap<String, Arc<CodecChain>>,
}

impl CodecRegistryBuilder {
    /// Register the chain for a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is invalid or already registered.
    pub fn register(
        mut self,
        namespace: impl Into<String>,
        chain: CodecChain,
    ) -> Result<Self, RegistryError> {
        let namespace = namespace.into();

        if !is_valid_namespace(&namespace) {
            return Err(RegistryError::InvalidNamespace(namespace));
        }
        if self.chains.contains_key(&namespace) {
            return Err(RegistryError::DuplicateNamespace(namespace));
        }

        tracing::debug!(namespace = %namespace, stages = ?chain, "Registered codec chain");
        self.chains.insert(namespace, Arc::new(chain));
        Ok(self)
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> CodecRegistry {
        CodecRegistry {
            chains: self.chains,
        }
    }
}

/// Namespaces must fit in a single path segment.
fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && !namespace.contains('/') && !namespace.chars().any(char::is_whitespace)
}
