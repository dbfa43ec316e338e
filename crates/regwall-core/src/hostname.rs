//! Hostnames of the cluster's own image registry.
//!
//! The integrated registry is always reachable, whatever the allow-list
//! says. Its hostnames are usually discovered at runtime, so they are
//! supplied through a trait rather than configuration.

use std::fmt::Debug;

/// Source of the integrated registry's hostnames.
pub trait RegistryHostnameProvider: Send + Sync + Debug {
    /// Hostname (`host` or `host:port`) used inside the cluster.
    fn internal_hostname(&self) -> Option<String>;

    /// Hostname exposed outside the cluster.
    fn external_hostname(&self) -> Option<String>;

    /// Returns true if `registry` names the integrated registry.
    fn is_registry_hostname(&self, registry: &str) -> bool {
        [self.internal_hostname(), self.external_hostname()]
            .into_iter()
            .flatten()
            .any(|h| !h.is_empty() && h == registry)
    }
}

/// Fixed hostnames, typically read from configuration.
///
/// # Examples
///
/// ```
/// use regwall_core::{RegistryHostnameProvider, StaticHostnames};
///
/// let hostnames = StaticHostnames::new()
///     .with_internal("image-registry.svc:5000");
/// assert!(hostnames.is_registry_hostname("image-registry.svc:5000"));
/// assert!(!hostnames.is_registry_hostname("image-registry.svc"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticHostnames {
    internal: Option<String>,
    external: Option<String>,
}

impl StaticHostnames {
    /// Creates a provider with no hostnames.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            internal: None,
            external: None,
        }
    }

    /// Sets the internal hostname.
    #[must_use]
    pub fn with_internal(mut self, hostname: impl Into<String>) -> Self {
        self.internal = Some(hostname.into());
        self
    }

    /// Sets the external hostname.
    #[must_use]
    pub fn with_external(mut self, hostname: impl Into<String>) -> Self {
        self.external = Some(hostname.into());
        self
    }
}

impl RegistryHostnameProvider for StaticHostnames {
    fn internal_hostname(&self) -> Option<String> {
        self.internal.clone()
    }

    fn external_hostname(&self) -> Option<String> {
        self.external.clone()
    }
}
