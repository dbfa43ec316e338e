//! Static configuration for the registry allow-list.
//!
//! Configuration is loaded once at process start and handed to
//! [`RegistryWhitelister`](crate::RegistryWhitelister). Files use camelCase
//! keys:
//!
//! ```yaml
//! allowedRegistries:
//!   - domainName: docker.io
//!   - domainName: "*.internal.example.com"
//!     insecure: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WhitelistError};

/// One allow-list rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryLocation {
    /// Domain pattern, optionally with a port (e.g. `*.example.com:5000`).
    pub domain_name: String,

    /// Whether the registry is reached without TLS.
    #[serde(default)]
    pub insecure: bool,
}

impl RegistryLocation {
    /// Creates a location reached over TLS.
    #[must_use]
    pub fn secure(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            insecure: false,
        }
    }

    /// Creates a location reached without TLS.
    #[must_use]
    pub fn insecure(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            insecure: true,
        }
    }
}

/// Ordered list of allowed registry locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedRegistries(Vec<RegistryLocation>);

impl AllowedRegistries {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no locations are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the locations in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryLocation> {
        self.0.iter()
    }
}

impl FromIterator<RegistryLocation> for AllowedRegistries {
    fn from_iter<T: IntoIterator<Item = RegistryLocation>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<RegistryLocation>> for AllowedRegistries {
    fn from(locations: Vec<RegistryLocation>) -> Self {
        Self(locations)
    }
}

/// A set of hostnames that all name the same registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasGroup {
    /// Canonical spelling used in repository keys.
    pub canonical: String,

    /// Other hostnames for the same registry.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Namespace assumed when a reference to this registry has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,
}

impl AliasGroup {
    fn contains(&self, host: &str) -> bool {
        self.canonical == host || self.aliases.iter().any(|a| a == host)
    }
}

/// Registry alias table.
///
/// # Examples
///
/// ```
/// use regwall_core::RegistryAliases;
///
/// let aliases = RegistryAliases::default();
/// assert_eq!(aliases.default_registry(), "docker.io");
/// assert_eq!(aliases.canonicalize("index.docker.io"), "docker.io");
/// assert_eq!(aliases.canonicalize("quay.io"), "quay.io");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAliases {
    /// Registry assumed when a reference names none.
    pub default_registry: String,

    /// Alias groups.
    #[serde(default)]
    pub groups: Vec<AliasGroup>,
}

impl Default for RegistryAliases {
    fn default() -> Self {
        Self::docker_hub()
    }
}

impl RegistryAliases {
    /// Docker Hub defaults: `docker.io`, its two historical hostnames and the
    /// `library` namespace for official images.
    #[must_use]
    pub fn docker_hub() -> Self {
        Self {
            default_registry: "docker.io".to_string(),
            groups: vec![AliasGroup {
                canonical: "docker.io".to_string(),
                aliases: vec![
                    "index.docker.io".to_string(),
                    "registry-1.docker.io".to_string(),
                ],
                default_namespace: Some("library".to_string()),
            }],
        }
    }

    /// A table with no aliases at all.
    #[must_use]
    pub fn none(default_registry: impl Into<String>) -> Self {
        Self {
            default_registry: default_registry.into(),
            groups: Vec::new(),
        }
    }

    /// Returns the registry assumed for references without one.
    #[must_use]
    pub fn default_registry(&self) -> &str {
        &self.default_registry
    }

    fn group_of(&self, host: &str) -> Option<&AliasGroup> {
        self.groups.iter().find(|g| g.contains(host))
    }

    /// Maps an alias to its canonical spelling; other hosts pass through.
    #[must_use]
    pub fn canonicalize<'a>(&'a self, host: &'a str) -> &'a str {
        self.group_of(host).map_or(host, |g| g.canonical.as_str())
    }

    /// Returns every spelling of `host`, canonical first. Hosts outside any
    /// group yield only themselves.
    #[must_use]
    pub fn equivalents<'a>(&'a self, host: &'a str) -> Vec<&'a str> {
        self.group_of(host).map_or_else(
            || vec![host],
            |g| {
                std::iter::once(g.canonical.as_str())
                    .chain(g.aliases.iter().map(String::as_str))
                    .collect()
            },
        )
    }

    /// Returns the implicit namespace for `host`, if its group has one.
    #[must_use]
    pub fn default_namespace(&self, host: &str) -> Option<&str> {
        self.group_of(host)
            .and_then(|g| g.default_namespace.as_deref())
    }
}

/// Complete allow-list configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistConfig {
    /// Allowed registries, in order.
    #[serde(default)]
    pub allowed_registries: AllowedRegistries,

    /// Registry alias table.
    #[serde(default)]
    pub registry_aliases: RegistryAliases,
}

impl WhitelistConfig {
    /// Parses configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::ConfigParse`] if the document is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::ConfigParse`] if the document is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads configuration from a file. Files ending in `.json` are read as
    /// JSON, everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::ConfigLoad`] if the file cannot be read, or
    /// [`WhitelistError::ConfigParse`] if its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| WhitelistError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Loading whitelist configuration");

        if path.extension().is_some_and(|e| e == "json") {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }
}
