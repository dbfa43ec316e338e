//! The registry allow-list engine.
//!
//! [`RegistryWhitelister`] holds an ordered list of [`PolicyEntry`] values and
//! a set of pinned repositories. Admission is read-only. Mutation is meant
//! for request-scoped copies: the process-wide baseline is built once and
//! only ever lent out by shared reference, and callers that need to extend it
//! take a [`RegistryWhitelister::copy`] first.
//!
//! ```
//! use regwall_core::{AllowedRegistries, RegistryLocation, RegistryWhitelister, Transport};
//!
//! let allowed: AllowedRegistries = vec![RegistryLocation::secure("quay.io")].into();
//! let baseline = RegistryWhitelister::new(&allowed).unwrap();
//!
//! assert!(baseline.admit_pull_spec("quay.io/team/app:1.0", Transport::Secure).is_ok());
//! assert!(baseline.admit_pull_spec("ghcr.io/team/app:1.0", Transport::Secure).is_err());
//!
//! let mut request = baseline.copy();
//! request.whitelist_repository("ghcr.io/team/app:1.0").unwrap();
//! assert!(request.admit_pull_spec("ghcr.io/team/app@sha256:abcd", Transport::Any).is_ok());
//! assert!(baseline.admit_pull_spec("ghcr.io/team/app:1.0", Transport::Secure).is_err());
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::{AllowedRegistries, RegistryAliases, WhitelistConfig};
use crate::entry::PolicyEntry;
use crate::error::{ParseErrorKind, Result, WhitelistError};
use crate::hostname::RegistryHostnameProvider;
use crate::reference::{parse_registry, ImageReference};
use crate::transport::Transport;

/// Number of entries spelled out in a denial message.
const SHOW_MAX: usize = 4;

/// Registry allow-list with dynamic extension.
#[derive(Debug, Clone)]
pub struct RegistryWhitelister {
    entries: Vec<PolicyEntry>,
    pinned: BTreeSet<String>,
    aliases: RegistryAliases,
    hostnames: Option<Arc<dyn RegistryHostnameProvider>>,
}

impl RegistryWhitelister {
    /// Builds an engine from allowed registries using the Docker Hub alias
    /// table.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::Configuration`] for the first pattern that
    /// fails to parse. No engine is produced in that case.
    pub fn new(allowed: &AllowedRegistries) -> Result<Self> {
        Self::builder().allowed_registries(allowed.clone()).build()
    }

    /// Builds an engine from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::Configuration`] for the first pattern that
    /// fails to parse.
    pub fn from_config(config: &WhitelistConfig) -> Result<Self> {
        Self::builder()
            .allowed_registries(config.allowed_registries.clone())
            .aliases(config.registry_aliases.clone())
            .build()
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RegistryWhitelisterBuilder {
        RegistryWhitelisterBuilder::default()
    }

    /// Returns the entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    /// Returns the pinned canonical repositories in sorted order.
    pub fn pinned_repositories(&self) -> impl Iterator<Item = &str> {
        self.pinned.iter().map(String::as_str)
    }

    /// Returns the alias table in use.
    #[must_use]
    pub const fn aliases(&self) -> &RegistryAliases {
        &self.aliases
    }

    /// Returns an independent copy. Mutating either instance afterwards is
    /// invisible to the other.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Checks whether a registry hostname (`host` or `host:port`) is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the hostname cannot
    /// be split into host and port, or a denial if no applicable entry
    /// matches.
    pub fn admit_hostname(&self, hostname: &str, transport: Transport) -> Result<()> {
        if hostname.is_empty() {
            return Err(WhitelistError::malformed(hostname, ParseErrorKind::EmptyHost));
        }
        let (host, port) =
            parse_registry(hostname).map_err(|reason| WhitelistError::malformed(hostname, reason))?;
        self.admit(hostname, host, port, transport)
    }

    /// Checks whether the registry of a parsed reference is allowed. Pinned
    /// repositories are admitted for every transport.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the registry cannot
    /// be split into host and port, or a denial if no applicable entry
    /// matches.
    pub fn admit_reference(&self, reference: &ImageReference, transport: Transport) -> Result<()> {
        let repository = reference.canonical_repository(&self.aliases);
        if self.pinned.contains(&repository) {
            trace!(repository = %repository, "Repository is pinned");
            return Ok(());
        }

        if reference.registry.is_empty() {
            let default = self.aliases.default_registry();
            return self.admit(default, default, None, transport);
        }
        let (host, port) = reference.registry_host_port()?;
        self.admit(&reference.registry, host, port, transport)
    }

    /// Parses a pull spec and checks it with [`Self::admit_reference`].
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the pull spec does
    /// not parse, or a denial if it is not allowed.
    pub fn admit_pull_spec(&self, pull_spec: &str, transport: Transport) -> Result<()> {
        let reference = ImageReference::parse(pull_spec)?;
        self.admit_reference(&reference, transport)
    }

    /// Adds a registry (optionally with a port). `Transport::Any` adds both
    /// the secure and the insecure entry. Entries already present are not
    /// added again.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if `domain` cannot be
    /// split into host and port. Nothing is added in that case.
    pub fn whitelist_registry(&mut self, domain: &str, transport: Transport) -> Result<()> {
        let flags: &[bool] = match transport {
            Transport::Secure => &[false],
            Transport::Insecure => &[true],
            Transport::Any => &[false, true],
        };

        let entries = flags
            .iter()
            .map(|&insecure| PolicyEntry::parse(domain, insecure))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| WhitelistError::malformed(domain, reason))?;

        for entry in entries {
            debug!(entry = %entry, insecure = entry.is_insecure(), "Whitelisting registry");
            self.insert(entry);
        }
        Ok(())
    }

    /// Pins the repository of `pull_spec`. Every later reference to the same
    /// canonical repository is admitted, whatever its tag or digest.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the pull spec does
    /// not parse.
    pub fn whitelist_repository(&mut self, pull_spec: &str) -> Result<()> {
        let reference = ImageReference::parse(pull_spec)?;
        let repository = reference.canonical_repository(&self.aliases);
        debug!(repository = %repository, "Pinning repository");
        self.pinned.insert(repository);
        Ok(())
    }

    fn insert(&mut self, entry: PolicyEntry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Checks a split registry against the hostname provider and the
    /// entries. `shown` is the spelling used in logs and denials.
    fn admit(&self, shown: &str, host: &str, port: Option<u16>, transport: Transport) -> Result<()> {
        if self
            .hostnames
            .as_ref()
            .is_some_and(|h| h.is_registry_hostname(shown))
        {
            trace!(registry = shown, "Integrated registry is always allowed");
            return Ok(());
        }

        let candidates = self.aliases.equivalents(host);
        let applicable: Vec<&PolicyEntry> = self
            .entries
            .iter()
            .filter(|e| transport.applies_to(e.is_insecure()))
            .collect();

        // Wildcards see only the given and canonical spellings, so
        // `*.docker.io` cannot reach `docker.io` through `index.docker.io`.
        if applicable.iter().any(|e| {
            if e.is_wildcard() {
                e.matches(host, port) || candidates.first().is_some_and(|c| e.matches(c, port))
            } else {
                candidates.iter().any(|h| e.matches(h, port))
            }
        })
        {
            trace!(registry = shown, %transport, "Registry allowed");
            return Ok(());
        }

        debug!(
            registry = shown,
            %transport,
            applicable = applicable.len(),
            "Registry not allowed"
        );

        if applicable.is_empty() {
            return Err(WhitelistError::NotAllowedByEmptyWhitelist {
                registry: shown.to_string(),
            });
        }
        Err(WhitelistError::NotAllowed {
            registry: shown.to_string(),
            whitelist: render_whitelist(&applicable),
        })
    }
}

/// Renders entries as `"a:443", "b:80", ..., and N more ...`.
fn render_whitelist(entries: &[&PolicyEntry]) -> String {
    let mut parts: Vec<String> = entries
        .iter()
        .take(SHOW_MAX)
        .map(|e| format!("{:?}", e.to_string()))
        .collect();
    if entries.len() > SHOW_MAX {
        parts.push(format!("and {} more ...", entries.len() - SHOW_MAX));
    }
    parts.join(", ")
}

/// Builder for [`RegistryWhitelister`].
#[derive(Debug, Default)]
pub struct RegistryWhitelisterBuilder {
    allowed: AllowedRegistries,
    aliases: RegistryAliases,
    hostnames: Option<Arc<dyn RegistryHostnameProvider>>,
}

impl RegistryWhitelisterBuilder {
    /// Sets the allowed registries.
    #[must_use]
    pub fn allowed_registries(mut self, allowed: AllowedRegistries) -> Self {
        self.allowed = allowed;
        self
    }

    /// Sets the alias table.
    #[must_use]
    pub fn aliases(mut self, aliases: RegistryAliases) -> Self {
        self.aliases = aliases;
        self
    }

    /// Sets the provider of the integrated registry's hostnames.
    #[must_use]
    pub fn hostname_provider(mut self, provider: Arc<dyn RegistryHostnameProvider>) -> Self {
        self.hostnames = Some(provider);
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::Configuration`] for the first pattern that
    /// fails to parse.
    pub fn build(self) -> Result<RegistryWhitelister> {
        let mut whitelister = RegistryWhitelister {
            entries: Vec::with_capacity(self.allowed.len()),
            pinned: BTreeSet::new(),
            aliases: self.aliases,
            hostnames: self.hostnames,
        };

        for location in self.allowed.iter() {
            let entry = PolicyEntry::parse(&location.domain_name, location.insecure).map_err(
                |reason| WhitelistError::Configuration {
                    domain: location.domain_name.clone(),
                    reason,
                },
            )?;
            whitelister.insert(entry);
        }

        info!(
            entries = whitelister.entries.len(),
            "Registry whitelist initialized"
        );
        Ok(whitelister)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryLocation;
    use crate::hostname::StaticHostnames;

    fn secure(domains: &[&str]) -> RegistryWhitelister {
        let allowed: AllowedRegistries = domains.iter().map(|d| RegistryLocation::secure(*d)).collect();
        RegistryWhitelister::new(&allowed).unwrap()
    }

    #[test]
    fn test_construction_preserves_order_and_dedups() {
        let whitelister = secure(&["b.io", "a.io", "b.io", "b.io:443"]);
        let rendered: Vec<String> = whitelister.entries().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["b.io:443", "a.io:443"]);
    }

    #[test]
    fn test_construction_fails_fast() {
        let allowed: AllowedRegistries = vec![
            RegistryLocation::secure("ok.io"),
            RegistryLocation::secure("0:1:2:3"),
            RegistryLocation::secure("bad:port"),
        ]
        .into();
        let err = RegistryWhitelister::new(&allowed).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"failed to parse allowed registry "0:1:2:3": too many colons"#
        );
    }

    #[test]
    fn test_render_truncates_after_four() {
        let whitelister = secure(&["a.io", "b.io", "c.io", "d.io", "e.io", "f.io"]);
        let err = whitelister.admit_hostname("z.io", Transport::Secure).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"registry "z.io" not allowed by whitelist: "a.io:443", "b.io:443", "c.io:443", "d.io:443", and 2 more ..."#
        );
    }

    #[test]
    fn test_render_exactly_four() {
        let whitelister = secure(&["a.io", "b.io", "c.io", "d.io"]);
        let err = whitelister.admit_hostname("z.io", Transport::Any).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"registry "z.io" not allowed by whitelist: "a.io:443", "b.io:443", "c.io:443", "d.io:443""#
        );
    }

    #[test]
    fn test_no_applicable_entries_is_empty_whitelist() {
        let whitelister = secure(&["a.io"]);
        let err = whitelister.admit_hostname("a.io", Transport::Insecure).unwrap_err();
        assert!(matches!(err, WhitelistError::NotAllowedByEmptyWhitelist { .. }));
        assert_eq!(err.to_string(), r#"registry "a.io" not allowed by empty whitelist"#);
    }

    #[test]
    fn test_malformed_hostname() {
        let whitelister = secure(&["*"]);
        let err = whitelister.admit_hostname("a:b:c", Transport::Any).unwrap_err();
        assert!(matches!(err, WhitelistError::MalformedReference { .. }));
        assert!(!err.is_denied());
    }

    #[test]
    fn test_empty_hostname_is_malformed() {
        let whitelister = secure(&["docker.io"]);
        let err = whitelister.admit_hostname("", Transport::Secure).unwrap_err();
        assert!(matches!(
            err,
            WhitelistError::MalformedReference {
                reason: ParseErrorKind::EmptyHost,
                ..
            }
        ));
        assert!(!err.is_denied());
    }

    #[test]
    fn test_malformed_reference_registry() {
        let whitelister = secure(&["*"]);
        let reference = ImageReference::new("busybox").with_registry("a:b:c");
        let err = whitelister.admit_reference(&reference, Transport::Any).unwrap_err();
        assert!(matches!(
            err,
            WhitelistError::MalformedReference {
                reason: ParseErrorKind::TooManyColons,
                ..
            }
        ));
    }

    #[test]
    fn test_wildcard_does_not_reach_alias_suffix() {
        let whitelister = secure(&["*.docker.io"]);
        assert!(whitelister.admit_hostname("docker.io", Transport::Secure).is_err());
        assert!(whitelister.admit_pull_spec("busybox", Transport::Secure).is_err());
        assert!(whitelister.admit_hostname("index.docker.io", Transport::Secure).is_ok());

        let whitelister = secure(&["*docker.io"]);
        assert!(whitelister.admit_hostname("docker.io", Transport::Secure).is_ok());
        assert!(whitelister.admit_hostname("registry-1.docker.io", Transport::Secure).is_ok());
    }

    #[test]
    fn test_alias_symmetry() {
        let whitelister = secure(&["index.docker.io"]);
        assert!(whitelister.admit_hostname("docker.io", Transport::Secure).is_ok());
        assert!(whitelister.admit_pull_spec("busybox", Transport::Secure).is_ok());
        assert!(whitelister.admit_hostname("quay.io", Transport::Secure).is_err());
    }

    #[test]
    fn test_empty_registry_is_reported_as_default() {
        let whitelister = secure(&["quay.io"]);
        let err = whitelister
            .admit_reference(&ImageReference::new("busybox"), Transport::Secure)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"registry "docker.io" not allowed by whitelist: "quay.io:443""#
        );
    }

    #[test]
    fn test_custom_aliases() {
        let whitelister = RegistryWhitelister::builder()
            .allowed_registries(vec![RegistryLocation::secure("mirror.local")].into())
            .aliases(RegistryAliases::none("mirror.local"))
            .build()
            .unwrap();
        assert!(whitelister.admit_pull_spec("busybox", Transport::Secure).is_ok());
        assert!(whitelister.admit_hostname("index.docker.io", Transport::Secure).is_err());
    }

    #[test]
    fn test_integrated_registry_hostname() {
        let whitelister = RegistryWhitelister::builder()
            .hostname_provider(Arc::new(
                StaticHostnames::new().with_internal("image-registry.svc:5000"),
            ))
            .build()
            .unwrap();

        for transport in [Transport::Secure, Transport::Insecure, Transport::Any] {
            assert!(whitelister
                .admit_pull_spec("image-registry.svc:5000/ns/app:1", transport)
                .is_ok());
        }
        assert!(whitelister
            .admit_hostname("image-registry.svc", Transport::Any)
            .is_err());
    }

    #[test]
    fn test_whitelist_registry_with_port() {
        let mut whitelister = secure(&[]);
        whitelister.whitelist_registry("localhost:5000", Transport::Any).unwrap();
        let rendered: Vec<String> = whitelister.entries().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["localhost:5000", "localhost:5000"]);
        assert!(whitelister.admit_hostname("localhost:5000", Transport::Insecure).is_ok());
        assert!(whitelister.admit_hostname("localhost:5001", Transport::Secure).is_err());
    }

    #[test]
    fn test_whitelist_registry_malformed_adds_nothing() {
        let mut whitelister = secure(&[]);
        let err = whitelister.whitelist_registry("a:b:c", Transport::Any).unwrap_err();
        assert!(matches!(err, WhitelistError::MalformedReference { .. }));
        assert!(whitelister.entries().is_empty());
    }

    #[test]
    fn test_pinned_repositories_listed() {
        let mut whitelister = secure(&[]);
        whitelister.whitelist_repository("quay.io/b/app:1").unwrap();
        whitelister.whitelist_repository("busybox@sha256:abcd").unwrap();
        let pinned: Vec<&str> = whitelister.pinned_repositories().collect();
        assert_eq!(pinned, vec!["docker.io/library/busybox", "quay.io/b/app"]);
    }

    #[test]
    fn test_whitelister_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegistryWhitelister>();
    }
}
