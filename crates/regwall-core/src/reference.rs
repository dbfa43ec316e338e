//! Image reference parsing and canonicalization.
//!
//! A pull spec such as `quay.io/team/app:1.2@sha256:...` is split into
//! registry, namespace, name, tag and digest. The first path segment is
//! treated as a registry only when it contains a `.` or `:` or is
//! `localhost`; otherwise the reference points at the default registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::RegistryAliases;
use crate::error::{ParseErrorKind, Result, WhitelistError};

const MAX_TAG_LEN: usize = 128;

/// A parsed container image reference.
///
/// Empty `registry` and `namespace` fields mean "not given"; they are filled
/// in by [`ImageReference::canonical_repository`].
///
/// # Examples
///
/// ```
/// use regwall_core::{ImageReference, RegistryAliases};
///
/// let reference = ImageReference::parse("busybox:glibc").unwrap();
/// assert_eq!(reference.name, "busybox");
/// assert_eq!(reference.tag.as_deref(), Some("glibc"));
/// assert_eq!(
///     reference.canonical_repository(&RegistryAliases::default()),
///     "docker.io/library/busybox"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    /// Registry as `host` or `host:port`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry: String,

    /// First path component when the repository has more than one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Remaining path components.
    pub name: String,

    /// Tag, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Digest (`algorithm:hex`), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ImageReference {
    /// Creates a reference to `name` on the default registry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the registry.
    #[must_use]
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Parses a pull spec.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the pull spec cannot be
    /// split into an optional `host[:port]` and valid path components, or if
    /// the tag or digest is malformed.
    pub fn parse(spec: &str) -> Result<Self> {
        parse_pull_spec(spec).map_err(|reason| WhitelistError::malformed(spec, reason))
    }

    /// Splits the registry into host and explicit port.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError::MalformedReference`] if the registry has
    /// too many colons or a non-numeric port.
    pub fn registry_host_port(&self) -> Result<(&str, Option<u16>)> {
        parse_registry(&self.registry)
            .map_err(|reason| WhitelistError::malformed(self.registry.as_str(), reason))
    }

    /// Returns `registry/namespace/name` with the default registry, alias
    /// canonicalization and default namespace applied. Tag and digest are
    /// dropped.
    #[must_use]
    pub fn canonical_repository(&self, aliases: &RegistryAliases) -> String {
        let registry = if self.registry.is_empty() {
            aliases.default_registry()
        } else {
            aliases.canonicalize(&self.registry)
        };

        let namespace = if self.namespace.is_empty() {
            aliases.default_namespace(registry).unwrap_or_default()
        } else {
            self.namespace.as_str()
        };

        if namespace.is_empty() {
            format!("{registry}/{}", self.name)
        } else {
            format!("{registry}/{namespace}/{}", self.name)
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.registry.is_empty() {
            write!(f, "{}/", self.registry)?;
        }
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        f.write_str(&self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

/// Splits `host`, `host:port` or `[v6]:port` without interpreting the port.
pub(crate) fn split_host_port(s: &str) -> std::result::Result<(&str, Option<&str>), ParseErrorKind> {
    let (host, port) = if s.starts_with('[') {
        let end = s.find(']').ok_or(ParseErrorKind::UnclosedBracket)?;
        let (host, rest) = s.split_at(end + 1);
        match rest.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if rest.is_empty() => (host, None),
            None => return Err(ParseErrorKind::InvalidPort(rest.to_string())),
        }
    } else {
        match s.matches(':').count() {
            0 => (s, None),
            1 => s
                .split_once(':')
                .map(|(h, p)| (h, Some(p)))
                .ok_or(ParseErrorKind::TooManyColons)?,
            _ => return Err(ParseErrorKind::TooManyColons),
        }
    };

    if host.is_empty() {
        return Err(ParseErrorKind::EmptyHost);
    }
    Ok((host, port))
}

pub(crate) fn parse_port(port: &str) -> std::result::Result<u16, ParseErrorKind> {
    port.parse()
        .map_err(|_| ParseErrorKind::InvalidPort(port.to_string()))
}

/// Splits a registry into host and numeric port. An empty registry yields an
/// empty host.
pub(crate) fn parse_registry(registry: &str) -> std::result::Result<(&str, Option<u16>), ParseErrorKind> {
    if registry.is_empty() {
        return Ok((registry, None));
    }
    let (host, port) = split_host_port(registry)?;
    Ok((host, port.map(parse_port).transpose()?))
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn parse_pull_spec(spec: &str) -> std::result::Result<ImageReference, ParseErrorKind> {
    if spec.is_empty() {
        return Err(ParseErrorKind::Empty);
    }

    let (remainder, digest) = match spec.split_once('@') {
        Some((remainder, digest)) => {
            validate_digest(digest)?;
            (remainder, Some(digest.to_string()))
        }
        None => (spec, None),
    };

    // A colon after the last slash introduces a tag; earlier ones belong to
    // the registry port.
    let (path, tag) = match remainder.rfind(':') {
        Some(idx) if !remainder[idx + 1..].contains('/') => {
            let tag = &remainder[idx + 1..];
            validate_tag(tag)?;
            (&remainder[..idx], Some(tag.to_string()))
        }
        _ => (remainder, None),
    };

    if path.is_empty() {
        return Err(ParseErrorKind::MissingName);
    }

    let mut components: Vec<&str> = path.split('/').collect();
    let registry = if components.len() > 1 && looks_like_registry(components[0]) {
        let registry = components.remove(0);
        parse_registry(registry)?;
        registry
    } else {
        ""
    };

    for component in &components {
        validate_component(component)?;
    }

    let (namespace, name) = match components.as_slice() {
        [] => return Err(ParseErrorKind::MissingName),
        [name] => (String::new(), (*name).to_string()),
        [namespace, rest @ ..] => ((*namespace).to_string(), rest.join("/")),
    };

    Ok(ImageReference {
        registry: registry.to_string(),
        namespace,
        name,
        tag,
        digest,
    })
}

fn validate_component(component: &str) -> std::result::Result<(), ParseErrorKind> {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let ok = component.starts_with(valid_char)
        && component.ends_with(valid_char)
        && component
            .chars()
            .all(|c| valid_char(c) || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidComponent(component.to_string()))
    }
}

fn validate_tag(tag: &str) -> std::result::Result<(), ParseErrorKind> {
    let ok = tag.len() <= MAX_TAG_LEN
        && tag.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidTag(tag.to_string()))
    }
}

fn validate_digest(digest: &str) -> std::result::Result<(), ParseErrorKind> {
    let ok = digest.split_once(':').is_some_and(|(algorithm, hex)| {
        !algorithm.is_empty()
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-'))
            && !hex.is_empty()
            && hex.chars().all(|c| c.is_ascii_hexdigit())
    });
    if ok {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidDigest(digest.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:1303dbf110c57f3edf68d9f5a16c082ec06c4cf7604831669faf2c712260b5a0";

    #[test]
    fn test_canonical_repository() {
        let aliases = RegistryAliases::default();
        let cases = [
            ("busybox".to_string(), "docker.io/library/busybox"),
            ("busybox:glibc".to_string(), "docker.io/library/busybox"),
            (format!("docker.io/busybox@{DIGEST}"), "docker.io/library/busybox"),
            (
                format!("docker.io/busybox:latest@{DIGEST}"),
                "docker.io/library/busybox",
            ),
            ("library/busybox:1".to_string(), "docker.io/library/busybox"),
            ("index.docker.io/busybox".to_string(), "docker.io/library/busybox"),
            (
                format!("image-registry.openshift-image-registry.svc:5000/openshift/httpd@{DIGEST}"),
                "image-registry.openshift-image-registry.svc:5000/openshift/httpd",
            ),
            ("quay.io/app".to_string(), "quay.io/app"),
        ];

        for (spec, want) in cases {
            let reference = ImageReference::parse(&spec).unwrap();
            assert_eq!(reference.canonical_repository(&aliases), want, "spec: {spec}");
        }
    }

    #[test]
    fn test_parse_full_reference() {
        let reference = ImageReference::parse(&format!("localhost:5000/my/repo/sitory:v1@{DIGEST}")).unwrap();
        assert_eq!(reference.registry, "localhost:5000");
        assert_eq!(reference.namespace, "my");
        assert_eq!(reference.name, "repo/sitory");
        assert_eq!(reference.tag.as_deref(), Some("v1"));
        assert_eq!(reference.digest.as_deref(), Some(DIGEST));
        assert_eq!(reference.registry_host_port().unwrap(), ("localhost", Some(5000)));
    }

    #[test]
    fn test_parse_namespace_without_registry() {
        let reference = ImageReference::parse("nm/repo:latest").unwrap();
        assert!(reference.registry.is_empty());
        assert_eq!(reference.namespace, "nm");
        assert_eq!(reference.name, "repo");
    }

    #[test]
    fn test_parse_localhost_registry() {
        let reference = ImageReference::parse("localhost/app").unwrap();
        assert_eq!(reference.registry, "localhost");
        assert_eq!(reference.name, "app");
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("", ParseErrorKind::Empty),
            ("a:b:c/repo", ParseErrorKind::TooManyColons),
            ("example.com:http/repo", ParseErrorKind::InvalidPort("http".to_string())),
            ("example.com/", ParseErrorKind::InvalidComponent(String::new())),
            ("Example/Repo", ParseErrorKind::InvalidComponent("Example".to_string())),
            ("repo:-bad", ParseErrorKind::InvalidTag("-bad".to_string())),
            ("repo@sha256", ParseErrorKind::InvalidDigest("sha256".to_string())),
            ("repo@sha256:xyz", ParseErrorKind::InvalidDigest("sha256:xyz".to_string())),
            (":tag", ParseErrorKind::MissingName),
        ];

        for (spec, want) in cases {
            match ImageReference::parse(spec) {
                Err(WhitelistError::MalformedReference { reference, reason }) => {
                    assert_eq!(reference, spec);
                    assert_eq!(reason, want, "spec: {spec}");
                }
                other => panic!("expected malformed reference for {spec:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_display_round_trips_input() {
        for spec in ["busybox", "quay.io/ns/app:1.0", "localhost:5000/app@sha256:abc123"] {
            assert_eq!(ImageReference::parse(spec).unwrap().to_string(), spec);
        }
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com"), Ok(("example.com", None)));
        assert_eq!(split_host_port("example.com:*"), Ok(("example.com", Some("*"))));
        assert_eq!(split_host_port("[::1]:5000"), Ok(("[::1]", Some("5000"))));
        assert_eq!(split_host_port("[::1]"), Ok(("[::1]", None)));
        assert_eq!(split_host_port("[::1"), Err(ParseErrorKind::UnclosedBracket));
        assert_eq!(split_host_port("0:1:2:3"), Err(ParseErrorKind::TooManyColons));
        assert_eq!(split_host_port(":80"), Err(ParseErrorKind::EmptyHost));
    }

    #[test]
    fn test_parse_registry() {
        assert_eq!(parse_registry(""), Ok(("", None)));
        assert_eq!(parse_registry("docker.io:443"), Ok(("docker.io", Some(443))));
        assert_eq!(
            parse_registry("docker.io:"),
            Err(ParseErrorKind::InvalidPort(String::new()))
        );
        assert_eq!(
            parse_registry("docker.io:99999"),
            Err(ParseErrorKind::InvalidPort("99999".to_string()))
        );
    }

    #[test]
    fn test_builder() {
        let reference = ImageReference::new("busybox")
            .with_registry("docker.io")
            .with_namespace("library")
            .with_tag("1.36");
        assert_eq!(reference.to_string(), "docker.io/library/busybox:1.36");
    }
}
