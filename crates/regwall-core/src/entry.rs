//! Allow-list entries.
//!
//! An entry pairs a domain pattern with a port and the transport it was
//! registered for. Entries never change after construction; the engine only
//! appends them.

use std::fmt;

use crate::error::ParseErrorKind;
use crate::reference::{parse_port, split_host_port};
use crate::transport::{INSECURE_PORT, SECURE_PORT};

/// Port constraint of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPort {
    /// Matches any port, including none.
    Any,
    /// Matches exactly this port when the target names one.
    Port(u16),
}

impl EntryPort {
    /// Returns true if a target with the given explicit port is accepted.
    /// Targets without a port are never rejected on port grounds.
    #[must_use]
    pub const fn accepts(self, port: Option<u16>) -> bool {
        match (self, port) {
            (Self::Any, _) | (_, None) => true,
            (Self::Port(expected), Some(port)) => expected == port,
        }
    }
}

impl fmt::Display for EntryPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Port(port) => write!(f, "{port}"),
        }
    }
}

/// One normalized allow-list rule.
///
/// # Examples
///
/// ```
/// use regwall_core::{EntryPort, PolicyEntry};
///
/// let entry = PolicyEntry::parse("*.foo.com", true).unwrap();
/// assert_eq!(entry.port(), EntryPort::Port(80));
/// assert!(entry.matches("registry.foo.com", None));
/// assert!(!entry.matches("foo.com", None));
/// assert_eq!(entry.to_string(), "*.foo.com:80");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyEntry {
    domain: String,
    port: EntryPort,
    insecure: bool,
}

impl PolicyEntry {
    /// Parses a domain pattern.
    ///
    /// Accepted forms are `host`, `host:port`, `host:*`, `*`, `*:*`,
    /// `*.suffix` and `*suffix`. Without an explicit port the entry gets 80
    /// when `insecure` is set and 443 otherwise.
    ///
    /// # Errors
    ///
    /// Returns the reason the pattern could not be split into a host and a
    /// port, e.g. [`ParseErrorKind::TooManyColons`].
    pub fn parse(pattern: &str, insecure: bool) -> Result<Self, ParseErrorKind> {
        let (domain, port) = split_host_port(pattern)?;
        let port = match port {
            Some("*") => EntryPort::Any,
            Some(port) => EntryPort::Port(parse_port(port)?),
            None if insecure => EntryPort::Port(INSECURE_PORT),
            None => EntryPort::Port(SECURE_PORT),
        };

        Ok(Self {
            domain: domain.to_string(),
            port,
            insecure,
        })
    }

    /// Returns the domain pattern without the port.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the port constraint.
    #[must_use]
    pub const fn port(&self) -> EntryPort {
        self.port
    }

    /// Returns true if the entry was registered for plain-text transport.
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        self.insecure
    }

    /// Returns true if the domain pattern starts with `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.domain.starts_with('*')
    }

    /// Returns true if the domain pattern matches `host`.
    ///
    /// A leading `*` turns the rest of the pattern into a suffix, so `*`
    /// matches everything, `*.foo.com` matches subdomains only and
    /// `*foo.com` also matches `foo.com` itself.
    #[must_use]
    pub fn matches_host(&self, host: &str) -> bool {
        self.domain
            .strip_prefix('*')
            .map_or_else(|| self.domain == host, |suffix| host.ends_with(suffix))
    }

    /// Returns true if both the host and the explicit port (if any) match.
    #[must_use]
    pub fn matches(&self, host: &str, port: Option<u16>) -> bool {
        self.matches_host(host) && self.port.accepts(port)
    }
}

impl fmt::Display for PolicyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.port)
    }
}
