//! Error types for registry allow-list operations.
//!
//! Every failure the engine can produce is a [`WhitelistError`]. Denials are
//! ordinary errors too: callers decide what an unparsable reference means, so
//! nothing here is ever folded into a silent allow or deny.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`WhitelistError`] as the error type.
pub type Result<T> = std::result::Result<T, WhitelistError>;

/// Errors returned by the allow-list engine.
#[derive(Debug, Error)]
pub enum WhitelistError {
    /// A configured registry pattern could not be parsed.
    #[error("failed to parse allowed registry {domain:?}: {reason}")]
    Configuration {
        /// The pattern as it appeared in the configuration.
        domain: String,
        /// Why parsing failed.
        reason: ParseErrorKind,
    },

    /// A pull spec, hostname or registry string could not be parsed.
    #[error("invalid reference {reference:?}: {reason}")]
    MalformedReference {
        /// The offending input.
        reference: String,
        /// Why parsing failed.
        reason: ParseErrorKind,
    },

    /// The registry is not matched by any applicable entry.
    #[error("registry {registry:?} not allowed by whitelist: {whitelist}")]
    NotAllowed {
        /// Registry as given by the caller (`host` or `host:port`).
        registry: String,
        /// Rendered enumeration of the applicable entries.
        whitelist: String,
    },

    /// No entries apply to the requested transport.
    #[error("registry {registry:?} not allowed by empty whitelist")]
    NotAllowedByEmptyWhitelist {
        /// Registry as given by the caller.
        registry: String,
    },

    /// Configuration file could not be read.
    #[error("Failed to read configuration from {}: {source}", .path.display())]
    ConfigLoad {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be deserialized.
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse {
        /// Reason reported by the deserializer.
        reason: String,
    },
}

impl WhitelistError {
    /// Returns true if this error is a policy denial rather than a failure
    /// to parse input or configuration.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(
            self,
            Self::NotAllowed { .. } | Self::NotAllowedByEmptyWhitelist { .. }
        )
    }

    pub(crate) fn malformed(reference: impl Into<String>, reason: ParseErrorKind) -> Self {
        Self::MalformedReference {
            reference: reference.into(),
            reason,
        }
    }
}

impl From<serde_yaml::Error> for WhitelistError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigParse {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for WhitelistError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse {
            reason: err.to_string(),
        }
    }
}

/// Why a registry pattern or image reference failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The input was empty.
    #[error("empty reference")]
    Empty,

    /// More than one colon outside of a port position.
    #[error("too many colons")]
    TooManyColons,

    /// A bracketed IPv6 literal was not closed.
    #[error("missing ']' in address")]
    UnclosedBracket,

    /// The host portion was empty.
    #[error("empty registry host")]
    EmptyHost,

    /// The port was empty, non-numeric or out of range.
    #[error("invalid port {0:?}")]
    InvalidPort(String),

    /// A path component contains characters outside the reference grammar.
    #[error("invalid repository path component {0:?}")]
    InvalidComponent(String),

    /// No repository name follows the registry.
    #[error("missing repository name")]
    MissingName,

    /// The tag does not match the tag grammar.
    #[error("invalid tag {0:?}")]
    InvalidTag(String),

    /// The digest is not of the form `algorithm:hex`.
    #[error("invalid digest {0:?}")]
    InvalidDigest(String),
}
