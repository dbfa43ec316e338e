//! Transport classes used to select applicable allow-list entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default port for registries reached over TLS.
pub const SECURE_PORT: u16 = 443;

/// Default port for registries reached without TLS.
pub const INSECURE_PORT: u16 = 80;

/// Whether a registry connection must, must not, or may use TLS.
///
/// # Examples
///
/// ```
/// use regwall_core::Transport;
///
/// let transport: Transport = "insecure".parse().unwrap();
/// assert_eq!(transport, Transport::Insecure);
/// assert!(transport.applies_to(true));
/// assert!(!transport.applies_to(false));
/// assert!(Transport::Any.applies_to(false));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// TLS required.
    #[default]
    Secure,
    /// TLS forbidden.
    Insecure,
    /// Either.
    Any,
}

impl Transport {
    /// Returns true if an entry registered with the given `insecure` flag
    /// is consulted for this transport.
    #[must_use]
    pub const fn applies_to(self, insecure: bool) -> bool {
        match self {
            Self::Secure => !insecure,
            Self::Insecure => insecure,
            Self::Any => true,
        }
    }

    /// Returns the transport as a lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secure => "secure",
            Self::Insecure => "insecure",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "secure" => Ok(Self::Secure),
            "insecure" => Ok(Self::Insecure),
            "any" => Ok(Self::Any),
            other => Err(format!(
                "unknown transport '{other}', expected one of: secure, insecure, any"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applies_to() {
        assert!(Transport::Secure.applies_to(false));
        assert!(!Transport::Secure.applies_to(true));
        assert!(Transport::Insecure.applies_to(true));
        assert!(!Transport::Insecure.applies_to(false));
        assert!(Transport::Any.applies_to(true));
        assert!(Transport::Any.applies_to(false));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ANY".parse::<Transport>().unwrap(), Transport::Any);
        assert_eq!("Secure".parse::<Transport>().unwrap(), Transport::Secure);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "tls".parse::<Transport>().unwrap_err();
        assert!(err.contains("unknown transport 'tls'"));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Transport::Insecure).unwrap();
        assert_eq!(json, r#""insecure""#);
        let parsed: Transport = serde_json::from_str(r#""any""#).unwrap();
        assert_eq!(parsed, Transport::Any);
    }
}
