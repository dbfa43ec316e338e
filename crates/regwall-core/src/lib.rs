//! # Regwall Core
//!
//! Container registry allow-list engine.
//!
//! Given a configured list of allowed registries (domain pattern, optional
//! port, and whether the registry is reached without TLS) the engine decides
//! whether a hostname, image reference or pull spec may be used under a
//! requested [`Transport`]. Request-scoped copies can be extended at runtime
//! with extra registries or pinned repositories without touching the
//! baseline.
//!
//! - [`RegistryWhitelister`] - the engine
//! - [`PolicyEntry`] - one normalized allow-list rule
//! - [`ImageReference`] - pull spec parsing and canonicalization
//! - [`WhitelistConfig`] - YAML/JSON configuration
//!
//! ## Example
//!
//! ```rust
//! use regwall_core::{RegistryWhitelister, Transport, WhitelistConfig};
//!
//! let config = WhitelistConfig::from_yaml_str(r#"
//! allowedRegistries:
//!   - domainName: docker.io
//!   - domainName: "*.corp.example.com"
//!   - domainName: "localhost:5000"
//!     insecure: true
//! "#).unwrap();
//!
//! let whitelister = RegistryWhitelister::from_config(&config).unwrap();
//! assert!(whitelister.admit_pull_spec("busybox:latest", Transport::Secure).is_ok());
//! assert!(whitelister.admit_hostname("registry.corp.example.com", Transport::Secure).is_ok());
//! assert!(whitelister.admit_pull_spec("localhost:5000/app", Transport::Insecure).is_ok());
//!
//! let err = whitelister.admit_hostname("quay.io", Transport::Insecure).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     r#"registry "quay.io" not allowed by whitelist: "localhost:5000""#
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decision;
pub mod entry;
pub mod error;
pub mod hostname;
pub mod reference;
pub mod transport;
pub mod whitelist;


pub use config::{AliasGroup, AllowedRegistries, RegistryAliases, RegistryLocation, WhitelistConfig};
pub use decision::AdmissionDecision;
pub use entry::{EntryPort, PolicyEntry};
pub use error::{ParseErrorKind, Result, WhitelistError};
pub use hostname::{RegistryHostnameProvider, StaticHostnames};
pub use reference::ImageReference;
pub use transport::Transport;
pub use whitelist::{RegistryWhitelister, RegistryWhitelisterBuilder};
