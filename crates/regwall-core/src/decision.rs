//! Admission decision records.
//!
//! This module defines [`AdmissionDecision`], a serializable summary of one
//! admission check for reporting and auditing.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::Transport;

/// The outcome of checking one target against the allow-list.
///
/// # Examples
///
/// ```rust
/// use regwall_core::{AdmissionDecision, Transport};
///
/// let decision = AdmissionDecision::allow("quay.io/app:1", Transport::Secure);
/// assert!(decision.is_allowed());
///
/// let denied = AdmissionDecision::deny("ghcr.io/app:1", Transport::Any, "not allowed");
/// assert!(denied.is_denied());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// The hostname or pull spec that was checked.
    pub target: String,

    /// Transport the check was made for.
    pub transport: Transport,

    /// Whether the target is allowed.
    pub allowed: bool,

    /// Why the target was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AdmissionDecision {
    /// Creates an allow decision.
    #[must_use]
    pub fn allow(target: impl Into<String>, transport: Transport) -> Self {
        Self {
            target: target.into(),
            transport,
            allowed: true,
            reason: None,
        }
    }

    /// Creates a deny decision.
    #[must_use]
    pub fn deny(target: impl Into<String>, transport: Transport, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            transport,
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Records the result of an `admit_*` call. Any error, including a
    /// malformed reference, becomes a deny carrying the error message.
    #[must_use]
    pub fn from_result(target: impl Into<String>, transport: Transport, result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self::allow(target, transport),
            Err(err) => Self::deny(target, transport, err.to_string()),
        }
    }

    /// Returns true if the target was allowed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Returns true if the target was denied.
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        !self.allowed
    }
}
