//! Authentication failure taxonomy.

use thiserror::Error;

/// Failures surfaced by the guardian session boundary.
///
/// The display strings are what the presentation layer shows. They are
/// generic: `InvalidCredentials` covers unknown subjects, wrong
/// secrets, inactive guardians and unavailable directories alike.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid guardian credentials")]
    InvalidCredentials,

    #[error("Guardian profile not found")]
    ProfileNotFound,

    #[error("guardian directory unavailable")]
    CollaboratorUnavailable,

    #[error("guardian session expired")]
    SessionExpired,

    #[error("no active guardian session")]
    NoActiveSession,

    /// Non-fatal: reported for diagnostics, never allowed to fail the action
    /// being audited.
    #[error("audit forwarding failed: {0}")]
    AuditForwardingFailed(String),
}

impl AuthError {
    /// Whether the failure came from the verifier (as opposed to lifecycle state).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::ProfileNotFound)
    }
}
