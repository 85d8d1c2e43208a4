use thiserror::Error;

use guardian_auth::{GuardianGrant, GuardianProfile, Secret};
use guardian_core::SubjectId;

/// Failure reported by an external identity/profile collaborator.
///
/// These reasons are for logs only. The verifier collapses them into a
/// generic authentication failure before anything reaches the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("subject not found")]
    NotFound,

    #[error("subject is inactive")]
    Inactive,

    #[error("secret rejected")]
    Rejected,

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Password-based identity collaborator.
///
/// Owns its own session for the identity; this core only asks it to verify,
/// invalidate and refresh.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify `email`/`password` and return the stable identity id.
    async fn verify_password(
        &self,
        email: &str,
        password: &Secret,
    ) -> Result<SubjectId, CollaboratorError>;

    /// Tear down the collaborator-side session for `identity`.
    async fn invalidate(&self, identity: &SubjectId) -> Result<(), CollaboratorError>;

    /// Refresh the collaborator-side session. `Ok(false)` means the
    /// collaborator declined (session revoked or lapsed on its side).
    async fn refresh(&self, identity: &SubjectId) -> Result<bool, CollaboratorError>;
}

/// Guardian profile lookup keyed by a verified identity.
#[async_trait::async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn fetch_profile(&self, identity: &SubjectId)
    -> Result<GuardianProfile, CollaboratorError>;
}

/// One-step lookup-and-verify of `(subject_name, sacred key)`.
#[async_trait::async_trait]
pub trait SacredKeyDirectory: Send + Sync {
    async fn verify(
        &self,
        subject_name: &str,
        key: &Secret,
    ) -> Result<GuardianGrant, CollaboratorError>;
}

/// One-step lookup-and-verify of `(subject_name, emergency key)`.
///
/// Emergency keys are distinct from sacred keys; the same guardian may hold both.
#[async_trait::async_trait]
pub trait EmergencyDirectory: Send + Sync {
    async fn verify(
        &self,
        subject_name: &str,
        emergency_key: &Secret,
    ) -> Result<GuardianGrant, CollaboratorError>;
}
