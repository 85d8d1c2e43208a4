//! Credential verification for the three guardian login flows.
//!
//! Every flow ends in either a freshly issued [`SessionRecord`] or an
//! [`AuthError`]. Collaborator-side reasons (unknown subject, wrong secret,
//! inactive guardian, directory down) are logged here and collapsed into a
//! generic failure so callers cannot tell which step of a check failed.

use std::sync::Arc;

use chrono::Utc;

use guardian_auth::{
    AuthError, GuardianGrant, GuardianProfile, Secret, SessionKind, SessionLifetimes,
    SessionRecord,
};
use guardian_core::SubjectId;

use crate::audit::{AuditForwarder, GuardianAction};
use crate::collaborators::Collaborators;
use crate::directory::{
    CollaboratorError, EmergencyDirectory, IdentityProvider, ProfileDirectory, SacredKeyDirectory,
};

pub struct CredentialVerifier {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileDirectory>,
    sacred_keys: Arc<dyn SacredKeyDirectory>,
    emergency: Arc<dyn EmergencyDirectory>,
    audit: AuditForwarder,
    lifetimes: SessionLifetimes,
}

impl CredentialVerifier {
    pub fn new(
        collaborators: &Collaborators,
        audit: AuditForwarder,
        lifetimes: SessionLifetimes,
    ) -> Self {
        Self {
            identity: collaborators.identity.clone(),
            profiles: collaborators.profiles.clone(),
            sacred_keys: collaborators.sacred_keys.clone(),
            emergency: collaborators.emergency.clone(),
            audit,
            lifetimes,
        }
    }

    /// Two-step password login: identity check, then profile lookup.
    ///
    /// A profile failure tears the identity session back down so no
    /// collaborator-side session is left orphaned.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &Secret,
    ) -> Result<SessionRecord, AuthError> {
        let identity = self
            .identity
            .verify_password(username, password)
            .await
            .map_err(|err| rejected(SessionKind::Credentials, username, &err))?;

        let profile = match self.profiles.fetch_profile(&identity).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(
                    flow = %SessionKind::Credentials,
                    %identity,
                    reason = %err,
                    "guardian profile lookup failed; tearing down identity session"
                );
                if let Err(err) = self.identity.invalidate(&identity).await {
                    tracing::warn!(
                        %identity,
                        "failed to invalidate orphaned identity session: {err}"
                    );
                }
                return Err(AuthError::ProfileNotFound);
            }
        };

        let subject_name = profile
            .subject_name
            .clone()
            .unwrap_or_else(|| username.to_string());
        Ok(self
            .issue(SessionKind::Credentials, subject_name, identity, profile)
            .await)
    }

    /// One-step sacred key login.
    pub async fn verify_sacred_key(
        &self,
        subject_name: &str,
        key: &Secret,
    ) -> Result<SessionRecord, AuthError> {
        let result = self.sacred_keys.verify(subject_name, key).await;
        self.issue_from_grant(SessionKind::SacredKey, subject_name, result)
            .await
    }

    /// Break-glass login with the guardian's emergency key.
    pub async fn verify_emergency_override(
        &self,
        subject_name: &str,
        emergency_key: &Secret,
    ) -> Result<SessionRecord, AuthError> {
        let result = self.emergency.verify(subject_name, emergency_key).await;
        self.issue_from_grant(SessionKind::Emergency, subject_name, result)
            .await
    }

    async fn issue_from_grant(
        &self,
        kind: SessionKind,
        subject_name: &str,
        result: Result<GuardianGrant, CollaboratorError>,
    ) -> Result<SessionRecord, AuthError> {
        let grant = result.map_err(|err| rejected(kind, subject_name, &err))?;
        Ok(self
            .issue(kind, subject_name.to_string(), grant.subject_id, grant.profile)
            .await)
    }

    async fn issue(
        &self,
        kind: SessionKind,
        subject_name: String,
        subject_id: SubjectId,
        mut profile: GuardianProfile,
    ) -> SessionRecord {
        for unknown in profile.permissions.unknown() {
            tracing::debug!(
                permission = %unknown,
                %subject_id,
                "carrying unrecognised permission flag"
            );
        }
        // Non-finite numbers have no JSON form; the persisted record must
        // round-trip.
        profile.ethics_thresholds.retain(|name, value| {
            let finite = value.is_finite();
            if !finite {
                tracing::warn!(
                    threshold = %name,
                    %subject_id,
                    "dropping non-finite ethics threshold"
                );
            }
            finite
        });

        let session = SessionRecord::issue(
            kind,
            subject_name,
            Some(subject_id.clone()),
            profile,
            &self.lifetimes,
            Utc::now(),
        );

        self.audit
            .record(&subject_id, GuardianAction::login(kind))
            .await;

        tracing::info!(
            flow = %kind,
            %subject_id,
            access_level = %session.access_level,
            expires_at = %session.expires_at,
            "guardian authenticated"
        );
        session
    }
}

fn rejected(kind: SessionKind, subject: &str, err: &CollaboratorError) -> AuthError {
    tracing::warn!(flow = %kind, subject, reason = %err, "guardian authentication rejected");
    AuthError::InvalidCredentials
}

impl core::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("lifetimes", &self.lifetimes)
            .finish_non_exhaustive()
    }
}
